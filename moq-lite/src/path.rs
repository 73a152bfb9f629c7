use std::{borrow::Cow, fmt, io};

use bytes::BytesMut;

use crate::coding::{Decode, DecodeError, Encode};

/// A hierarchical broadcast name, eg. `room/alice/camera`.
///
/// Paths are always absolute (no leading/trailing slash) and use `/` to
/// separate segments. Each segment must be non-empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path<'a>(Cow<'a, str>);

impl<'a> Path<'a> {
	pub fn new(path: impl Into<Cow<'a, str>>) -> Self {
		Self(path.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn into_owned(self) -> Path<'static> {
		Path(Cow::Owned(self.0.into_owned()))
	}

	pub fn segments(&self) -> impl Iterator<Item = &str> {
		self.0.split('/').filter(|s| !s.is_empty())
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Returns true if `self` is `prefix` or a descendant of it.
	pub fn has_prefix(&self, prefix: &Path<'_>) -> bool {
		if prefix.is_empty() {
			return true;
		}

		match self.0.strip_prefix(prefix.as_str()) {
			Some(rest) => rest.is_empty() || rest.starts_with('/'),
			None => false,
		}
	}

	/// Strip `prefix` from `self`, returning the remaining suffix.
	pub fn strip_prefix(&self, prefix: &Path<'_>) -> Option<Path<'static>> {
		if !self.has_prefix(prefix) {
			return None;
		}

		let rest = self.0[prefix.0.len()..].trim_start_matches('/');
		Some(Path(Cow::Owned(rest.to_string())))
	}

	/// Join a suffix onto this path.
	pub fn join(&self, suffix: &Path<'_>) -> Path<'static> {
		if self.is_empty() {
			return suffix.clone().into_owned();
		}
		if suffix.is_empty() {
			return self.clone().into_owned();
		}

		Path(Cow::Owned(format!("{}/{}", self.0, suffix.0)))
	}
}

impl fmt::Display for Path<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl<'a> From<&'a str> for Path<'a> {
	fn from(value: &'a str) -> Self {
		Path(Cow::Borrowed(value))
	}
}

impl From<String> for Path<'static> {
	fn from(value: String) -> Self {
		Path(Cow::Owned(value))
	}
}

impl AsRef<str> for Path<'_> {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

/// Anything that can be cheaply viewed as a [Path].
pub trait AsPath {
	fn as_path(&self) -> Path<'_>;
}

impl AsPath for str {
	fn as_path(&self) -> Path<'_> {
		Path(Cow::Borrowed(self))
	}
}

impl AsPath for String {
	fn as_path(&self) -> Path<'_> {
		Path(Cow::Borrowed(self.as_str()))
	}
}

impl AsPath for Path<'_> {
	fn as_path(&self) -> Path<'_> {
		Path(Cow::Borrowed(self.as_str()))
	}
}

impl<V: Clone> Decode<V> for Path<'static> {
	fn decode(cursor: &mut io::Cursor<&BytesMut>, version: V) -> Result<Self, DecodeError> {
		let s: String = Decode::decode(cursor, version)?;
		Ok(Path(Cow::Owned(s)))
	}
}

impl<V: Clone> Encode<V> for Path<'_> {
	fn encode(&self, buf: &mut BytesMut, version: V) {
		self.0.as_ref().encode(buf, version)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_prefix() {
		let full = Path::new("room/alice/camera");
		let prefix = Path::new("room/alice");
		assert!(full.has_prefix(&prefix));
		assert_eq!(full.strip_prefix(&prefix).unwrap().as_str(), "camera");

		let other = Path::new("room/bob");
		assert!(!full.has_prefix(&other));
	}

	#[test]
	fn test_join() {
		let base = Path::new("room/alice");
		let suffix = Path::new("camera");
		assert_eq!(base.join(&suffix).as_str(), "room/alice/camera");
	}

	#[test]
	fn test_empty_prefix() {
		let full = Path::new("room/alice");
		let empty = Path::new("");
		assert!(full.has_prefix(&empty));
		assert_eq!(full.strip_prefix(&empty).unwrap().as_str(), "room/alice");
	}
}
