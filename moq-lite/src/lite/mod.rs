//! Wire messages and version negotiation for the control/data stream protocol.
//!
//! This implementation speaks one wire format (modeled on the `moq-lite` draft
//! series) but recognizes version numbers from both the `moq-lite` and IETF
//! MoQ Transport numeric families during setup, so it can produce a useful
//! [Error::Version] instead of silently refusing to negotiate with a peer
//! that only understands the other family.

mod publisher;
mod session;
mod subscribe;
mod subscriber;

pub(crate) use publisher::*;
pub(crate) use session::*;
pub(crate) use subscriber::*;
pub use subscribe::*;

use std::io;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::coding::{Decode, DecodeError, Encode};
use crate::{Path, Time};

/// The negotiated protocol version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Version {
	Draft01,
	Draft02,
	Draft03,
}

/// The moq-lite draft version numbers, in preference order (highest first).
pub const VERSIONS: [u64; 3] = [0xff0dad03, 0xff0dad02, 0xff0dad01];

/// IETF moq-transport numeric version ids. We recognize these during setup so
/// we can report [Error::Version] instead of silently hanging, but this
/// implementation does not speak the IETF wire format.
const IETF_VERSIONS: [u64; 4] = [0xff000007, 0xff00000e, 0xff00000f, 0xff000010];

impl Version {
	pub fn to_u64(self) -> u64 {
		match self {
			Self::Draft01 => 0xff0dad01,
			Self::Draft02 => 0xff0dad02,
			Self::Draft03 => 0xff0dad03,
		}
	}

	/// Pick the best mutually supported version from a list offered by a peer.
	pub fn negotiate(offered: &[u64]) -> Result<Self, crate::Error> {
		for &supported in VERSIONS.iter() {
			if offered.contains(&supported) {
				return Self::try_from(supported);
			}
		}

		if offered.iter().any(|v| IETF_VERSIONS.contains(v)) {
			tracing::warn!("peer only offered IETF moq-transport versions, which are unsupported");
		}

		Err(crate::Error::Version)
	}
}

impl TryFrom<u64> for Version {
	type Error = crate::Error;

	fn try_from(value: u64) -> Result<Self, Self::Error> {
		match value {
			0xff0dad01 => Ok(Self::Draft01),
			0xff0dad02 => Ok(Self::Draft02),
			0xff0dad03 => Ok(Self::Draft03),
			_ => Err(crate::Error::Version),
		}
	}
}

/// The type of a control stream, sent as the first message on the stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum ControlType {
	Announce = 1,
	Subscribe = 2,
}

impl<V: Clone> Decode<V> for ControlType {
	fn decode(cursor: &mut io::Cursor<&BytesMut>, version: V) -> Result<Self, DecodeError> {
		match u64::decode(cursor, version)? {
			1 => Ok(Self::Announce),
			2 => Ok(Self::Subscribe),
			_ => Err(DecodeError::InvalidValue),
		}
	}
}

impl<V: Clone> Encode<V> for ControlType {
	fn encode(&self, buf: &mut BytesMut, version: V) {
		(*self as u64).encode(buf, version)
	}
}

/// The type of a unidirectional data stream, sent as the first message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum DataType {
	Group = 1,
}

impl<V: Clone> Decode<V> for DataType {
	fn decode(cursor: &mut io::Cursor<&BytesMut>, version: V) -> Result<Self, DecodeError> {
		match u64::decode(cursor, version)? {
			1 => Ok(Self::Group),
			_ => Err(DecodeError::InvalidValue),
		}
	}
}

impl<V: Clone> Encode<V> for DataType {
	fn encode(&self, buf: &mut BytesMut, version: V) {
		(*self as u64).encode(buf, version)
	}
}

/// Opaque setup parameters. Currently unused but reserved for extensions.
#[derive(Clone, Debug, Default)]
pub struct Parameters(pub Bytes);

impl<V: Clone> Decode<V> for Parameters {
	fn decode(cursor: &mut io::Cursor<&BytesMut>, version: V) -> Result<Self, DecodeError> {
		Ok(Self(Bytes::decode(cursor, version)?))
	}
}

impl<V: Clone> Encode<V> for Parameters {
	fn encode(&self, buf: &mut BytesMut, version: V) {
		self.0.encode(buf, version)
	}
}

/// Sent by a subscriber to request announcements for all broadcasts under `prefix`.
#[derive(Clone, Debug)]
pub struct AnnouncePlease {
	pub prefix: Path<'static>,
}

impl<V: Clone> Decode<V> for AnnouncePlease {
	fn decode(cursor: &mut io::Cursor<&BytesMut>, version: V) -> Result<Self, DecodeError> {
		Ok(Self {
			prefix: Decode::decode(cursor, version)?,
		})
	}
}

impl<V: Clone> Encode<V> for AnnouncePlease {
	fn encode(&self, buf: &mut BytesMut, version: V) {
		self.prefix.encode(buf, version);
	}
}

/// Sent once in response to [AnnouncePlease], listing all broadcasts already active.
#[derive(Clone, Debug)]
pub struct AnnounceInit {
	pub suffixes: Vec<String>,
}

impl<V: Clone> Decode<V> for AnnounceInit {
	fn decode(cursor: &mut io::Cursor<&BytesMut>, version: V) -> Result<Self, DecodeError> {
		Ok(Self {
			suffixes: Decode::decode(cursor, version)?,
		})
	}
}

impl<V: Clone> Encode<V> for AnnounceInit {
	fn encode(&self, buf: &mut BytesMut, version: V) {
		self.suffixes.encode(buf, version);
	}
}

/// Incremental updates after [AnnounceInit], one per broadcast transition.
#[derive(Clone, Debug)]
pub enum Announce {
	Active { suffix: String },
	Ended { suffix: String },
}

impl<V: Clone> Decode<V> for Announce {
	fn decode(cursor: &mut io::Cursor<&BytesMut>, version: V) -> Result<Self, DecodeError> {
		let active = bool::decode(cursor, version.clone())?;
		let suffix = String::decode(cursor, version)?;
		Ok(if active {
			Self::Active { suffix }
		} else {
			Self::Ended { suffix }
		})
	}
}

impl<V: Clone> Encode<V> for Announce {
	fn encode(&self, buf: &mut BytesMut, version: V) {
		match self {
			Self::Active { suffix } => {
				true.encode(buf, version.clone());
				suffix.encode(buf, version);
			}
			Self::Ended { suffix } => {
				false.encode(buf, version.clone());
				suffix.encode(buf, version);
			}
		}
	}
}

/// The header of a unidirectional stream carrying one group's frames.
#[derive(Clone, Copy, Debug)]
pub struct Group {
	pub subscribe: u64,
	pub sequence: u64,
}

impl<V: Clone> Decode<V> for Group {
	fn decode(cursor: &mut io::Cursor<&BytesMut>, version: V) -> Result<Self, DecodeError> {
		Ok(Self {
			subscribe: Decode::decode(cursor, version.clone())?,
			sequence: Decode::decode(cursor, version)?,
		})
	}
}

impl<V: Clone> Encode<V> for Group {
	fn encode(&self, buf: &mut BytesMut, version: V) {
		self.subscribe.encode(buf, version.clone());
		self.sequence.encode(buf, version);
	}
}

/// The header preceding each frame's payload within a group stream.
///
/// `delta` is the frame's timestamp relative to the previous frame in the
/// group (zero for the first frame), which tends to compress better than an
/// absolute timestamp and naturally resets per-group.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameHeader {
	pub delta: Time,
	pub size: usize,
}

impl<V: Clone> Decode<V> for FrameHeader {
	fn decode(cursor: &mut io::Cursor<&BytesMut>, version: V) -> Result<Self, DecodeError> {
		let delta = Decode::decode(cursor, version.clone())?;
		let size = Decode::decode(cursor, version)?;
		Ok(Self { delta, size })
	}
}

impl<V: Clone> Encode<V> for FrameHeader {
	fn encode(&self, buf: &mut BytesMut, version: V) {
		self.delta.encode(buf, version.clone());
		self.size.encode(buf, version);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_version_negotiate() {
		let v = Version::negotiate(&[0xff0dad02, 0xff0dad03]).unwrap();
		assert_eq!(v, Version::Draft03);
	}

	#[test]
	fn test_version_negotiate_ietf_only() {
		assert!(Version::negotiate(&[0xff000007]).is_err());
	}

	#[test]
	fn test_frame_header_roundtrip() {
		let header = FrameHeader {
			delta: Time::from_millis_unchecked(33),
			size: 1024,
		};
		let mut buf = BytesMut::new();
		header.encode(&mut buf, ());
		let mut cursor = io::Cursor::new(&buf);
		let decoded = FrameHeader::decode(&mut cursor, ()).unwrap();
		assert_eq!(decoded.delta, header.delta);
		assert_eq!(decoded.size, header.size);
	}
}
