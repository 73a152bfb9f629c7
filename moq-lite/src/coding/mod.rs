//! Wire encoding primitives shared by every message in the protocol.

mod reader;
mod stream;
mod varint;
mod writer;

pub use reader::*;
pub use stream::*;
pub use varint::*;
pub use writer::*;

use std::io;

use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Decode a type from a buffer, given the negotiated protocol version.
///
/// Implementations must be careful to not consume any bytes from `cursor` on
/// [DecodeError::Short], so the caller can buffer more data and retry.
pub trait Decode<V>: Sized {
	fn decode(cursor: &mut io::Cursor<&BytesMut>, version: V) -> Result<Self, DecodeError>;
}

/// Encode a type into a buffer, given the negotiated protocol version.
pub trait Encode<V> {
	fn encode(&self, buf: &mut BytesMut, version: V);
}

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
	#[error("not enough data, try again later")]
	Short,

	#[error("invalid value")]
	InvalidValue,

	#[error("invalid string")]
	InvalidString(#[from] std::str::Utf8Error),

	#[error("bounds exceeded")]
	BoundsExceeded(#[from] BoundsExceeded),
}

impl<V: Clone> Decode<V> for String {
	fn decode(cursor: &mut io::Cursor<&BytesMut>, version: V) -> Result<Self, DecodeError> {
		let size: usize = Decode::decode(cursor, version.clone())?;
		if cursor.remaining() < size {
			return Err(DecodeError::Short);
		}

		let mut buf = vec![0u8; size];
		cursor.copy_to_slice(&mut buf);
		Ok(String::from_utf8(buf).map_err(|e| DecodeError::InvalidString(e.utf8_error()))?)
	}
}

impl<V: Clone> Encode<V> for str {
	fn encode(&self, buf: &mut BytesMut, version: V) {
		self.len().encode(buf, version.clone());
		buf.put_slice(self.as_bytes());
	}
}

impl<V: Clone> Encode<V> for String {
	fn encode(&self, buf: &mut BytesMut, version: V) {
		self.as_str().encode(buf, version)
	}
}

impl<V: Clone> Decode<V> for Bytes {
	fn decode(cursor: &mut io::Cursor<&BytesMut>, version: V) -> Result<Self, DecodeError> {
		let size: usize = Decode::decode(cursor, version)?;
		if cursor.remaining() < size {
			return Err(DecodeError::Short);
		}

		let mut buf = BytesMut::with_capacity(size);
		buf.resize(size, 0);
		cursor.copy_to_slice(&mut buf);
		Ok(buf.freeze())
	}
}

impl<V: Clone> Encode<V> for Bytes {
	fn encode(&self, buf: &mut BytesMut, version: V) {
		self.len().encode(buf, version);
		buf.put_slice(self);
	}
}

impl<V: Clone, T: Decode<V>> Decode<V> for Vec<T> {
	fn decode(cursor: &mut io::Cursor<&BytesMut>, version: V) -> Result<Self, DecodeError> {
		let count: usize = Decode::decode(cursor, version.clone())?;
		let mut out = Vec::with_capacity(count.min(1024));
		for _ in 0..count {
			out.push(T::decode(cursor, version.clone())?);
		}
		Ok(out)
	}
}

impl<V: Clone, T: Encode<V>> Encode<V> for Vec<T> {
	fn encode(&self, buf: &mut BytesMut, version: V) {
		self.len().encode(buf, version.clone());
		for item in self {
			item.encode(buf, version.clone());
		}
	}
}

impl<V: Clone, T: Decode<V>> Decode<V> for Option<T> {
	fn decode(cursor: &mut io::Cursor<&BytesMut>, version: V) -> Result<Self, DecodeError> {
		let present: bool = Decode::decode(cursor, version.clone())?;
		if present {
			Ok(Some(T::decode(cursor, version)?))
		} else {
			Ok(None)
		}
	}
}

impl<V: Clone, T: Encode<V>> Encode<V> for Option<T> {
	fn encode(&self, buf: &mut BytesMut, version: V) {
		self.is_some().encode(buf, version.clone());
		if let Some(value) = self {
			value.encode(buf, version);
		}
	}
}
