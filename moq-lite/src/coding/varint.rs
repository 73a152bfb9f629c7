use std::io;

use bytes::{Buf, BufMut, BytesMut};

use super::{Decode, DecodeError, Encode};

/// A QUIC-style variable-length integer, encoded as 1/2/4/8 bytes depending on magnitude.
///
/// The two most significant bits of the first byte encode the length:
/// `00` = 1 byte (6 bits of value), `01` = 2 bytes (14 bits), `10` = 4 bytes (30 bits),
/// `11` = 8 bytes (62 bits).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarInt(u64);

impl VarInt {
	pub const ZERO: VarInt = VarInt(0);
	pub const MAX: VarInt = VarInt((1 << 62) - 1);

	pub fn from_u32(value: u32) -> Self {
		VarInt(value as u64)
	}

	pub fn try_from_u64(value: u64) -> Result<Self, BoundsExceeded> {
		if value > Self::MAX.0 {
			Err(BoundsExceeded)
		} else {
			Ok(VarInt(value))
		}
	}

	pub fn into_inner(self) -> u64 {
		self.0
	}

	pub const fn from_u64_unchecked(value: u64) -> Self {
		VarInt(value)
	}

	pub fn size(&self) -> usize {
		match self.0 {
			0..=0x3f => 1,
			0x40..=0x3fff => 2,
			0x4000..=0x3fffffff => 4,
			_ => 8,
		}
	}
}

/// An encoded value would not fit in a VarInt (i.e. exceeds 2^62 - 1).
#[derive(Debug, thiserror::Error)]
#[error("value too large for varint")]
pub struct BoundsExceeded;

impl TryFrom<u64> for VarInt {
	type Error = BoundsExceeded;

	fn try_from(value: u64) -> Result<Self, Self::Error> {
		Self::try_from_u64(value)
	}
}

impl TryFrom<usize> for VarInt {
	type Error = BoundsExceeded;

	fn try_from(value: usize) -> Result<Self, Self::Error> {
		Self::try_from_u64(value as u64)
	}
}

impl From<VarInt> for u64 {
	fn from(v: VarInt) -> Self {
		v.0
	}
}

impl From<VarInt> for usize {
	fn from(v: VarInt) -> Self {
		v.0 as usize
	}
}

impl From<u8> for VarInt {
	fn from(value: u8) -> Self {
		VarInt(value as u64)
	}
}

impl From<u16> for VarInt {
	fn from(value: u16) -> Self {
		VarInt(value as u64)
	}
}

impl From<u32> for VarInt {
	fn from(value: u32) -> Self {
		VarInt(value as u64)
	}
}

impl<V> Decode<V> for VarInt {
	fn decode(cursor: &mut io::Cursor<&BytesMut>, _version: V) -> Result<Self, DecodeError> {
		if !cursor.has_remaining() {
			return Err(DecodeError::Short);
		}

		let first = cursor.chunk()[0];
		let tag = first >> 6;
		let len = 1usize << tag;

		if cursor.remaining() < len {
			return Err(DecodeError::Short);
		}

		let mut buf = [0u8; 8];
		cursor.copy_to_slice(&mut buf[8 - len..]);
		buf[8 - len] &= 0x3f;

		let value = u64::from_be_bytes(buf);
		Ok(VarInt(value))
	}
}

impl<V> Encode<V> for VarInt {
	fn encode(&self, buf: &mut BytesMut, _version: V) {
		let x = self.0;
		if x <= 0x3f {
			buf.put_u8(x as u8);
		} else if x <= 0x3fff {
			buf.put_u16(0x4000 | x as u16);
		} else if x <= 0x3fffffff {
			buf.put_u32(0x8000_0000 | x as u32);
		} else {
			buf.put_u64(0xc000_0000_0000_0000 | x);
		}
	}
}

impl<V: Clone> Decode<V> for u64 {
	fn decode(cursor: &mut io::Cursor<&BytesMut>, version: V) -> Result<Self, DecodeError> {
		Ok(VarInt::decode(cursor, version)?.into())
	}
}

impl<V> Encode<V> for u64 {
	fn encode(&self, buf: &mut BytesMut, version: V) {
		VarInt::try_from_u64(*self).unwrap_or(VarInt::MAX).encode(buf, version)
	}
}

impl<V: Clone> Decode<V> for u32 {
	fn decode(cursor: &mut io::Cursor<&BytesMut>, version: V) -> Result<Self, DecodeError> {
		let v: u64 = Decode::decode(cursor, version)?;
		v.try_into().map_err(|_| DecodeError::InvalidValue)
	}
}

impl<V> Encode<V> for u32 {
	fn encode(&self, buf: &mut BytesMut, version: V) {
		(*self as u64).encode(buf, version)
	}
}

impl<V: Clone> Decode<V> for u16 {
	fn decode(cursor: &mut io::Cursor<&BytesMut>, version: V) -> Result<Self, DecodeError> {
		let v: u64 = Decode::decode(cursor, version)?;
		v.try_into().map_err(|_| DecodeError::InvalidValue)
	}
}

impl<V> Encode<V> for u16 {
	fn encode(&self, buf: &mut BytesMut, version: V) {
		(*self as u64).encode(buf, version)
	}
}

impl<V: Clone> Decode<V> for u8 {
	fn decode(cursor: &mut io::Cursor<&BytesMut>, version: V) -> Result<Self, DecodeError> {
		let v: u64 = Decode::decode(cursor, version)?;
		v.try_into().map_err(|_| DecodeError::InvalidValue)
	}
}

impl<V> Encode<V> for u8 {
	fn encode(&self, buf: &mut BytesMut, version: V) {
		(*self as u64).encode(buf, version)
	}
}

impl<V: Clone> Decode<V> for usize {
	fn decode(cursor: &mut io::Cursor<&BytesMut>, version: V) -> Result<Self, DecodeError> {
		let v: u64 = Decode::decode(cursor, version)?;
		Ok(v as usize)
	}
}

impl<V> Encode<V> for usize {
	fn encode(&self, buf: &mut BytesMut, version: V) {
		(*self as u64).encode(buf, version)
	}
}

impl<V> Encode<V> for bool {
	fn encode(&self, buf: &mut BytesMut, _version: V) {
		buf.put_u8(if *self { 1 } else { 0 });
	}
}

impl<V> Decode<V> for bool {
	fn decode(cursor: &mut io::Cursor<&BytesMut>, _version: V) -> Result<Self, DecodeError> {
		if !cursor.has_remaining() {
			return Err(DecodeError::Short);
		}
		Ok(cursor.get_u8() != 0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn roundtrip(value: u64) {
		let v = VarInt::try_from_u64(value).unwrap();
		let mut buf = BytesMut::new();
		v.encode(&mut buf, ());
		assert_eq!(buf.len(), v.size());

		let mut cursor = io::Cursor::new(&buf);
		let decoded = VarInt::decode(&mut cursor, ()).unwrap();
		assert_eq!(decoded, v);
		assert_eq!(cursor.position() as usize, buf.len());
	}

	#[test]
	fn test_varint_boundaries() {
		roundtrip(0);
		roundtrip(63);
		roundtrip(64);
		roundtrip(16383);
		roundtrip(16384);
		roundtrip(1073741823);
		roundtrip(1073741824);
		roundtrip(VarInt::MAX.into_inner());
	}

	#[test]
	fn test_varint_short() {
		let buf = BytesMut::new();
		let mut cursor = io::Cursor::new(&buf);
		assert!(matches!(VarInt::decode(&mut cursor, ()), Err(DecodeError::Short)));
	}

	#[test]
	fn test_varint_too_large() {
		assert!(VarInt::try_from_u64(1 << 62).is_err());
	}
}
