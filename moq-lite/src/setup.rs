//! The handshake messages exchanged before a version is negotiated.
//!
//! These are encoded with `()` as the version type, since no version has
//! been agreed upon yet; every [Decode]/[Encode] impl that's generic over
//! `V: Clone` works for any version including `()`.
use std::io;

use bytes::{Bytes, BytesMut};

use crate::coding::{Decode, DecodeError, Encode};

/// Sent by the client as the first message on the setup stream.
#[derive(Clone, Debug)]
pub struct Client {
	/// Versions the client is willing to speak, in the client's preference order.
	pub versions: Vec<u64>,

	/// Opaque setup parameters, currently unused but reserved for extensions.
	pub parameters: Bytes,
}

impl<V: Clone> Decode<V> for Client {
	fn decode(cursor: &mut io::Cursor<&BytesMut>, version: V) -> Result<Self, DecodeError> {
		Ok(Self {
			versions: Decode::decode(cursor, version.clone())?,
			parameters: Decode::decode(cursor, version)?,
		})
	}
}

impl<V: Clone> Encode<V> for Client {
	fn encode(&self, buf: &mut BytesMut, version: V) {
		self.versions.encode(buf, version.clone());
		self.parameters.encode(buf, version);
	}
}

/// Sent by the server in response to [Client], picking one of the offered versions.
#[derive(Clone, Debug)]
pub struct Server {
	pub version: u64,
	pub parameters: Bytes,
}

impl<V: Clone> Decode<V> for Server {
	fn decode(cursor: &mut io::Cursor<&BytesMut>, version: V) -> Result<Self, DecodeError> {
		Ok(Self {
			version: Decode::decode(cursor, version.clone())?,
			parameters: Decode::decode(cursor, version)?,
		})
	}
}

impl<V: Clone> Encode<V> for Server {
	fn encode(&self, buf: &mut BytesMut, version: V) {
		self.version.encode(buf, version.clone());
		self.parameters.encode(buf, version);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_client_roundtrip() {
		let client = Client {
			versions: vec![0xff0dad03, 0xff0dad02],
			parameters: Bytes::new(),
		};
		let mut buf = BytesMut::new();
		client.encode(&mut buf, ());
		let mut cursor = io::Cursor::new(&buf);
		let decoded = Client::decode(&mut cursor, ()).unwrap();
		assert_eq!(decoded.versions, client.versions);
	}
}
