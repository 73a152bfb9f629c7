use std::io;

use bytes::BytesMut;

use crate::coding::{Decode, DecodeError, Encode};
use crate::{Path, Time};

/// Sent by the subscriber to request all future groups for the given track.
///
/// Objects on the resulting data streams reference `id` instead of the full
/// track name, to save bytes.
#[derive(Clone, Debug)]
pub struct Subscribe {
	pub id: u64,
	pub broadcast: Path<'static>,
	pub track: String,
	pub priority: u8,
	pub max_latency: Time,
	pub ordered: bool,
}

impl<V: Clone> Decode<V> for Subscribe {
	fn decode(cursor: &mut io::Cursor<&BytesMut>, version: V) -> Result<Self, DecodeError> {
		Ok(Self {
			id: Decode::decode(cursor, version.clone())?,
			broadcast: Decode::decode(cursor, version.clone())?,
			track: Decode::decode(cursor, version.clone())?,
			priority: Decode::decode(cursor, version.clone())?,
			max_latency: Decode::decode(cursor, version.clone())?,
			ordered: Decode::decode(cursor, version)?,
		})
	}
}

impl<V: Clone> Encode<V> for Subscribe {
	fn encode(&self, buf: &mut BytesMut, version: V) {
		self.id.encode(buf, version.clone());
		self.broadcast.encode(buf, version.clone());
		self.track.encode(buf, version.clone());
		self.priority.encode(buf, version.clone());
		self.max_latency.encode(buf, version.clone());
		self.ordered.encode(buf, version);
	}
}

/// Sent in response to [Subscribe], and again whenever the effective
/// delivery parameters change (e.g. because another subscriber joined).
#[derive(Clone, Copy, Debug)]
pub struct SubscribeOk {
	pub priority: u8,
	pub max_latency: Time,
	pub ordered: bool,
}

impl<V: Clone> Decode<V> for SubscribeOk {
	fn decode(cursor: &mut io::Cursor<&BytesMut>, version: V) -> Result<Self, DecodeError> {
		Ok(Self {
			priority: Decode::decode(cursor, version.clone())?,
			max_latency: Decode::decode(cursor, version.clone())?,
			ordered: Decode::decode(cursor, version)?,
		})
	}
}

impl<V: Clone> Encode<V> for SubscribeOk {
	fn encode(&self, buf: &mut BytesMut, version: V) {
		self.priority.encode(buf, version.clone());
		self.max_latency.encode(buf, version.clone());
		self.ordered.encode(buf, version);
	}
}

/// Sent by the subscriber on the same stream to change the requested
/// delivery parameters for an active subscription.
#[derive(Clone, Copy, Debug)]
pub struct SubscribeUpdate {
	pub priority: u8,
	pub max_latency: Time,
	pub ordered: bool,
}

impl<V: Clone> Decode<V> for SubscribeUpdate {
	fn decode(cursor: &mut io::Cursor<&BytesMut>, version: V) -> Result<Self, DecodeError> {
		Ok(Self {
			priority: Decode::decode(cursor, version.clone())?,
			max_latency: Decode::decode(cursor, version.clone())?,
			ordered: Decode::decode(cursor, version)?,
		})
	}
}

impl<V: Clone> Encode<V> for SubscribeUpdate {
	fn encode(&self, buf: &mut BytesMut, version: V) {
		self.priority.encode(buf, version.clone());
		self.max_latency.encode(buf, version.clone());
		self.ordered.encode(buf, version);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_subscribe_roundtrip() {
		let msg = Subscribe {
			id: 7,
			broadcast: Path::new("room/alice"),
			track: "camera".to_string(),
			priority: 128,
			max_latency: Time::from_millis_unchecked(500),
			ordered: true,
		};

		let mut buf = BytesMut::new();
		msg.encode(&mut buf, ());
		let mut cursor = io::Cursor::new(&buf);
		let decoded = Subscribe::decode(&mut cursor, ()).unwrap();

		assert_eq!(decoded.id, msg.id);
		assert_eq!(decoded.broadcast, msg.broadcast);
		assert_eq!(decoded.track, msg.track);
		assert_eq!(decoded.priority, msg.priority);
		assert_eq!(decoded.max_latency, msg.max_latency);
		assert_eq!(decoded.ordered, msg.ordered);
	}
}
