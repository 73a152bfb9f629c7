//! The "legacy" per-frame container: a VarInt timestamp prefix followed by the raw codec payload.
//!
//! This is the container used when a catalog rendition's `container.kind` is `legacy`
//! (the default). The `cmaf` kind instead carries complete fMP4 `moof`+`mdat` fragments
//! and derives its timestamp from the `tfdt` box; see [crate::catalog::Container].

use bytes::{Bytes, BytesMut};
use moq_lite::coding::{Decode, Encode};
use moq_lite::{Frame, GroupConsumer, GroupProducer, Time};

use crate::Error;

/// A single timestamped frame as it appears on the wire for a legacy-container track.
pub struct Container {
	pub timestamp: Time,
	pub payload: Bytes,
}

impl Container {
	/// Decode the next frame off a group, if any remain.
	pub async fn decode(group: &mut GroupConsumer) -> Result<Option<Self>, Error> {
		let Some(payload) = group.read_frame().await? else {
			return Ok(None);
		};

		let mut cursor = std::io::Cursor::new(&payload);
		let timestamp = Time::decode(&mut cursor, ())?;
		let pos = cursor.position() as usize;

		Ok(Some(Self {
			timestamp,
			payload: payload.slice(pos..),
		}))
	}

	/// Encode and append this frame to a group.
	pub fn encode(&self, group: &mut GroupProducer) -> Result<(), Error> {
		let mut header = BytesMut::new();
		self.timestamp.encode(&mut header, ());

		let frame = Frame {
			size: header.len() + self.payload.len(),
			instant: self.timestamp,
		};

		let mut chunked = group.create_frame(frame)?;
		chunked.write_chunk(header.freeze())?;
		chunked.write_chunk(self.payload.clone())?;
		chunked.close()?;

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use moq_lite::Track;

	#[tokio::test]
	async fn test_roundtrip() {
		let mut track = Track::from("test").produce().producer;

		let mut group = track.append_group().unwrap();
		let container = Container {
			timestamp: Time::from_millis_unchecked(42),
			payload: Bytes::from_static(b"hello"),
		};
		container.encode(&mut group).unwrap();
		group.close().unwrap();

		let mut consumer = track.consume();
		let mut group = consumer.next_group().await.unwrap().unwrap();
		let decoded = Container::decode(&mut group).await.unwrap().unwrap();
		assert_eq!(decoded.timestamp, container.timestamp);
		assert_eq!(decoded.payload, container.payload);
	}
}
