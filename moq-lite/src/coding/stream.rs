use crate::Error;

use super::{Reader, Writer};

/// A bidirectional control stream, paired reader/writer sharing a protocol version.
pub struct Stream<S: web_transport_trait::Session, V> {
	pub reader: Reader<S::RecvStream, V>,
	pub writer: Writer<S::SendStream, V>,
}

impl<S: web_transport_trait::Session, V> Stream<S, V> {
	/// Open a new bidirectional stream.
	pub async fn open(session: &S, version: V) -> Result<Self, Error>
	where
		V: Copy,
	{
		let (send, recv) = session.open_bi().await.map_err(Error::from_transport)?;
		Ok(Self {
			reader: Reader::new(recv, version),
			writer: Writer::new(send, version),
		})
	}

	/// Accept the next bidirectional stream opened by the peer.
	pub async fn accept(session: &S, version: V) -> Result<Self, Error>
	where
		V: Copy,
	{
		let (send, recv) = session.accept_bi().await.map_err(Error::from_transport)?;
		Ok(Self {
			reader: Reader::new(recv, version),
			writer: Writer::new(send, version),
		})
	}

	/// Cast the stream to a different version, used during version negotiation.
	pub fn with_version<O: Copy>(self, version: O) -> Stream<S, O> {
		Stream {
			reader: self.reader.with_version(version),
			writer: self.writer.with_version(version),
		}
	}
}
