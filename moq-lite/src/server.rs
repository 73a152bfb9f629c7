use bytes::Bytes;

use crate::{coding::Stream, lite, setup, Error, OriginConsumer, OriginProducer, Session};

/// A MoQ server session builder.
#[derive(Default, Clone)]
pub struct Server {
	publish: Option<OriginConsumer>,
	consume: Option<OriginProducer>,
}

impl Server {
	pub fn new() -> Self {
		Default::default()
	}

	pub fn with_publish(mut self, publish: impl Into<Option<OriginConsumer>>) -> Self {
		self.publish = publish.into();
		self
	}

	pub fn with_consume(mut self, consume: impl Into<Option<OriginProducer>>) -> Self {
		self.consume = consume.into();
		self
	}

	/// Perform the MoQ handshake as a server for the given session.
	pub async fn accept<S: web_transport_trait::Session>(&self, session: S) -> Result<Session, Error> {
		if self.publish.is_none() && self.consume.is_none() {
			tracing::warn!("not publishing or consuming anything");
		}

		// Accept with a dummy version; we don't know the real one until we've decoded the client's offer.
		let mut stream = Stream::accept(&session, ()).await?;
		let client: setup::Client = stream.reader.decode().await?;
		tracing::trace!(?client, "received client setup");

		let version = lite::Version::negotiate(&client.versions)?;

		let server = setup::Server {
			version: version.to_u64(),
			parameters: Bytes::new(),
		};
		tracing::trace!(?server, "sending server setup");
		stream.writer.encode(&server).await?;

		let stream = stream.with_version(version);

		let closed = lite::start(
			session.clone(),
			stream,
			self.publish.clone(),
			self.consume.clone(),
			version,
		)
		.await?;

		tracing::debug!(?version, "connected");

		Ok(Session::new(session, closed))
	}
}
