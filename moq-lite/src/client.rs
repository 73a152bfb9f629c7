use bytes::Bytes;

use crate::{coding::Stream, lite, setup, Error, OriginConsumer, OriginProducer, Session};

/// A MoQ client session builder.
#[derive(Default, Clone)]
pub struct Client {
	publish: Option<OriginConsumer>,
	consume: Option<OriginProducer>,
}

impl Client {
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

	/// Perform the MoQ handshake as a client negotiating the version.
	pub async fn connect<S: web_transport_trait::Session>(&self, session: S) -> Result<Session, Error> {
		if self.publish.is_none() && self.consume.is_none() {
			tracing::warn!("not publishing or consuming anything");
		}

		let mut stream = Stream::open(&session, ()).await?;

		let client = setup::Client {
			versions: lite::VERSIONS.into(),
			parameters: Bytes::new(),
		};

		tracing::trace!(?client, "sending client setup");
		stream.writer.encode(&client).await?;

		let server: setup::Server = stream.reader.decode().await?;
		tracing::trace!(?server, "received server setup");

		let version = lite::Version::try_from(server.version)?;
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
