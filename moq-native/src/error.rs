#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	#[error("moq session error: {0}")]
	Moq(#[from] moq_lite::Error),

	#[error("QUIC connect failed: {0}")]
	Quic(#[from] quinn::ConnectError),

	#[error("QUIC connection failed: {0}")]
	Connection(#[from] quinn::ConnectionError),

	#[error("webtransport error: {0}")]
	WebTransport(#[from] web_transport_quinn::Error),

	#[error("invalid TLS configuration: {0}")]
	Tls(#[from] rustls::Error),

	#[error("failed to load native root certificates")]
	Roots,

	#[error("relay URL missing a hostname")]
	MissingHost,

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}
