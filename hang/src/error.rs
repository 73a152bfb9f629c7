use crate::catalog::InvalidCodec;

/// Errors produced by the `hang` media layer.
///
/// Wraps [moq_lite::Error] so a transport failure surfaces through the same type as a
/// catalog or container error, without losing the underlying cause.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	#[error("transport error: {0}")]
	Moq(#[from] moq_lite::Error),

	#[error("invalid catalog: {0}")]
	Schema(#[from] serde_json::Error),

	#[error("invalid codec string")]
	Codec(#[from] InvalidCodec),

	#[error("no rendition in the catalog is supported")]
	Unsupported,

	#[error("malformed container")]
	Container,
}
