#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	#[error("hang error: {0}")]
	Hang(#[from] hang::Error),

	#[error("moq error: {0}")]
	Moq(#[from] moq_lite::Error),

	#[error("no rendition in the catalog is supported by the decoder")]
	Unsupported,

	#[error("decoder rejected the media sink's source buffer configuration")]
	SinkUnsupported,

	#[error("media source closed before the buffer could be used")]
	SourceClosed,
}
