use std::sync::Arc;

use crate::coding;

/// Errors that can occur while running a MoQ session.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
	#[error("transport error: {0}")]
	Transport(Arc<dyn std::error::Error + Send + Sync>),

	#[error("decode error")]
	Decode,

	#[error("unsupported version")]
	Version,

	/// A required extension was not present.
	#[error("extension required")]
	RequiredExtension,

	/// An unexpected stream type was received.
	#[error("unexpected stream type")]
	UnexpectedStream,

	/// Some VarInt was too large to represent.
	#[error("varint bounds exceeded")]
	BoundsExceeded,

	/// A duplicate broadcast/track/group was inserted.
	#[error("duplicate")]
	Duplicate,

	/// There are no more readers, or the writer gave up.
	#[error("cancelled")]
	Cancel,

	/// All producer handles were dropped without an explicit close.
	#[error("dropped")]
	Dropped,

	/// It took too long to open or transmit a stream.
	#[error("timeout")]
	Timeout,

	/// The group/frame is older than the track's latency budget allows.
	#[error("expired")]
	Expired,

	/// The group is older than the latest group and was dropped.
	#[error("old")]
	Old,

	/// The application closed the stream with an app-defined code.
	#[error("app code={0}")]
	App(u16),

	#[error("not found")]
	NotFound,

	#[error("wrong frame size")]
	WrongSize,

	#[error("protocol violation")]
	ProtocolViolation,

	#[error("unauthorized")]
	Unauthorized,

	#[error("unexpected message")]
	UnexpectedMessage,

	#[error("unsupported")]
	Unsupported,

	#[error("too large")]
	TooLarge,

	#[error("too many parameters")]
	TooManyParameters,

	#[error("invalid path")]
	InvalidPath,
}

impl Error {
	/// An integer code sent over the wire (e.g. as a QUIC stream reset/stop code).
	pub fn to_code(&self) -> u32 {
		match self {
			Self::Cancel => 0,
			Self::RequiredExtension => 1,
			Self::Old => 2,
			Self::Timeout => 3,
			Self::Transport(_) => 4,
			Self::Decode => 5,
			Self::Unauthorized => 6,
			Self::Expired => 7,
			Self::Dropped => 8,
			Self::Version => 9,
			Self::UnexpectedStream => 10,
			Self::BoundsExceeded => 11,
			Self::Duplicate => 12,
			Self::NotFound => 13,
			Self::WrongSize => 14,
			Self::ProtocolViolation => 15,
			Self::UnexpectedMessage => 16,
			Self::Unsupported => 17,
			Self::TooLarge => 18,
			Self::TooManyParameters => 19,
			Self::InvalidPath => 20,
			Self::App(app) => *app as u32 + 64,
		}
	}

	/// Decode an error from a wire code (the reverse of [Self::to_code]).
	pub fn from_code(code: u32) -> Self {
		match code {
			0 => Self::Cancel,
			1 => Self::RequiredExtension,
			2 => Self::Old,
			3 => Self::Timeout,
			4 => Self::Transport(Arc::new(std::io::Error::other("remote reset"))),
			5 => Self::Decode,
			6 => Self::Unauthorized,
			7 => Self::Expired,
			8 => Self::Dropped,
			9 => Self::Version,
			10 => Self::UnexpectedStream,
			11 => Self::BoundsExceeded,
			12 => Self::Duplicate,
			13 => Self::NotFound,
			14 => Self::WrongSize,
			15 => Self::ProtocolViolation,
			16 => Self::UnexpectedMessage,
			17 => Self::Unsupported,
			18 => Self::TooLarge,
			19 => Self::TooManyParameters,
			20 => Self::InvalidPath,
			code if code >= 64 => match u16::try_from(code - 64) {
				Ok(app) => Self::App(app),
				Err(_) => Self::ProtocolViolation,
			},
			_ => Self::ProtocolViolation,
		}
	}

	/// Convert a transport error into an [Error], decoding stream reset codes if present.
	pub fn from_transport(err: impl web_transport_trait::Error) -> Self {
		if let Some(code) = err.stream_error() {
			return Self::from_code(code);
		}

		tracing::warn!(%err, "transport error");
		Self::Transport(Arc::new(err))
	}
}

impl From<coding::DecodeError> for Error {
	fn from(err: coding::DecodeError) -> Self {
		tracing::warn!(%err, "decode error");
		Error::Decode
	}
}

impl From<coding::BoundsExceeded> for Error {
	fn from(err: coding::BoundsExceeded) -> Self {
		tracing::warn!(%err, "bounds exceeded");
		Error::BoundsExceeded
	}
}

pub type Result<T> = std::result::Result<T, Error>;
