//! Capability traits an embedding application implements: a WebCodecs-style [Decoder]
//! for the canvas path, and an MSE-style [MediaSink] for the media-element path.
//!
//! Decoding, rendering, and the concrete media element are all out of scope here —
//! frames in, frames out, exactly as [hang]'s own module doc puts it.

use bytes::Bytes;
use moq_lite::Time;

use crate::Error;

/// A decoder that turns compressed per-frame payloads into presentable output.
///
/// `Frame` is opaque to this crate: it's whatever the embedder's decoder produces
/// (a GPU texture handle, a software bitmap, …).
pub trait Decoder: Send {
	type Frame: Send;

	/// Probe whether this decoder can handle the given codec string and optional
	/// out-of-band description (e.g. an `avcC`/`hvcC`/`AudioSpecificConfig` box).
	fn is_supported(&self, codec: &str, description: Option<&[u8]>) -> bool;

	/// Configure the decoder for a specific rendition. Called once per committed
	/// rendition switch, never mid-stream for the same rendition.
	fn configure(&mut self, codec: &str, description: Option<&[u8]>) -> Result<(), Error>;

	/// Decode one frame, returning the presentable output once it's ready.
	///
	/// Decoders are free to buffer internally (B-frame reordering) and return `None`
	/// until enough input has accumulated.
	fn decode(&mut self, timestamp: Time, keyframe: bool, data: Bytes) -> Result<Option<Self::Frame>, Error>;
}

/// An MSE-style media sink: one source buffer per media type, fed init once then
/// fragments serially.
pub trait MediaSink: Send {
	/// Add a source buffer typed by MIME + codec string derived from the catalog.
	/// Fails if the sink (media source) doesn't support the given type.
	fn add_source_buffer(&mut self, mime_codec: &str) -> Result<(), Error>;

	/// Append the track-specific init segment. Called exactly once per source buffer.
	async fn append_init(&mut self, data: Bytes) -> Result<(), Error>;

	/// Append one fragment, waiting for the sink's "update-end" signal before returning.
	async fn append_fragment(&mut self, data: Bytes) -> Result<(), Error>;

	/// Remove `[0, until)` seconds from the buffered range.
	fn trim(&mut self, until: f64) -> Result<(), Error>;

	/// `[start, end)` second ranges currently buffered, per the sink's own accounting.
	fn buffered(&self) -> Vec<(f64, f64)>;

	/// The sink's current playhead position, in seconds.
	fn current_time(&self) -> f64;

	/// Move the playhead, e.g. to skip forward past a stall.
	fn seek(&mut self, to: f64);

	/// Pause or resume playback. Returns an error if resuming playback failed (the
	/// embedder is expected to treat that as "still paused").
	fn set_paused(&mut self, paused: bool) -> Result<(), Error>;
}
