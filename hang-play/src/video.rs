//! Rendition selection and live switching for a video track (C12).

use std::time::{Duration, Instant};

use hang::catalog::{Video, VideoConfig};
use hang::jitter::Jitter;
use hang::sync::Sync as Scheduler;
use moq_lite::{BroadcastConsumer, Delivery, Time, Track};
use tokio::sync::Notify;

use crate::sink::Decoder;
use crate::Error;

/// How a rendition is picked when the catalog updates.
#[derive(Clone, Debug, Default)]
pub enum Target {
	/// Smallest rendition whose `codedWidth*codedHeight` is at least this many pixels;
	/// falls back to the largest rendition below it, then to the first supported one.
	#[default]
	Auto,
	Pixels(u64),
	Name(String),
}

/// Monotonic counters exposed regardless of backend.
#[derive(Clone, Copy, Debug, Default)]
pub struct Stats {
	pub frame_count: u64,
	pub bytes_received: u64,
	pub last_timestamp: Option<Time>,
}

struct Rendition<D> {
	name: String,
	jitter: Jitter,
	decoder: D,
}

/// Selects a rendition from the catalog, decodes it, and swaps renditions without a
/// visible gap: the new rendition is opened `pending` while the old stays `active`
/// until the new one proves it has caught up to the live edge.
pub struct VideoSource<D: Decoder, F: FnMut() -> D> {
	broadcast: BroadcastConsumer,
	new_decoder: F,
	target_latency: Time,
	sync: Scheduler,
	active: Option<Rendition<D>>,
	pending: Option<Rendition<D>>,
	stats: Stats,
}

/// A rendition's switch is committed once its presentation wait resolved with less
/// than this much sleep remaining, i.e. it's caught up to the live edge.
const CATCH_UP_THRESHOLD: Duration = Duration::from_millis(200);

impl<D: Decoder, F: FnMut() -> D> VideoSource<D, F> {
	pub fn new(broadcast: BroadcastConsumer, new_decoder: F, target_latency: Time) -> Self {
		Self {
			broadcast,
			new_decoder,
			target_latency,
			sync: Scheduler::new(target_latency),
			active: None,
			pending: None,
			stats: Stats::default(),
		}
	}

	pub fn stats(&self) -> Stats {
		self.stats
	}

	pub fn current_rendition(&self) -> Option<&str> {
		self.active.as_ref().map(|r| r.name.as_str())
	}

	/// Re-evaluate the rendition selection against an updated catalog.
	///
	/// A no-op if the selection is unchanged. Otherwise opens the new rendition as
	/// `pending`, probing decoder support along the way.
	pub fn update_catalog(&mut self, video: &Video, target: &Target) -> Result<(), Error> {
		let probe = self.pending.as_ref().map(|r| &r.decoder).or(self.active.as_ref().map(|r| &r.decoder));
		let selected = select_rendition(video, target, |codec, desc| match &probe {
			// No decoder instantiated yet: optimistically accept, `configure` will fail later if not.
			None => true,
			Some(decoder) => decoder.is_supported(codec, desc),
		});

		let Some((track, config)) = selected else {
			return Err(Error::Unsupported);
		};

		if self.active.as_ref().is_some_and(|r| r.name == track.name) {
			return Ok(());
		}
		if self.pending.as_ref().is_some_and(|r| r.name == track.name) {
			return Ok(());
		}

		let delivery = Delivery {
			priority: track.priority,
			max_latency: track.max_latency,
			ordered: false,
		};
		let consumer = self.broadcast.subscribe_track(track.clone(), delivery)?;
		let jitter = Jitter::new(consumer, self.target_latency);

		let mut decoder = (self.new_decoder)();
		decoder.configure(&config.codec.to_string(), config.description.as_deref())?;

		self.pending = Some(Rendition {
			name: track.name,
			jitter,
			decoder,
		});

		Ok(())
	}

	/// Decode the next frame, pacing its emission to `reference + target_latency` via
	/// the shared scheduler and committing a pending rendition switch once the wait
	/// for its frame resolved with little enough sleep remaining to mean "caught up".
	///
	/// Returns `None` once both the active and any pending track have closed.
	pub async fn poll(&mut self, cancel: &Notify) -> Result<Option<D::Frame>, Error> {
		if let Some(pending) = self.pending.as_mut() {
			let container = tokio::select! {
				biased;
				_ = cancel.notified() => return Ok(None),
				container = pending.jitter.decode() => container?,
			};

			if let Some(container) = container {
				self.stats.bytes_received += container.payload.len() as u64;
				let frame = pending.decoder.decode(container.timestamp, false, container.payload)?;

				let wait_started = Instant::now();
				if !self.sync.wait(container.timestamp, cancel).await {
					return Ok(None);
				}

				if wait_started.elapsed() < CATCH_UP_THRESHOLD {
					let committed = self.pending.take().expect("checked above");
					self.active = Some(committed);
					tracing::debug!(rendition = %self.active.as_ref().unwrap().name, "committed rendition switch");
				}

				self.stats.frame_count += 1;
				self.stats.last_timestamp = Some(container.timestamp);
				if let Some(frame) = frame {
					return Ok(Some(frame));
				}
			}
		}

		let Some(active) = self.active.as_mut() else {
			return Ok(None);
		};

		let container = tokio::select! {
			biased;
			_ = cancel.notified() => return Ok(None),
			container = active.jitter.decode() => container?,
		};

		let Some(container) = container else {
			self.active = None;
			return Ok(None);
		};

		self.stats.bytes_received += container.payload.len() as u64;

		let frame = active.decoder.decode(container.timestamp, false, container.payload)?;

		if !self.sync.wait(container.timestamp, cancel).await {
			return Ok(None);
		}

		self.stats.frame_count += 1;
		self.stats.last_timestamp = Some(container.timestamp);
		Ok(frame)
	}
}

fn select_rendition(
	video: &Video,
	target: &Target,
	supported: impl Fn(&str, Option<&[u8]>) -> bool,
) -> Option<(Track, VideoConfig)> {
	let candidates: Vec<(&Track, &VideoConfig)> = video
		.renditions
		.iter()
		.filter(|(_, config)| supported(&config.codec.to_string(), config.description.as_deref()))
		.collect();

	if let Target::Name(name) = target {
		if let Some((track, config)) = candidates.iter().find(|(t, _)| &t.name == name) {
			return Some(((*track).clone(), (*config).clone()));
		}
	}

	let target_pixels = match target {
		Target::Pixels(pixels) => Some(*pixels),
		_ => None,
	};

	if let Some(target_pixels) = target_pixels {
		let pixels = |c: &VideoConfig| c.coded_width.unwrap_or(0) * c.coded_height.unwrap_or(0);

		let mut above: Vec<_> = candidates.iter().filter(|(_, c)| pixels(c) >= target_pixels).collect();
		above.sort_by_key(|(_, c)| pixels(c));
		if let Some((track, config)) = above.first() {
			return Some(((*track).clone(), (*config).clone()));
		}

		let mut below: Vec<_> = candidates.iter().filter(|(_, c)| pixels(c) < target_pixels).collect();
		below.sort_by_key(|(_, c)| std::cmp::Reverse(pixels(c)));
		if let Some((track, config)) = below.first() {
			return Some(((*track).clone(), (*config).clone()));
		}
	}

	candidates.first().map(|(t, c)| ((*t).clone(), (*c).clone()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use hang::catalog::VideoCodec;

	fn config(width: u64, height: u64) -> VideoConfig {
		VideoConfig {
			codec: VideoCodec::VP8,
			container: hang::catalog::Container::Legacy,
			description: None,
			coded_width: Some(width),
			coded_height: Some(height),
			display_aspect_width: None,
			display_aspect_height: None,
			framerate: None,
			bitrate: None,
			optimize_for_latency: None,
			jitter: None,
		}
	}

	#[test]
	fn test_select_by_pixels_prefers_smallest_above() {
		let mut video = Video::default();
		video.renditions.insert(Track::new("sd"), config(640, 360));
		video.renditions.insert(Track::new("hd"), config(1280, 720));
		video.renditions.insert(Track::new("uhd"), config(3840, 2160));

		let (track, _) = select_rendition(&video, &Target::Pixels(640 * 360 + 1), |_, _| true).unwrap();
		assert_eq!(track.name, "hd");
	}

	#[test]
	fn test_select_by_pixels_falls_back_below_when_nothing_above() {
		let mut video = Video::default();
		video.renditions.insert(Track::new("sd"), config(640, 360));

		let (track, _) = select_rendition(&video, &Target::Pixels(10_000_000), |_, _| true).unwrap();
		assert_eq!(track.name, "sd");
	}

	#[test]
	fn test_select_by_name_overrides_pixels() {
		let mut video = Video::default();
		video.renditions.insert(Track::new("sd"), config(640, 360));
		video.renditions.insert(Track::new("hd"), config(1280, 720));

		let (track, _) = select_rendition(&video, &Target::Name("sd".to_string()), |_, _| true).unwrap();
		assert_eq!(track.name, "sd");
	}

	#[test]
	fn test_select_skips_unsupported() {
		let mut video = Video::default();
		video.renditions.insert(Track::new("sd"), config(640, 360));

		assert!(select_rendition(&video, &Target::Auto, |_, _| false).is_none());
	}
}
