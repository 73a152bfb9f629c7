//! Feeds a [MediaSink] with init + per-fragment data, enforcing a rolling buffer
//! window, live-edge skip-forward, and pause/play (C14).

use std::collections::VecDeque;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, watch};

use crate::sink::MediaSink;
use crate::Error;

const APPEND_QUEUE_CAP: usize = 10;
const TRIM_INTERVAL: Duration = Duration::from_secs(1);
const SKIP_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Drives one source buffer: appends fragments serially, trims behind the playhead,
/// and skips forward when buffered media runs too far ahead of `current_time`.
pub struct Muxer<S: MediaSink> {
	sink: S,
	queue: VecDeque<Bytes>,
	target_latency: Duration,
	trim_retention: Duration,
}

impl<S: MediaSink> Muxer<S> {
	pub fn new(mut sink: S, mime_codec: &str, target_latency: Duration) -> Result<Self, Error> {
		sink.add_source_buffer(mime_codec).map_err(|_| Error::SinkUnsupported)?;
		let trim_retention = target_latency.saturating_add(Duration::from_secs(1)).max(Duration::from_secs(10));
		Ok(Self {
			sink,
			queue: VecDeque::new(),
			target_latency,
			trim_retention,
		})
	}

	/// Append the track-specific init segment. Call exactly once, before any fragment.
	pub async fn append_init(&mut self, data: Bytes) -> Result<(), Error> {
		self.sink.append_init(data).await?;
		Ok(())
	}

	/// Queue a fragment for serial append. If the bounded queue is already full, the
	/// oldest pending fragment is dropped and logged rather than blocking the producer.
	pub fn enqueue_fragment(&mut self, data: Bytes) {
		if self.queue.len() >= APPEND_QUEUE_CAP {
			tracing::warn!("append queue full, dropping oldest pending fragment");
			self.queue.pop_front();
		}
		self.queue.push_back(data);
	}

	async fn drain_one(&mut self) -> Result<(), Error> {
		if let Some(fragment) = self.queue.pop_front() {
			if let Err(err) = self.sink.append_fragment(fragment).await {
				tracing::warn!(%err, "appendBuffer failed; dropping fragment");
			}
		}
		Ok(())
	}

	/// The sink's currently buffered ranges, in seconds.
	pub fn buffered(&self) -> Vec<(f64, f64)> {
		self.sink.buffered()
	}

	fn trim(&mut self) {
		let until = self.sink.current_time() - self.trim_retention.as_secs_f64();
		if until > 0.0 {
			if let Err(err) = self.sink.trim(until) {
				tracing::warn!(%err, "trim failed");
			}
		}
	}

	fn skip_forward_if_behind(&mut self, paused: bool) {
		if paused {
			return;
		}
		let Some(&(_, end)) = self.sink.buffered().last() else {
			return;
		};
		let behind = end - self.sink.current_time();
		if behind > self.target_latency.as_secs_f64() + 0.1 {
			self.sink.seek(end - self.target_latency.as_secs_f64());
		}
	}

	/// Run the muxer's event loop: drains queued fragments as they arrive, trims and
	/// checks the live edge on their own intervals, and propagates pause/play changes.
	///
	/// Returns once `fragments` closes.
	pub async fn run(mut self, mut fragments: mpsc::Receiver<Bytes>, mut paused: watch::Receiver<bool>) -> Result<(), Error> {
		let mut trim_timer = tokio::time::interval(TRIM_INTERVAL);
		let mut skip_timer = tokio::time::interval(SKIP_CHECK_INTERVAL);

		if let Err(err) = self.sink.set_paused(*paused.borrow()) {
			tracing::warn!(%err, "failed to apply initial paused state");
		}

		loop {
			tokio::select! {
				biased;
				Some(fragment) = fragments.recv() => {
					self.enqueue_fragment(fragment);
					self.drain_one().await?;
				}
				_ = paused.changed() => {
					if let Err(err) = self.sink.set_paused(*paused.borrow()) {
						tracing::warn!(%err, "play() failed, staying paused");
					}
				}
				_ = trim_timer.tick() => self.trim(),
				_ = skip_timer.tick() => self.skip_forward_if_behind(*paused.borrow()),
				else => return Ok(()),
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::{Arc, Mutex};

	#[derive(Default)]
	struct FakeSinkState {
		init: Option<Bytes>,
		fragments: Vec<Bytes>,
		paused: bool,
		current_time: f64,
		buffered: Vec<(f64, f64)>,
		trims: Vec<f64>,
	}

	#[derive(Clone, Default)]
	struct FakeSink(Arc<Mutex<FakeSinkState>>);

	impl MediaSink for FakeSink {
		fn add_source_buffer(&mut self, _mime_codec: &str) -> Result<(), Error> {
			Ok(())
		}

		async fn append_init(&mut self, data: Bytes) -> Result<(), Error> {
			self.0.lock().unwrap().init = Some(data);
			Ok(())
		}

		async fn append_fragment(&mut self, data: Bytes) -> Result<(), Error> {
			self.0.lock().unwrap().fragments.push(data);
			Ok(())
		}

		fn trim(&mut self, until: f64) -> Result<(), Error> {
			self.0.lock().unwrap().trims.push(until);
			Ok(())
		}

		fn buffered(&self) -> Vec<(f64, f64)> {
			self.0.lock().unwrap().buffered.clone()
		}

		fn current_time(&self) -> f64 {
			self.0.lock().unwrap().current_time
		}

		fn seek(&mut self, to: f64) {
			self.0.lock().unwrap().current_time = to;
		}

		fn set_paused(&mut self, paused: bool) -> Result<(), Error> {
			self.0.lock().unwrap().paused = paused;
			Ok(())
		}
	}

	#[tokio::test]
	async fn test_append_init_and_fragment() {
		let sink = FakeSink::default();
		let mut muxer = Muxer::new(sink.clone(), "video/mp4", Duration::from_millis(100)).unwrap();
		muxer.append_init(Bytes::from_static(b"init")).await.unwrap();
		muxer.enqueue_fragment(Bytes::from_static(b"frag"));
		muxer.drain_one().await.unwrap();

		let state = sink.0.lock().unwrap();
		assert_eq!(state.init, Some(Bytes::from_static(b"init")));
		assert_eq!(state.fragments, vec![Bytes::from_static(b"frag")]);
	}

	#[tokio::test]
	async fn test_queue_drops_oldest_when_full() {
		let sink = FakeSink::default();
		let mut muxer = Muxer::new(sink.clone(), "video/mp4", Duration::from_millis(100)).unwrap();
		for i in 0..(APPEND_QUEUE_CAP + 3) {
			muxer.enqueue_fragment(Bytes::from(i.to_string()));
		}
		assert_eq!(muxer.queue.len(), APPEND_QUEUE_CAP);
		assert_eq!(muxer.queue.front().unwrap(), &Bytes::from(3.to_string()));
	}

	#[test]
	fn test_skip_forward_when_behind_live_edge() {
		let sink = FakeSink::default();
		sink.0.lock().unwrap().buffered = vec![(0.0, 10.0)];
		sink.0.lock().unwrap().current_time = 0.0;
		let mut muxer = Muxer::new(sink.clone(), "video/mp4", Duration::from_millis(500)).unwrap();
		muxer.skip_forward_if_behind(false);
		assert_eq!(sink.0.lock().unwrap().current_time, 9.5);
	}

	#[test]
	fn test_no_skip_while_paused() {
		let sink = FakeSink::default();
		sink.0.lock().unwrap().buffered = vec![(0.0, 10.0)];
		let mut muxer = Muxer::new(sink.clone(), "video/mp4", Duration::from_millis(500)).unwrap();
		muxer.skip_forward_if_behind(true);
		assert_eq!(sink.0.lock().unwrap().current_time, 0.0);
	}
}
