//! Reorders out-of-order groups from a [TrackConsumer] into an in-order frame stream,
//! dropping groups that fall too far behind the live edge.
//!
//! Groups of a track arrive on independent unidirectional streams and may complete out
//! of order. Each admitted group gets its own background task pulling frames off the
//! wire ("filler"), so a slow group doesn't stall a faster one; [Jitter::decode] drains
//! the oldest non-skipped group in frame order.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use moq_lite::{GroupConsumer, Time, TrackConsumer};
use tokio::sync::Notify;

use crate::{container::Container, Error};

struct GroupBuffer {
	frames: VecDeque<Container>,
	latest_ts: Time,
	closed: bool,
}

struct Shared {
	groups: Mutex<BTreeMap<u64, GroupBuffer>>,
	notify: Notify,
}

pub struct Jitter {
	track: TrackConsumer,
	target_latency: Time,
	shared: Arc<Shared>,
	active: Option<u64>,
}

impl Jitter {
	pub fn new(track: TrackConsumer, target_latency: Time) -> Self {
		Self {
			track,
			target_latency,
			shared: Arc::new(Shared {
				groups: Mutex::new(BTreeMap::new()),
				notify: Notify::new(),
			}),
			active: None,
		}
	}

	/// Update the live target latency. The buffer observes the change on its next
	/// frame; shrinking it may trigger a skip, growing it only grows tolerance.
	pub fn set_target_latency(&mut self, target_latency: Time) {
		self.target_latency = target_latency;
		self.shared.notify.notify_waiters();
	}

	/// Admit a newly-arrived group, spawning its filler task.
	///
	/// A group whose sequence is older than the current active sequence is dropped
	/// without being observable through [Self::decode].
	fn admit(&mut self, group: GroupConsumer) {
		let sequence = group.info().sequence;
		if let Some(active) = self.active {
			if sequence < active {
				return;
			}
		}

		self.shared.groups.lock().unwrap().entry(sequence).or_insert_with(|| GroupBuffer {
			frames: VecDeque::new(),
			latest_ts: Time::ZERO,
			closed: false,
		});

		if self.active.is_none() {
			self.active = Some(sequence);
		}

		let shared = self.shared.clone();
		web_async::spawn(async move {
			let mut group = group;
			loop {
				let frame = match Container::decode(&mut group).await {
					Ok(Some(frame)) => frame,
					Ok(None) | Err(_) => break,
				};

				let mut groups = shared.groups.lock().unwrap();
				match groups.get_mut(&sequence) {
					Some(buf) => {
						buf.latest_ts = buf.latest_ts.max(frame.timestamp);
						buf.frames.push_back(frame);
					}
					// Evicted by latency enforcement while we were decoding.
					None => break,
				}
				drop(groups);
				shared.notify.notify_waiters();
			}

			if let Some(buf) = shared.groups.lock().unwrap().get_mut(&sequence) {
				buf.closed = true;
			}
			shared.notify.notify_waiters();
		});
	}

	/// Drop the oldest buffered group(s) whose oldest unconsumed frame is further than
	/// `target_latency` behind the newest frame observed across all buffered groups.
	fn enforce_latency(&mut self) {
		loop {
			let mut groups = self.shared.groups.lock().unwrap();
			if groups.len() < 2 {
				return;
			}

			let newest = groups.values().map(|g| g.latest_ts).max().unwrap_or(Time::ZERO);
			let (&oldest_seq, oldest) = groups.iter().next().expect("checked len >= 2 above");
			let oldest_unconsumed = oldest.frames.front().map(|f| f.timestamp).unwrap_or(oldest.latest_ts);

			if newest.checked_sub(oldest_unconsumed).unwrap_or(Time::ZERO) <= self.target_latency {
				return;
			}

			tracing::warn!(sequence = oldest_seq, "dropping group for exceeding target latency");
			groups.remove(&oldest_seq);

			if self.active == Some(oldest_seq) {
				self.active = groups.keys().next().copied();
			}
		}
	}

	/// Return the next frame in order from the active group, skipping groups that
	/// exceed the latency budget along the way.
	///
	/// Returns `None` once the underlying track closes and every buffered group has
	/// drained.
	pub async fn decode(&mut self) -> Result<Option<Container>, Error> {
		loop {
			self.enforce_latency();

			if let Some(active) = self.active {
				let next = self.shared.groups.lock().unwrap().get_mut(&active).and_then(|g| g.frames.pop_front());
				if let Some(frame) = next {
					return Ok(Some(frame));
				}

				let closed = self
					.shared
					.groups
					.lock()
					.unwrap()
					.get(&active)
					.map(|g| g.closed)
					.unwrap_or(true);

				if closed {
					self.shared.groups.lock().unwrap().remove(&active);
					self.active = self.shared.groups.lock().unwrap().keys().next().copied();
					if self.active.is_some() {
						continue;
					}
				}
			}

			tokio::select! {
				biased;
				group = self.track.next_group() => {
					match group? {
						Some(group) => {
							self.admit(group);
							continue;
						}
						None => return Ok(None),
					}
				}
				_ = self.shared.notify.notified() => continue,
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use moq_lite::Track;

	#[tokio::test]
	async fn test_in_order_delivery() {
		let mut track = Track::from("video").produce().producer;

		for seq in 0..3u64 {
			let mut group = track.create_group(seq).unwrap();
			let container = Container {
				timestamp: Time::from_millis_unchecked(seq * 10),
				payload: bytes::Bytes::from(format!("frame-{seq}")),
			};
			container.encode(&mut group).unwrap();
			group.close().unwrap();
		}

		let mut jitter = Jitter::new(track.consume(), Time::from_millis_unchecked(100));
		for seq in 0..3u64 {
			let frame = jitter.decode().await.unwrap().unwrap();
			assert_eq!(frame.timestamp, Time::from_millis_unchecked(seq * 10));
		}
	}
}
