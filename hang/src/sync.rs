//! Converts a stream-local timestamp into a wall-clock "present at" time.
//!
//! The first frame ever observed anchors the timeline; `target_latency` is then a
//! uniform presentation offset added on top of the earliest observed arrival. A later
//! frame that arrives *earlier* relative to its own timestamp re-anchors the reference
//! so playback catches up, rather than perpetually trailing a single unlucky frame.

use std::sync::Mutex;

use moq_lite::Time;
use tokio::sync::Notify;

struct State {
	/// The smallest observed `(wall_now - frame_timestamp)` across all streams so far.
	reference: Option<Time>,
	target_latency: Time,
}

/// Shared scheduling state for one connection; cloned handles observe the same reference.
pub struct Sync {
	state: Mutex<State>,
	notify: Notify,
}

impl Sync {
	pub fn new(target_latency: Time) -> Self {
		Self {
			state: Mutex::new(State {
				reference: None,
				target_latency,
			}),
			notify: Notify::new(),
		}
	}

	/// Update the live target latency. Lowering it may cause subsequent `wait` calls to
	/// return sooner (and the jitter buffer above to skip groups); raising it only grows
	/// tolerance.
	pub fn set_target_latency(&self, target_latency: Time) {
		self.state.lock().unwrap().target_latency = target_latency;
		self.notify.notify_waiters();
	}

	/// Record that a frame with this timestamp was just received, updating the
	/// reference if this is the earliest-relative-arrival frame seen so far.
	pub fn received(&self, ts: Time) {
		let now = Time::now();
		let arrival = now.checked_sub(ts).unwrap_or(Time::ZERO);

		let mut state = self.state.lock().unwrap();
		let update = match state.reference {
			None => true,
			Some(reference) => arrival < reference,
		};
		if update {
			state.reference = Some(arrival);
			drop(state);
			self.notify.notify_waiters();
		}
	}

	/// Sleep until `ts` is due to be presented, or until cancelled.
	///
	/// Returns `false` if cancelled before the wait completed.
	pub async fn wait(&self, ts: Time, cancel: &Notify) -> bool {
		loop {
			let sleep = {
				let state = self.state.lock().unwrap();
				let Some(reference) = state.reference else {
					// No reference yet; this frame defines it.
					drop(state);
					self.received(ts);
					return true;
				};

				let now = Time::now();
				let arrival = now.checked_sub(ts).unwrap_or(Time::ZERO);
				let due = reference + state.target_latency;

				if arrival >= due {
					return true;
				}
				due.checked_sub(arrival).unwrap_or(Time::ZERO)
			};

			tokio::select! {
				biased;
				_ = cancel.notified() => return false,
				_ = self.notify.notified() => {}
				_ = tokio::time::sleep(sleep.into()) => return true,
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_first_frame_returns_immediately() {
		let sync = Sync::new(Time::from_millis_unchecked(100));
		let cancel = Notify::new();
		assert!(sync.wait(Time::ZERO, &cancel).await);
	}

	#[tokio::test]
	async fn test_cancel() {
		let sync = Sync::new(Time::from_secs_unchecked(3600));
		sync.received(Time::ZERO);

		let cancel = Notify::new();
		let fut = sync.wait(Time::from_secs_unchecked(1), &cancel);
		cancel.notify_one();
		assert!(!fut.await);
	}
}
