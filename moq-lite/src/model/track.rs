//! A track is a collection of [Group]s, split into a [TrackProducer] and [TrackConsumer] handle.
//!
//! Groups arrive out of order and may be dropped once they're older than the
//! track's effective `max_latency`, which is the aggregate across all current
//! subscribers (see [Subscribers]).
use std::collections::VecDeque;
use std::time::Duration;

use super::{Consumer, Producer, ProducerWeak};
use crate::{
	Delivery, DeliveryConsumer, DeliveryProducer, Error, ExpiresProducer, Group, GroupConsumer, GroupProducer, Produce,
	Subscriber, Subscribers, Time,
};

/// Keep at most this many of the most recent groups in memory per track.
///
/// Older groups are evicted (and aborted with [Error::Old]) to bound memory use
/// for tracks whose subscribers never catch up, e.g. a stalled decoder.
const MAX_GROUPS: usize = 8;

/// A named track of a broadcast, eg. `video` or `audio`.
#[derive(Clone, Debug, Default)]
pub struct Track {
	pub name: String,

	/// The default priority for this track, used until a subscriber requests otherwise.
	pub priority: u8,

	/// The default latency budget for this track.
	pub max_latency: Time,
}

// Tracks are keyed by name alone; two `Track`s with the same name but different
// default priority/latency are considered the same track for map/set purposes,
// e.g. when used as a catalog rendition key.
impl PartialEq for Track {
	fn eq(&self, other: &Self) -> bool {
		self.name == other.name
	}
}

impl Eq for Track {}

impl std::hash::Hash for Track {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.name.hash(state);
	}
}

impl Ord for Track {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		self.name.cmp(&other.name)
	}
}

impl PartialOrd for Track {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

/// Serializes/deserializes as just the track name, so a `Track` can be used directly
/// as a JSON object key (e.g. a catalog's rendition map).
#[cfg(feature = "serde")]
impl serde::Serialize for Track {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.name)
	}
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Track {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		Ok(Self::new(String::deserialize(deserializer)?))
	}
}

impl Track {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			priority: 0,
			max_latency: Time::ZERO,
		}
	}

	pub fn produce(self) -> Produce<TrackProducer, TrackConsumer> {
		let producer = TrackProducer::new(self);
		let consumer = producer.consume();
		Produce { producer, consumer }
	}
}

impl From<String> for Track {
	fn from(name: String) -> Self {
		Self::new(name)
	}
}

impl From<&str> for Track {
	fn from(name: &str) -> Self {
		Self::new(name)
	}
}

#[derive(Default)]
struct State {
	groups: VecDeque<Option<GroupProducer>>,
	/// The sequence number of `groups[0]`.
	base: u64,
	/// The highest sequence number ever created.
	max: Option<u64>,
}

impl State {
	fn slot(&mut self, sequence: u64) -> Result<usize, Error> {
		if sequence < self.base {
			return Err(Error::Old);
		}

		let idx = (sequence - self.base) as usize;
		if idx >= self.groups.len() {
			self.groups.resize_with(idx + 1, || None);
		}

		Ok(idx)
	}

	fn evict(&mut self) {
		while self.groups.len() > MAX_GROUPS {
			if let Some(Some(mut old)) = self.groups.pop_front() {
				old.abort(Error::Old).ok();
			}
			self.base += 1;
		}
	}
}

/// Create a track, group-by-group.
#[derive(Clone)]
pub struct TrackProducer {
	info: Track,
	state: Producer<State>,
	delivery: DeliveryProducer,
	subscribers: Subscribers,
	expires: ExpiresProducer,
}

impl TrackProducer {
	pub fn new<T: Into<Track>>(info: T) -> Self {
		let info = info.into();

		let delivery = DeliveryProducer::new(Delivery {
			priority: info.priority,
			max_latency: info.max_latency,
			ordered: false,
		});
		let expires = ExpiresProducer::new(delivery.consume());
		let subscribers = Subscribers::new();
		let state = Producer::new(State::default());

		let weak = state.weak();
		let task_subscribers = subscribers.clone();
		let task_delivery = delivery.clone();

		web_async::spawn(async move {
			Self::run_delivery_sync(weak, task_subscribers, task_delivery).await;
		});

		Self {
			info,
			state,
			delivery,
			subscribers,
			expires,
		}
	}

	/// Keep the track's effective delivery parameters in sync with the aggregate
	/// across all current subscribers, so a change in priority or latency takes
	/// effect for group expiry even if no new frame is written in the meantime.
	async fn run_delivery_sync(weak: ProducerWeak<State>, mut subscribers: Subscribers, delivery: DeliveryProducer) {
		loop {
			tokio::select! {
				changed = subscribers.changed() => {
					match changed {
						Some(max) => delivery.update(max),
						None => return,
					}
				},
				_ = tokio::time::sleep(Duration::from_secs(5)) => {},
			}

			// No live producer left; let this background task die with it.
			if weak.upgrade().is_err() {
				return;
			}
		}
	}

	pub fn info(&self) -> &Track {
		&self.info
	}

	/// Create a new group with an explicit sequence number.
	pub fn create_group<T: Into<Group>>(&mut self, info: T) -> Result<GroupProducer, Error> {
		let info = info.into();
		let sequence = info.sequence;

		let producer = GroupProducer::new(info, self.expires.clone());
		let stored = producer.clone();

		self.state.modify(move |state| -> Result<(), Error> {
			let idx = state.slot(sequence)?;
			if state.groups[idx].is_some() {
				return Err(Error::Duplicate);
			}

			state.groups[idx] = Some(stored);
			state.max = Some(state.max.map_or(sequence, |max| max.max(sequence)));
			state.evict();

			Ok(())
		})??;

		Ok(producer)
	}

	/// Create a new group, one more than the last one created (or 0 for the first).
	pub fn append_group(&mut self) -> Result<GroupProducer, Error> {
		let sequence = self.state.borrow().max.map_or(0, |max| max + 1);
		self.create_group(sequence)
	}

	pub fn close(&mut self) -> Result<(), Error> {
		self.state.close()
	}

	pub fn abort(&mut self, err: Error) -> Result<(), Error> {
		self.state.abort(err)
	}

	/// Subscribe with the track's own default delivery parameters.
	pub fn consume(&self) -> TrackConsumer {
		self.subscribe(Delivery {
			priority: self.info.priority,
			max_latency: self.info.max_latency,
			ordered: false,
		})
	}

	/// Subscribe with explicit delivery parameters, contributing to the track's
	/// aggregate (highest priority/latency, and-of-ordered) across all subscribers.
	pub fn subscribe(&self, delivery: Delivery) -> TrackConsumer {
		TrackConsumer {
			info: self.info.clone(),
			state: self.state.consume(),
			delivery: self.delivery.consume(),
			subscriber: self.subscribers.subscribe(delivery),
			next_sequence: 0,
		}
	}

	/// Block until there are no active consumers.
	pub async fn unused(&self) {
		self.state.unused().await
	}

	/// Return true if this is the same track.
	pub fn is_clone(&self, other: &Self) -> bool {
		self.state.is_clone(&other.state)
	}
}

impl std::ops::Deref for TrackProducer {
	type Target = Track;

	fn deref(&self) -> &Self::Target {
		&self.info
	}
}

/// Consume a track, group-by-group.
///
/// If the consumer is cloned via [TrackProducer::subscribe], each clone receives
/// a copy of all groups going forward (fanout), independently.
pub struct TrackConsumer {
	info: Track,
	state: Consumer<State>,
	delivery: DeliveryConsumer,
	subscriber: Subscriber,
	/// The next sequence number we expect to read.
	next_sequence: u64,
}

impl TrackConsumer {
	pub fn info(&self) -> &Track {
		&self.info
	}

	/// The track's effective delivery parameters, aggregated across all subscribers.
	pub fn delivery(&self) -> DeliveryConsumer {
		self.delivery.clone()
	}

	/// This subscription's own delivery request, contributing to the aggregate.
	pub fn subscriber(&mut self) -> &mut Subscriber {
		&mut self.subscriber
	}

	/// Return the next group in sequence order.
	///
	/// NOTE: This can skip sequence numbers if the reader is too slow and a group
	/// is evicted before it could be read.
	pub async fn next_group(&mut self) -> Result<Option<GroupConsumer>, Error> {
		loop {
			let target = self.next_sequence;

			let r = self
				.state
				.wait_for(move |state| {
					state.base > target
						|| (state.max.is_some_and(|max| max >= target) && (target - state.base) as usize) < state.groups.len()
				})
				.await?;

			if r.base > target {
				// We fell behind and the group was evicted; skip to the live edge.
				self.next_sequence = r.base;
				continue;
			}

			let idx = (target - r.base) as usize;
			let group = r.groups.get(idx).cloned().flatten();
			drop(r);

			self.next_sequence = target + 1;

			if let Some(group) = group {
				return Ok(Some(group.consume()));
			}
		}
	}

	/// Block until the track is closed.
	pub async fn closed(&self) -> Result<(), Error> {
		self.state.closed().await
	}

	pub fn is_clone(&self, other: &Self) -> bool {
		self.state.is_clone(&other.state)
	}
}

impl std::ops::Deref for TrackConsumer {
	type Target = Track;

	fn deref(&self) -> &Self::Target {
		&self.info
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bytes::Bytes;

	#[tokio::test]
	async fn test_track_append_group() {
		let track = Track::new("video");
		let mut producer = TrackProducer::new(track);
		let mut consumer = producer.consume();

		let mut group = producer.append_group().unwrap();
		group.write_frame(Bytes::from("a"), Time::ZERO).unwrap();
		group.close().unwrap();

		let mut group = producer.append_group().unwrap();
		assert_eq!(group.info().sequence, 1);
		group.write_frame(Bytes::from("b"), Time::ZERO).unwrap();
		group.close().unwrap();

		producer.close().unwrap();

		let g0 = consumer.next_group().await.unwrap().unwrap();
		assert_eq!(g0.info().sequence, 0);

		let g1 = consumer.next_group().await.unwrap().unwrap();
		assert_eq!(g1.info().sequence, 1);

		assert!(consumer.next_group().await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_track_duplicate_group() {
		let mut producer = TrackProducer::new(Track::new("video"));

		producer.create_group(0u64).unwrap();
		assert!(matches!(producer.create_group(0u64), Err(Error::Duplicate)));
	}

	#[tokio::test]
	async fn test_track_subscriber_aggregation() {
		let producer = TrackProducer::new(Track::new("video"));

		let low = producer.subscribe(Delivery {
			priority: 1,
			max_latency: Time::ZERO,
			ordered: true,
		});
		let high = producer.subscribe(Delivery {
			priority: 9,
			max_latency: Time::ZERO,
			ordered: true,
		});

		// Give the background sync task a chance to observe the aggregate change.
		tokio::task::yield_now().await;
		tokio::task::yield_now().await;

		assert_eq!(low.delivery().current().priority, 9);
		assert_eq!(high.delivery().current().priority, 9);
	}
}
