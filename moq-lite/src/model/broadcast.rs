//! A broadcast is a collection of [Track]s, split into a [BroadcastProducer] and
//! [BroadcastConsumer] handle.
use std::collections::{hash_map, HashMap};

use super::{Consumer, Producer};
use crate::{Delivery, Error, Produce, Track, TrackConsumer, TrackProducer};

/// A collection of named tracks, published together under one broadcast path.
///
/// Create via [Broadcast::produce] to obtain a [BroadcastProducer]/[BroadcastConsumer] pair.
#[derive(Clone, Default)]
pub struct Broadcast {}

impl Broadcast {
	pub fn produce(self) -> Produce<BroadcastProducer, BroadcastConsumer> {
		let producer = BroadcastProducer::new();
		let consumer = producer.consume();
		Produce { producer, consumer }
	}
}

#[derive(Default)]
struct State {
	producers: HashMap<String, TrackProducer>,
}

/// Synchronously creates (and starts fetching) a track the first time it's requested.
///
/// Used to represent a broadcast discovered over the network, where the set of
/// tracks isn't known upfront; the application learns about them by subscribing.
pub type TrackFactory = std::sync::Arc<dyn Fn(&Track, Delivery) -> TrackProducer + Send + Sync>;

/// Publish tracks under a broadcast.
#[derive(Clone)]
pub struct BroadcastProducer {
	state: Producer<State>,
}

impl Default for BroadcastProducer {
	fn default() -> Self {
		Self::new()
	}
}

impl BroadcastProducer {
	pub fn new() -> Self {
		Self {
			state: Producer::new(State::default()),
		}
	}

	/// Produce a new track and insert it into the broadcast.
	pub fn create_track<T: Into<Track>>(&mut self, track: T) -> Result<TrackProducer, Error> {
		let track = TrackProducer::new(track.into());
		self.publish_track(track.clone())?;
		Ok(track)
	}

	/// Insert an existing track into the broadcast, erroring if the name is taken.
	pub fn publish_track(&mut self, track: TrackProducer) -> Result<(), Error> {
		let name = track.info().name.clone();

		self.state.modify(move |state| match state.producers.entry(name) {
			hash_map::Entry::Vacant(entry) => {
				entry.insert(track);
				Ok(())
			}
			hash_map::Entry::Occupied(_) => Err(Error::Duplicate),
		})?
	}

	/// Remove a track from the broadcast, returning its producer.
	pub fn remove_track(&mut self, name: &str) -> Result<TrackProducer, Error> {
		self.state.modify(|state| state.producers.remove(name))?.ok_or(Error::NotFound)
	}

	pub fn consume(&self) -> BroadcastConsumer {
		BroadcastConsumer {
			state: self.state.consume(),
			factory: None,
		}
	}

	/// Like [Self::consume], but `factory` is called to create a track the first
	/// time a subscriber asks for a name that isn't already published.
	pub fn consume_with<F>(&self, factory: F) -> BroadcastConsumer
	where
		F: Fn(&Track, Delivery) -> TrackProducer + Send + Sync + 'static,
	{
		BroadcastConsumer {
			state: self.state.consume(),
			factory: Some(std::sync::Arc::new(factory)),
		}
	}

	pub fn close(&mut self) -> Result<(), Error> {
		self.state.close()
	}

	pub fn abort(&mut self, err: Error) -> Result<(), Error> {
		self.state.abort(err)
	}

	/// Block until there are no more consumers.
	pub async fn unused(&self) {
		self.state.unused().await
	}

	pub fn is_clone(&self, other: &Self) -> bool {
		self.state.is_clone(&other.state)
	}
}

/// Subscribe to tracks within a broadcast.
#[derive(Clone)]
pub struct BroadcastConsumer {
	state: Consumer<State>,
	factory: Option<TrackFactory>,
}

impl BroadcastConsumer {
	/// Subscribe to a track, erroring with [Error::NotFound] if it doesn't exist
	/// and this broadcast has no [TrackFactory] to create it on demand.
	///
	/// A factory-backed broadcast doesn't deduplicate concurrent first subscribers
	/// to the same not-yet-seen name; each independently creates its own track.
	pub fn subscribe_track(&self, track: impl Into<Track>, delivery: Delivery) -> Result<TrackConsumer, Error> {
		let track = track.into();

		let existing = self.state.borrow().producers.get(&track.name).cloned();
		if let Some(producer) = existing {
			return Ok(producer.subscribe(delivery));
		}

		let factory = self.factory.as_ref().ok_or(Error::NotFound)?;
		let producer = factory(&track, delivery);
		Ok(producer.subscribe(delivery))
	}

	pub async fn closed(&self) -> Result<(), Error> {
		self.state.closed().await
	}

	/// Check if this is the exact same instance of a broadcast.
	pub fn is_clone(&self, other: &Self) -> bool {
		self.state.is_clone(&other.state)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bytes::Bytes;
	use futures::FutureExt;

	#[tokio::test]
	async fn test_broadcast_publish_subscribe() {
		let mut producer = BroadcastProducer::new();
		let consumer = producer.consume();

		let mut track = producer.create_track("video").unwrap();
		let mut sub = consumer.subscribe_track("video", Delivery::default()).unwrap();

		let mut group = track.append_group().unwrap();
		group.write_frame(Bytes::from("a"), crate::Time::ZERO).unwrap();
		group.close().unwrap();

		let group = sub.next_group().await.unwrap().unwrap();
		assert_eq!(group.info().sequence, 0);
	}

	#[tokio::test]
	async fn test_broadcast_subscribe_missing() {
		let producer = BroadcastProducer::new();
		let consumer = producer.consume();

		assert!(matches!(
			consumer.subscribe_track("missing", Delivery::default()),
			Err(Error::NotFound)
		));
	}

	#[tokio::test]
	async fn test_broadcast_duplicate_track() {
		let mut producer = BroadcastProducer::new();
		producer.create_track("video").unwrap();
		assert!(matches!(producer.create_track("video"), Err(Error::Duplicate)));
	}

	#[tokio::test]
	async fn test_broadcast_factory() {
		let producer = BroadcastProducer::new();
		let consumer = producer.consume_with(|track, _delivery| TrackProducer::new(track.clone()));

		let mut sub = consumer.subscribe_track("video", Delivery::default()).unwrap();
		assert_eq!(sub.info().name, "video");
		assert!(sub.next_group().now_or_never().is_none());
	}

	#[tokio::test]
	async fn test_broadcast_closed_on_drop() {
		let producer = BroadcastProducer::new();
		let consumer = producer.consume();

		assert!(consumer.closed().now_or_never().is_none());
		drop(producer);
		assert!(consumer.closed().now_or_never().is_some());
	}
}
