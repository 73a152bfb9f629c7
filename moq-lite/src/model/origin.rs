use std::collections::{HashMap, VecDeque};

use crate::{AsPath, Broadcast, BroadcastConsumer, BroadcastProducer, Path};

use super::state::{Consumer, Producer};

#[derive(Default)]
struct State {
	broadcasts: HashMap<Path<'static>, BroadcastConsumer>,
	/// Append-only log of (path, active) transitions. Each [OriginConsumer] tracks its
	/// own read position so multiple consumers can replay independently.
	log: VecDeque<(Path<'static>, bool)>,
}

/// A registry of broadcasts, keyed by path, that can be announced to peers.
pub struct OriginProducer {
	state: Producer<State>,
}

impl Default for OriginProducer {
	fn default() -> Self {
		Self::new()
	}
}

impl OriginProducer {
	pub fn new() -> Self {
		Self {
			state: Producer::new(State::default()),
		}
	}

	pub fn consume(&self) -> OriginConsumer {
		OriginConsumer {
			state: self.state.consume(),
			scope: None,
			index: 0,
		}
	}

	/// Publish an existing broadcast, announcing it under `path` until it closes.
	pub fn publish_broadcast(&self, path: impl AsPath, broadcast: BroadcastConsumer) {
		let path = path.as_path().into_owned();

		let inserted = self
			.state
			.modify(|state| {
				state.broadcasts.insert(path.clone(), broadcast.clone());
				state.log.push_back((path.clone(), true));
			})
			.is_ok();

		if !inserted {
			return;
		}

		// Hold a clone alive only long enough to unannounce once the broadcast closes.
		let producer = self.state.clone();
		web_async::spawn(async move {
			broadcast.closed().await.ok();

			producer
				.modify(|state| {
					if state.broadcasts.remove(&path).is_some() {
						state.log.push_back((path.clone(), false));
					}
				})
				.ok();
		});
	}

	/// Create a new broadcast and immediately announce it under `path`.
	pub fn create_broadcast(&self, path: impl AsPath) -> BroadcastProducer {
		let produce = Broadcast::default().produce();
		self.publish_broadcast(path, produce.consumer);
		produce.producer
	}
}

/// A read-only view over an [OriginProducer]'s broadcasts, optionally scoped to a prefix.
#[derive(Clone)]
pub struct OriginConsumer {
	state: Consumer<State>,
	scope: Option<Path<'static>>,
	index: usize,
}

impl OriginConsumer {
	/// The fully-qualified path for `path` as seen by a relay rooted at this origin.
	///
	/// This implementation doesn't chain origins across relay hops, so this is
	/// currently the identity function; it exists for logging symmetry with the path.
	pub fn absolute(&self, path: &Path<'_>) -> Path<'static> {
		path.clone().into_owned()
	}

	/// Restrict this view to broadcasts under `prefixes`.
	///
	/// Only the first prefix is honored; this implementation doesn't need to
	/// support disjoint multi-prefix scopes.
	pub fn consume_only(&self, prefixes: &[Path<'_>]) -> Option<OriginConsumer> {
		let prefix = prefixes.first()?.clone().into_owned();
		Some(OriginConsumer {
			state: self.state.clone(),
			scope: Some(prefix),
			index: self.index,
		})
	}

	pub fn consume_broadcast(&self, path: &Path<'_>) -> Option<BroadcastConsumer> {
		self.state.borrow().broadcasts.get(path).cloned()
	}

	/// Drain any announcements already buffered, without waiting.
	pub fn try_announced(&mut self) -> Option<(Path<'static>, Option<BroadcastConsumer>)> {
		loop {
			let entry = {
				let r = self.state.borrow();
				r.log.get(self.index).cloned()
			};

			let (path, active) = entry?;
			self.index += 1;

			if let Some(scope) = &self.scope {
				if !path.has_prefix(scope) {
					continue;
				}
			}

			let consumer = if active {
				self.state.borrow().broadcasts.get(&path).cloned()
			} else {
				None
			};

			return Some((path, consumer));
		}
	}

	/// Wait for the next announcement, returning `None` once the origin closes.
	pub async fn announced(&mut self) -> Option<(Path<'static>, Option<BroadcastConsumer>)> {
		loop {
			let idx = self.index;
			let r = self.state.wait_for(|state| state.log.len() > idx).await.ok()?;
			let (path, active) = r.log[idx].clone();
			drop(r);
			self.index += 1;

			if let Some(scope) = &self.scope {
				if !path.has_prefix(scope) {
					continue;
				}
			}

			let consumer = if active {
				self.state.borrow().broadcasts.get(&path).cloned()
			} else {
				None
			};

			return Some((path, consumer));
		}
	}
}
