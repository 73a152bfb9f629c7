use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use crate::{
	coding::{Reader, Stream},
	lite::{self, Version},
	BroadcastProducer, Delivery, Error, Frame, OriginProducer, Path, Time, Track, TrackProducer,
};

/// Tracks awaiting incoming group data, keyed by the subscribe id we assigned.
type Tracks = Arc<Mutex<HashMap<u64, TrackProducer>>>;

pub(crate) struct Subscriber<S: web_transport_trait::Session> {
	session: S,
	// Remote broadcasts discovered over the network are inserted here.
	origin: Option<OriginProducer>,
	version: Version,
	tracks: Tracks,
	next_id: Arc<AtomicU64>,
	// Keeps each remote broadcast's producer half alive until the peer unannounces it.
	remote: Arc<Mutex<HashMap<Path<'static>, BroadcastProducer>>>,
}

impl<S: web_transport_trait::Session> Subscriber<S> {
	pub fn new(session: S, origin: Option<OriginProducer>, version: Version) -> Self {
		Self {
			session,
			origin,
			version,
			tracks: Default::default(),
			next_id: Default::default(),
			remote: Default::default(),
		}
	}

	pub async fn run(self, init: oneshot::Sender<()>) -> Result<(), Error> {
		tokio::select! {
			res = self.run_announce(init) => res,
			res = self.run_groups() => res,
		}
	}

	/// Request announcements for every broadcast the peer is willing to show us,
	/// populating `self.origin` as broadcasts come and go.
	async fn run_announce(&self, init: oneshot::Sender<()>) -> Result<(), Error> {
		let Some(origin) = &self.origin else {
			// Nothing to subscribe to; signal readiness immediately and idle.
			let _ = init.send(());
			return std::future::pending().await;
		};

		let prefix = Path::new("");
		let mut stream = Stream::open(&self.session, self.version).await?;
		stream
			.writer
			.encode(&lite::AnnouncePlease {
				prefix: prefix.clone(),
			})
			.await?;

		let announce_init = stream.reader.decode::<lite::AnnounceInit>().await?;
		for suffix in announce_init.suffixes {
			self.announce(origin, suffix, true);
		}

		// We've processed the initial snapshot; the caller can safely `consume()` now.
		let _ = init.send(());

		loop {
			let msg = stream.reader.decode::<lite::Announce>().await?;
			match msg {
				lite::Announce::Active { suffix } => self.announce(origin, suffix, true),
				lite::Announce::Ended { suffix } => self.announce(origin, suffix, false),
			}
		}
	}

	fn announce(&self, origin: &OriginProducer, suffix: String, active: bool) {
		let path = Path::new(suffix).into_owned();

		if !active {
			tracing::debug!(broadcast = %path, "remote unannounce");
			if let Some(mut producer) = self.remote.lock().unwrap().remove(&path) {
				producer.close().ok();
			}
			return;
		}

		tracing::debug!(broadcast = %path, "remote announce");

		let session = self.session.clone();
		let version = self.version;
		let tracks = self.tracks.clone();
		let next_id = self.next_id.clone();
		let broadcast_path = path.clone();

		let broadcast = crate::Broadcast::default().produce();
		let consumer = broadcast.producer.consume_with(move |track: &Track, delivery: Delivery| {
			let id = next_id.fetch_add(1, Ordering::Relaxed);
			let producer = TrackProducer::new(track.clone());

			tracks.lock().unwrap().insert(id, producer.clone());

			let session = session.clone();
			let broadcast_path = broadcast_path.clone();
			let track = track.clone();
			let tracks = tracks.clone();
			let mut producer_task = producer.clone();

			web_async::spawn(async move {
				let res = Self::run_subscribe(session, broadcast_path, id, track, delivery, version, &mut producer_task).await;
				tracks.lock().unwrap().remove(&id);

				match res {
					Ok(()) => {
						producer_task.close().ok();
					}
					Err(err) => {
						producer_task.abort(err).ok();
					}
				}
			});

			producer
		});

		origin.publish_broadcast(path.clone(), consumer);
		self.remote.lock().unwrap().insert(path, broadcast.producer);
	}

	/// Open a subscribe stream for one remote track and pump `SubscribeOk`/`SubscribeUpdate`
	/// for as long as the track producer is still in use.
	async fn run_subscribe(
		session: S,
		broadcast: Path<'static>,
		id: u64,
		track: Track,
		delivery: Delivery,
		version: Version,
		producer: &mut TrackProducer,
	) -> Result<(), Error> {
		let msg = lite::Subscribe {
			id,
			broadcast,
			track: track.name.clone(),
			priority: delivery.priority,
			max_latency: delivery.max_latency,
			ordered: delivery.ordered,
		};

		let mut stream = Stream::open(&session, version).await?;
		stream.writer.encode(&msg).await?;

		let ok = stream.reader.decode::<lite::SubscribeOk>().await?;
		tracing::trace!(subscribe = %id, track = %track.name, ?ok, "subscribe ok");

		tokio::select! {
			biased;
			_ = producer.unused() => {}
			res = stream.reader.closed() => res?,
		}

		stream.writer.finish()?;
		stream.writer.closed().await?;

		Ok(())
	}

	/// Accept incoming unidirectional group-data streams and demux them by subscribe id.
	///
	/// A group referencing a subscribe id we never assigned is a hard protocol error:
	/// the fatal path below is propagated out of this loop (and the session closes)
	/// rather than merely logged, unlike a group for an id that's simply been torn
	/// down already (a normal unsubscribe race).
	async fn run_groups(&self) -> Result<(), Error> {
		let (fatal_tx, mut fatal_rx) = tokio::sync::mpsc::unbounded_channel::<Error>();

		loop {
			tokio::select! {
				biased;
				Some(err) = fatal_rx.recv() => return Err(err),
				stream = self.session.accept_uni() => {
					let stream = stream.map_err(Error::from_transport)?;

					let tracks = self.tracks.clone();
					let next_id = self.next_id.clone();
					let version = self.version;
					let fatal_tx = fatal_tx.clone();

					web_async::spawn(async move {
						match Self::serve_group(stream, tracks, next_id, version).await {
							Ok(()) => {}
							Err(err @ Error::ProtocolViolation) => {
								let _ = fatal_tx.send(err);
							}
							Err(err) => tracing::debug!(%err, "group stream error"),
						}
					});
				}
			}
		}
	}

	async fn serve_group(stream: S::RecvStream, tracks: Tracks, next_id: Arc<AtomicU64>, version: Version) -> Result<(), Error> {
		let mut reader = Reader::new(stream, version);

		match reader.decode::<lite::DataType>().await? {
			lite::DataType::Group => {}
		}

		let msg = reader.decode::<lite::Group>().await?;

		let mut producer = match tracks.lock().unwrap().get(&msg.subscribe).cloned() {
			Some(producer) => producer,
			// Never assigned: the peer is referencing a subscribe id out of thin air.
			None if msg.subscribe >= next_id.load(Ordering::Relaxed) => return Err(Error::ProtocolViolation),
			// Assigned and since torn down (e.g. unsubscribed); not fatal.
			None => return Err(Error::NotFound),
		};

		let mut group = producer.create_group(msg.sequence)?;

		// The maximum instant seen so far in this group, used to undo delta encoding.
		let mut instant_max = Time::ZERO;

		while let Some(header) = reader.decode_maybe::<lite::FrameHeader>().await? {
			instant_max = instant_max.checked_add(header.delta).unwrap_or(instant_max);

			let mut frame = group.create_frame(Frame {
				instant: instant_max,
				size: header.size,
			})?;

			let mut remaining = header.size;
			while remaining > 0 {
				let chunk = reader.read(remaining).await?.ok_or(Error::Decode)?;
				remaining -= chunk.len();
				frame.write_chunk(chunk)?;
			}

			frame.close()?;
		}

		group.close()?;

		Ok(())
	}
}
