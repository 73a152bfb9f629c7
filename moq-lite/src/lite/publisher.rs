use std::sync::Arc;

use futures::{stream::FuturesUnordered, FutureExt, StreamExt};

use crate::{
	coding::{Stream, Writer},
	lite::{self, Version},
	model::GroupConsumer,
	AsPath, BroadcastConsumer, Delivery, Error, OriginConsumer, OriginProducer, Time, Track,
};

pub(crate) struct Publisher<S: web_transport_trait::Session> {
	session: S,
	origin: OriginConsumer,
	version: Version,
}

impl<S: web_transport_trait::Session> Publisher<S> {
	pub fn new(session: S, origin: Option<OriginConsumer>, version: Version) -> Self {
		// Default to a dummy origin that is immediately closed.
		let origin = origin.unwrap_or_else(|| OriginProducer::new().consume());
		Self { session, origin, version }
	}

	pub async fn run(mut self) -> Result<(), Error> {
		loop {
			let mut stream = Stream::accept(&self.session, self.version).await?;

			// To avoid cloning the origin, we process each control stream in received order.
			// This adds some head-of-line blocking but it delays an expensive clone.
			let kind = stream.reader.decode().await?;

			if let Err(err) = match kind {
				lite::ControlType::Announce => self.recv_announce(stream).await,
				lite::ControlType::Subscribe => self.recv_subscribe(stream).await,
			} {
				tracing::warn!(%err, "control stream error");
			}
		}
	}

	pub async fn recv_announce(&mut self, mut stream: Stream<S, Version>) -> Result<(), Error> {
		let interest = stream.reader.decode::<lite::AnnouncePlease>().await?;
		let prefix = interest.prefix;

		tracing::trace!(root = %self.origin.absolute(&prefix), "announcing start");

		let mut origin = self
			.origin
			.consume_only(&[prefix.as_path()])
			.ok_or(Error::Unauthorized)?;

		web_async::spawn(async move {
			if let Err(err) = Self::run_announce(&mut stream, &mut origin, prefix.clone()).await {
				match &err {
					Error::Cancel | Error::Transport(_) => {
						tracing::debug!(prefix = %origin.absolute(&prefix), "announcing cancelled");
					}
					err => {
						tracing::warn!(%err, prefix = %origin.absolute(&prefix), "announcing error");
					}
				}

				stream.writer.abort(&err);
			} else {
				tracing::trace!(prefix = %origin.absolute(&prefix), "announcing complete");
			}
		});

		Ok(())
	}

	async fn run_announce(
		stream: &mut Stream<S, Version>,
		origin: &mut OriginConsumer,
		prefix: crate::Path<'static>,
	) -> Result<(), Error> {
		let mut init = Vec::new();

		// Send ANNOUNCE_INIT as the first message with all currently active paths.
		while let Some((path, active)) = origin.try_announced() {
			let suffix = path.strip_prefix(&prefix).expect("origin returned invalid path");

			if active.is_some() {
				tracing::debug!(broadcast = %origin.absolute(&path), "announce");
				init.push(suffix.to_string());
			} else {
				tracing::debug!(broadcast = %origin.absolute(&path), "unannounce");
				init.retain(|s| s != suffix.as_str());
			}
		}

		let announce_init = lite::AnnounceInit { suffixes: init };
		stream.writer.encode(&announce_init).await?;

		loop {
			tokio::select! {
				biased;
				res = stream.reader.closed() => return res,
				announced = origin.announced() => {
					match announced {
						Some((path, active)) => {
							let suffix = path.strip_prefix(&prefix).expect("origin returned invalid path").to_string();

							if active.is_some() {
								tracing::debug!(broadcast = %origin.absolute(&path), "announce");
								stream.writer.encode(&lite::Announce::Active { suffix }).await?;
							} else {
								tracing::debug!(broadcast = %origin.absolute(&path), "unannounce");
								stream.writer.encode(&lite::Announce::Ended { suffix }).await?;
							}
						},
						None => {
							stream.writer.finish()?;
							return stream.writer.closed().await;
						}
					}
				}
			}
		}
	}

	pub async fn recv_subscribe(&mut self, mut stream: Stream<S, Version>) -> Result<(), Error> {
		let subscribe = stream.reader.decode::<lite::Subscribe>().await?;

		let id = subscribe.id;
		let track = subscribe.track.clone();
		let absolute = self.origin.absolute(&subscribe.broadcast);

		let broadcast = self.origin.consume_broadcast(&subscribe.broadcast);
		let version = self.version;

		let session = self.session.clone();
		web_async::spawn(async move {
			if let Err(err) = Self::run_subscribe(session, &mut stream, &subscribe, broadcast, version).await {
				match &err {
					Error::Cancel | Error::Transport(_) => {
						tracing::info!(%id, broadcast = %absolute, %track, "subscribe cancelled")
					}
					err => {
						tracing::warn!(%id, broadcast = %absolute, %track, %err, "subscribe error")
					}
				}
				stream.writer.abort(&err);
			} else {
				tracing::info!(%id, broadcast = %absolute, %track, "subscribe complete")
			}
		});

		Ok(())
	}

	async fn run_subscribe(
		session: S,
		stream: &mut Stream<S, Version>,
		subscribe: &lite::Subscribe,
		broadcast: Option<BroadcastConsumer>,
		version: Version,
	) -> Result<(), Error> {
		let track = Track::new(subscribe.track.clone());

		let delivery = Delivery {
			priority: subscribe.priority,
			max_latency: subscribe.max_latency,
			ordered: subscribe.ordered,
		};

		tracing::info!(id = %subscribe.id, broadcast = %subscribe.broadcast, track = %track.name, ?delivery, "subscribe started");

		let mut track = broadcast.ok_or(Error::NotFound)?.subscribe_track(track, delivery)?;
		let current = track.delivery().current();

		let info = lite::SubscribeOk {
			priority: current.priority,
			max_latency: current.max_latency,
			ordered: current.ordered,
		};

		tracing::trace!(subscribe = %subscribe.id, broadcast = %subscribe.broadcast, track = %track.name, ?current, "subscribe ok");
		stream.writer.encode(&info).await?;

		let mut delivery = track.delivery();

		// All of the groups we're currently serving.
		let mut tasks = FuturesUnordered::new();

		loop {
			let group = tokio::select! {
				group = track.next_group() => match group? {
					Some(group) => group,
					None => break,
				},
				update = stream.reader.decode_maybe::<lite::SubscribeUpdate>() => {
					let Some(update) = update? else { break };

					let delivery = Delivery {
						priority: update.priority,
						max_latency: update.max_latency,
						ordered: update.ordered,
					};

					tracing::info!(subscribe = %subscribe.id, broadcast = %subscribe.broadcast, track = %track.name, ?delivery, "subscribe update");
					track.subscriber().update(delivery);

					continue;
				},
				Some(current) = delivery.changed() => {
					let info = lite::SubscribeOk {
						priority: current.priority,
						max_latency: current.max_latency,
						ordered: current.ordered,
					};

					tracing::info!(subscribe = %subscribe.id, broadcast = %subscribe.broadcast, track = %track.name, ?current, "subscribe ok");
					stream.writer.encode(&info).await?;

					continue;
				},
				// This is a hack to avoid waking up the select! loop each time a group completes.
				true = async {
					while tasks.next().await.is_some() {}
					false
				} => unreachable!("never match"),
				else => break,
			};

			tracing::debug!(subscribe = %subscribe.id, broadcast = %subscribe.broadcast, track = %track.name, group = %group.sequence, "serving group");

			let msg = lite::Group {
				subscribe: subscribe.id,
				sequence: group.sequence,
			};

			let priority = track.subscriber().current().priority;

			tasks.push(Self::serve_group(session.clone(), msg, priority, group, version).map(|_| ()));
		}

		stream.writer.finish()?;
		stream.writer.closed().await?;

		Ok(())
	}

	/// Stream out one group's frames on a new unidirectional stream.
	///
	/// The stream priority is fixed at open time from the track's current
	/// delivery priority; subsequent `SubscribeUpdate`s only affect groups
	/// opened afterwards, not this one.
	async fn serve_group(
		session: S,
		msg: lite::Group,
		priority: u8,
		mut group: GroupConsumer,
		version: Version,
	) -> Result<(), Error> {
		let stream = session.open_uni().await.map_err(|err| Error::Transport(Arc::new(err)))?;

		let mut stream = Writer::new(stream, version);
		stream.set_priority(priority);
		stream.encode(&lite::DataType::Group).await?;
		stream.encode(&msg).await?;

		// The maximum instant of the frames in the group, used for delta encoding.
		let mut instant_max = Time::ZERO;

		loop {
			let frame = tokio::select! {
				_ = stream.closed() => return Err(Error::Cancel),
				frame = group.next_frame() => frame,
			};

			let mut frame = match frame? {
				Some(frame) => frame,
				None => break,
			};

			let delta = match frame.instant.checked_sub(instant_max) {
				Ok(delta) => {
					instant_max = frame.instant;
					delta
				}
				Err(_) => {
					tracing::warn!("frame instant went backwards");
					Default::default()
				}
			};

			stream
				.encode(&lite::FrameHeader {
					delta,
					size: frame.size,
				})
				.await?;

			loop {
				let chunk = tokio::select! {
					_ = stream.closed() => return Err(Error::Cancel),
					chunk = frame.read_chunk() => chunk,
				};

				let Some(mut chunk) = chunk? else { break };
				stream.write_all(&mut chunk).await?;
			}
		}

		stream.finish()?;
		stream.closed().await?;

		Ok(())
	}
}
