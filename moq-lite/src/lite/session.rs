use tokio::sync::{oneshot, watch};

use crate::{coding::Stream, Error, OriginConsumer, OriginProducer};

use super::{Publisher, Subscriber, Version};

/// Spawns the session's publisher/subscriber tasks in the background and returns a
/// watch that flips to `true` once they exit for any reason, letting [crate::Session]
/// observe when the session has ended without polling.
pub(crate) async fn start<S: web_transport_trait::Session>(
	session: S,
	// The stream used to setup the session, after exchanging setup messages.
	setup: Stream<S, Version>,
	// We will publish any local broadcasts from this origin.
	publish: Option<OriginConsumer>,
	// We will consume any remote broadcasts, inserting them into this origin.
	subscribe: Option<OriginProducer>,
	// The version of the protocol to use.
	version: Version,
) -> Result<watch::Receiver<bool>, Error> {
	// We don't use the setup stream for anything further; drop it so the peer
	// sees it cleanly finished instead of reset.
	let mut setup = setup;
	setup.writer.finish()?;
	drop(setup);

	let publisher = Publisher::new(session.clone(), publish, version);
	let subscriber = Subscriber::new(session.clone(), subscribe, version);

	let init = oneshot::channel();
	let (closed_tx, closed_rx) = watch::channel(false);

	web_async::spawn(async move {
		let res = tokio::select! {
			res = publisher.run() => res,
			res = subscriber.run(init.0) => res,
		};

		match res {
			Err(Error::Cancel) | Err(Error::Transport(_)) => {
				tracing::info!("session terminated");
				session.close(0, "");
			}
			Err(err) => {
				tracing::warn!(%err, "session error");
				session.close(err.to_code(), err.to_string().as_ref());
			}
			_ => {
				tracing::info!("session closed");
				session.close(0, "");
			}
		}

		let _ = closed_tx.send(true);
	});

	// Wait until receiving the initial announcements to prevent some race conditions.
	// Otherwise, `consume()` might return not found if we don't wait long enough, so just wait.
	// If the announce stream fails or is closed, this will return an error instead of hanging.
	init.1.await.map_err(|_| Error::Cancel)?;

	Ok(closed_rx)
}
