//! Connection supervisor: owns the WebTransport/QUIC session lifecycle for a single
//! relay connection, reconnecting with exponential backoff on failure.
//!
//! Version negotiation happens inside [moq_lite::Client::connect]; the supervisor's job
//! stops at handing it an established transport session and watching for it to die.

use std::sync::Arc;

use tokio::sync::watch;
use url::Url;

use crate::{Backoff, Error};

/// Connection lifecycle, matching `connecting -> connected -> (disconnected | error)`.
#[derive(Clone, Debug)]
pub enum State {
	Connecting,
	Connected(moq_lite::Session),
	Disconnected,
	Error(Arc<Error>),
}

impl State {
	pub fn session(&self) -> Option<&moq_lite::Session> {
		match self {
			Self::Connected(session) => Some(session),
			_ => None,
		}
	}
}

/// Supervises a single relay connection, publishing [State] transitions to any watchers.
///
/// All active Tracks belonging to a dropped session are closed by the transport itself
/// (a `Session` drop tears down its streams); re-subscribing on the new connection is
/// left to the surrounding `Broadcast`, not to the supervisor.
pub struct Supervisor {
	state: watch::Sender<State>,
}

impl Supervisor {
	/// Start supervising `relay_url`, spawning the reconnect loop in the background.
	///
	/// `reconnect` mirrors [crate::Config::reconnect]: when false, a single connection
	/// attempt is made and the loop exits (settling in `Disconnected` or `Error`) instead
	/// of retrying forever.
	pub fn spawn(relay_url: Url, moq: moq_lite::Client, reconnect: bool) -> (Self, watch::Receiver<State>) {
		let (tx, rx) = watch::channel(State::Connecting);
		let sender = tx.clone();

		tokio::spawn(async move {
			run(relay_url, moq, reconnect, tx).await;
		});

		(Self { state: sender }, rx)
	}

	pub fn state(&self) -> State {
		self.state.borrow().clone()
	}
}

async fn run(relay_url: Url, moq: moq_lite::Client, reconnect: bool, state: watch::Sender<State>) {
	let backoff = Backoff::default();
	let endpoint = match client_endpoint() {
		Ok(endpoint) => endpoint,
		Err(err) => {
			tracing::error!(%err, "failed to build QUIC endpoint");
			state.send_replace(State::Error(Arc::new(err)));
			return;
		}
	};

	let mut attempt = 0u32;

	loop {
		state.send_replace(State::Connecting);

		match connect_once(&endpoint, &relay_url, &moq).await {
			Ok(session) => {
				tracing::info!(url = %relay_url, "connected");
				attempt = 0;
				state.send_replace(State::Connected(session.clone()));

				if state.receiver_count() == 0 {
					return;
				}

				// Hold here until either the session dies (reconnect below) or every
				// watcher loses interest (nothing left to supervise).
				tokio::select! {
					_ = session.closed() => {
						tracing::warn!(url = %relay_url, "session closed");
					}
					_ = state.closed() => return,
				}

				state.send_replace(State::Disconnected);

				if !reconnect {
					return;
				}

				tokio::time::sleep(backoff.delay(attempt)).await;
				attempt += 1;
			}
			Err(err) => {
				tracing::warn!(%err, attempt, "connection failed");
				state.send_replace(State::Disconnected);

				if !reconnect {
					state.send_replace(State::Error(Arc::new(err)));
					return;
				}

				tokio::time::sleep(backoff.delay(attempt)).await;
				attempt += 1;
			}
		}
	}
}

async fn connect_once(endpoint: &quinn::Endpoint, url: &Url, moq: &moq_lite::Client) -> Result<moq_lite::Session, Error> {
	let session = web_transport_quinn::connect(endpoint, url).await?;
	let session = moq.connect(session).await?;
	Ok(session)
}

fn client_endpoint() -> Result<quinn::Endpoint, Error> {
	let mut roots = rustls::RootCertStore::empty();
	let native = rustls_native_certs::load_native_certs();
	for err in native.errors {
		tracing::warn!(%err, "failed to load a root cert");
	}
	for cert in native.certs {
		roots.add(cert).map_err(|_| Error::Roots)?;
	}

	let tls = rustls::ClientConfig::builder()
		.with_root_certificates(roots)
		.with_no_client_auth();

	let tls = quinn::crypto::rustls::QuicClientConfig::try_from(tls).map_err(|_| Error::Roots)?;
	let quic = quinn::ClientConfig::new(Arc::new(tls));

	let mut endpoint = quinn::Endpoint::client("[::]:0".parse().expect("valid bind addr"))?;
	endpoint.set_default_client_config(quic);
	Ok(endpoint)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_state_session() {
		assert!(State::Connecting.session().is_none());
		assert!(State::Disconnected.session().is_none());
	}
}
