use std::sync::Arc;

use tokio::sync::watch;

/// A type-erased handle to an established session, returned once [crate::Client::connect]
/// or [crate::Server::accept] finish the handshake and version negotiation.
///
/// The actual publish/subscribe work happens in a background task spawned during
/// the handshake; this handle lets the caller close the underlying transport and,
/// via [Session::closed], observe when that background task has exited.
#[derive(Clone)]
pub struct Session {
	inner: Arc<dyn ErasedSession>,
	closed: watch::Receiver<bool>,
}

trait ErasedSession: Send + Sync {
	fn close(&self, code: u32, reason: &str);
}

struct Inner<S>(S);

impl<S: web_transport_trait::Session> ErasedSession for Inner<S> {
	fn close(&self, code: u32, reason: &str) {
		self.0.close(code, reason);
	}
}

impl Session {
	pub(crate) fn new<S: web_transport_trait::Session>(session: S, closed: watch::Receiver<bool>) -> Self {
		Self {
			inner: Arc::new(Inner(session)),
			closed,
		}
	}

	/// Close the underlying transport with an application error code.
	pub fn close(&self, code: u32, reason: &str) {
		self.inner.close(code, reason);
	}

	/// Resolves once the session's background publish/subscribe task has exited,
	/// i.e. the session has ended for any reason: clean shutdown, a protocol error,
	/// or the transport itself failing.
	pub async fn closed(&self) {
		let mut closed = self.closed.clone();
		if *closed.borrow() {
			return;
		}
		let _ = closed.changed().await;
	}
}
