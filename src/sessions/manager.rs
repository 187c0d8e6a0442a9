//! Per-order ownership of instant-payment sessions.
//!
//! At most one active session exists per order. Registering a new session
//! for an order supersedes the previous one: the old session is cancelled
//! (if still pending), its poller is stopped, and the provider is told to
//! cancel the old payment on a best-effort basis.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::providers::InstantPaymentProvider;
use crate::sessions::poller::SessionPoller;
use crate::sessions::session::InstantPaymentSession;

struct ActiveSession {
    session: Arc<InstantPaymentSession>,
    poller: SessionPoller,
    provider: Arc<dyn InstantPaymentProvider>,
}

#[derive(Default)]
pub struct SessionManager {
    active: Mutex<HashMap<u64, ActiveSession>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the session for its order, superseding any prior one.
    pub async fn register(
        &self,
        session: Arc<InstantPaymentSession>,
        poller: SessionPoller,
        provider: Arc<dyn InstantPaymentProvider>,
    ) {
        let order_id = session.order_id();
        let previous = {
            let mut active = self.active.lock().await;
            active.insert(
                order_id,
                ActiveSession {
                    session,
                    poller,
                    provider,
                },
            )
        };
        if let Some(previous) = previous {
            info!(order_id, payment_id = %previous.session.payment_id(), "superseding prior payment session");
            teardown(previous).await;
        }
    }

    /// Cancel the active session for an order, if any. Idempotent: a second
    /// call (or a call against an already-terminal session) is a no-op.
    pub async fn cancel(&self, order_id: u64) -> bool {
        let entry = {
            let mut active = self.active.lock().await;
            active.remove(&order_id)
        };
        match entry {
            Some(entry) => {
                teardown(entry).await;
                true
            }
            None => false,
        }
    }

    pub async fn get(&self, order_id: u64) -> Option<Arc<InstantPaymentSession>> {
        let active = self.active.lock().await;
        active.get(&order_id).map(|e| Arc::clone(&e.session))
    }

    pub async fn get_by_payment_id(&self, payment_id: &str) -> Option<Arc<InstantPaymentSession>> {
        let active = self.active.lock().await;
        active
            .values()
            .find(|e| e.session.payment_id() == payment_id)
            .map(|e| Arc::clone(&e.session))
    }

    /// Session plus the seconds left on its countdown, for status queries.
    pub async fn snapshot_by_payment_id(
        &self,
        payment_id: &str,
    ) -> Option<(Arc<InstantPaymentSession>, i64)> {
        let active = self.active.lock().await;
        active
            .values()
            .find(|e| e.session.payment_id() == payment_id)
            .map(|e| (Arc::clone(&e.session), e.poller.remaining_secs()))
    }

    /// Cancel the session for `payment_id`, returning whether one existed.
    pub async fn cancel_by_payment_id(&self, payment_id: &str) -> bool {
        let order_id = {
            let active = self.active.lock().await;
            active
                .values()
                .find(|e| e.session.payment_id() == payment_id)
                .map(|e| e.session.order_id())
        };
        match order_id {
            Some(order_id) => self.cancel(order_id).await,
            None => false,
        }
    }
}

/// Flip the session to cancelled if still pending, stop both of its timer
/// processes, and tell the provider. Remote cancellation failing only gets
/// a warning; local state is authoritative.
async fn teardown(entry: ActiveSession) {
    let was_pending = entry.session.mark_cancelled();
    entry.poller.stop();
    if was_pending {
        if let Err(e) = entry.provider.cancel_payment(entry.session.payment_id()).await {
            warn!(
                payment_id = %entry.session.payment_id(),
                error = %e,
                "provider-side cancellation failed"
            );
        }
    }
}
