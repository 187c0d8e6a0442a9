//! Per-session countdown and status polling.
//!
//! Each active session owns exactly one poller task driving two periodic
//! processes: a 1-second countdown toward `valid_until` and a fixed-cadence
//! status poll against the provider. Both run inside a single
//! `tokio::select!` loop, which gives two guarantees for free:
//!
//! - a session never has overlapping polls: the status request is awaited
//!   inline, so a slow response delays the next tick instead of stacking a
//!   second request;
//! - stopping the poller stops both processes as a unit.
//!
//! Poll failures are transient: logged and retried on the next tick, never
//! turned into a terminal session state. When the countdown reaches zero
//! the poller makes one final grace poll before expiring the session, so a
//! payment confirmed remotely at the buzzer still lands as `paid`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::providers::InstantPaymentProvider;
use crate::sessions::session::InstantPaymentSession;

#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Cadence of remote status polls.
    pub poll_interval: Duration,
    /// Countdown granularity.
    pub countdown_tick: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            countdown_tick: Duration::from_secs(1),
        }
    }
}

pub struct SessionPoller {
    shutdown_tx: watch::Sender<bool>,
    remaining_rx: watch::Receiver<i64>,
    handle: JoinHandle<()>,
}

impl SessionPoller {
    /// Start the countdown + poll loop for `session`. The deadline is fixed
    /// at spawn time from `valid_until - now`.
    pub fn spawn(
        session: Arc<InstantPaymentSession>,
        provider: Arc<dyn InstantPaymentProvider>,
        config: PollerConfig,
    ) -> Self {
        let ttl = (session.record().valid_until - chrono::Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        let deadline = Instant::now() + ttl;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (remaining_tx, remaining_rx) = watch::channel(ttl.as_secs() as i64);

        let handle = tokio::spawn(run(
            session,
            provider,
            config,
            deadline,
            remaining_tx,
            shutdown_rx,
        ));

        Self {
            shutdown_tx,
            remaining_rx,
            handle,
        }
    }

    /// Seconds left on the countdown, as last published by the task.
    pub fn remaining_secs(&self) -> i64 {
        *self.remaining_rx.borrow()
    }

    /// Stop both the countdown and the status poll. Safe to call any number
    /// of times.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for SessionPoller {
    fn drop(&mut self) {
        // A dropped handle must not leave a background task polling the
        // provider for a flow nobody is watching anymore.
        let _ = self.shutdown_tx.send(true);
    }
}

async fn run(
    session: Arc<InstantPaymentSession>,
    provider: Arc<dyn InstantPaymentProvider>,
    config: PollerConfig,
    deadline: Instant,
    remaining_tx: watch::Sender<i64>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut status_rx = session.subscribe();
    let mut countdown = interval(config.countdown_tick);
    countdown.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut poll = interval(config.poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if session.status().is_terminal() {
            break;
        }
        tokio::select! {
            _ = shutdown_rx.changed() => {
                debug!(payment_id = %session.payment_id(), "poller stopped");
                break;
            }
            changed = status_rx.changed() => {
                // Terminal transition applied elsewhere (cancellation,
                // callback); the loop condition picks it up.
                if changed.is_err() {
                    break;
                }
            }
            _ = countdown.tick() => {
                let now = Instant::now();
                let remaining = deadline.saturating_duration_since(now).as_secs() as i64;
                let _ = remaining_tx.send(remaining);
                if now >= deadline {
                    grace_poll_then_expire(&session, provider.as_ref()).await;
                    break;
                }
            }
            _ = poll.tick() => {
                match provider.get_payment_status(session.payment_id()).await {
                    Ok(status) => {
                        session.apply_provider_status(status);
                    }
                    Err(e) => {
                        warn!(
                            payment_id = %session.payment_id(),
                            error = %e,
                            "status poll failed; retrying on next tick"
                        );
                    }
                }
            }
        }
    }
}

/// The countdown hit zero. Ask the provider one last time before expiring:
/// a remote `paid` outranks the local clock.
async fn grace_poll_then_expire(
    session: &InstantPaymentSession,
    provider: &dyn InstantPaymentProvider,
) {
    match provider.get_payment_status(session.payment_id()).await {
        Ok(status) => {
            session.apply_provider_status(status);
        }
        Err(e) => {
            warn!(
                payment_id = %session.payment_id(),
                error = %e,
                "final status poll failed at expiry"
            );
        }
    }
    if !session.status().is_terminal() {
        session.mark_expired();
    }
}
