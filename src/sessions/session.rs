//! Instant-payment session state machine.
//!
//! One session represents one outstanding QR/code payment for an order.
//! Status lives in a `watch` channel: transitions happen inside
//! `send_if_modified`, which serializes writers and lets observers (the
//! poller, the HTTP status endpoint, tests) await changes.
//!
//! Transition table:
//!
//! ```text
//! pending  -> paid | cancelled | expired | failed
//! expired  -> paid            (remote truth outranks the local clock)
//! ```
//!
//! Everything else is a no-op: duplicate poll results and late timer fires
//! against a terminal session return `false` instead of erroring.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

use crate::providers::ProviderPaymentStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Paid,
    Cancelled,
    Expired,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
            Self::Failed => "failed",
        }
    }
}

/// Immutable facts about the payment, captured at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub payment_id: String,
    pub order_id: u64,
    pub amount: Decimal,
    pub currency: String,
    pub qr_payload: String,
    pub readable_code: String,
    pub created_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

pub struct InstantPaymentSession {
    record: SessionRecord,
    status_tx: watch::Sender<SessionStatus>,
}

impl InstantPaymentSession {
    pub fn new(record: SessionRecord) -> Self {
        let (status_tx, _) = watch::channel(SessionStatus::Pending);
        Self { record, status_tx }
    }

    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    pub fn payment_id(&self) -> &str {
        &self.record.payment_id
    }

    pub fn order_id(&self) -> u64 {
        self.record.order_id
    }

    pub fn status(&self) -> SessionStatus {
        *self.status_tx.borrow()
    }

    /// Subscribe to status changes; used by the poller to stop itself and
    /// by callers that want to await a terminal state.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    /// Core transition primitive. Returns whether the state changed.
    fn transition(&self, next: SessionStatus) -> bool {
        let mut changed = false;
        self.status_tx.send_if_modified(|current| {
            let allowed = match (*current, next) {
                (SessionStatus::Pending, n) if n.is_terminal() => true,
                // Explicit policy, not an incidental race: a remote "paid"
                // wins over a local expiry that already fired.
                (SessionStatus::Expired, SessionStatus::Paid) => true,
                _ => false,
            };
            if allowed {
                *current = next;
                changed = true;
            }
            allowed
        });
        if changed {
            info!(
                payment_id = %self.record.payment_id,
                order_id = self.record.order_id,
                status = next.as_str(),
                "payment session transitioned"
            );
        }
        changed
    }

    pub fn mark_paid(&self) -> bool {
        self.transition(SessionStatus::Paid)
    }

    /// Countdown reached zero with no terminal poll result observed.
    pub fn mark_expired(&self) -> bool {
        self.transition(SessionStatus::Expired)
    }

    /// Explicit user/administrator cancellation before expiry.
    pub fn mark_cancelled(&self) -> bool {
        self.transition(SessionStatus::Cancelled)
    }

    /// Provider reported the payment as cancelled or failed.
    pub fn mark_failed(&self) -> bool {
        self.transition(SessionStatus::Failed)
    }

    /// Feed a poll result into the state machine. Non-terminal results
    /// change nothing.
    pub fn apply_provider_status(&self, status: ProviderPaymentStatus) -> bool {
        match status {
            ProviderPaymentStatus::Pending => false,
            ProviderPaymentStatus::Paid => self.mark_paid(),
            ProviderPaymentStatus::Cancelled => self.mark_failed(),
            ProviderPaymentStatus::Expired => self.mark_expired(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> InstantPaymentSession {
        InstantPaymentSession::new(SessionRecord {
            payment_id: "pay_1".into(),
            order_id: 1,
            amount: Decimal::new(50_000, 0),
            currency: "IQD".into(),
            qr_payload: "qr".into(),
            readable_code: "AB12".into(),
            created_at: Utc::now(),
            valid_until: Utc::now() + chrono::Duration::minutes(5),
        })
    }

    #[test]
    fn pending_reaches_each_terminal_state() {
        for (apply, expected) in [
            (
                InstantPaymentSession::mark_paid as fn(&InstantPaymentSession) -> bool,
                SessionStatus::Paid,
            ),
            (InstantPaymentSession::mark_cancelled, SessionStatus::Cancelled),
            (InstantPaymentSession::mark_expired, SessionStatus::Expired),
            (InstantPaymentSession::mark_failed, SessionStatus::Failed),
        ] {
            let s = session();
            assert!(apply(&s));
            assert_eq!(s.status(), expected);
        }
    }

    #[test]
    fn terminal_states_ignore_further_transitions() {
        let s = session();
        assert!(s.mark_cancelled());
        assert!(!s.mark_paid());
        assert!(!s.mark_expired());
        assert!(!s.mark_failed());
        assert_eq!(s.status(), SessionStatus::Cancelled);
    }

    #[test]
    fn paid_wins_over_an_expiry_that_already_fired() {
        let s = session();
        assert!(s.mark_expired());
        assert!(s.mark_paid());
        assert_eq!(s.status(), SessionStatus::Paid);
    }

    #[test]
    fn paid_is_final_even_against_expiry() {
        let s = session();
        assert!(s.mark_paid());
        assert!(!s.mark_expired());
        assert_eq!(s.status(), SessionStatus::Paid);
    }

    #[test]
    fn pending_poll_results_change_nothing() {
        let s = session();
        assert!(!s.apply_provider_status(ProviderPaymentStatus::Pending));
        assert_eq!(s.status(), SessionStatus::Pending);
    }

    #[test]
    fn provider_cancellation_maps_to_failed() {
        let s = session();
        assert!(s.apply_provider_status(ProviderPaymentStatus::Cancelled));
        assert_eq!(s.status(), SessionStatus::Failed);
    }
}
