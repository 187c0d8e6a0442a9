//! Instant-payment sessions: the state machine, the per-session poller, and
//! per-order session ownership.

pub mod manager;
pub mod poller;
pub mod session;

pub use manager::SessionManager;
pub use poller::{PollerConfig, SessionPoller};
pub use session::{InstantPaymentSession, SessionRecord, SessionStatus};
