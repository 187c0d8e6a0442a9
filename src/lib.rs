//! Payment processing orchestration core for the chempay back office.
//!
//! The interesting parts of an otherwise CRUD-heavy system live here:
//! gateway configuration with a single-active-gateway invariant, checkout
//! dispatch to redirect / manual-transfer / instant-payment flows, the
//! instant-payment session state machine with its countdown and status
//! poller, and receipt intake for manual reconciliation.

pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateways;
pub mod logging;
pub mod middleware;
pub mod providers;
pub mod receipts;
pub mod sessions;

pub use config::Settings;
pub use dispatch::{DispatchRequest, DispatchResult, PaymentDispatcher, PaymentMethod};
pub use error::AppError;
pub use gateways::{GatewayConfig, GatewayKind, GatewayRepository, GatewaySettings, InMemoryGatewayStore};
pub use receipts::{FilesystemReceiptStorage, ReceiptIntake};
pub use sessions::{InstantPaymentSession, PollerConfig, SessionManager, SessionPoller, SessionStatus};
