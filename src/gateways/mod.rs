//! Gateway configuration: typed per-gateway settings, validation, and the
//! store that enforces the single-active-gateway invariant.

pub mod store;
pub mod types;

pub use store::{GatewayRepository, InMemoryGatewayStore};
pub use types::{
    BankTransferSettings, CardSettings, GatewayConfig, GatewayKind, GatewaySettings,
    InstantBankSettings, NewGateway, WalletSettings,
};
