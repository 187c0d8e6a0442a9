//! Gateway records and per-type configuration.
//!
//! Gateway configuration is a tagged union keyed by gateway type: each
//! variant carries the fields that type understands, so validation is an
//! exhaustive match instead of a string-keyed required-field lookup. All
//! fields are optional at rest — an administrator may save a gateway in an
//! incomplete state and edit it back to valid later; completeness is
//! enforced again before dispatch.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayKind {
    BankTransferDomestic,
    BankTransferInternational,
    Card,
    Wallet,
    InstantBank,
}

impl GatewayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BankTransferDomestic => "bank_transfer_domestic",
            Self::BankTransferInternational => "bank_transfer_international",
            Self::Card => "card",
            Self::Wallet => "wallet",
            Self::InstantBank => "instant_bank",
        }
    }
}

impl std::fmt::Display for GatewayKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Manual bank-transfer destination details. Shared by the domestic and
/// international variants; international additionally requires an IBAN.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BankTransferSettings {
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub swift_code: Option<String>,
    pub account_holder: Option<String>,
    pub branch_code: Option<String>,
    pub iban: Option<String>,
    pub bank_address: Option<String>,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CardSettings {
    pub api_key: Option<String>,
    pub secret_key: Option<String>,
    pub provider: Option<String>,
    pub currency: Option<String>,
    pub api_base_url: Option<String>,
    pub merchant_id: Option<String>,
    pub terminal_id: Option<String>,
    pub processing_fee: Option<Decimal>,
    pub accepted_cards: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WalletSettings {
    pub api_key: Option<String>,
    pub secret_key: Option<String>,
    pub wallet_provider: Option<String>,
    pub api_base_url: Option<String>,
    pub merchant_id: Option<String>,
    pub wallet_account_id: Option<String>,
    pub app_id: Option<String>,
    pub transaction_fee: Option<Decimal>,
    pub callback_url: Option<String>,
    pub return_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstantBankSettings {
    pub api_key: Option<String>,
    pub secret_key: Option<String>,
    pub api_base_url: Option<String>,
    pub merchant_id: Option<String>,
    pub webhook_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub test_mode: Option<bool>,
}

/// Typed per-gateway configuration. The serde tag doubles as the gateway
/// type column, so an unknown type is unrepresentable after deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewaySettings {
    BankTransferDomestic(BankTransferSettings),
    BankTransferInternational(BankTransferSettings),
    Card(CardSettings),
    Wallet(WalletSettings),
    InstantBank(InstantBankSettings),
}

fn require(missing: &mut Vec<&'static str>, name: &'static str, value: &Option<String>) {
    if value.as_deref().map(str::trim).filter(|v| !v.is_empty()).is_none() {
        missing.push(name);
    }
}

impl GatewaySettings {
    pub fn kind(&self) -> GatewayKind {
        match self {
            Self::BankTransferDomestic(_) => GatewayKind::BankTransferDomestic,
            Self::BankTransferInternational(_) => GatewayKind::BankTransferInternational,
            Self::Card(_) => GatewayKind::Card,
            Self::Wallet(_) => GatewayKind::Wallet,
            Self::InstantBank(_) => GatewayKind::InstantBank,
        }
    }

    /// Save-time required-field check. Returns the wire names of fields
    /// that are missing or blank; empty means valid.
    pub fn missing_required_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        match self {
            Self::BankTransferDomestic(s) => {
                require(&mut missing, "bankName", &s.bank_name);
                require(&mut missing, "accountNumber", &s.account_number);
                require(&mut missing, "swiftCode", &s.swift_code);
            }
            Self::BankTransferInternational(s) => {
                require(&mut missing, "bankName", &s.bank_name);
                require(&mut missing, "accountNumber", &s.account_number);
                require(&mut missing, "swiftCode", &s.swift_code);
                require(&mut missing, "iban", &s.iban);
            }
            Self::Card(s) => {
                require(&mut missing, "apiKey", &s.api_key);
                require(&mut missing, "secretKey", &s.secret_key);
            }
            Self::Wallet(s) => {
                require(&mut missing, "apiKey", &s.api_key);
                require(&mut missing, "secretKey", &s.secret_key);
            }
            Self::InstantBank(s) => {
                require(&mut missing, "apiKey", &s.api_key);
                require(&mut missing, "secretKey", &s.secret_key);
                require(&mut missing, "apiBaseUrl", &s.api_base_url);
            }
        }
        missing
    }

    /// Dispatch-time check. Redirect-style flows additionally need an
    /// `apiBaseUrl` to construct the provider URL from.
    pub fn missing_for_dispatch(&self, needs_redirect: bool) -> Vec<&'static str> {
        let mut missing = self.missing_required_fields();
        if needs_redirect {
            let base_url = match self {
                Self::Card(s) => &s.api_base_url,
                Self::Wallet(s) => &s.api_base_url,
                _ => return missing,
            };
            if !missing.contains(&"apiBaseUrl") {
                require(&mut missing, "apiBaseUrl", base_url);
            }
        }
        missing
    }
}

/// A configured payment gateway as persisted in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    pub id: Uuid,
    pub name: String,
    pub enabled: bool,
    #[serde(flatten)]
    pub settings: GatewaySettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GatewayConfig {
    pub fn kind(&self) -> GatewayKind {
        self.settings.kind()
    }
}

/// Input for creating a gateway. `enabled` always starts out false; a
/// gateway only becomes active through the exclusive enable operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGateway {
    pub name: String,
    #[serde(flatten)]
    pub settings: GatewaySettings,
}
