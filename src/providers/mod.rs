//! Instant-payment provider contract.
//!
//! The remote provider is a collaborator: the core only needs "create a
//! payment" and "get a payment's status". The HTTP implementation lives in
//! [`http`]; tests substitute their own implementations.

pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::gateways::InstantBankSettings;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub order_id: u64,
    pub amount: Decimal,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

/// Remote payment status. Providers report these case-insensitively on the
/// wire (`PAID` and `paid` both occur).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderPaymentStatus {
    Pending,
    Paid,
    Cancelled,
    Expired,
}

impl ProviderPaymentStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "pending" | "unpaid" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "cancelled" | "canceled" | "failed" | "declined" => Some(Self::Cancelled),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Response to a create-payment call: everything the checkout flow needs to
/// render the QR code and track the payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderPayment {
    pub payment_id: String,
    pub qr_payload: String,
    pub readable_code: String,
    pub valid_until: DateTime<Utc>,
    pub status: ProviderPaymentStatus,
}

#[async_trait]
pub trait InstantPaymentProvider: Send + Sync {
    async fn create_payment(&self, req: CreatePaymentRequest)
        -> Result<ProviderPayment, AppError>;

    async fn get_payment_status(
        &self,
        payment_id: &str,
    ) -> Result<ProviderPaymentStatus, AppError>;

    /// Best-effort remote cancellation; the local session state is
    /// authoritative for the checkout flow either way.
    async fn cancel_payment(&self, payment_id: &str) -> Result<(), AppError>;
}

/// Builds a provider from the active gateway's instant-bank settings.
pub trait ProviderFactory: Send + Sync {
    fn instant_provider(
        &self,
        settings: &InstantBankSettings,
    ) -> Result<Arc<dyn InstantPaymentProvider>, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_status_parses_case_insensitively() {
        assert_eq!(
            ProviderPaymentStatus::parse("PAID"),
            Some(ProviderPaymentStatus::Paid)
        );
        assert_eq!(
            ProviderPaymentStatus::parse("Cancelled"),
            Some(ProviderPaymentStatus::Cancelled)
        );
        assert_eq!(
            ProviderPaymentStatus::parse("pending"),
            Some(ProviderPaymentStatus::Pending)
        );
        assert_eq!(ProviderPaymentStatus::parse("weird"), None);
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!ProviderPaymentStatus::Pending.is_terminal());
        assert!(ProviderPaymentStatus::Paid.is_terminal());
        assert!(ProviderPaymentStatus::Expired.is_terminal());
    }
}
