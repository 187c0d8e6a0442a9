//! Checkout dispatch: resolve the active gateway and produce the right
//! payment flow for it.
//!
//! Three outcomes exist. Redirect-style methods (card, wallet) get a
//! deterministically constructed provider URL and no session. Manual bank
//! transfers get the gateway's banking details plus an upload handle for
//! the receipt. The instant method creates a remote payment, wraps it in a
//! session, and starts that session's poller; dispatching again for the
//! same order supersedes any still-pending prior session.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Url;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::gateways::{
    BankTransferSettings, GatewayKind, GatewayRepository, GatewaySettings,
};
use crate::providers::{CreatePaymentRequest, ProviderFactory, ProviderPaymentStatus};
use crate::sessions::{
    InstantPaymentSession, PollerConfig, SessionManager, SessionPoller, SessionRecord,
    SessionStatus,
};

/// Prefix for idempotent payment references, `{prefix}_{orderId}_{unixMillis}`.
const REFERENCE_PREFIX: &str = "TXN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Wallet,
    InstantBank,
    BankTransferDomestic,
    BankTransferInternational,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Wallet => "wallet",
            Self::InstantBank => "instant_bank",
            Self::BankTransferDomestic => "bank_transfer_domestic",
            Self::BankTransferInternational => "bank_transfer_international",
        }
    }

    fn serves(&self, kind: GatewayKind) -> bool {
        matches!(
            (self, kind),
            (Self::Card, GatewayKind::Card)
                | (Self::Wallet, GatewayKind::Wallet)
                | (Self::InstantBank, GatewayKind::InstantBank)
                | (Self::BankTransferDomestic, GatewayKind::BankTransferDomestic)
                | (Self::BankTransferInternational, GatewayKind::BankTransferInternational)
        )
    }

    fn needs_redirect(&self) -> bool {
        matches!(self, Self::Card | Self::Wallet)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    pub order_id: u64,
    #[serde(default)]
    pub order_number: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub method: PaymentMethod,
    #[serde(default)]
    pub return_url: Option<String>,
    #[serde(default)]
    pub cancel_url: Option<String>,
}

impl DispatchRequest {
    fn order_number(&self) -> String {
        self.order_number
            .clone()
            .unwrap_or_else(|| format!("ORD-{}", self.order_id))
    }
}

/// Snapshot of an instant-payment session for API responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub payment_id: String,
    pub order_id: u64,
    pub amount: Decimal,
    pub currency: String,
    pub qr_payload: String,
    pub readable_code: String,
    pub status: SessionStatus,
    pub valid_until: DateTime<Utc>,
    pub remaining_secs: i64,
}

impl SessionSummary {
    pub fn from_session(session: &InstantPaymentSession, remaining_secs: i64) -> Self {
        let record = session.record();
        Self {
            payment_id: record.payment_id.clone(),
            order_id: record.order_id,
            amount: record.amount,
            currency: record.currency.clone(),
            qr_payload: record.qr_payload.clone(),
            readable_code: record.readable_code.clone(),
            status: session.status(),
            valid_until: record.valid_until,
            remaining_secs,
        }
    }
}

/// Bank details + upload handle for a manual transfer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferInstructions {
    pub order_id: u64,
    pub reference: String,
    pub amount: Decimal,
    pub currency: String,
    pub bank_name: String,
    pub account_number: String,
    pub swift_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_holder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iban: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Where to POST the transfer receipt for reconciliation.
    pub receipt_upload_path: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchResult {
    Redirect { url: String, reference: String },
    Instant { session: SessionSummary },
    ManualTransfer { instructions: TransferInstructions },
}

pub struct PaymentDispatcher {
    gateways: Arc<dyn GatewayRepository>,
    factory: Arc<dyn ProviderFactory>,
    sessions: Arc<SessionManager>,
    poller_config: PollerConfig,
}

impl PaymentDispatcher {
    pub fn new(
        gateways: Arc<dyn GatewayRepository>,
        factory: Arc<dyn ProviderFactory>,
        sessions: Arc<SessionManager>,
        poller_config: PollerConfig,
    ) -> Self {
        Self {
            gateways,
            factory,
            sessions,
            poller_config,
        }
    }

    pub async fn dispatch(&self, req: DispatchRequest) -> Result<DispatchResult, AppError> {
        let gateway = self
            .gateways
            .get_active()
            .await
            .ok_or(AppError::NoActiveGateway)?;

        if !req.method.serves(gateway.kind()) {
            return Err(AppError::MethodNotAvailable {
                method: req.method.to_string(),
                gateway: gateway.kind().to_string(),
            });
        }

        // Defense in depth: the gateway may have been saved incomplete and
        // never edited back to valid.
        let missing = gateway.settings.missing_for_dispatch(req.method.needs_redirect());
        if !missing.is_empty() {
            return Err(AppError::GatewayMisconfigured {
                missing: missing.into_iter().map(String::from).collect(),
            });
        }

        info!(
            order_id = req.order_id,
            method = %req.method,
            gateway = %gateway.name,
            "dispatching checkout payment"
        );

        match &gateway.settings {
            GatewaySettings::Card(s) => {
                let merchant_id = s
                    .merchant_id
                    .clone()
                    .or_else(|| s.terminal_id.clone())
                    .unwrap_or_default();
                let base = s.api_base_url.as_deref().unwrap_or_default();
                let (url, reference) =
                    build_redirect_url(base, &merchant_id, &req, None, Utc::now())?;
                Ok(DispatchResult::Redirect { url, reference })
            }
            GatewaySettings::Wallet(s) => {
                let merchant_id = s
                    .merchant_id
                    .clone()
                    .or_else(|| s.wallet_account_id.clone())
                    .unwrap_or_default();
                let base = s.api_base_url.as_deref().unwrap_or_default();
                let (url, reference) = build_redirect_url(
                    base,
                    &merchant_id,
                    &req,
                    s.return_url.as_deref(),
                    Utc::now(),
                )?;
                Ok(DispatchResult::Redirect { url, reference })
            }
            GatewaySettings::InstantBank(s) => self.dispatch_instant(s, &req).await,
            GatewaySettings::BankTransferDomestic(s)
            | GatewaySettings::BankTransferInternational(s) => {
                Ok(DispatchResult::ManualTransfer {
                    instructions: transfer_instructions(s, &req),
                })
            }
        }
    }

    async fn dispatch_instant(
        &self,
        settings: &crate::gateways::InstantBankSettings,
        req: &DispatchRequest,
    ) -> Result<DispatchResult, AppError> {
        let provider = self.factory.instant_provider(settings)?;
        let payment = provider
            .create_payment(CreatePaymentRequest {
                order_id: req.order_id,
                amount: req.amount,
                currency: req.currency.clone(),
                description: Some(format!("Order {}", req.order_number())),
                callback_url: settings.webhook_url.clone(),
            })
            .await?;

        let now = Utc::now();
        if payment.valid_until <= now {
            return Err(AppError::ExpiredSession {
                payment_id: payment.payment_id,
            });
        }

        let session = Arc::new(InstantPaymentSession::new(SessionRecord {
            payment_id: payment.payment_id,
            order_id: req.order_id,
            amount: req.amount,
            currency: req.currency.clone(),
            qr_payload: payment.qr_payload,
            readable_code: payment.readable_code,
            created_at: now,
            valid_until: payment.valid_until,
        }));
        // Providers normally answer `pending` here, but a terminal answer
        // at creation time is applied rather than ignored.
        if payment.status != ProviderPaymentStatus::Pending {
            session.apply_provider_status(payment.status);
        }

        info!(
            order_id = req.order_id,
            payment_id = %session.payment_id(),
            code = %crate::logging::mask_payment_code(&session.record().readable_code),
            valid_until = %session.record().valid_until,
            "instant payment session created"
        );

        let poller = SessionPoller::spawn(
            Arc::clone(&session),
            Arc::clone(&provider),
            self.poller_config.clone(),
        );
        let summary = SessionSummary::from_session(&session, poller.remaining_secs());
        self.sessions
            .register(Arc::clone(&session), poller, provider)
            .await;

        Ok(DispatchResult::Instant { session: summary })
    }
}

/// Deterministic redirect URL construction: pure given its inputs plus the
/// supplied timestamp, no external call.
pub fn build_redirect_url(
    api_base_url: &str,
    merchant_id: &str,
    req: &DispatchRequest,
    default_return_url: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(String, String), AppError> {
    let mut url = Url::parse(api_base_url)
        .map_err(|e| AppError::validation(format!("invalid apiBaseUrl: {e}")))?;
    let reference = format!("{REFERENCE_PREFIX}_{}_{}", req.order_id, now.timestamp_millis());
    let return_url = req
        .return_url
        .as_deref()
        .or(default_return_url)
        .unwrap_or_default();
    let cancel_url = req.cancel_url.as_deref().unwrap_or_default();

    url.query_pairs_mut()
        .append_pair("merchantId", merchant_id)
        .append_pair("amount", &req.amount.to_string())
        .append_pair("currency", &req.currency)
        .append_pair("reference", &reference)
        .append_pair("orderNumber", &req.order_number())
        .append_pair("returnUrl", return_url)
        .append_pair("cancelUrl", cancel_url);

    Ok((url.into(), reference))
}

fn transfer_instructions(
    settings: &BankTransferSettings,
    req: &DispatchRequest,
) -> TransferInstructions {
    TransferInstructions {
        order_id: req.order_id,
        reference: req.order_number(),
        amount: req.amount,
        currency: req.currency.clone(),
        bank_name: settings.bank_name.clone().unwrap_or_default(),
        account_number: settings.account_number.clone().unwrap_or_default(),
        swift_code: settings.swift_code.clone().unwrap_or_default(),
        account_holder: settings.account_holder.clone(),
        iban: settings.iban.clone(),
        bank_address: settings.bank_address.clone(),
        instructions: settings.instructions.clone(),
        receipt_upload_path: format!("/api/orders/{}/receipt", req.order_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request() -> DispatchRequest {
        DispatchRequest {
            order_id: 42,
            order_number: Some("M2508942".into()),
            amount: Decimal::new(150_000, 0),
            currency: "IQD".into(),
            method: PaymentMethod::Card,
            return_url: Some("https://shop.example.com/payment/callback".into()),
            cancel_url: Some("https://shop.example.com/payment/cancel".into()),
        }
    }

    #[test]
    fn redirect_url_is_deterministic_for_a_fixed_timestamp() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let (url, reference) =
            build_redirect_url("https://sep.shaparak.iq/pay", "M123", &request(), None, now)
                .unwrap();
        assert_eq!(reference, "TXN_42_1700000000000");
        assert_eq!(
            url,
            "https://sep.shaparak.iq/pay?merchantId=M123&amount=150000&currency=IQD\
             &reference=TXN_42_1700000000000&orderNumber=M2508942\
             &returnUrl=https%3A%2F%2Fshop.example.com%2Fpayment%2Fcallback\
             &cancelUrl=https%3A%2F%2Fshop.example.com%2Fpayment%2Fcancel"
        );
    }

    #[test]
    fn order_number_falls_back_to_order_id() {
        let mut req = request();
        req.order_number = None;
        assert_eq!(req.order_number(), "ORD-42");
    }

    #[test]
    fn method_matches_only_its_gateway_kind() {
        assert!(PaymentMethod::InstantBank.serves(GatewayKind::InstantBank));
        assert!(!PaymentMethod::InstantBank.serves(GatewayKind::Card));
        assert!(PaymentMethod::Card.needs_redirect());
        assert!(!PaymentMethod::BankTransferDomestic.needs_redirect());
    }
}
