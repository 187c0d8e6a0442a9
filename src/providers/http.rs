//! HTTP implementation of the instant-payment provider contract.
//!
//! Talks JSON to the provider's REST API using the credentials configured
//! on the active instant-bank gateway. Transport failures and 5xx answers
//! are retryable (the poller retries on its next tick); 4xx answers are
//! not.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::error::AppError;
use crate::gateways::InstantBankSettings;
use crate::providers::{
    CreatePaymentRequest, InstantPaymentProvider, ProviderFactory, ProviderPayment,
    ProviderPaymentStatus,
};

const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug)]
pub struct HttpInstantProvider {
    client: Client,
    base_url: Url,
    api_key: String,
    secret_key: String,
    merchant_id: Option<String>,
    callback_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentResponse {
    payment_id: String,
    #[serde(alias = "qrCode")]
    qr_payload: String,
    readable_code: String,
    valid_until: DateTime<Utc>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentStatusResponse {
    status: String,
}

impl HttpInstantProvider {
    pub fn from_settings(settings: &InstantBankSettings) -> Result<Self, AppError> {
        let base_url = settings
            .api_base_url
            .as_deref()
            .ok_or_else(|| AppError::GatewayMisconfigured {
                missing: vec!["apiBaseUrl".to_string()],
            })?;
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| AppError::GatewayMisconfigured {
                missing: vec!["apiKey".to_string()],
            })?;
        let secret_key = settings
            .secret_key
            .clone()
            .ok_or_else(|| AppError::GatewayMisconfigured {
                missing: vec!["secretKey".to_string()],
            })?;

        let mut base_url = Url::parse(base_url)
            .map_err(|e| AppError::validation(format!("invalid apiBaseUrl: {e}")))?;
        // Trailing slash so Url::join appends instead of replacing the
        // last path segment.
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let timeout = settings.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .map_err(|e| AppError::provider(e.to_string(), false))?;

        Ok(Self {
            client,
            base_url,
            api_key,
            secret_key,
            merchant_id: settings.merchant_id.clone(),
            callback_url: settings.webhook_url.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::provider(format!("invalid provider endpoint: {e}"), false))
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("x-api-key", &self.api_key)
            .header("x-api-secret", &self.secret_key)
    }

    fn transport_error(e: reqwest::Error) -> AppError {
        AppError::provider(format!("provider request failed: {e}"), true)
    }

    fn status_error(status: StatusCode, body: String) -> AppError {
        let retryable = status.is_server_error();
        AppError::provider(format!("provider returned {status}: {body}"), retryable)
    }

    fn parse_status(raw: &str) -> Result<ProviderPaymentStatus, AppError> {
        ProviderPaymentStatus::parse(raw).ok_or_else(|| {
            AppError::provider(format!("provider reported unknown status {raw:?}"), false)
        })
    }
}

#[async_trait]
impl InstantPaymentProvider for HttpInstantProvider {
    async fn create_payment(
        &self,
        req: CreatePaymentRequest,
    ) -> Result<ProviderPayment, AppError> {
        let url = self.endpoint("payments")?;
        let mut body = serde_json::json!({
            "orderId": req.order_id,
            "amount": req.amount,
            "currency": req.currency,
        });
        if let Some(description) = &req.description {
            body["description"] = serde_json::json!(description);
        }
        if let Some(callback) = req.callback_url.as_ref().or(self.callback_url.as_ref()) {
            body["callbackUrl"] = serde_json::json!(callback);
        }
        if let Some(merchant) = &self.merchant_id {
            body["merchantId"] = serde_json::json!(merchant);
        }

        debug!(order_id = req.order_id, %url, "creating instant payment");
        let response = self
            .request(reqwest::Method::POST, url)
            .json(&body)
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status, body));
        }

        let payment: CreatePaymentResponse =
            response.json().await.map_err(Self::transport_error)?;
        let payment_status = payment
            .status
            .as_deref()
            .map(Self::parse_status)
            .transpose()?
            .unwrap_or(ProviderPaymentStatus::Pending);

        Ok(ProviderPayment {
            payment_id: payment.payment_id,
            qr_payload: payment.qr_payload,
            readable_code: payment.readable_code,
            valid_until: payment.valid_until,
            status: payment_status,
        })
    }

    async fn get_payment_status(
        &self,
        payment_id: &str,
    ) -> Result<ProviderPaymentStatus, AppError> {
        let url = self.endpoint(&format!("payments/{payment_id}/status"))?;
        let response = self
            .request(reqwest::Method::GET, url)
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status, body));
        }

        let parsed: PaymentStatusResponse = response.json().await.map_err(Self::transport_error)?;
        Self::parse_status(&parsed.status)
    }

    async fn cancel_payment(&self, payment_id: &str) -> Result<(), AppError> {
        let url = self.endpoint(&format!("payments/{payment_id}/cancel"))?;
        let response = self
            .request(reqwest::Method::POST, url)
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status, body));
        }
        Ok(())
    }
}

/// Default factory: one HTTP provider per dispatch, configured from the
/// active gateway's settings.
#[derive(Default)]
pub struct HttpProviderFactory;

impl ProviderFactory for HttpProviderFactory {
    fn instant_provider(
        &self,
        settings: &InstantBankSettings,
    ) -> Result<Arc<dyn InstantPaymentProvider>, AppError> {
        Ok(Arc::new(HttpInstantProvider::from_settings(settings)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateways::InstantBankSettings;

    fn settings(base: &str) -> InstantBankSettings {
        InstantBankSettings {
            api_key: Some("key".into()),
            secret_key: Some("secret".into()),
            api_base_url: Some(base.into()),
            ..Default::default()
        }
    }

    #[test]
    fn base_url_join_appends_path_segments() {
        let provider = HttpInstantProvider::from_settings(&settings("https://pay.example.iq/v1")).unwrap();
        let url = provider.endpoint("payments/abc/status").unwrap();
        assert_eq!(url.as_str(), "https://pay.example.iq/v1/payments/abc/status");
    }

    #[test]
    fn missing_base_url_is_a_misconfiguration() {
        let mut s = settings("https://pay.example.iq");
        s.api_base_url = None;
        let err = HttpInstantProvider::from_settings(&s).unwrap_err();
        assert!(matches!(err, AppError::GatewayMisconfigured { .. }));
    }

    #[test]
    fn invalid_base_url_is_a_validation_error() {
        let err = HttpInstantProvider::from_settings(&settings("not a url")).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
}
