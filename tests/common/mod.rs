//! Shared test fixtures: a scriptable instant-payment provider and
//! gateway settings builders.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;

use chempay_backend::error::AppError;
use chempay_backend::gateways::{
    BankTransferSettings, CardSettings, GatewaySettings, InstantBankSettings, NewGateway,
};
use chempay_backend::providers::{
    CreatePaymentRequest, InstantPaymentProvider, ProviderFactory, ProviderPayment,
    ProviderPaymentStatus,
};

/// Instant-payment provider double. The reported status is mutable from
/// the test, the next N polls can be made to fail, and every call is
/// recorded.
pub struct MockProvider {
    status: Mutex<ProviderPaymentStatus>,
    failing_polls: AtomicUsize,
    valid_for_secs: i64,
    payment_seq: AtomicUsize,
    pub create_calls: Mutex<Vec<(u64, Decimal, String)>>,
    pub status_calls: AtomicUsize,
    pub cancel_calls: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn pending(valid_for_secs: i64) -> Arc<Self> {
        Arc::new(Self {
            status: Mutex::new(ProviderPaymentStatus::Pending),
            failing_polls: AtomicUsize::new(0),
            valid_for_secs,
            payment_seq: AtomicUsize::new(0),
            create_calls: Mutex::new(Vec::new()),
            status_calls: AtomicUsize::new(0),
            cancel_calls: Mutex::new(Vec::new()),
        })
    }

    /// Change the status future polls will observe.
    pub fn set_status(&self, status: ProviderPaymentStatus) {
        *self.status.lock().unwrap() = status;
    }

    /// Make the next `n` polls fail with a retryable provider error.
    pub fn fail_next_polls(&self, n: usize) {
        self.failing_polls.store(n, Ordering::SeqCst);
    }

    pub fn status_call_count(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InstantPaymentProvider for MockProvider {
    async fn create_payment(
        &self,
        req: CreatePaymentRequest,
    ) -> Result<ProviderPayment, AppError> {
        self.create_calls
            .lock()
            .unwrap()
            .push((req.order_id, req.amount, req.currency.clone()));
        let seq = self.payment_seq.fetch_add(1, Ordering::SeqCst);
        Ok(ProviderPayment {
            payment_id: format!("pay_{}_{}", req.order_id, seq),
            qr_payload: "iqd-qr-payload".to_string(),
            readable_code: "AB12CD34".to_string(),
            valid_until: Utc::now() + ChronoDuration::seconds(self.valid_for_secs),
            status: ProviderPaymentStatus::Pending,
        })
    }

    async fn get_payment_status(
        &self,
        _payment_id: &str,
    ) -> Result<ProviderPaymentStatus, AppError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self.failing_polls.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_polls.store(failing - 1, Ordering::SeqCst);
            return Err(AppError::provider("simulated network failure", true));
        }
        Ok(*self.status.lock().unwrap())
    }

    async fn cancel_payment(&self, payment_id: &str) -> Result<(), AppError> {
        self.cancel_calls.lock().unwrap().push(payment_id.to_string());
        Ok(())
    }
}

pub struct MockFactory {
    pub provider: Arc<MockProvider>,
}

impl ProviderFactory for MockFactory {
    fn instant_provider(
        &self,
        _settings: &InstantBankSettings,
    ) -> Result<Arc<dyn InstantPaymentProvider>, AppError> {
        Ok(self.provider.clone())
    }
}

pub fn domestic_gateway(name: &str) -> NewGateway {
    NewGateway {
        name: name.to_string(),
        settings: GatewaySettings::BankTransferDomestic(BankTransferSettings {
            bank_name: Some("Rafidain Bank".into()),
            account_number: Some("0100-2003-0045".into()),
            swift_code: Some("RAFBIQBA".into()),
            account_holder: Some("Chempay Trading Co.".into()),
            ..Default::default()
        }),
    }
}

pub fn card_gateway_missing_secret(name: &str) -> NewGateway {
    NewGateway {
        name: name.to_string(),
        settings: GatewaySettings::Card(CardSettings {
            api_key: Some("pk_live_1".into()),
            provider: Some("sep".into()),
            currency: Some("IQD".into()),
            api_base_url: Some("https://sep.shaparak.iq/pay".into()),
            ..Default::default()
        }),
    }
}

pub fn card_gateway(name: &str) -> NewGateway {
    NewGateway {
        name: name.to_string(),
        settings: GatewaySettings::Card(CardSettings {
            api_key: Some("pk_live_1".into()),
            secret_key: Some("sk_live_1".into()),
            provider: Some("sep".into()),
            currency: Some("IQD".into()),
            api_base_url: Some("https://sep.shaparak.iq/pay".into()),
            merchant_id: Some("M123".into()),
            ..Default::default()
        }),
    }
}

pub fn instant_gateway(name: &str) -> NewGateway {
    NewGateway {
        name: name.to_string(),
        settings: GatewaySettings::InstantBank(InstantBankSettings {
            api_key: Some("fib-key".into()),
            secret_key: Some("fib-secret".into()),
            api_base_url: Some("https://fib.example.iq/protected/v1".into()),
            ..Default::default()
        }),
    }
}
