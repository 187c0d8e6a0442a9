//! Gateway configuration store.
//!
//! The store is the only writer of gateway records and the single piece of
//! globally shared mutable state in the payment core. The invariant it
//! guards: at most one gateway is enabled at any time. Enabling a gateway
//! disables every other record inside one write-guard section, so a
//! concurrent reader never observes zero-or-many enabled gateways
//! mid-update.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AppError;
use crate::gateways::types::{GatewayConfig, NewGateway};

/// Port for gateway persistence. The in-memory adapter below is the
/// default; a SQL adapter would implement the same trait.
#[async_trait]
pub trait GatewayRepository: Send + Sync {
    async fn create(&self, new: NewGateway) -> Result<GatewayConfig, AppError>;

    /// Shallow-merges `patch` into the gateway's settings object. Does not
    /// alter `enabled`.
    async fn update(&self, id: Uuid, patch: serde_json::Value) -> Result<GatewayConfig, AppError>;

    /// The only mutator of `enabled`: atomically enables `id` and disables
    /// every other gateway.
    async fn set_enabled(&self, id: Uuid) -> Result<GatewayConfig, AppError>;

    /// The single enabled gateway, if any. Absence is a normal outcome for
    /// dispatch to handle explicitly, not an error.
    async fn get_active(&self) -> Option<GatewayConfig>;

    async fn get(&self, id: Uuid) -> Result<GatewayConfig, AppError>;

    async fn list(&self) -> Vec<GatewayConfig>;

    /// Removes the record. Deleting the enabled gateway leaves the system
    /// with zero enabled gateways; nothing is activated in its place.
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
}

#[derive(Default)]
pub struct InMemoryGatewayStore {
    records: RwLock<HashMap<Uuid, GatewayConfig>>,
}

impl InMemoryGatewayStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GatewayRepository for InMemoryGatewayStore {
    async fn create(&self, new: NewGateway) -> Result<GatewayConfig, AppError> {
        if new.name.trim().is_empty() {
            return Err(AppError::validation("gateway name must not be empty"));
        }
        let now = Utc::now();
        let record = GatewayConfig {
            id: Uuid::new_v4(),
            name: new.name,
            enabled: false,
            settings: new.settings,
            created_at: now,
            updated_at: now,
        };

        let missing = record.settings.missing_required_fields();
        if !missing.is_empty() {
            // Saving incomplete is allowed; completeness is enforced again
            // before dispatch.
            debug!(gateway = %record.name, ?missing, "gateway saved with incomplete configuration");
        }

        let mut records = self.records.write().await;
        records.insert(record.id, record.clone());
        info!(gateway_id = %record.id, kind = %record.kind(), "payment gateway created");
        Ok(record)
    }

    async fn update(&self, id: Uuid, patch: serde_json::Value) -> Result<GatewayConfig, AppError> {
        let patch = match patch {
            serde_json::Value::Object(map) => map,
            _ => return Err(AppError::validation("gateway patch must be a JSON object")),
        };
        if patch.contains_key("enabled") {
            return Err(AppError::validation(
                "enabled cannot be changed through update; use the enable operation",
            ));
        }
        let redacted_patch = crate::logging::redact_sensitive_data(
            &serde_json::Value::Object(patch.clone()).to_string(),
        );

        let mut records = self.records.write().await;
        let record = records
            .get_mut(&id)
            .ok_or(AppError::GatewayNotFound { id })?;

        let mut merged = match serde_json::to_value(&record.settings) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => return Err(AppError::validation("gateway settings are not an object")),
        };
        if let Some(name) = patch.get("name").and_then(|v| v.as_str()) {
            if name.trim().is_empty() {
                return Err(AppError::validation("gateway name must not be empty"));
            }
            record.name = name.to_string();
        }
        for (key, value) in patch {
            if key == "name" {
                continue;
            }
            merged.insert(key, value);
        }

        record.settings = serde_json::from_value(serde_json::Value::Object(merged))
            .map_err(|e| AppError::validation(format!("invalid gateway configuration: {e}")))?;
        record.updated_at = Utc::now();
        debug!(gateway_id = %id, patch = %redacted_patch, "payment gateway updated");
        Ok(record.clone())
    }

    async fn set_enabled(&self, id: Uuid) -> Result<GatewayConfig, AppError> {
        let mut records = self.records.write().await;
        if !records.contains_key(&id) {
            return Err(AppError::GatewayNotFound { id });
        }
        let now = Utc::now();
        for (record_id, record) in records.iter_mut() {
            let enable = *record_id == id;
            if record.enabled != enable {
                record.enabled = enable;
                record.updated_at = now;
            }
        }
        let record = records[&id].clone();
        info!(gateway_id = %id, name = %record.name, kind = %record.kind(), "payment gateway enabled");
        Ok(record)
    }

    async fn get_active(&self) -> Option<GatewayConfig> {
        let records = self.records.read().await;
        records.values().find(|r| r.enabled).cloned()
    }

    async fn get(&self, id: Uuid) -> Result<GatewayConfig, AppError> {
        let records = self.records.read().await;
        records
            .get(&id)
            .cloned()
            .ok_or(AppError::GatewayNotFound { id })
    }

    async fn list(&self) -> Vec<GatewayConfig> {
        let records = self.records.read().await;
        let mut all: Vec<_> = records.values().cloned().collect();
        all.sort_by_key(|r| r.created_at);
        all
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut records = self.records.write().await;
        let removed = records
            .remove(&id)
            .ok_or(AppError::GatewayNotFound { id })?;
        if removed.enabled {
            info!(gateway_id = %id, "enabled gateway deleted; no gateway is active now");
        }
        Ok(())
    }
}
