mod common;

use std::sync::Arc;

use chempay_backend::error::AppError;
use chempay_backend::gateways::{GatewayRepository, GatewaySettings, InMemoryGatewayStore};
use uuid::Uuid;

use common::{card_gateway, domestic_gateway, instant_gateway};

#[tokio::test]
async fn created_gateways_start_disabled() {
    let store = InMemoryGatewayStore::new();
    let created = store.create(domestic_gateway("Rafidain")).await.unwrap();
    assert!(!created.enabled);
    assert!(store.get_active().await.is_none());
}

#[tokio::test]
async fn create_rejects_blank_name() {
    let store = InMemoryGatewayStore::new();
    let mut new = domestic_gateway("");
    new.name = "   ".to_string();
    let err = store.create(new).await.unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

#[tokio::test]
async fn enable_is_exclusive() {
    let store = InMemoryGatewayStore::new();
    let a = store.create(domestic_gateway("Rafidain")).await.unwrap();
    let b = store.create(card_gateway("SEP")).await.unwrap();

    store.set_enabled(a.id).await.unwrap();
    assert_eq!(store.get_active().await.unwrap().id, a.id);

    store.set_enabled(b.id).await.unwrap();
    let all = store.list().await;
    let enabled: Vec<_> = all.iter().filter(|g| g.enabled).collect();
    assert_eq!(enabled.len(), 1);
    assert_eq!(enabled[0].id, b.id);
}

#[tokio::test]
async fn concurrent_enables_never_leave_two_active() {
    let store = Arc::new(InMemoryGatewayStore::new());
    let mut ids = Vec::new();
    for i in 0..8 {
        let g = store
            .create(instant_gateway(&format!("FIB {i}")))
            .await
            .unwrap();
        ids.push(g.id);
    }

    let mut tasks = Vec::new();
    for _ in 0..4 {
        for &id in &ids {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store.set_enabled(id).await.unwrap();
                // Interleave with other writers.
                tokio::task::yield_now().await;
            }));
        }
    }
    for task in tasks {
        task.await.unwrap();
    }

    let enabled: Vec<_> = store.list().await.into_iter().filter(|g| g.enabled).collect();
    assert_eq!(enabled.len(), 1);
    assert!(ids.contains(&enabled[0].id));
}

#[tokio::test]
async fn enable_of_unknown_gateway_is_not_found() {
    let store = InMemoryGatewayStore::new();
    let err = store.set_enabled(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::GatewayNotFound { .. }));
}

#[tokio::test]
async fn update_merges_settings_without_touching_enabled() {
    let store = InMemoryGatewayStore::new();
    let g = store.create(card_gateway("SEP")).await.unwrap();
    store.set_enabled(g.id).await.unwrap();

    let updated = store
        .update(g.id, serde_json::json!({ "merchantId": "M999", "name": "SEP Prod" }))
        .await
        .unwrap();

    assert!(updated.enabled);
    assert_eq!(updated.name, "SEP Prod");
    match updated.settings {
        GatewaySettings::Card(s) => {
            assert_eq!(s.merchant_id.as_deref(), Some("M999"));
            // Untouched fields survive the merge.
            assert_eq!(s.secret_key.as_deref(), Some("sk_live_1"));
        }
        other => panic!("gateway type changed unexpectedly: {:?}", other.kind()),
    }
}

#[tokio::test]
async fn update_rejects_enabled_in_the_patch() {
    let store = InMemoryGatewayStore::new();
    let g = store.create(card_gateway("SEP")).await.unwrap();
    let err = store
        .update(g.id, serde_json::json!({ "enabled": true }))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
    assert!(!store.get(g.id).await.unwrap().enabled);
}

#[tokio::test]
async fn update_can_switch_gateway_type() {
    let store = InMemoryGatewayStore::new();
    let g = store.create(card_gateway("Main")).await.unwrap();
    let updated = store
        .update(
            g.id,
            serde_json::json!({
                "type": "instant_bank",
                "apiKey": "k",
                "secretKey": "s",
                "apiBaseUrl": "https://fib.example.iq",
            }),
        )
        .await
        .unwrap();
    assert!(matches!(updated.settings, GatewaySettings::InstantBank(_)));
}

#[tokio::test]
async fn update_rejects_a_non_object_patch() {
    let store = InMemoryGatewayStore::new();
    let g = store.create(card_gateway("SEP")).await.unwrap();
    let err = store
        .update(g.id, serde_json::json!("not an object"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

#[tokio::test]
async fn deleting_the_enabled_gateway_leaves_none_active() {
    let store = InMemoryGatewayStore::new();
    let a = store.create(domestic_gateway("Rafidain")).await.unwrap();
    let b = store.create(card_gateway("SEP")).await.unwrap();
    store.set_enabled(a.id).await.unwrap();

    store.delete(a.id).await.unwrap();

    // Nothing is promoted in its place.
    assert!(store.get_active().await.is_none());
    assert_eq!(store.list().await.len(), 1);
    assert!(!store.get(b.id).await.unwrap().enabled);
}

#[tokio::test]
async fn delete_of_unknown_gateway_is_not_found() {
    let store = InMemoryGatewayStore::new();
    let err = store.delete(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::GatewayNotFound { .. }));
}
