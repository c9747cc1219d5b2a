#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use plubin_db::{create_pool, run_migrations, DbPool, DbRuntimeSettings, IN_MEMORY};
use plubin_server::{
    app,
    config::{AuthConfig, StorageConfig},
    AppState,
};
use serde_json::Value;
use tower::ServiceExt;

pub const ANON_KEY: &str = "anon-key";
pub const SERVICE_KEY: &str = "service-key";
pub const USER_TOKEN: &str = "user-token";

pub const SEED_ASSET_ID: &str = plubin_db::SEED_ASSET_ID;
pub const SEED_MATERIAL_ID: &str = plubin_db::SEED_MATERIAL_ID;

pub fn setup_app() -> (Router, DbPool) {
    let pool = create_pool(IN_MEMORY, DbRuntimeSettings::default()).unwrap();
    {
        let conn = pool.get().unwrap();
        run_migrations(&conn).unwrap();
    }

    let auth = AuthConfig {
        anon_key: Some(ANON_KEY.to_string()),
        service_key: Some(SERVICE_KEY.to_string()),
        user_tokens: vec![USER_TOKEN.to_string()],
    };
    let storage = StorageConfig {
        public_base_url: "https://files.example.com".to_string(),
        bucket: "assets".to_string(),
    };

    let state = AppState::new(pool.clone(), auth, storage);
    (app(state), pool)
}

pub fn count(pool: &DbPool, table: &str) -> i64 {
    let conn = pool.get().unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

/// Sends a request and returns the status and the JSON body (or `Null`).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    key: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = key {
        builder = builder.header("apikey", key);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    read(app.clone().oneshot(request).await.unwrap()).await
}

pub async fn read(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, json)
}
