mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;

#[tokio::test]
async fn health_check_returns_ok() {
    let (app, _pool) = setup_app();
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn anonymous_can_read_all_tables() {
    let (app, _pool) = setup_app();

    let (status, assets) = send(&app, "GET", "/api/assets", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(assets.as_array().unwrap().len(), 1);

    let (status, materials) = send(&app, "GET", "/api/materials", Some(ANON_KEY), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(materials[0]["name"], "MDF");

    let uri = format!("/api/assets/{SEED_ASSET_ID}/materials");
    let (status, links) = send(&app, "GET", &uri, Some(ANON_KEY), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(links, json!([]));
}

#[tokio::test]
async fn anonymous_cannot_write() {
    let (app, pool) = setup_app();

    let (status, body) = send(
        &app,
        "POST",
        "/api/assets",
        Some(ANON_KEY),
        Some(json!({"name": "gaveteiro", "type": "furniture"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("permission denied"));

    let uri = format!("/api/assets/{SEED_ASSET_ID}");
    let (status, _) = send(&app, "PATCH", &uri, None, Some(json!({"version": "2.0"}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "DELETE", &uri, None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "POST",
        "/api/materials",
        None,
        Some(json!({"name": "Pinus"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let uri = format!("/api/assets/{SEED_ASSET_ID}/materials");
    let (status, _) = send(
        &app,
        "POST",
        &uri,
        None,
        Some(json!({"material_id": SEED_MATERIAL_ID})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert_eq!(count(&pool, "assets"), 1);
    assert_eq!(count(&pool, "materials"), 1);
    assert_eq!(count(&pool, "asset_materials"), 0);
}

#[tokio::test]
async fn service_can_insert_everywhere_and_delete_assets() {
    let (app, pool) = setup_app();

    let (status, asset) = send(
        &app,
        "POST",
        "/api/assets",
        Some(SERVICE_KEY),
        Some(json!({"name": "gaveteiro", "type": "furniture", "tags": ["drawer"]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let asset_id = asset["id"].as_str().unwrap().to_string();

    let (status, material) = send(
        &app,
        "POST",
        "/api/materials",
        Some(SERVICE_KEY),
        Some(json!({"name": "Carvalho", "color": "#8B5A2B"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/api/assets/{asset_id}/materials");
    let (status, link) = send(
        &app,
        "POST",
        &uri,
        Some(SERVICE_KEY),
        Some(json!({"material_id": material["id"], "role": "front"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(link["role"], "front");

    let uri = format!("/api/assets/{asset_id}");
    let (status, updated) = send(
        &app,
        "PATCH",
        &uri,
        Some(SERVICE_KEY),
        Some(json!({"version": "1.1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["version"], "1.1");

    let (status, _) = send(&app, "DELETE", &uri, Some(SERVICE_KEY), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert_eq!(count(&pool, "assets"), 1);
    assert_eq!(count(&pool, "materials"), 2);
    assert_eq!(count(&pool, "asset_materials"), 0);
}

#[tokio::test]
async fn service_reads_are_denied() {
    let (app, _pool) = setup_app();
    let (status, _) = send(&app, "GET", "/api/assets", Some(SERVICE_KEY), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn materials_and_links_cannot_be_deleted() {
    let (app, pool) = setup_app();

    let link_uri = format!("/api/assets/{SEED_ASSET_ID}/materials");
    let (status, _) = send(
        &app,
        "POST",
        &link_uri,
        Some(USER_TOKEN),
        Some(json!({"material_id": SEED_MATERIAL_ID})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    for key in [USER_TOKEN, SERVICE_KEY] {
        let uri = format!("/api/materials/{SEED_MATERIAL_ID}");
        let (status, _) = send(&app, "DELETE", &uri, Some(key), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let uri = format!("/api/assets/{SEED_ASSET_ID}/materials/{SEED_MATERIAL_ID}");
        let (status, _) = send(&app, "DELETE", &uri, Some(key), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    assert_eq!(count(&pool, "materials"), 1);
    assert_eq!(count(&pool, "asset_materials"), 1);
}

#[tokio::test]
async fn unknown_key_is_unauthorized() {
    let (app, _pool) = setup_app();
    let (status, _) = send(&app, "GET", "/api/assets", Some("mallory"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bearer_token_is_accepted() {
    let (app, _pool) = setup_app();
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/materials")
        .header("Authorization", format!("Bearer {USER_TOKEN}"))
        .header("content-type", "application/json")
        .body(axum::body::Body::from(json!({"name": "Pinus"}).to_string()))
        .unwrap();

    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    let (status, body) = read(response).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Pinus");
}

#[tokio::test]
async fn non_bearer_authorization_is_unauthorized() {
    let (app, _pool) = setup_app();
    let request = axum::http::Request::builder()
        .uri("/api/assets")
        .header("Authorization", "Basic dXNlcjpwYXNz")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn policies_are_listed() {
    let (app, _pool) = setup_app();
    let (status, body) = send(&app, "GET", "/api/policies", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let policies = body.as_array().unwrap();
    assert_eq!(policies.len(), 20);
    let deletes: Vec<_> = policies
        .iter()
        .filter(|p| p["operation"] == "delete")
        .collect();
    assert_eq!(deletes.len(), 2);
    assert!(deletes.iter().all(|p| p["table"] == "assets"));
}
