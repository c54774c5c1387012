//! HTTP API tests against an in-memory repository

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{audiences, pools, seeded_repository};
use rotapost::config::Config;
use rotapost::http::{create_router, AppState};
use rotapost::models::Pools;
use rotapost::planner::PlanningService;
use rotapost::storage::create_mock_repository;

fn router_with(pools: Option<&Pools>) -> Router {
    let repo = match pools {
        Some(pools) => seeded_repository(pools),
        None => create_mock_repository(),
    };
    let service = PlanningService::new(repo, Arc::new(Config::default()));
    create_router(AppState::new(service))
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let router = router_with(None);
    let (status, body) = send(&router, get("/api/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "healthy");
}

#[tokio::test]
async fn test_create_plan_and_list() {
    let router = router_with(Some(&pools(2, &audiences(5), 2, 0)));

    let (status, body) = send(
        &router,
        post_json("/api/plans", json!({"day": "2024-03-04", "count": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["plan"]["assignments"].as_array().unwrap().len(), 3);
    assert_eq!(body["data"]["plan"]["termination"], "completed");
    assert_eq!(body["data"]["stored"].as_array().unwrap().len(), 3);

    let (status, body) = send(&router, get("/api/plans/2024-03-04")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["assignments"].as_array().unwrap().len(), 3);

    let (status, body) = send(&router, get("/api/plans/2024-03-04/verify")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["violations"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_dry_run_returns_ok_and_stores_nothing() {
    let router = router_with(Some(&pools(1, &audiences(3), 1, 0)));

    let (status, body) = send(
        &router,
        post_json(
            "/api/plans",
            json!({"day": "2024-03-04", "count": 2, "start_time": "14:10", "dry_run": true}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let first = &body["data"]["plan"]["assignments"][0];
    assert_eq!(first["scheduled_time"], "2024-03-04T14:10:00");

    let (_, body) = send(&router, get("/api/plans/2024-03-04")).await;
    assert!(body["data"]["assignments"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_pool_is_unprocessable() {
    let router = router_with(None);

    let (status, body) = send(
        &router,
        post_json("/api/plans", json!({"day": "2024-03-04", "count": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["pool"], "actors");
}

#[tokio::test]
async fn test_bad_start_time_and_date() {
    let router = router_with(Some(&pools(1, &audiences(2), 1, 0)));

    let (status, _) = send(
        &router,
        post_json("/api/plans", json!({"day": "2024-03-04", "start_time": "25:99"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&router, get("/api/plans/04-03-2024")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("YYYY-MM-DD"));
}

#[tokio::test]
async fn test_record_outcome() {
    let router = router_with(Some(&pools(1, &audiences(2), 1, 0)));

    let (_, body) = send(
        &router,
        post_json("/api/plans", json!({"day": "2024-03-04", "count": 1})),
    )
    .await;
    let id = body["data"]["stored"][0]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &router,
        post_json(
            &format!("/api/assignments/{id}/outcome"),
            json!({"outcome": "posted"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&router, get("/api/plans/2024-03-04")).await;
    assert_eq!(body["data"]["assignments"][0]["outcome"], "posted");

    let (status, _) = send(
        &router,
        post_json(
            "/api/assignments/missing/outcome",
            json!({"outcome": "posted"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &router,
        post_json(&format!("/api/assignments/{id}/outcome"), json!({"outcome": "maybe"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let _ = rotapost::metrics::init_metrics();
    let router = router_with(None);

    let response = router.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
