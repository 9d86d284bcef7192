//! モデル一覧・ヘルスチェックAPIとラウンドロビンベースラインの契約テスト

use crate::support;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use std::collections::HashMap;
use tower::ServiceExt;
use vllm_lb_balancer::{api, AppState};
use vllm_lb_common::types::LoadSample;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    (status, body)
}

#[tokio::test]
async fn test_list_models_contract() {
    let mut model_map = HashMap::new();
    model_map.insert(
        "m2".to_string(),
        vec!["http://c:8000".to_string()],
    );
    model_map.insert(
        "m1".to_string(),
        vec!["http://a:8000".to_string(), "http://b:8000".to_string()],
    );
    let config = support::test_config(
        vec![
            "http://a:8000".to_string(),
            "http://b:8000".to_string(),
            "http://c:8000".to_string(),
        ],
        model_map,
    );
    let app = api::create_router(AppState::adaptive(&config));

    let (status, body) = get_json(app, "/v1/models").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["object"], "list");
    // モデルIDでソートされた決定的な並び
    assert_eq!(
        body["data"],
        json!([
            {"id": "m1", "object": "model", "replicas": 2},
            {"id": "m2", "object": "model", "replicas": 1},
        ])
    );
}

#[tokio::test]
async fn test_health_adaptive_unhealthy_without_samples() {
    let config = support::test_config(
        vec!["http://a:8000".to_string(), "http://b:8000".to_string()],
        HashMap::new(),
    );
    let app = api::create_router(AppState::adaptive(&config));

    let (status, body) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["endpoints"], 2);
    assert_eq!(body["healthy_endpoints"], 0);
}

#[tokio::test]
async fn test_health_adaptive_counts_healthy_backends() {
    let config = support::test_config(
        vec!["http://a:8000".to_string(), "http://b:8000".to_string()],
        HashMap::new(),
    );
    let state = AppState::adaptive(&config);
    state
        .load_cache
        .store(LoadSample::reachable("http://a:8000", 0.0))
        .await;
    state
        .load_cache
        .store(LoadSample::unreachable("http://b:8000"))
        .await;
    let app = api::create_router(state);

    let (status, body) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["healthy_endpoints"], 1);
}

#[tokio::test]
async fn test_health_round_robin_is_fixed() {
    let config = support::test_config(
        vec!["http://a:8000".to_string(), "http://b:8000".to_string()],
        HashMap::new(),
    );
    let app = api::create_router(AppState::round_robin(&config));

    let (status, body) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["endpoints"], 2);
    // ベースラインはテレメトリを持たないためhealthy_endpointsは含まない
    assert!(body.get("healthy_endpoints").is_none());
}

#[tokio::test]
async fn test_metrics_route_absent_on_round_robin_baseline() {
    let config = support::test_config(vec!["http://a:8000".to_string()], HashMap::new());
    let app = api::create_router(AppState::round_robin(&config));

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_round_robin_spreads_requests_evenly() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;

    for backend in [&first, &second] {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .expect(2)
            .mount(backend)
            .await;
    }

    let replicas = vec![first.uri(), second.uri()];
    let config = support::test_config(
        replicas.clone(),
        support::single_model_map("m1", &replicas),
    );
    let app = api::create_router(AppState::round_robin(&config));

    // 4回のリクエストが2レプリカへ2回ずつ分配される
    for _ in 0..4 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/chat/completions")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({"model": "m1", "stream": false, "messages": []}).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
