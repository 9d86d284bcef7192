//! テレメトリポーラーの統合テスト

use std::collections::HashMap;
use tokio::time::{sleep, Duration};
use vllm_lb_balancer::balancer::LoadCache;
use vllm_lb_balancer::poller::TelemetryPoller;
use vllm_lb_balancer::registry::ModelRegistry;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const METRICS_BODY: &str = concat!(
    "# HELP vllm:num_requests_waiting Number of requests waiting to be processed.\n",
    "# TYPE vllm:num_requests_waiting gauge\n",
    "vllm:num_requests_waiting{model_name=\"m1\"} 3.0\n",
    "vllm:num_requests_running{model_name=\"m1\"} 8.0\n",
);

async fn mock_metrics(server: &MockServer, body: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path("/metrics"))
        .respond_with(ResponseTemplate::new(status).set_body_raw(body.to_string(), "text/plain"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_poll_once_extracts_queue_depth() {
    let backend = MockServer::start().await;
    mock_metrics(&backend, METRICS_BODY, 200).await;

    let registry = ModelRegistry::new(vec![backend.uri()], HashMap::new());
    let cache = LoadCache::new();
    let poller = TelemetryPoller::new(registry, cache.clone());

    poller.poll_once().await;

    let sample = cache.get(&backend.uri()).await.unwrap();
    assert!(sample.healthy);
    assert_eq!(sample.queue_depth, 3.0);
}

#[tokio::test]
async fn test_scrape_failure_does_not_affect_other_backends() {
    let good = MockServer::start().await;
    let bad = MockServer::start().await;
    mock_metrics(&good, "vllm:num_requests_waiting 1.0\n", 200).await;
    mock_metrics(&bad, "internal error", 500).await;

    let registry = ModelRegistry::new(vec![good.uri(), bad.uri()], HashMap::new());
    let cache = LoadCache::new();
    let poller = TelemetryPoller::new(registry, cache.clone());

    poller.poll_once().await;

    let good_sample = cache.get(&good.uri()).await.unwrap();
    assert!(good_sample.healthy);
    assert_eq!(good_sample.queue_depth, 1.0);

    let bad_sample = cache.get(&bad.uri()).await.unwrap();
    assert!(!bad_sample.healthy);
    assert!(bad_sample.queue_depth.is_infinite());
}

#[tokio::test]
async fn test_missing_metric_key_marks_backend_unhealthy() {
    let backend = MockServer::start().await;
    mock_metrics(&backend, "vllm:num_requests_running 2.0\n", 200).await;

    let registry = ModelRegistry::new(vec![backend.uri()], HashMap::new());
    let cache = LoadCache::new();
    let poller = TelemetryPoller::new(registry, cache.clone());

    poller.poll_once().await;

    let sample = cache.get(&backend.uri()).await.unwrap();
    assert!(!sample.healthy);
    assert!(sample.queue_depth.is_infinite());
}

#[tokio::test]
async fn test_custom_metric_key() {
    let backend = MockServer::start().await;
    mock_metrics(&backend, "sglang:num_queue_reqs 5\n", 200).await;

    let registry = ModelRegistry::new(vec![backend.uri()], HashMap::new());
    let cache = LoadCache::new();
    let poller = TelemetryPoller::new(registry, cache.clone())
        .with_metric_key("sglang:num_queue_reqs");

    poller.poll_once().await;

    let sample = cache.get(&backend.uri()).await.unwrap();
    assert!(sample.healthy);
    assert_eq!(sample.queue_depth, 5.0);
}

#[tokio::test]
async fn test_background_poller_marks_unreachable_backend_unhealthy() {
    // 接続拒否されるバックエンド。1ポーリング間隔以内にunhealthyが観測できる。
    let dead = "http://127.0.0.1:1".to_string();
    let registry = ModelRegistry::new(vec![dead.clone()], HashMap::new());
    let cache = LoadCache::new();

    TelemetryPoller::new(registry, cache.clone())
        .with_interval(1)
        .start();

    // intervalの最初のtickは即時発火する
    sleep(Duration::from_millis(500)).await;

    let sample = cache.get(&dead).await.expect("poller should have run");
    assert!(!sample.healthy);
    assert!(sample.queue_depth.is_infinite());
}

#[tokio::test]
async fn test_poll_overwrites_previous_sample() {
    let backend = MockServer::start().await;
    mock_metrics(&backend, "vllm:num_requests_waiting 4.0\n", 200).await;

    let registry = ModelRegistry::new(vec![backend.uri()], HashMap::new());
    let cache = LoadCache::new();
    let poller = TelemetryPoller::new(registry, cache.clone());

    poller.poll_once().await;
    assert_eq!(cache.get(&backend.uri()).await.unwrap().queue_depth, 4.0);

    // バックエンドのメトリクスが変化したら次のポーリングで置き換わる
    backend.reset().await;
    mock_metrics(&backend, "vllm:num_requests_waiting 0.0\n", 200).await;

    poller.poll_once().await;
    let sample = cache.get(&backend.uri()).await.unwrap();
    assert_eq!(sample.queue_depth, 0.0);
    assert!(sample.healthy);
}
