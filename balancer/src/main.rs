//! Smart Load Balancer エントリポイント（アダプティブバリアント）
//!
//! テレメトリポーラーを起動し、キュー深度が最小のレプリカへルーティングする。

use tracing::info;
use tracing_subscriber::EnvFilter;
use vllm_lb_balancer::{api, poller::TelemetryPoller, AppState};
use vllm_lb_common::config::LbConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Smart Load Balancer v{}", env!("CARGO_PKG_VERSION"));

    let config = LbConfig::from_env().expect("Failed to load configuration");

    info!(
        endpoints = ?config.endpoints,
        models = config.model_map.len(),
        poll_interval_secs = config.poll_interval_secs,
        "Configuration loaded"
    );

    let state = AppState::adaptive(&config);

    // ポーラーはリクエスト処理とは独立にプロセス終了まで走り続ける
    TelemetryPoller::new(state.registry.clone(), state.load_cache.clone())
        .with_interval(config.poll_interval_secs)
        .with_metric_key(config.queue_depth_metric.clone())
        .start();

    let app = api::create_router(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    info!(addr = %bind_addr, "Smart load balancer listening");

    axum::serve(listener, app).await.expect("Server error");
}
