//! Simple Load Balancer エントリポイント（ラウンドロビンベースライン）
//!
//! テレメトリを使わず、レジストリ順の巡回だけでルーティングする比較用バリアント。

use tracing::info;
use tracing_subscriber::EnvFilter;
use vllm_lb_balancer::{api, AppState};
use vllm_lb_common::config::LbConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Simple Round-Robin Load Balancer v{}", env!("CARGO_PKG_VERSION"));

    let config = LbConfig::from_env().expect("Failed to load configuration");

    info!(
        endpoints = ?config.endpoints,
        models = config.model_map.len(),
        "Configuration loaded"
    );

    let state = AppState::round_robin(&config);
    let app = api::create_router(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    info!(addr = %bind_addr, "Simple load balancer listening");

    axum::serve(listener, app).await.expect("Server error");
}
