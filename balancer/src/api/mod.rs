//! REST APIハンドラー
//!
//! OpenAI互換プロキシ、モデル一覧、ヘルスチェック、メトリクスAPI

pub mod error;
pub mod health;
pub mod metrics;
pub mod models;
pub mod proxy;

use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// APIルーターを作成
///
/// `/metrics`（ロードキャッシュのダンプ）はアダプティブバリアントのみ。
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/v1/chat/completions", post(proxy::chat_completions))
        .route("/v1/completions", post(proxy::completions))
        .route("/v1/models", get(models::list_models))
        .route("/health", get(health::health));

    if state.selector.is_adaptive() {
        router = router.route("/metrics", get(metrics::dump_load_cache));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
