//! ヘルスチェックAPI

use crate::{balancer::Selector, AppState};
use axum::{extract::State, Json};
use serde_json::{json, Value};

/// GET /health - バランサー自身の稼働状況
///
/// アダプティブバリアントはロードキャッシュから集計したバックエンドの
/// 健全数を含める。ベースラインはテレメトリを持たないため固定値を返す。
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let total = state.registry.endpoint_count();

    match &state.selector {
        Selector::LeastLoaded(_) => {
            let healthy = state.load_cache.healthy_count().await;
            let status = if healthy > 0 { "healthy" } else { "unhealthy" };
            Json(json!({
                "status": status,
                "endpoints": total,
                "healthy_endpoints": healthy,
            }))
        }
        Selector::RoundRobin(_) => Json(json!({
            "status": "healthy",
            "endpoints": total,
        })),
    }
}
