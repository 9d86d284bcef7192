//! ロードキャッシュのダンプAPI（アダプティブバリアントのみ）

use crate::AppState;
use axum::{extract::State, Json};
use std::collections::HashMap;
use vllm_lb_common::types::LoadSample;

/// GET /metrics - 現在のロードキャッシュをエンドポイント別にダンプ
pub async fn dump_load_cache(State(state): State<AppState>) -> Json<HashMap<String, LoadSample>> {
    Json(state.load_cache.snapshot().await)
}
