//! モデル一覧API

use crate::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};

/// GET /v1/models - 登録済みモデル一覧（OpenAI互換 + レプリカ数）
pub async fn list_models(State(state): State<AppState>) -> Json<Value> {
    let mut data: Vec<(String, usize)> = state
        .registry
        .models()
        .map(|(model, replicas)| (model.clone(), replicas.len()))
        .collect();
    // HashMap順は不定なのでモデルIDでソートして決定的にする
    data.sort();

    let data: Vec<Value> = data
        .into_iter()
        .map(|(model, replicas)| {
            json!({
                "id": model,
                "object": "model",
                "replicas": replicas,
            })
        })
        .collect();

    Json(json!({
        "object": "list",
        "data": data,
    }))
}
