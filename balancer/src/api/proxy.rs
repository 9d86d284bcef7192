//! OpenAI互換プロキシ APIハンドラー
//!
//! 受信ボディからモデル名とストリーミングフラグだけを読み、
//! それ以外のフィールドは無変更でバックエンドへ中継する。

use crate::{api::error::AppError, AppState};
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::TryStreamExt;
use serde_json::Value;
use std::io;
use tracing::{error, info};
use uuid::Uuid;
use vllm_lb_common::error::LbError;

/// POST /v1/chat/completions - チャット補完プロキシ
pub async fn chat_completions(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    proxy_request(&state, "/v1/chat/completions", &headers, &body).await
}

/// POST /v1/completions - 補完プロキシ
pub async fn completions(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    proxy_request(&state, "/v1/completions", &headers, &body).await
}

/// リクエストを選択したバックエンドへ転送する
///
/// ボディ解析・転送のどの段階で失敗しても500で返し、リトライはしない。
/// 再ルーティングすると非冪等な生成リクエストを二重実行しかねないため。
async fn proxy_request(
    state: &AppState,
    path: &str,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Response, AppError> {
    let payload: Value = serde_json::from_slice(body)
        .map_err(|e| LbError::InvalidRequest(format!("Failed to parse request body: {}", e)))?;
    let model = extract_model(&payload);
    let stream = extract_stream(&payload);

    let endpoint = state.selector.select(model.as_deref()).await;
    let request_id = Uuid::new_v4();

    info!(
        %request_id,
        model = model.as_deref().unwrap_or("-"),
        endpoint = %endpoint,
        path = %path,
        stream,
        "Proxying request"
    );

    let mut request = state.http_client.post(format!("{}{}", endpoint, path));
    for (name, value) in headers {
        if is_forwardable(name) {
            request = request.header(name.as_str(), value.as_bytes());
        }
    }

    let response = request.json(&payload).send().await.map_err(|e| {
        error!(%request_id, endpoint = %endpoint, error = %e, "Proxy request failed");
        if e.is_timeout() {
            LbError::Timeout(format!("Request to {} timed out", endpoint))
        } else {
            LbError::Http(format!("Failed to forward request to {}: {}", endpoint, e))
        }
    })?;

    if stream {
        Ok(forward_streaming_response(response))
    } else {
        Ok(forward_json_response(response).await?)
    }
}

/// バックエンドのレスポンスボディをそのままチャンク単位で中継する
///
/// 全体をバッファせず、ステータスコードとcontent-typeを維持する。
/// クライアント切断時はボディストリームごと破棄され、上流接続も解放される。
fn forward_streaming_response(response: reqwest::Response) -> Response {
    let status = StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::OK);
    let headers = response.headers().clone();
    let stream = response.bytes_stream().map_err(io::Error::other);

    let mut relayed = Response::new(Body::from_stream(stream));
    *relayed.status_mut() = status;
    for (name, value) in headers.iter() {
        if name == reqwest::header::TRANSFER_ENCODING
            || name == reqwest::header::CONTENT_LENGTH
            || name == reqwest::header::CONNECTION
        {
            continue;
        }
        if let (Ok(header_name), Ok(header_value)) = (
            HeaderName::from_bytes(name.as_str().as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            relayed.headers_mut().insert(header_name, header_value);
        }
    }
    relayed
}

/// バックエンドのJSONレスポンスをステータスごと中継する
async fn forward_json_response(response: reqwest::Response) -> Result<Response, LbError> {
    let status = StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::OK);
    let body: Value = response
        .json()
        .await
        .map_err(|e| LbError::Http(format!("Failed to read backend response: {}", e)))?;
    Ok((status, Json(body)).into_response())
}

/// 転送してよいリクエストヘッダーか
///
/// host/content-lengthは転送先で再計算される。content-typeは
/// ボディ再シリアライズ時にクライアント側が設定する。
fn is_forwardable(name: &HeaderName) -> bool {
    name != header::HOST && name != header::CONTENT_LENGTH && name != header::CONTENT_TYPE
}

fn extract_model(payload: &Value) -> Option<String> {
    payload
        .get("model")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn extract_stream(payload: &Value) -> bool {
    payload
        .get("stream")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}
