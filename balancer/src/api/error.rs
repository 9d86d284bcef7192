//! Axum用のエラーレスポンス型

use axum::{http::StatusCode, response::IntoResponse, Json};
use vllm_lb_common::error::LbError;

/// Axum用のエラーレスポンス型
///
/// プロキシの契約上、ボディ解析・転送のいずれの失敗も
/// 単一の500レスポンスとして呼び出し元へ返す。リトライはしない。
#[derive(Debug)]
pub struct AppError(pub LbError);

impl From<LbError> for AppError {
    fn from(err: LbError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}
