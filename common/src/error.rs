//! エラー型定義
//!
//! 統一エラー型（thiserror使用）

use thiserror::Error;

/// 共通レイヤーのエラー型
#[derive(Debug, Error)]
pub enum CommonError {
    /// 設定エラー
    #[error("Configuration error: {0}")]
    Config(String),

    /// シリアライゼーションエラー
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// バランサーのエラー型
#[derive(Debug, Error)]
pub enum LbError {
    /// 共通レイヤーのエラー
    #[error(transparent)]
    Common(#[from] CommonError),

    /// 不正なリクエストボディ
    #[error("Invalid request body: {0}")]
    InvalidRequest(String),

    /// HTTPクライアントエラー
    #[error("HTTP client error: {0}")]
    Http(String),

    /// タイムアウト
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// 内部エラー
    #[error("Internal error: {0}")]
    Internal(String),
}

/// 共通レイヤーのResult型
pub type CommonResult<T> = Result<T, CommonError>;

/// バランサーのResult型
pub type LbResult<T> = Result<T, LbError>;
