//! vLLM Load Balancer 共通クレート
//!
//! バランサーバイナリ間で共有する型・設定・エラー定義

#![warn(missing_docs)]

/// 設定管理（環境変数読み込み）
pub mod config;

/// エラー型定義
pub mod error;

/// 共通型定義
pub mod types;
