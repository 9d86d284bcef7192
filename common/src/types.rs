//! 共通型定義
//!
//! LoadSample等のコアデータ型

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// スクレイプ失敗・未観測を表すキュー深度のセンチネル値
pub const UNKNOWN_QUEUE_DEPTH: f64 = f64::INFINITY;

/// エンドポイント1台分の最新負荷観測値
///
/// ポーラーが定期的に上書きする。履歴は保持しない。
/// `queue_depth` が `+∞` であることと直近スクレイプの失敗は等価。
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LoadSample {
    /// エンドポイントのベースURL
    pub endpoint: String,
    /// 待機中リクエスト数（未観測・失敗時は `+∞`）
    #[serde(serialize_with = "serialize_queue_depth")]
    pub queue_depth: f64,
    /// 直近スクレイプが成功したか
    pub healthy: bool,
    /// 観測時刻
    pub timestamp: DateTime<Utc>,
}

impl LoadSample {
    /// スクレイプ成功時のサンプルを作成
    pub fn reachable(endpoint: impl Into<String>, queue_depth: f64) -> Self {
        Self {
            endpoint: endpoint.into(),
            queue_depth,
            healthy: true,
            timestamp: Utc::now(),
        }
    }

    /// スクレイプ失敗・不正ペイロード時のサンプルを作成
    pub fn unreachable(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            queue_depth: UNKNOWN_QUEUE_DEPTH,
            healthy: false,
            timestamp: Utc::now(),
        }
    }
}

/// JSONにInfinityは存在しないため、非有限値はnullとして出力する
fn serialize_queue_depth<S>(depth: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if depth.is_finite() {
        serializer.serialize_f64(*depth)
    } else {
        serializer.serialize_none()
    }
}
