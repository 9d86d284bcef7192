//! ロードバランサーモジュール
//!
//! エンドポイントの負荷観測値を集約し、負荷ベース・ラウンドロビンの
//! エンドポイント選択を提供する。

pub mod selector;

pub use selector::{LeastLoadedSelector, RoundRobinSelector, Selector};

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use vllm_lb_common::types::{LoadSample, UNKNOWN_QUEUE_DEPTH};

/// ロードキャッシュ
///
/// エンドポイントURL → 最新のLoadSampleの共有マップ。
/// ポーラーのみが書き込み、セレクターとAPIハンドラーが読み取る。
/// 書き込みは常にサンプル全体の置換であり、部分更新は行わない。
#[derive(Clone, Default)]
pub struct LoadCache {
    samples: Arc<RwLock<HashMap<String, LoadSample>>>,
}

impl LoadCache {
    /// 空のキャッシュを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// サンプルを丸ごと置き換えて保存
    pub async fn store(&self, sample: LoadSample) {
        let mut samples = self.samples.write().await;
        samples.insert(sample.endpoint.clone(), sample);
    }

    /// エンドポイントの最新サンプルを取得
    pub async fn get(&self, endpoint: &str) -> Option<LoadSample> {
        let samples = self.samples.read().await;
        samples.get(endpoint).cloned()
    }

    /// エンドポイントのキュー深度を取得（未観測は `+∞`）
    pub async fn queue_depth(&self, endpoint: &str) -> f64 {
        let samples = self.samples.read().await;
        samples
            .get(endpoint)
            .map(|s| s.queue_depth)
            .unwrap_or(UNKNOWN_QUEUE_DEPTH)
    }

    /// 全サンプルのスナップショットを取得
    pub async fn snapshot(&self) -> HashMap<String, LoadSample> {
        let samples = self.samples.read().await;
        samples.clone()
    }

    /// 直近スクレイプが成功したエンドポイント数を返す
    pub async fn healthy_count(&self) -> usize {
        let samples = self.samples.read().await;
        samples.values().filter(|s| s.healthy).count()
    }
}
