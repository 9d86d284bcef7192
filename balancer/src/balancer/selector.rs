//! エンドポイント選択
//!
//! 負荷ベース（キュー深度最小）とラウンドロビンの2方式。
//! どちらの選択も失敗しない。最悪でも候補の先頭を返し、
//! 下流のエラーはプロキシ側で処理される。

use super::LoadCache;
use crate::registry::ModelRegistry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;
use vllm_lb_common::types::UNKNOWN_QUEUE_DEPTH;

/// キュー深度が最小のエンドポイントを選ぶセレクター
#[derive(Clone)]
pub struct LeastLoadedSelector {
    registry: ModelRegistry,
    cache: LoadCache,
}

impl LeastLoadedSelector {
    /// セレクターを作成
    pub fn new(registry: ModelRegistry, cache: LoadCache) -> Self {
        Self { registry, cache }
    }

    /// 候補のうちキュー深度が最小のエンドポイントを返す
    ///
    /// 同値の場合はレジストリ順で先のものを維持する。全候補が未観測
    /// （`+∞`）でも先頭候補を返し、選択自体は決して失敗しない。
    pub async fn select(&self, model: Option<&str>) -> String {
        let candidates = self.registry.candidates(model);
        let samples = self.cache.snapshot().await;

        let mut best = &candidates[0];
        let mut min_depth = UNKNOWN_QUEUE_DEPTH;

        for candidate in candidates {
            let depth = samples
                .get(candidate)
                .map(|s| s.queue_depth)
                .unwrap_or(UNKNOWN_QUEUE_DEPTH);
            if depth < min_depth {
                min_depth = depth;
                best = candidate;
            }
        }

        debug!(
            model = model.unwrap_or("-"),
            endpoint = %best,
            queue_depth = min_depth,
            "Selected least-loaded endpoint"
        );
        best.clone()
    }
}

struct RoundRobinInner {
    registry: ModelRegistry,
    /// モデルごとのカーソル（起動時に固定されるキー集合）
    model_cursors: HashMap<String, AtomicUsize>,
    /// 未登録モデル・モデル指定なし用のグローバルカーソル
    global_cursor: AtomicUsize,
}

/// ラウンドロビンでエンドポイントを選ぶセレクター（ベースライン）
///
/// テレメトリを一切参照せず、登録済みモデルはそのレプリカ群を、
/// それ以外は全エンドポイントをレジストリ順に巡回する。
#[derive(Clone)]
pub struct RoundRobinSelector {
    inner: Arc<RoundRobinInner>,
}

impl RoundRobinSelector {
    /// セレクターを作成
    pub fn new(registry: ModelRegistry) -> Self {
        let model_cursors = registry
            .models()
            .map(|(model, _)| (model.clone(), AtomicUsize::new(0)))
            .collect();
        Self {
            inner: Arc::new(RoundRobinInner {
                registry,
                model_cursors,
                global_cursor: AtomicUsize::new(0),
            }),
        }
    }

    /// 次のエンドポイントを返す
    ///
    /// カーソルは選択1回につきちょうど1回だけ進む。
    pub fn select(&self, model: Option<&str>) -> String {
        let cursor = model
            .and_then(|m| self.inner.model_cursors.get(m))
            .unwrap_or(&self.inner.global_cursor);
        let candidates = self.inner.registry.candidates(model);
        let index = cursor.fetch_add(1, Ordering::Relaxed) % candidates.len();

        let endpoint = &candidates[index];
        debug!(
            model = model.unwrap_or("-"),
            endpoint = %endpoint,
            "Selected endpoint (round-robin)"
        );
        endpoint.clone()
    }
}

/// バリアント非依存のセレクター
#[derive(Clone)]
pub enum Selector {
    /// 負荷ベース（アダプティブバリアント）
    LeastLoaded(LeastLoadedSelector),
    /// ラウンドロビン（ベースラインバリアント）
    RoundRobin(RoundRobinSelector),
}

impl Selector {
    /// リクエストの転送先エンドポイントを1つ選ぶ
    pub async fn select(&self, model: Option<&str>) -> String {
        match self {
            Selector::LeastLoaded(selector) => selector.select(model).await,
            Selector::RoundRobin(selector) => selector.select(model),
        }
    }

    /// アダプティブバリアントかどうか
    pub fn is_adaptive(&self) -> bool {
        matches!(self, Selector::LeastLoaded(_))
    }
}
