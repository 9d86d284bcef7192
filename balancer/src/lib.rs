//! vLLM Load Balancer
//!
//! 複数のvLLMレプリカへOpenAI互換リクエストを分散するアダプティブルーター

#![warn(missing_docs)]

/// REST APIハンドラー
pub mod api;

/// ロードキャッシュとエンドポイント選択（負荷ベース、ラウンドロビン）
pub mod balancer;

/// テレメトリポーラー（バックグラウンドのメトリクススクレイプ）
pub mod poller;

/// モデル→レプリカのレジストリ
pub mod registry;

use balancer::{LeastLoadedSelector, LoadCache, RoundRobinSelector, Selector};
use registry::ModelRegistry;
use std::time::Duration;
use vllm_lb_common::config::LbConfig;

/// アプリケーション状態
#[derive(Clone)]
pub struct AppState {
    /// モデルレジストリ
    pub registry: ModelRegistry,
    /// ロードキャッシュ（ポーラーのみが書き込む）
    pub load_cache: LoadCache,
    /// エンドポイントセレクター
    pub selector: Selector,
    /// 上流転送用HTTPクライアント
    pub http_client: reqwest::Client,
}

impl AppState {
    /// アダプティブ（負荷ベース）バリアントの状態を構築
    pub fn adaptive(config: &LbConfig) -> Self {
        let registry = ModelRegistry::from_config(config);
        let load_cache = LoadCache::new();
        let selector =
            Selector::LeastLoaded(LeastLoadedSelector::new(registry.clone(), load_cache.clone()));
        Self {
            registry,
            load_cache,
            selector,
            http_client: build_http_client(config),
        }
    }

    /// ラウンドロビン（ベースライン）バリアントの状態を構築
    pub fn round_robin(config: &LbConfig) -> Self {
        let registry = ModelRegistry::from_config(config);
        let selector = Selector::RoundRobin(RoundRobinSelector::new(registry.clone()));
        Self {
            registry,
            load_cache: LoadCache::new(),
            selector,
            http_client: build_http_client(config),
        }
    }
}

/// 上流転送用のHTTPクライアントを構築
///
/// 生成完了まで数分かかるリクエストがあるためタイムアウトは長め。
fn build_http_client(config: &LbConfig) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.upstream_timeout_secs))
        .build()
        .expect("Failed to create HTTP client")
}
