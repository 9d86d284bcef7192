//! テレメトリポーラー
//!
//! 各バックエンドのPrometheus形式 `/metrics` を定期的にスクレイプし、
//! キュー深度をロードキャッシュへ書き込む。

use crate::balancer::LoadCache;
use crate::registry::ModelRegistry;
use reqwest::Client;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, error, info, warn};
use vllm_lb_common::types::LoadSample;

/// スクレイプのタイムアウト（秒）。ポーリング間隔とは独立。
const SCRAPE_TIMEOUT_SECS: u64 = 5;

/// デフォルトのポーリング間隔（秒）
const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;

/// デフォルトのキュー深度メトリクスキー（vLLMの公開形式）
const DEFAULT_QUEUE_DEPTH_METRIC: &str = "vllm:num_requests_waiting";

/// テレメトリポーラー
///
/// 起動後はプロセス終了まで走り続ける。1台のスクレイプ失敗は
/// 他のエンドポイントにもループ自体にも影響しない。
#[derive(Clone)]
pub struct TelemetryPoller {
    /// モデルレジストリ（スクレイプ対象の全エンドポイント）
    registry: ModelRegistry,
    /// 書き込み先のロードキャッシュ
    cache: LoadCache,
    /// HTTPクライアント
    client: Client,
    /// ポーリング間隔（秒）
    poll_interval_secs: u64,
    /// 抽出するメトリクスキー
    queue_depth_metric: String,
}

impl TelemetryPoller {
    /// 新しいポーラーを作成
    pub fn new(registry: ModelRegistry, cache: LoadCache) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(SCRAPE_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            registry,
            cache,
            client,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            queue_depth_metric: DEFAULT_QUEUE_DEPTH_METRIC.to_string(),
        }
    }

    /// ポーリング間隔を設定
    pub fn with_interval(mut self, interval_secs: u64) -> Self {
        self.poll_interval_secs = interval_secs.max(1);
        self
    }

    /// 抽出するメトリクスキーを設定
    pub fn with_metric_key(mut self, key: impl Into<String>) -> Self {
        self.queue_depth_metric = key.into();
        self
    }

    /// バックグラウンドでポーリングを開始
    pub fn start(self) {
        tokio::spawn(async move {
            self.monitor_loop().await;
        });
    }

    /// ポーリングループ
    async fn monitor_loop(&self) {
        let mut timer = interval(Duration::from_secs(self.poll_interval_secs));

        info!(
            interval_secs = self.poll_interval_secs,
            metric = %self.queue_depth_metric,
            endpoints = self.registry.endpoint_count(),
            "Telemetry poller started"
        );

        loop {
            timer.tick().await;
            self.poll_once().await;
        }
    }

    /// 全エンドポイントを1回並列スクレイプし、結果をキャッシュへ反映する
    pub async fn poll_once(&self) {
        let endpoints = self.registry.endpoints().to_vec();
        let mut handles = Vec::with_capacity(endpoints.len());

        for endpoint in endpoints {
            let poller = self.clone();
            handles.push(tokio::spawn(async move {
                poller.scrape_endpoint(&endpoint).await
            }));
        }

        for handle in handles {
            match handle.await {
                Ok(sample) => self.cache.store(sample).await,
                Err(e) => error!(error = %e, "Scrape task panicked"),
            }
        }
    }

    /// 1エンドポイントをスクレイプしてサンプルを作る
    ///
    /// 失敗・不正ペイロードはすべて unhealthy サンプルに変換され、
    /// エラーとしては伝播しない。
    async fn scrape_endpoint(&self, endpoint: &str) -> LoadSample {
        let url = format!("{}/metrics", endpoint);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "Failed to fetch metrics");
                return LoadSample::unreachable(endpoint);
            }
        };

        if !response.status().is_success() {
            warn!(
                endpoint = %endpoint,
                status = %response.status(),
                "Metrics endpoint returned non-success status"
            );
            return LoadSample::unreachable(endpoint);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "Failed to read metrics body");
                return LoadSample::unreachable(endpoint);
            }
        };

        match parse_queue_depth(&body, &self.queue_depth_metric) {
            Some(depth) => {
                debug!(endpoint = %endpoint, queue_depth = depth, "Scraped queue depth");
                LoadSample::reachable(endpoint, depth)
            }
            None => {
                warn!(
                    endpoint = %endpoint,
                    metric = %self.queue_depth_metric,
                    "Queue depth metric missing or malformed"
                );
                LoadSample::unreachable(endpoint)
            }
        }
    }
}

/// Prometheus形式のテキストからキュー深度を抽出する
///
/// コメント行（`#`始まり）を無視し、キーを含む行の末尾トークンを
/// 数値として読む。複数行が一致した場合は最後に解釈できた値を採用する。
/// 負値・非有限値はキュー深度として不正なので読み飛ばす。
fn parse_queue_depth(text: &str, key: &str) -> Option<f64> {
    let mut depth = None;

    for line in text.lines() {
        if line.starts_with('#') || !line.contains(key) {
            continue;
        }
        if let Some(token) = line.split_whitespace().last() {
            if let Ok(value) = token.parse::<f64>() {
                if value.is_finite() && value >= 0.0 {
                    depth = Some(value);
                }
            }
        }
    }

    depth
}
