//! 設定管理
//!
//! バランサー設定の環境変数読み込み

use crate::error::{CommonError, CommonResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// load balancer設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LbConfig {
    /// ホストアドレス (デフォルト: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// ポート番号 (デフォルト: 8000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// バックエンドのベースURL一覧（登録順を保持）
    #[serde(default)]
    pub endpoints: Vec<String>,

    /// モデル名 → レプリカURL一覧のマッピング
    #[serde(default)]
    pub model_map: HashMap<String, Vec<String>>,

    /// メトリクスポーリング間隔（秒）(デフォルト: 1)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// キュー深度として抽出するメトリクスキー
    /// (デフォルト: "vllm:num_requests_waiting")
    #[serde(default = "default_queue_depth_metric")]
    pub queue_depth_metric: String,

    /// 上流転送のタイムアウト（秒）(デフォルト: 300)
    ///
    /// 長い生成ではレスポンス完了まで数分かかるため余裕を持たせる。
    #[serde(default = "default_upstream_timeout")]
    pub upstream_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_poll_interval() -> u64 {
    1
}

fn default_queue_depth_metric() -> String {
    "vllm:num_requests_waiting".to_string()
}

fn default_upstream_timeout() -> u64 {
    300
}

impl Default for LbConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            endpoints: Vec::new(),
            model_map: HashMap::new(),
            poll_interval_secs: default_poll_interval(),
            queue_depth_metric: default_queue_depth_metric(),
            upstream_timeout_secs: default_upstream_timeout(),
        }
    }
}

impl LbConfig {
    /// 環境変数から設定を読み込む
    ///
    /// - `VLLM_ENDPOINTS`: カンマ区切りのバックエンドURL一覧（必須）
    /// - `VLLM_MODEL_MAP`: `model=url1|url2;model2=url3` 形式のレプリカマップ
    /// - `METRICS_POLL_INTERVAL`: ポーリング間隔（秒）
    /// - `QUEUE_DEPTH_METRIC`: 抽出するメトリクスキー
    /// - `UPSTREAM_TIMEOUT_SECS`: 上流転送タイムアウト（秒）
    /// - `LB_HOST` / `LB_PORT`: バインドアドレス
    pub fn from_env() -> CommonResult<Self> {
        let endpoints = parse_endpoints(
            &std::env::var("VLLM_ENDPOINTS")
                .map_err(|_| CommonError::Config("VLLM_ENDPOINTS is not set".to_string()))?,
        );
        if endpoints.is_empty() {
            return Err(CommonError::Config(
                "VLLM_ENDPOINTS contains no endpoints".to_string(),
            ));
        }

        let model_map = match std::env::var("VLLM_MODEL_MAP") {
            Ok(raw) => parse_model_map(&raw)?,
            Err(_) => HashMap::new(),
        };

        Ok(Self {
            host: std::env::var("LB_HOST").unwrap_or_else(|_| default_host()),
            port: env_parse("LB_PORT", default_port()),
            endpoints,
            model_map,
            poll_interval_secs: env_parse("METRICS_POLL_INTERVAL", default_poll_interval()),
            queue_depth_metric: std::env::var("QUEUE_DEPTH_METRIC")
                .unwrap_or_else(|_| default_queue_depth_metric()),
            upstream_timeout_secs: env_parse("UPSTREAM_TIMEOUT_SECS", default_upstream_timeout()),
        })
    }

    /// バインドアドレスを返す
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// カンマ区切りのURL一覧をパースする
///
/// 空要素はスキップし、末尾のスラッシュは除去する。
pub fn parse_endpoints(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/'))
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// `model=url1|url2;model2=url3` 形式のレプリカマップをパースする
pub fn parse_model_map(raw: &str) -> CommonResult<HashMap<String, Vec<String>>> {
    let mut map = HashMap::new();
    for entry in raw.split(';') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (model, urls) = entry.split_once('=').ok_or_else(|| {
            CommonError::Config(format!("Invalid model map entry: {}", entry))
        })?;
        let model = model.trim();
        if model.is_empty() {
            return Err(CommonError::Config(format!(
                "Empty model name in entry: {}",
                entry
            )));
        }
        let replicas: Vec<String> = urls
            .split('|')
            .map(|s| s.trim().trim_end_matches('/'))
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        if replicas.is_empty() {
            return Err(CommonError::Config(format!(
                "No replicas for model: {}",
                model
            )));
        }
        map.insert(model.to_string(), replicas);
    }
    Ok(map)
}
