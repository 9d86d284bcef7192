//! モデル→レプリカのレジストリ
//!
//! 起動時に設定から構築される静的なマッピング。実行時には変更されない。

use std::collections::HashMap;
use std::sync::Arc;
use vllm_lb_common::config::LbConfig;

struct RegistryInner {
    /// モデル名 → レプリカURL一覧（登録順を保持）
    models: HashMap<String, Vec<String>>,
    /// 全エンドポイントURL一覧（フォールバック用）
    endpoints: Vec<String>,
}

/// モデルレジストリ
///
/// モデル名から当該モデルを提供するレプリカ群を引く。
/// 未登録モデル・モデル指定なしの場合は全エンドポイントが候補になる。
#[derive(Clone)]
pub struct ModelRegistry {
    inner: Arc<RegistryInner>,
}

impl ModelRegistry {
    /// レジストリを作成
    pub fn new(endpoints: Vec<String>, models: HashMap<String, Vec<String>>) -> Self {
        Self {
            inner: Arc::new(RegistryInner { models, endpoints }),
        }
    }

    /// 設定からレジストリを構築
    pub fn from_config(config: &LbConfig) -> Self {
        Self::new(config.endpoints.clone(), config.model_map.clone())
    }

    /// リクエストの候補エンドポイント一覧を返す
    ///
    /// 登録済みモデルならそのレプリカ群、それ以外は全エンドポイント。
    pub fn candidates(&self, model: Option<&str>) -> &[String] {
        model
            .and_then(|m| self.inner.models.get(m))
            .filter(|replicas| !replicas.is_empty())
            .map(|replicas| replicas.as_slice())
            .unwrap_or(&self.inner.endpoints)
    }

    /// 全エンドポイント一覧を返す
    pub fn endpoints(&self) -> &[String] {
        &self.inner.endpoints
    }

    /// 登録済みモデルの一覧（モデル名、レプリカ群）を返す
    pub fn models(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.inner.models.iter()
    }

    /// 登録済みエンドポイント数を返す
    pub fn endpoint_count(&self) -> usize {
        self.inner.endpoints.len()
    }
}
