//! 契約テスト用の共通ヘルパー

use std::collections::HashMap;
use vllm_lb_common::config::LbConfig;

/// テスト用の設定を作成
pub fn test_config(
    endpoints: Vec<String>,
    model_map: HashMap<String, Vec<String>>,
) -> LbConfig {
    LbConfig {
        endpoints,
        model_map,
        ..LbConfig::default()
    }
}

/// 単一モデルのレプリカマップを作成
pub fn single_model_map(model: &str, replicas: &[String]) -> HashMap<String, Vec<String>> {
    let mut map = HashMap::new();
    map.insert(model.to_string(), replicas.to_vec());
    map
}
