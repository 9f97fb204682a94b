//! 配置模块，负责从JSON文件加载字段映射与自定义字段目录

use crate::condition::CustomFieldRecord;
use crate::resolver::{default_aliases, default_field_keys, BucketRules, FieldKeyRegistry};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// 配置加载错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("配置文件不存在: {0}")]
    Missing(String),
    #[error("无法读取配置文件 {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("无法解析JSON配置文件 {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 字段映射配置结构，所有字段均可省略
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// 后端字段名到UI字段名的映射
    pub field_keys: IndexMap<String, String>,
    /// 同一字段的历史拼写到规范后端字段名的映射
    pub aliases: HashMap<String, String>,
    pub custom_field_prefixes: Vec<String>,
    pub secondary_custom_field_prefixes: Vec<String>,
    pub attribute_keys: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        let rules = BucketRules::default();
        Self {
            field_keys: default_field_keys(),
            aliases: default_aliases(),
            custom_field_prefixes: rules.custom_field_prefixes,
            secondary_custom_field_prefixes: rules.secondary_custom_field_prefixes,
            attribute_keys: rules.attribute_keys,
        }
    }
}

impl RegistryConfig {
    /// 从JSON文件加载字段映射配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        read_json(path.as_ref())
    }

    /// 从JSON字符串加载
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|source| ConfigError::Parse {
            path: "<inline>".to_string(),
            source,
        })
    }

    /// 构建只读的字段映射快照
    pub fn into_registry(self) -> FieldKeyRegistry {
        let rules = BucketRules {
            custom_field_prefixes: self.custom_field_prefixes,
            secondary_custom_field_prefixes: self.secondary_custom_field_prefixes,
            attribute_keys: self.attribute_keys,
        };
        FieldKeyRegistry::new(self.field_keys, self.aliases, rules)
    }
}

/// 从JSON文件加载自定义字段目录（记录数组）
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Vec<CustomFieldRecord>, ConfigError> {
    read_json(path.as_ref())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    // 检查文件是否存在
    if !path.exists() {
        return Err(ConfigError::Missing(path.display().to_string()));
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}
