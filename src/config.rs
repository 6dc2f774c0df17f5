use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// easycron配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 关闭时使用内存存储替代持久化后端
    pub enable_storage: bool,
    pub storage_type: StorageType,
    pub data_source: DataSourceConfig,
    /// 调度池容量
    pub pool_size: usize,
    /// 关停时等待在途触发结束的秒数
    pub await_termination_seconds: u64,
    pub admin: AdminConfig,
}

/// 持久化后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceConfig {
    pub url: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    pub enabled: bool,
    pub bind_address: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            enable_storage: false,
            storage_type: StorageType::Sqlite,
            data_source: DataSourceConfig {
                url: "sqlite://easycron.db".to_string(),
                username: String::new(),
                password: String::new(),
            },
            pool_size: 8,
            await_termination_seconds: 60,
            admin: AdminConfig {
                enabled: true,
                bind_address: "0.0.0.0:8089".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// 加载配置：默认值 < TOML文件 < EASYCRON_*环境变量
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder()
            .set_default("enable_storage", false)?
            .set_default("storage_type", "sqlite")?
            .set_default("data_source.url", "sqlite://easycron.db")?
            .set_default("data_source.username", "")?
            .set_default("data_source.password", "")?
            .set_default("pool_size", 8)?
            .set_default("await_termination_seconds", 60)?
            .set_default("admin.enabled", true)?
            .set_default("admin.bind_address", "0.0.0.0:8089")?;

        if let Some(path) = config_path {
            if !Path::new(path).exists() {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        } else if Path::new("easycron.toml").exists() {
            builder = builder.add_source(File::new("easycron.toml", FileFormat::Toml));
        }

        builder = builder.add_source(Environment::with_prefix("EASYCRON").separator("__"));

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("解析配置失败")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(anyhow::anyhow!("pool_size必须大于0"));
        }
        if self.enable_storage && self.data_source.url.is_empty() {
            return Err(anyhow::anyhow!("启用持久化时必须配置data_source.url"));
        }
        if self.admin.enabled && self.admin.bind_address.is_empty() {
            return Err(anyhow::anyhow!("启用管理端时必须配置admin.bind_address"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(!config.enable_storage);
        assert_eq!(config.storage_type, StorageType::Sqlite);
        assert_eq!(config.pool_size, 8);
        assert_eq!(config.await_termination_seconds, 60);
        assert!(config.admin.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.pool_size, 8);
        assert_eq!(config.storage_type, StorageType::Sqlite);
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(AppConfig::load(Some("/不存在/easycron.toml")).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_pool() {
        let mut config = AppConfig::default();
        config.pool_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_storage_without_url() {
        let mut config = AppConfig::default();
        config.enable_storage = true;
        config.data_source.url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_storage_type_serde_names() {
        assert_eq!(
            serde_json::to_string(&StorageType::Postgres).unwrap(),
            "\"postgres\""
        );
        let parsed: StorageType = serde_json::from_str("\"sqlite\"").unwrap();
        assert_eq!(parsed, StorageType::Sqlite);
    }
}
