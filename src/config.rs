use crate::error::{FormFillError, Result};
use formfill_common::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// ストアファイルの場所を上書きする環境変数
pub const STORE_ENV: &str = "FORMFILL_STORE";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// ストアファイル（未設定なら設定ディレクトリの store.json）
    pub store_path: Option<PathBuf>,
    /// 拡張機能へ渡すエンジン設定
    pub engine: EngineConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| FormFillError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("formfill"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// 使用するストアファイル
    ///
    /// 優先順位: 引数 > 環境変数 > 設定ファイル > デフォルト
    pub fn resolve_store_path(&self, arg: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = arg {
            return Ok(path.to_path_buf());
        }
        if let Ok(path) = std::env::var(STORE_ENV) {
            if !path.trim().is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
        if let Some(path) = &self.store_path {
            return Ok(path.clone());
        }
        Ok(Self::config_dir()?.join("store.json"))
    }

    pub fn set_store_path(&mut self, path: PathBuf) -> Result<()> {
        self.store_path = Some(path);
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_wins_over_config() {
        let config = Config {
            store_path: Some(PathBuf::from("/from/config.json")),
            ..Default::default()
        };
        let path = config
            .resolve_store_path(Some(Path::new("/from/arg.json")))
            .expect("解決失敗");
        assert_eq!(path, PathBuf::from("/from/arg.json"));
    }

    #[test]
    fn test_partial_config_file_keeps_engine_defaults() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"storePath": "/tmp/store.json"}"#).expect("書込失敗");

        let config = Config::load_from(&path).expect("読込失敗");
        assert_eq!(config.store_path, Some(PathBuf::from("/tmp/store.json")));
        assert_eq!(config.engine, EngineConfig::default());
    }
}
