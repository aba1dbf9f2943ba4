//! JSONファイルをストアとして使う
//!
//! 拡張機能のエクスポートと同じ形（URL → サイトレコード）の1ファイル。

use async_trait::async_trait;
use formfill_common::{Error, Result, Store, StoreBackend};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// ファイルが無ければ空のストア
    async fn read(&self) -> Result<Store> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(Store::new()),
            Ok(content) => Store::from_json(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Store::new()),
            Err(e) => Err(io_error("読込失敗", &self.path, e)),
        }
    }

    async fn write(&self, store: &Store) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error("ディレクトリ作成失敗", parent, e))?;
        }
        tokio::fs::write(&self.path, store.to_json_pretty()?)
            .await
            .map_err(|e| io_error("書込失敗", &self.path, e))?;
        log::debug!("ストアを書き込みました: {} ({}件)", self.path.display(), store.len());
        Ok(())
    }
}

// common はファイルを扱わないので、パスを含めた文字列で包む
fn io_error(context: &str, path: &Path, e: std::io::Error) -> Error {
    Error::Storage(format!("{}: {} ({})", context, path.display(), e))
}

#[async_trait(?Send)]
impl StoreBackend for JsonFileStore {
    async fn get_all(&self) -> Result<Store> {
        self.read().await
    }

    async fn get(&self, keys: &[&str]) -> Result<Store> {
        let all = self.read().await?;
        let mut found = Store::new();
        for key in keys {
            if let Some(value) = all.get_value(key) {
                found.insert_value(key, value.clone());
            }
        }
        Ok(found)
    }

    async fn set(&self, entries: Store) -> Result<()> {
        let mut all = self.read().await?;
        all.extend(entries);
        self.write(&all).await
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        let mut all = self.read().await?;
        for key in keys {
            all.remove(key);
        }
        self.write(&all).await
    }

    async fn clear(&self) -> Result<()> {
        self.write(&Store::new()).await
    }
}
