//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Site not found: {0}")]
    SiteNotFound(String),

    #[error("Tag not found: {tag} ({url})")]
    TagNotFound { url: String, tag: String },

    #[error("Tag already exists: {tag} ({url})")]
    TagExists { url: String, tag: String },

    #[error("Invalid tag: {0}")]
    InvalidTag(String),

    #[error("Invalid import data: {0}")]
    InvalidImport(String),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
