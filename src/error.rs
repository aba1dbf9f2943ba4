use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormFillError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error(transparent)]
    Store(#[from] formfill_common::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("ストアファイルが見つかりません: {0}")]
    StoreFileNotFound(String),

    #[error("入力エラー: {0}")]
    Prompt(String),

    #[error("キャンセルしました")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, FormFillError>;
