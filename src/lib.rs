//! Form Fill CLI
//!
//! 拡張機能のストアをエクスポートしたJSONファイルを対象に、照合・一覧・削除・複製・
//! インポート/エクスポートを行う。

pub mod cli;
pub mod config;
pub mod error;
pub mod file_store;
pub mod report;
