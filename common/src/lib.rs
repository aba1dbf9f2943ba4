//! Form Fill Common Library
//!
//! ブラウザ拡張(WASM)とCLIで共有される型・照合ロジック・入力計画

pub mod types;
pub mod error;
pub mod config;
pub mod url_key;
pub mod element;
pub mod fill;
pub mod matcher;
pub mod store;

pub use types::{InputSnapshot, MatchCandidate, MatchType, SavedValue, SiteRecord, Store, TagEntry};
pub use error::{Error, Result};
pub use config::EngineConfig;
pub use url_key::{loose_key, strict_key};
pub use element::{should_collect, CollectCandidate, CollectMode, ElementKind};
pub use fill::{plan_fill, FillStep, FillValue, TargetInfo};
pub use matcher::{disambiguate_tags, find_matches, resolve};
pub use store::{MemoryStore, StoreBackend, StoreStats};
