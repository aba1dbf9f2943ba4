//! 入力エンジンの設定

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// タイミングや表示の設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// 一括入力後、メニューを閉じるクリックを送るまでの待ち時間
    pub menu_close_delay_ms: u32,
    /// ボタン/ドロップダウンを隠すまでの待ち時間
    pub hide_delay_ms: u32,
    /// URL変化を検知してから再初期化するまでの待ち時間
    pub url_change_debounce_ms: u32,
    /// 入力欄からボタンまでの上方向オフセット
    pub button_offset_px: f64,
    pub button_label: String,
    pub dropdown_title: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            menu_close_delay_ms: 100,
            hide_delay_ms: 300,
            url_change_debounce_ms: 500,
            button_offset_px: 35.0,
            button_label: "📋 テストデータを入力".into(),
            dropdown_title: "読み込むテストデータを選択".into(),
        }
    }
}

impl EngineConfig {
    /// JSON文字列から読み込み（省略した項目はデフォルト値）
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timings() {
        let config = EngineConfig::default();
        assert_eq!(config.menu_close_delay_ms, 100);
        assert_eq!(config.hide_delay_ms, 300);
        assert_eq!(config.url_change_debounce_ms, 500);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{"hideDelayMs": 50}"#).expect("読込失敗");
        assert_eq!(config.hide_delay_ms, 50);
        assert_eq!(config.menu_close_delay_ms, 100);
        assert_eq!(config.dropdown_title, "読み込むテストデータを選択");
    }

    #[test]
    fn test_invalid_json() {
        assert!(EngineConfig::from_json("{").is_err());
    }
}
