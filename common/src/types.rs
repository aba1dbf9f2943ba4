//! 保存データの型定義
//!
//! ストレージ上のJSON形状をそのまま表す:
//! - InputSnapshot: 入力要素1つ分の保存時の状態
//! - SavedValue: スナップショット、または旧形式の文字列
//! - SiteRecord: タグ → スナップショット配列 + `_` 始まりのメタデータ
//! - Store: URL → SiteRecord（無関係なキーが混在してもよい）
//! - MatchCandidate: 照合結果（永続化しない）

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

pub const PAGE_TITLE_KEY: &str = "_pageTitle";
pub const SAVED_AT_KEY: &str = "_savedAt";
pub const LAST_UPDATED_KEY: &str = "_lastUpdated";

const TITLE_DISPLAY_CHARS: usize = 80;
const URL_DISPLAY_CHARS: usize = 50;

/// `_` で始まるキーはメタデータ（タグとして扱わない）
pub fn is_meta_key(key: &str) -> bool {
    key.starts_with('_')
}

/// 入力要素1つ分のスナップショット
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSnapshot {
    #[serde(default)]
    pub value: String,

    #[serde(rename = "type", default)]
    pub input_type: String,

    /// チェックボックス/ラジオのみ
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl InputSnapshot {
    pub fn text(value: impl Into<String>, input_type: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            input_type: input_type.into(),
            checked: None,
            name: None,
        }
    }

    pub fn toggle(
        value: impl Into<String>,
        input_type: impl Into<String>,
        checked: bool,
        name: Option<String>,
    ) -> Self {
        Self {
            value: value.into(),
            input_type: input_type.into(),
            checked: Some(checked),
            name,
        }
    }

    pub fn is_toggle(&self) -> bool {
        self.input_type.eq_ignore_ascii_case("checkbox") || self.input_type.eq_ignore_ascii_case("radio")
    }
}

/// 保存済みの1エントリ
///
/// 初期のバージョンは値の文字列だけを保存していたため、両方を受け付ける。
/// どちらでもない要素（null、数値の value など）も位置を保つため `Other` で残す。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SavedValue {
    Snapshot(InputSnapshot),
    Raw(String),
    Other(Value),
}

impl SavedValue {
    /// 書き込み用の文字列。プリミティブでないものは空文字列
    pub fn value(&self) -> Cow<'_, str> {
        match self {
            SavedValue::Snapshot(s) => Cow::Borrowed(&s.value),
            SavedValue::Raw(v) => Cow::Borrowed(v),
            SavedValue::Other(Value::Object(obj)) => obj.get("value").map(primitive_text).unwrap_or_default(),
            SavedValue::Other(other) => primitive_text(other),
        }
    }

    pub fn checked(&self) -> Option<bool> {
        match self {
            SavedValue::Snapshot(s) => s.checked,
            SavedValue::Raw(_) => None,
            SavedValue::Other(value) => value.get("checked").and_then(Value::as_bool),
        }
    }

    pub fn is_toggle(&self) -> bool {
        matches!(self, SavedValue::Snapshot(s) if s.is_toggle())
    }
}

impl From<InputSnapshot> for SavedValue {
    fn from(snapshot: InputSnapshot) -> Self {
        SavedValue::Snapshot(snapshot)
    }
}

fn primitive_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s),
        Value::Number(n) => Cow::Owned(n.to_string()),
        Value::Bool(b) => Cow::Owned(b.to_string()),
        _ => Cow::Borrowed(""),
    }
}

/// タグ1つ分のデータ（順序に意味がある）
pub type TagEntry = Vec<SavedValue>;

/// 配列なら要素ごとに読む。読めない要素があっても件数は変えない
fn parse_tag_entry(value: &Value) -> Option<TagEntry> {
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .map(|item| serde_json::from_value(item.clone()).unwrap_or_else(|_| SavedValue::Other(item.clone())))
            .collect(),
    )
}

/// URL単位の保存レコード
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteRecord(Map<String, Value>);

impl SiteRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// JSONオブジェクトのみレコードとして扱う
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_object().map(|map| Self(map.clone()))
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// タグ一覧（保存順）
    pub fn tags(&self) -> Vec<(&str, TagEntry)> {
        self.0
            .iter()
            .filter(|(key, _)| !is_meta_key(key))
            .filter_map(|(key, value)| parse_tag_entry(value).map(|entry| (key.as_str(), entry)))
            .collect()
    }

    pub fn tag_names(&self) -> Vec<&str> {
        self.tags().into_iter().map(|(name, _)| name).collect()
    }

    pub fn tag(&self, name: &str) -> Option<TagEntry> {
        if is_meta_key(name) {
            return None;
        }
        self.0.get(name).and_then(parse_tag_entry)
    }

    pub fn contains_tag(&self, name: &str) -> bool {
        self.tag(name).is_some()
    }

    pub fn tag_count(&self) -> usize {
        self.tags().len()
    }

    /// タグを丸ごと置き換える
    pub fn insert_tag(&mut self, name: &str, entry: &[SavedValue]) -> Result<()> {
        if name.trim().is_empty() || is_meta_key(name) {
            return Err(Error::InvalidTag(name.to_string()));
        }
        self.0.insert(name.to_string(), serde_json::to_value(entry)?);
        Ok(())
    }

    pub fn remove_tag(&mut self, name: &str) -> bool {
        if is_meta_key(name) {
            return false;
        }
        self.0.shift_remove(name).is_some()
    }

    pub fn page_title(&self) -> Option<&str> {
        self.0
            .get(PAGE_TITLE_KEY)
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
    }

    pub fn set_page_title(&mut self, title: &str) {
        self.0
            .insert(PAGE_TITLE_KEY.to_string(), Value::String(title.to_string()));
    }

    /// 保存日時を更新
    pub fn touch(&mut self, timestamp: &str) {
        self.0
            .insert(SAVED_AT_KEY.to_string(), Value::String(timestamp.to_string()));
        self.0
            .insert(LAST_UPDATED_KEY.to_string(), Value::String(timestamp.to_string()));
    }

    pub fn saved_at(&self) -> Option<&str> {
        self.0.get(SAVED_AT_KEY).and_then(Value::as_str)
    }

    pub fn last_updated(&self) -> Option<&str> {
        self.0
            .get(LAST_UPDATED_KEY)
            .and_then(Value::as_str)
            .or_else(|| self.saved_at())
    }

    /// テストデータらしい形状か（配列の中に value/type を持つオブジェクトがある）
    pub fn has_test_data(&self) -> bool {
        self.0.values().any(|value| {
            value.as_array().is_some_and(|items| {
                items.iter().any(|item| {
                    item.as_object()
                        .is_some_and(|obj| obj.contains_key("type") || obj.contains_key("value"))
                })
            })
        })
    }

    /// 表示用タイトル（ページタイトル優先）
    pub fn display_title(&self, url: &str) -> String {
        match self.page_title() {
            Some(title) => title.chars().take(TITLE_DISPLAY_CHARS).collect(),
            None => display_url(url),
        }
    }
}

/// 表示用URL（ホスト + パス）
pub fn display_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => format!("{}{}", parsed.host_str().unwrap_or(""), parsed.path()),
        Err(_) => {
            if url.chars().count() > URL_DISPLAY_CHARS {
                let head: String = url.chars().take(URL_DISPLAY_CHARS).collect();
                format!("{}...", head)
            } else {
                url.to_string()
            }
        }
    }
}

/// ストア全体（URL → レコード）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Store(Map<String, Value>);

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// JSON文字列から読み込み（トップレベルはオブジェクト必須）
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::InvalidImport(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.0)?)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.0.contains_key(url)
    }

    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert_value(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    pub fn record(&self, url: &str) -> Option<SiteRecord> {
        self.0.get(url).and_then(SiteRecord::from_value)
    }

    pub fn insert_record(&mut self, url: &str, record: SiteRecord) {
        self.0.insert(url.to_string(), record.into_value());
    }

    pub fn remove(&mut self, url: &str) -> Option<Value> {
        self.0.shift_remove(url)
    }

    pub fn extend(&mut self, other: Store) {
        self.0.extend(other.0);
    }

    /// オブジェクト値のエントリのみ（保存順）
    pub fn site_records(&self) -> impl Iterator<Item = (&str, SiteRecord)> {
        self.0
            .iter()
            .filter_map(|(url, value)| SiteRecord::from_value(value).map(|r| (url.as_str(), r)))
    }

    /// テストデータの形状を持つサイトだけを抜き出す
    pub fn test_data_sites(&self) -> Store {
        let mut filtered = Store::new();
        for (url, record) in self.site_records() {
            if record.has_test_data() {
                filtered.insert_record(url, record);
            }
        }
        filtered
    }
}

impl From<Map<String, Value>> for Store {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 照合の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Strict,
    Loose,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Strict => "strict",
            MatchType::Loose => "loose",
        }
    }

    /// 画面表示用ラベル
    pub fn label(&self) -> &'static str {
        match self {
            MatchType::Strict => "完全一致",
            MatchType::Loose => "部分一致",
        }
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 照合候補
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCandidate {
    pub tag: String,
    pub data: TagEntry,
    pub source_url: String,
    pub page_title: String,
    pub test_data_count: usize,
    pub count_difference: usize,
    pub match_type: MatchType,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_deserialize_missing_fields() {
        let snapshot: InputSnapshot = serde_json::from_str(r#"{"value": "abc"}"#).expect("デシリアライズ失敗");
        assert_eq!(snapshot.value, "abc");
        assert_eq!(snapshot.input_type, "");
        assert_eq!(snapshot.checked, None);
        assert_eq!(snapshot.name, None);
    }

    #[test]
    fn test_snapshot_serialize_omits_absent_fields() {
        let json = serde_json::to_string(&InputSnapshot::text("taro", "text")).expect("シリアライズ失敗");
        assert_eq!(json, r#"{"value":"taro","type":"text"}"#);

        let toggle = InputSnapshot::toggle("b", "checkbox", true, Some("opts".to_string()));
        let json = serde_json::to_string(&toggle).expect("シリアライズ失敗");
        assert!(json.contains("\"checked\":true"));
        assert!(json.contains("\"name\":\"opts\""));
    }

    #[test]
    fn test_saved_value_accepts_legacy_strings() {
        let entry: TagEntry =
            serde_json::from_value(json!(["plain", {"value": "x", "type": "email"}])).expect("デシリアライズ失敗");
        assert_eq!(entry[0], SavedValue::Raw("plain".to_string()));
        assert_eq!(entry[1].value(), "x");
        assert!(!entry[1].is_toggle());
    }

    #[test]
    fn test_saved_value_null_checked_is_none() {
        let value: SavedValue =
            serde_json::from_value(json!({"value": "a", "type": "checkbox", "checked": null, "name": null}))
                .expect("デシリアライズ失敗");
        assert!(value.is_toggle());
        assert_eq!(value.checked(), None);
    }

    #[test]
    fn test_site_record_skips_meta_and_non_arrays() {
        let record = SiteRecord::from_value(&json!({
            "_pageTitle": "注文フォーム",
            "_savedAt": "2025-01-18T00:00:00Z",
            "first": [{"value": "1", "type": "text"}],
            "flag": true,
            "second": ["raw"]
        }))
        .expect("オブジェクトのはず");

        assert_eq!(record.tag_names(), vec!["first", "second"]);
        assert_eq!(record.tag_count(), 2);
        assert_eq!(record.page_title(), Some("注文フォーム"));
        assert_eq!(record.last_updated(), Some("2025-01-18T00:00:00Z"));
        assert!(record.tag("_pageTitle").is_none());
        assert!(record.tag("flag").is_none());
    }

    #[test]
    fn test_tag_entry_keeps_unreadable_elements() {
        let record = SiteRecord::from_value(&json!({
            "t": [{"value": "a", "type": "text"}, null, "c"],
            "n": [{"value": 5, "type": "number"}]
        }))
        .expect("オブジェクトのはず");

        let entry = record.tag("t").expect("タグが残るはず");
        assert_eq!(entry.len(), 3);
        assert_eq!(entry[1], SavedValue::Other(Value::Null));
        assert_eq!(entry[1].value(), "");
        assert_eq!(entry[2].value(), "c");

        let numeric = record.tag("n").expect("タグが残るはず");
        assert_eq!(numeric.len(), 1);
        assert_eq!(numeric[0].value(), "5");
        assert_eq!(record.tag_names(), vec!["t", "n"]);
    }

    #[test]
    fn test_saved_value_batch_parse_accepts_mixed_elements() {
        let entry: TagEntry = serde_json::from_value(json!(["a", null, {"value": true, "checked": true}]))
            .expect("デシリアライズ失敗");
        assert_eq!(entry.len(), 3);
        assert_eq!(entry[2].value(), "true");
        assert_eq!(entry[2].checked(), Some(true));
    }

    #[test]
    fn test_site_record_insert_rejects_meta_key() {
        let mut record = SiteRecord::new();
        let result = record.insert_tag("_hidden", &[SavedValue::Raw("x".to_string())]);
        assert!(matches!(result, Err(Error::InvalidTag(_))));
        assert!(record.insert_tag("  ", &[]).is_err());
    }

    #[test]
    fn test_site_record_has_test_data() {
        let record = SiteRecord::from_value(&json!({"a": [{"value": "1"}]})).expect("オブジェクトのはず");
        assert!(record.has_test_data());

        let unrelated = SiteRecord::from_value(&json!({"theme": "dark", "ids": [1, 2]})).expect("オブジェクトのはず");
        assert!(!unrelated.has_test_data());
    }

    #[test]
    fn test_display_title_fallbacks() {
        let mut record = SiteRecord::new();
        assert_eq!(
            record.display_title("https://example.com/orders/new?x=1"),
            "example.com/orders/new"
        );

        record.set_page_title(&"あ".repeat(100));
        assert_eq!(record.display_title("https://example.com/").chars().count(), 80);

        let long = "x".repeat(60);
        assert_eq!(display_url(&long), format!("{}...", "x".repeat(50)));
    }

    #[test]
    fn test_store_from_json_requires_object() {
        assert!(Store::from_json(r#"{"https://a.test/": {}}"#).is_ok());
        let err = Store::from_json("[1, 2]").unwrap_err();
        assert!(matches!(err, Error::InvalidImport(_)));
        assert!(matches!(Store::from_json("{").unwrap_err(), Error::Json(_)));
    }

    #[test]
    fn test_store_test_data_sites_filters_unrelated_keys() {
        let store = Store::from(
            json!({
                "settings": {"theme": "dark"},
                "counter": 3,
                "https://example.com/form": {"t": [{"value": "v", "type": "text"}]}
            })
            .as_object()
            .cloned()
            .unwrap_or_default(),
        );

        assert_eq!(store.site_records().count(), 2);
        let filtered = store.test_data_sites();
        assert_eq!(filtered.len(), 1);
        assert!(filtered.contains("https://example.com/form"));
    }

    #[test]
    fn test_match_candidate_serialize_camel_case() {
        let candidate = MatchCandidate {
            tag: "t".to_string(),
            data: vec![],
            source_url: "https://example.com/".to_string(),
            page_title: "Example".to_string(),
            test_data_count: 0,
            count_difference: 2,
            match_type: MatchType::Loose,
        };
        let json = serde_json::to_string(&candidate).expect("シリアライズ失敗");
        assert!(json.contains("\"sourceUrl\":"));
        assert!(json.contains("\"testDataCount\":0"));
        assert!(json.contains("\"countDifference\":2"));
        assert!(json.contains("\"matchType\":\"loose\""));
    }
}
