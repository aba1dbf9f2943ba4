//! 入力計画モジュール
//!
//! 保存済みスナップショットと、現在のページで収集した入力先の対応付けを決める。
//! DOMへの書き込み自体は WASM 側が行う。
//!
//! - キー照合モード: トグル以外は順番どおり、トグルは type/value/name で探す
//! - 旧形式モード: 全要素を順番どおりに対応付ける（生文字列や checked 無しのトグルを含む場合）
//!
//! どちらのモードでも、数が合わない場合は重なる先頭部分だけを入力する。

use crate::element::ElementKind;
use crate::types::SavedValue;
use regex::Regex;

/// 書き込む値
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillValue {
    pub value: String,
    pub checked: Option<bool>,
}

impl FillValue {
    /// 空値、非プリミティブ、その文字列化（"[object Object]" など）は None
    pub fn from_saved(saved: &SavedValue) -> Option<Self> {
        let value = saved.value();
        if !is_fillable_value(&value) {
            log::debug!("書き込めない値をスキップ: {:?}", value);
            return None;
        }
        Some(Self {
            value: value.to_string(),
            checked: saved.checked(),
        })
    }
}

/// ページに書き込んでよい値か
pub fn is_fillable_value(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }

    lazy_static::lazy_static! {
        static ref SENTINEL_RE: Regex = Regex::new(r"^(undefined|null|\[object [A-Za-z]+\])$").unwrap();
    }

    !SENTINEL_RE.is_match(value)
}

/// 入力先要素の情報
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetInfo {
    pub kind: ElementKind,
    pub value: String,
    pub name: Option<String>,
}

/// 入力手順1つ分
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillStep {
    /// 収集済み要素列のインデックス
    pub index: usize,
    pub value: FillValue,
}

/// 対応付けの方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Keyed,
    Legacy,
}

impl Alignment {
    pub fn of(snapshots: &[SavedValue]) -> Self {
        let legacy = snapshots.iter().any(|saved| match saved {
            SavedValue::Raw(_) => true,
            SavedValue::Snapshot(s) => s.is_toggle() && s.checked.is_none(),
            SavedValue::Other(_) => false,
        });
        if legacy {
            Alignment::Legacy
        } else {
            Alignment::Keyed
        }
    }
}

/// スナップショット列を入力先に対応付ける
pub fn plan_fill(snapshots: &[SavedValue], targets: &[TargetInfo]) -> Vec<FillStep> {
    if snapshots.len() != targets.len() {
        log::debug!(
            "スナップショット数 {} と入力先数 {} が一致しません",
            snapshots.len(),
            targets.len()
        );
    }

    match Alignment::of(snapshots) {
        Alignment::Legacy => plan_positional(snapshots, targets),
        Alignment::Keyed => plan_keyed(snapshots, targets),
    }
}

fn plan_positional(snapshots: &[SavedValue], targets: &[TargetInfo]) -> Vec<FillStep> {
    snapshots
        .iter()
        .zip(0..targets.len())
        .filter_map(|(saved, index)| FillValue::from_saved(saved).map(|value| FillStep { index, value }))
        .collect()
}

fn plan_keyed(snapshots: &[SavedValue], targets: &[TargetInfo]) -> Vec<FillStep> {
    let mut positional = targets
        .iter()
        .enumerate()
        .filter(|(_, target)| !target.kind.is_toggle())
        .map(|(index, _)| index);
    let mut used = vec![false; targets.len()];
    let mut steps = Vec::new();

    for saved in snapshots {
        let index = match saved {
            SavedValue::Snapshot(snapshot) if snapshot.is_toggle() => {
                let kind = ElementKind::from_snapshot_type(&snapshot.input_type);
                let found = targets.iter().enumerate().position(|(i, target)| {
                    !used[i]
                        && target.kind == kind
                        && target.value == snapshot.value
                        && snapshot
                            .name
                            .as_deref()
                            .map_or(true, |name| target.name.as_deref() == Some(name))
                });
                if found.is_none() {
                    log::debug!("一致するトグルがありません: {} ({})", snapshot.value, snapshot.input_type);
                }
                found
            }
            // 読めない要素も入力先を1つ消費して位置を保つ
            _ => positional.next(),
        };

        let Some(index) = index else {
            continue;
        };
        used[index] = true;

        if let Some(value) = FillValue::from_saved(saved) {
            steps.push(FillStep { index, value });
        }
    }

    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InputSnapshot;

    fn text_target() -> TargetInfo {
        TargetInfo {
            kind: ElementKind::Text,
            ..Default::default()
        }
    }

    fn checkbox(value: &str, name: &str) -> TargetInfo {
        TargetInfo {
            kind: ElementKind::Checkbox,
            value: value.to_string(),
            name: Some(name.to_string()),
        }
    }

    fn radio(value: &str, name: &str) -> TargetInfo {
        TargetInfo {
            kind: ElementKind::Radio,
            value: value.to_string(),
            name: Some(name.to_string()),
        }
    }

    #[test]
    fn test_sentinel_values_are_not_fillable() {
        assert!(!is_fillable_value(""));
        assert!(!is_fillable_value("undefined"));
        assert!(!is_fillable_value("[object Object]"));
        assert!(!is_fillable_value("[object HTMLInputElement]"));
        assert!(is_fillable_value("Object storage"));
        assert!(is_fillable_value("0"));
    }

    #[test]
    fn test_alignment_detection() {
        let keyed = vec![
            InputSnapshot::text("a", "text").into(),
            InputSnapshot::toggle("b", "checkbox", true, None).into(),
        ];
        assert_eq!(Alignment::of(&keyed), Alignment::Keyed);

        let raw = vec![SavedValue::Raw("a".to_string())];
        assert_eq!(Alignment::of(&raw), Alignment::Legacy);

        let unchecked_toggle = vec![InputSnapshot::text("b", "checkbox").into()];
        assert_eq!(Alignment::of(&unchecked_toggle), Alignment::Legacy);
    }

    #[test]
    fn test_round_trip_text_inputs() {
        let snapshots: Vec<SavedValue> = vec![
            InputSnapshot::text("taro", "text").into(),
            InputSnapshot::text("", "email").into(),
            InputSnapshot::text("memo", "textarea").into(),
        ];
        let targets = vec![
            text_target(),
            text_target(),
            TargetInfo {
                kind: ElementKind::TextArea,
                ..Default::default()
            },
        ];

        let steps = plan_fill(&snapshots, &targets);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].index, 0);
        assert_eq!(steps[0].value.value, "taro");
        assert_eq!(steps[1].index, 2);
        assert_eq!(steps[1].value.value, "memo");
    }

    #[test]
    fn test_checked_toggle_is_resolved_by_value() {
        let snapshots: Vec<SavedValue> = vec![
            InputSnapshot::text("name", "text").into(),
            InputSnapshot::toggle("b", "checkbox", true, Some("opts".to_string())).into(),
            InputSnapshot::text("after", "text").into(),
        ];
        let targets = vec![
            text_target(),
            checkbox("a", "opts"),
            checkbox("b", "opts"),
            checkbox("c", "opts"),
            text_target(),
        ];

        let steps = plan_fill(&snapshots, &targets);
        let indexes: Vec<usize> = steps.iter().map(|s| s.index).collect();
        assert_eq!(indexes, vec![0, 2, 4]);
        assert_eq!(steps[1].value.checked, Some(true));
    }

    #[test]
    fn test_radio_respects_name() {
        let snapshots: Vec<SavedValue> =
            vec![InputSnapshot::toggle("yes", "radio", true, Some("second".to_string())).into()];
        let targets = vec![radio("yes", "first"), radio("no", "first"), radio("yes", "second")];

        let steps = plan_fill(&snapshots, &targets);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].index, 2);
    }

    #[test]
    fn test_unmatched_toggle_is_dropped() {
        let snapshots: Vec<SavedValue> = vec![InputSnapshot::toggle("z", "checkbox", true, None).into()];
        let steps = plan_fill(&snapshots, &[checkbox("a", "opts")]);
        assert!(steps.is_empty());
    }

    #[test]
    fn test_stale_mapping_fills_overlapping_prefix() {
        let snapshots: Vec<SavedValue> = vec![
            InputSnapshot::text("1", "text").into(),
            InputSnapshot::text("2", "text").into(),
            InputSnapshot::text("3", "text").into(),
        ];
        let steps = plan_fill(&snapshots, &[text_target(), text_target()]);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].value.value, "2");

        let steps = plan_fill(&snapshots[..1], &[text_target(), text_target()]);
        assert_eq!(steps.len(), 1);
    }

    #[test]
    fn test_unreadable_entries_are_skipped_in_place() {
        let snapshots: Vec<SavedValue> = serde_json::from_value(serde_json::json!([
            {"value": "a", "type": "text"},
            null,
            {"value": 5, "type": "number"},
            {"value": {"nested": true}, "type": "text"}
        ]))
        .expect("デシリアライズ失敗");
        assert_eq!(Alignment::of(&snapshots), Alignment::Keyed);

        let targets = vec![text_target(), text_target(), text_target(), text_target()];
        let steps = plan_fill(&snapshots, &targets);
        let planned: Vec<(usize, &str)> = steps.iter().map(|s| (s.index, s.value.value.as_str())).collect();
        assert_eq!(planned, vec![(0, "a"), (2, "5")]);
    }

    #[test]
    fn test_legacy_fill_continues_past_missing_values() {
        let snapshots: Vec<SavedValue> =
            serde_json::from_value(serde_json::json!(["a", null, "c"])).expect("デシリアライズ失敗");
        let steps = plan_fill(&snapshots, &[text_target(), text_target(), text_target()]);
        let planned: Vec<(usize, &str)> = steps.iter().map(|s| (s.index, s.value.value.as_str())).collect();
        assert_eq!(planned, vec![(0, "a"), (2, "c")]);
    }

    #[test]
    fn test_legacy_raw_values_are_positional() {
        let snapshots = vec![
            SavedValue::Raw("taro".to_string()),
            SavedValue::Raw("b".to_string()),
            SavedValue::Raw("[object Object]".to_string()),
        ];
        let targets = vec![text_target(), checkbox("a", "opts"), text_target()];

        let steps = plan_fill(&snapshots, &targets);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].index, 1);
        assert_eq!(steps[1].value, FillValue { value: "b".to_string(), checked: None });
    }
}
