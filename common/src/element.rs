//! 入力要素の分類と収集ポリシー
//!
//! タグ名・type属性の文字列比較は一度だけ行い、以降は ElementKind で分岐する。

/// 入力要素の種類
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// text/email/number/password/type未指定の input
    Text,
    TextArea,
    Select,
    Checkbox,
    Radio,
    /// 上記以外（date, file など）。入力時はスキップする
    #[default]
    Unsupported,
}

impl ElementKind {
    /// タグ名と type 属性から分類
    pub fn classify(tag_name: &str, type_attr: Option<&str>) -> Self {
        let tag = tag_name.to_ascii_lowercase();
        let input_type = type_attr
            .map(|t| t.trim().to_ascii_lowercase())
            .unwrap_or_default();

        match tag.as_str() {
            "textarea" => ElementKind::TextArea,
            "select" => ElementKind::Select,
            "input" => match input_type.as_str() {
                "" | "text" | "email" | "number" | "password" => ElementKind::Text,
                "checkbox" => ElementKind::Checkbox,
                "radio" => ElementKind::Radio,
                _ => ElementKind::Unsupported,
            },
            _ => ElementKind::Unsupported,
        }
    }

    pub fn is_toggle(&self) -> bool {
        matches!(self, ElementKind::Checkbox | ElementKind::Radio)
    }

    /// スナップショットの type 文字列から分類（トグルかどうかの判定用）
    pub fn from_snapshot_type(input_type: &str) -> Self {
        match input_type.to_ascii_lowercase().as_str() {
            "checkbox" => ElementKind::Checkbox,
            "radio" => ElementKind::Radio,
            "textarea" => ElementKind::TextArea,
            "select-one" | "select-multiple" | "select" => ElementKind::Select,
            "" | "text" | "email" | "number" | "password" => ElementKind::Text,
            _ => ElementKind::Unsupported,
        }
    }
}

/// 収集の目的
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectMode {
    /// 保存用: チェック済みのトグルのみ
    Save,
    /// 入力先の解決用: トグルは全て
    FillTarget,
}

/// 収集判定に必要な要素の状態
#[derive(Debug, Clone, Default)]
pub struct CollectCandidate<'a> {
    pub type_attr: Option<&'a str>,
    pub kind: ElementKind,
    /// `hidden` 属性
    pub hidden_attr: bool,
    /// 算出スタイルが display:none
    pub display_none: bool,
    pub checked: bool,
}

/// 収集対象にするか
pub fn should_collect(candidate: &CollectCandidate<'_>, mode: CollectMode) -> bool {
    let is_hidden_type = candidate
        .type_attr
        .is_some_and(|t| t.trim().eq_ignore_ascii_case("hidden"));
    if is_hidden_type || candidate.hidden_attr || candidate.display_none {
        return false;
    }

    if mode == CollectMode::Save && candidate.kind.is_toggle() {
        return candidate.checked;
    }
    true
}
