//! ページ上の入力要素を種類ごとの型で保持する

use formfill_common::{ElementKind, TargetInfo};
use js_sys::Reflect;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, HtmlInputElement, HtmlSelectElement, HtmlTextAreaElement};

/// 分類済みの入力要素
///
/// iframe 内の要素は別 realm のため instanceof が通らない。
/// タグ名と type 属性で分類した後は unchecked_into で型を付ける。
#[derive(Debug, Clone)]
pub enum FormElement {
    Text(HtmlInputElement),
    TextArea(HtmlTextAreaElement),
    Select(HtmlSelectElement),
    Checkbox(HtmlInputElement),
    Radio(HtmlInputElement),
    Unsupported(Element),
}

impl FormElement {
    pub fn classify(element: Element) -> Self {
        let kind = ElementKind::classify(&element.tag_name(), element.get_attribute("type").as_deref());
        match kind {
            ElementKind::Text => FormElement::Text(element.unchecked_into()),
            ElementKind::TextArea => FormElement::TextArea(element.unchecked_into()),
            ElementKind::Select => FormElement::Select(element.unchecked_into()),
            ElementKind::Checkbox => FormElement::Checkbox(element.unchecked_into()),
            ElementKind::Radio => FormElement::Radio(element.unchecked_into()),
            ElementKind::Unsupported => FormElement::Unsupported(element),
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            FormElement::Text(_) => ElementKind::Text,
            FormElement::TextArea(_) => ElementKind::TextArea,
            FormElement::Select(_) => ElementKind::Select,
            FormElement::Checkbox(_) => ElementKind::Checkbox,
            FormElement::Radio(_) => ElementKind::Radio,
            FormElement::Unsupported(_) => ElementKind::Unsupported,
        }
    }

    pub fn element(&self) -> &Element {
        match self {
            FormElement::Text(input) | FormElement::Checkbox(input) | FormElement::Radio(input) => input.as_ref(),
            FormElement::TextArea(area) => area.as_ref(),
            FormElement::Select(select) => select.as_ref(),
            FormElement::Unsupported(element) => element,
        }
    }

    pub fn value(&self) -> String {
        match self {
            FormElement::Text(input) | FormElement::Checkbox(input) | FormElement::Radio(input) => input.value(),
            FormElement::TextArea(area) => area.value(),
            FormElement::Select(select) => select.value(),
            FormElement::Unsupported(element) => string_property(element, "value").unwrap_or_default(),
        }
    }

    /// `type` プロパティ。取れなければ小文字のタグ名
    pub fn input_type(&self) -> String {
        match self {
            FormElement::Text(input) | FormElement::Checkbox(input) | FormElement::Radio(input) => input.type_(),
            FormElement::TextArea(area) => area.type_(),
            FormElement::Select(select) => select.type_(),
            FormElement::Unsupported(element) => string_property(element, "type")
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| element.tag_name().to_lowercase()),
        }
    }

    pub fn checked(&self) -> bool {
        match self {
            FormElement::Checkbox(input) | FormElement::Radio(input) => input.checked(),
            _ => false,
        }
    }

    /// トグルの name 属性（空なら None）
    pub fn name(&self) -> Option<String> {
        match self {
            FormElement::Checkbox(input) | FormElement::Radio(input) => Some(input.name()).filter(|n| !n.is_empty()),
            _ => None,
        }
    }

    pub fn target_info(&self) -> TargetInfo {
        TargetInfo {
            kind: self.kind(),
            value: self.value(),
            name: self.name(),
        }
    }
}

fn string_property(element: &Element, key: &str) -> Option<String> {
    Reflect::get(element, &JsValue::from_str(key))
        .ok()
        .and_then(|v| v.as_string())
}
