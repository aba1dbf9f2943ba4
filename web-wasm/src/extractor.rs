//! 入力要素からスナップショットを取り出す

use crate::form_element::FormElement;
use formfill_common::InputSnapshot;

/// トグルは checked と name も記録する
pub fn extract(element: &FormElement) -> InputSnapshot {
    match element {
        FormElement::Checkbox(_) | FormElement::Radio(_) => {
            InputSnapshot::toggle(element.value(), element.input_type(), element.checked(), element.name())
        }
        _ => InputSnapshot::text(element.value(), element.input_type()),
    }
}

pub fn extract_all(elements: &[FormElement]) -> Vec<InputSnapshot> {
    elements.iter().map(extract).collect()
}
