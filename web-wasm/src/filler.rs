//! 入力要素への書き込み
//!
//! React などの管理下にある入力欄にも反映させるため、要素が属する realm の
//! ネイティブ value セッターを使ってから input/change イベントを送る。

use crate::collector::collect;
use crate::form_element::FormElement;
use formfill_common::{plan_fill, CollectMode, EngineConfig, FillValue, SavedValue, TargetInfo};
use gloo::timers::callback::Timeout;
use js_sys::{Function, Object, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, Event, EventInit, EventTarget, HtmlElement, HtmlInputElement, MouseEvent, MouseEventInit};

/// 要素1つに値を書き込む。失敗はログに残して続行する
pub fn fill_element(element: &FormElement, value: &FillValue) {
    if let Err(e) = try_fill(element, value) {
        log::error!("入力に失敗: {} {:?}", value.value, e);
    }
}

fn try_fill(element: &FormElement, value: &FillValue) -> Result<(), JsValue> {
    match element {
        FormElement::Text(input) => {
            set_native_value(input, "HTMLInputElement", &value.value)?;
            input.set_value(&value.value);
            dispatch(input, "input")?;
            dispatch(input, "change")
        }
        FormElement::TextArea(area) => {
            set_native_value(area, "HTMLTextAreaElement", &value.value)?;
            area.set_value(&value.value);
            dispatch(area, "input")?;
            dispatch(area, "change")
        }
        FormElement::Select(select) => {
            set_native_value(select, "HTMLSelectElement", &value.value)?;
            select.set_value(&value.value);
            dispatch(select, "change")
        }
        FormElement::Checkbox(input) => fill_toggle(input, value, false),
        FormElement::Radio(input) => fill_toggle(input, value, true),
        FormElement::Unsupported(element) => {
            log::warn!("未対応の要素をスキップ: {}", element.tag_name());
            Ok(())
        }
    }
}

fn fill_toggle(input: &HtmlInputElement, value: &FillValue, is_radio: bool) -> Result<(), JsValue> {
    match value.checked {
        Some(checked) => {
            if is_radio && input.value() != value.value {
                return Ok(());
            }
            input.set_checked(checked);
            dispatch(input, "change")
        }
        // 旧形式: 値が一致すればチェック、しなければ同じ文書から同じ値のチェックボックスを探す
        None => {
            if input.value() == value.value {
                input.set_checked(true);
                return dispatch(input, "change");
            }
            match input.owner_document().and_then(|d| find_checkbox_by_value(&d, &value.value)) {
                Some(checkbox) => {
                    checkbox.set_checked(true);
                    dispatch(&checkbox, "change")
                }
                None => {
                    log::debug!("値の一致するチェックボックスがありません: {}", value.value);
                    Ok(())
                }
            }
        }
    }
}

fn find_checkbox_by_value(document: &Document, value: &str) -> Option<HtmlInputElement> {
    let nodes = document.query_selector_all(r#"input[type="checkbox"]"#).ok()?;
    (0..nodes.length())
        .filter_map(|i| nodes.item(i))
        .map(|node| node.unchecked_into::<HtmlInputElement>())
        .find(|checkbox| checkbox.value() == value)
}

/// 要素の realm にある `<interface>.prototype` の value セッター
fn native_value_setter(element: &Element, interface: &str) -> Option<Function> {
    let realm: JsValue = match element.owner_document().and_then(|d| d.default_view()) {
        Some(window) => window.into(),
        None => js_sys::global().into(),
    };

    let constructor = Reflect::get(&realm, &JsValue::from_str(interface)).ok()?;
    let prototype = Reflect::get(&constructor, &JsValue::from_str("prototype")).ok()?;
    if !prototype.is_object() {
        return None;
    }
    let descriptor =
        Reflect::get_own_property_descriptor(prototype.unchecked_ref::<Object>(), &JsValue::from_str("value")).ok()?;
    if descriptor.is_undefined() {
        return None;
    }

    // 別 realm の関数は instanceof Function にならないので typeof で見る
    let setter = Reflect::get(&descriptor, &JsValue::from_str("set")).ok()?;
    setter.is_function().then(|| setter.unchecked_into())
}

fn set_native_value(element: &Element, interface: &str, value: &str) -> Result<(), JsValue> {
    match native_value_setter(element, interface) {
        Some(setter) => {
            setter.call1(element, &JsValue::from_str(value))?;
        }
        None => log::debug!("{} の value セッターが取得できません", interface),
    }
    Ok(())
}

fn dispatch(target: &EventTarget, event_type: &str) -> Result<(), JsValue> {
    let init = EventInit::new();
    init.set_bubbles(true);
    let event = Event::new_with_event_init_dict(event_type, &init)?;
    target.dispatch_event(&event)?;
    Ok(())
}

fn dispatch_mouse(target: &EventTarget, event_type: &str) -> Result<(), JsValue> {
    let init = MouseEventInit::new();
    init.set_bubbles(true);
    init.set_cancelable(true);
    let event = MouseEvent::new_with_mouse_event_init_dict(event_type, &init)?;
    target.dispatch_event(&event)?;
    Ok(())
}

/// スナップショット列をページへ書き込む。書き込んだ要素数を返す
pub fn fill_from_snapshots(document: &Document, snapshots: &[SavedValue], config: &EngineConfig) -> usize {
    let targets = collect(document, CollectMode::FillTarget);
    let infos: Vec<TargetInfo> = targets.iter().map(FormElement::target_info).collect();
    let steps = plan_fill(snapshots, &infos);

    for step in &steps {
        if let Some(element) = targets.get(step.index) {
            fill_element(element, &step.value);
        }
    }

    log::info!("{}件を入力しました（保存数 {} / 入力先 {}）", steps.len(), snapshots.len(), targets.len());
    if let Some(body) = document.body() {
        schedule_menu_close(body, config.menu_close_delay_ms);
    }
    steps.len()
}

/// 入力で開いたドロップダウン等を閉じるため body をクリックする
fn schedule_menu_close(body: HtmlElement, delay_ms: u32) {
    Timeout::new(delay_ms, move || {
        for event_type in ["mousedown", "mouseup", "click"] {
            if let Err(e) = dispatch_mouse(&body, event_type) {
                log::error!("{} の送信に失敗: {:?}", event_type, e);
            }
        }
    })
    .forget();
}

/// 入力欄を空にし、トグルのチェックを外す。変更した要素数を返す
pub fn clear_inputs(elements: &[FormElement]) -> usize {
    let mut cleared = 0;
    for element in elements {
        let result = match element {
            FormElement::Text(input) => set_native_value(input, "HTMLInputElement", "").and_then(|_| {
                input.set_value("");
                dispatch(input, "input")
            }),
            FormElement::TextArea(area) => set_native_value(area, "HTMLTextAreaElement", "").and_then(|_| {
                area.set_value("");
                dispatch(area, "input")
            }),
            FormElement::Checkbox(input) | FormElement::Radio(input) => {
                if !input.checked() {
                    continue;
                }
                input.set_checked(false);
                dispatch(input, "change")
            }
            FormElement::Select(_) | FormElement::Unsupported(_) => continue,
        };

        match result {
            Ok(()) => cleared += 1,
            Err(e) => log::error!("クリアに失敗: {:?}", e),
        }
    }
    cleared
}

#[cfg(all(target_arch = "wasm32", test))]
mod wasm_tests {
    use super::*;
    use crate::extractor::extract_all;
    use formfill_common::InputSnapshot;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn mount(html: &str) -> (Document, HtmlElement) {
        let document = web_sys::window().and_then(|w| w.document()).expect("document");
        let container: HtmlElement = document.create_element("div").expect("div").unchecked_into();
        container.set_inner_html(html);
        document.body().expect("body").append_child(&container).expect("append");
        (document, container)
    }

    fn input_by_id(document: &Document, id: &str) -> HtmlInputElement {
        document.get_element_by_id(id).expect(id).unchecked_into()
    }

    #[wasm_bindgen_test]
    fn save_then_fill_restores_values_and_checked_toggle() {
        let (document, container) = mount(
            r#"<input id="name" type="text" value="taro">
               <input id="opt-a" type="checkbox" name="opts" value="a">
               <input id="opt-b" type="checkbox" name="opts" value="b" checked>
               <input id="secret" type="hidden" value="x">
               <textarea id="memo">memo</textarea>"#,
        );

        let saved: Vec<SavedValue> = extract_all(&collect(&document, CollectMode::Save))
            .into_iter()
            .filter(|s| s.value == "taro" || s.value == "b" || s.value == "memo")
            .map(SavedValue::from)
            .collect();
        assert_eq!(saved.len(), 3);

        input_by_id(&document, "name").set_value("");
        input_by_id(&document, "opt-b").set_checked(false);

        let filled = fill_from_snapshots(&document, &saved, &EngineConfig::default());
        assert!(filled >= 3);
        assert_eq!(input_by_id(&document, "name").value(), "taro");
        assert!(input_by_id(&document, "opt-b").checked());
        assert!(!input_by_id(&document, "opt-a").checked());

        container.remove();
    }

    #[wasm_bindgen_test]
    fn legacy_raw_value_checks_checkbox_by_value() {
        let (document, container) = mount(
            r#"<input id="legacy-a" type="checkbox" value="apple">
               <input id="legacy-b" type="checkbox" value="banana">"#,
        );
        let element = FormElement::classify(document.get_element_by_id("legacy-a").expect("legacy-a"));

        fill_element(&element, &FillValue { value: "banana".to_string(), checked: None });
        assert!(input_by_id(&document, "legacy-b").checked());
        assert!(!input_by_id(&document, "legacy-a").checked());

        container.remove();
    }

    #[wasm_bindgen_test]
    fn clear_empties_text_and_unchecks() {
        let (document, container) = mount(
            r#"<input id="clear-text" type="text" value="abc">
               <input id="clear-check" type="checkbox" value="on" checked>"#,
        );
        let elements = vec![
            FormElement::classify(document.get_element_by_id("clear-text").expect("text")),
            FormElement::classify(document.get_element_by_id("clear-check").expect("check")),
        ];

        assert_eq!(clear_inputs(&elements), 2);
        assert_eq!(input_by_id(&document, "clear-text").value(), "");
        assert!(!input_by_id(&document, "clear-check").checked());

        container.remove();
    }

    #[wasm_bindgen_test]
    fn undefined_entry_is_skipped_and_rest_is_filled() {
        let (document, container) = mount(
            r#"<input id="gap-a" type="text">
               <input id="gap-b" type="text" value="keep">
               <input id="gap-c" type="text">"#,
        );
        let raw = js_sys::Array::of3(&JsValue::from_str("a"), &JsValue::UNDEFINED, &JsValue::from_str("c"));
        let saved: Vec<SavedValue> = serde_wasm_bindgen::from_value(raw.into()).expect("配列として読めるはず");
        assert_eq!(saved.len(), 3);

        let targets: Vec<FormElement> = ["gap-a", "gap-b", "gap-c"]
            .iter()
            .map(|id| FormElement::classify(document.get_element_by_id(id).expect(id)))
            .collect();
        let infos: Vec<TargetInfo> = targets.iter().map(FormElement::target_info).collect();
        for step in plan_fill(&saved, &infos) {
            fill_element(&targets[step.index], &step.value);
        }

        assert_eq!(input_by_id(&document, "gap-a").value(), "a");
        assert_eq!(input_by_id(&document, "gap-b").value(), "keep");
        assert_eq!(input_by_id(&document, "gap-c").value(), "c");

        container.remove();
    }

    #[wasm_bindgen_test]
    fn snapshot_of_unsupported_input_keeps_type() {
        let (document, container) = mount(r#"<input id="when" type="date" value="2024-01-02">"#);
        let element = FormElement::classify(document.get_element_by_id("when").expect("when"));
        let snapshot = crate::extractor::extract(&element);
        assert_eq!(snapshot, InputSnapshot::text("2024-01-02", "date"));
        container.remove();
    }
}
