//! ホバーメニュー
//!
//! 保存データのあるページで入力欄にマウスを乗せると「テストデータを入力」ボタンを出し、
//! ボタンに乗せると候補のドロップダウンを開く。
//! リスナーは init で一度だけ登録し、cleanup で全て外す。

use crate::content::{current_config, current_page_matches, fill_page, page_document};
use formfill_common::{disambiguate_tags, ElementKind, MatchCandidate};
use gloo::timers::callback::Timeout;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{AddEventListenerOptions, Document, Element, Event, EventTarget, HtmlElement, MouseEvent};

const BUTTON_ID: &str = "formfill-fill-button";
const DROPDOWN_ID: &str = "formfill-fill-dropdown";

const BUTTON_COLOR: &str = "#4285f4";
const BUTTON_HOVER_COLOR: &str = "#3367d6";

const BUTTON_STYLE: &str = "position: fixed; z-index: 2147483647; display: none; padding: 6px 12px; \
    background: #4285f4; color: #fff; border-radius: 4px; font: 12px sans-serif; cursor: pointer; \
    white-space: nowrap; box-shadow: 0 2px 6px rgba(0, 0, 0, 0.3);";

const DROPDOWN_STYLE: &str = "position: fixed; z-index: 2147483647; display: none; min-width: 240px; \
    max-height: 320px; overflow-y: auto; background: #fff; border: 1px solid #ddd; border-radius: 4px; \
    font: 13px sans-serif; color: #333; box-shadow: 0 4px 12px rgba(0, 0, 0, 0.2);";

const TITLE_STYLE: &str = "padding: 8px 12px; font-weight: bold; border-bottom: 1px solid #eee; background: #f8f9fa;";
const OPTION_STYLE: &str = "padding: 8px 12px; cursor: pointer; border-bottom: 1px solid #f0f0f0;";
const DETAIL_STYLE: &str = "font-size: 11px; color: #888; margin-top: 2px;";

/// ホバーメニューの制御
#[derive(Clone, Default)]
pub struct FillMenuController {
    inner: Rc<Inner>,
}

#[derive(Default)]
struct Inner {
    state: RefCell<State>,
    listeners: RefCell<Option<Listeners>>,
}

#[derive(Default)]
struct State {
    button: Option<HtmlElement>,
    dropdown: Option<HtmlElement>,
    hovered_input: Option<Element>,
    hide_timer: Option<Timeout>,
    option_handlers: Vec<Closure<dyn FnMut(Event)>>,
}

struct Listeners {
    mouse_over: Closure<dyn FnMut(MouseEvent)>,
    mouse_out: Closure<dyn FnMut(MouseEvent)>,
    reposition: Closure<dyn FnMut(Event)>,
}

impl FillMenuController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.listeners.borrow().is_some()
    }

    /// リスナーを登録する（二重登録はしない）
    pub fn init(&self) {
        if self.is_initialized() {
            log::debug!("ホバーメニューは初期化済み");
            return;
        }
        let (Some(window), Some(document)) = (web_sys::window(), page_document()) else {
            log::warn!("window/document がないためホバーメニューを初期化できません");
            return;
        };

        // 前回のスクリプトが残した要素
        for id in [BUTTON_ID, DROPDOWN_ID] {
            if let Some(stale) = document.get_element_by_id(id) {
                stale.remove();
            }
        }

        let weak = Rc::downgrade(&self.inner);
        let mouse_over = {
            let weak = weak.clone();
            Closure::<dyn FnMut(MouseEvent)>::new(move |event: MouseEvent| {
                if let Some(inner) = weak.upgrade() {
                    on_mouse_over(&inner, &event);
                }
            })
        };
        let mouse_out = {
            let weak = weak.clone();
            Closure::<dyn FnMut(MouseEvent)>::new(move |event: MouseEvent| {
                if let Some(inner) = weak.upgrade() {
                    on_mouse_out(&inner, &event);
                }
            })
        };
        let reposition = Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
            if let Some(inner) = weak.upgrade() {
                update_position(&inner);
            }
        });

        let result = document
            .add_event_listener_with_callback("mouseover", mouse_over.as_ref().unchecked_ref())
            .and_then(|_| document.add_event_listener_with_callback("mouseout", mouse_out.as_ref().unchecked_ref()))
            .and_then(|_| {
                let options = AddEventListenerOptions::new();
                options.set_passive(true);
                for event_type in ["scroll", "resize"] {
                    window.add_event_listener_with_callback_and_add_event_listener_options(
                        event_type,
                        reposition.as_ref().unchecked_ref(),
                        &options,
                    )?;
                }
                Ok(())
            });
        if let Err(e) = result {
            log::error!("リスナーの登録に失敗: {:?}", e);
        }

        *self.inner.listeners.borrow_mut() = Some(Listeners {
            mouse_over,
            mouse_out,
            reposition,
        });
        log::info!("ホバーメニューを初期化しました");
    }

    /// リスナーとタイマーを外し、ボタンとドロップダウンを取り除く
    pub fn cleanup(&self) {
        let listeners = self.inner.listeners.borrow_mut().take();
        if let Some(listeners) = listeners {
            remove_listeners(&listeners);
        }

        let mut state = self.inner.state.borrow_mut();
        state.hide_timer = None;
        state.hovered_input = None;
        state.option_handlers.clear();
        if let Some(button) = state.button.take() {
            button.remove();
        }
        if let Some(dropdown) = state.dropdown.take() {
            dropdown.remove();
        }
    }
}

fn remove_listeners(listeners: &Listeners) {
    let mut results = Vec::new();
    if let Some(document) = page_document() {
        results.push(document.remove_event_listener_with_callback("mouseover", listeners.mouse_over.as_ref().unchecked_ref()));
        results.push(document.remove_event_listener_with_callback("mouseout", listeners.mouse_out.as_ref().unchecked_ref()));
    }
    if let Some(window) = web_sys::window() {
        for event_type in ["scroll", "resize"] {
            results.push(window.remove_event_listener_with_callback(event_type, listeners.reposition.as_ref().unchecked_ref()));
        }
    }
    for result in results {
        if let Err(e) = result {
            log::warn!("リスナーの解除に失敗: {:?}", e);
        }
    }
}

fn event_element(target: Option<EventTarget>) -> Option<Element> {
    target?.dyn_into::<Element>().ok()
}

fn is_fillable_input(element: &Element) -> bool {
    ElementKind::classify(&element.tag_name(), element.get_attribute("type").as_deref()) != ElementKind::Unsupported
}

fn contains(container: &Option<HtmlElement>, element: &Element) -> bool {
    container
        .as_ref()
        .is_some_and(|c| c.contains(Some(element.as_ref())))
}

fn set_style(element: &HtmlElement, property: &str, value: &str) {
    if let Err(e) = element.style().set_property(property, value) {
        log::debug!("スタイル設定に失敗: {} {:?}", property, e);
    }
}

fn on_mouse_over(inner: &Rc<Inner>, event: &MouseEvent) {
    let Some(target) = event_element(event.target()) else {
        return;
    };
    let (button, in_dropdown) = {
        let state = inner.state.borrow();
        let button = state.button.clone().filter(|_| contains(&state.button, &target));
        (button, contains(&state.dropdown, &target))
    };

    if let Some(button) = button {
        cancel_hide(inner);
        set_style(&button, "background", BUTTON_HOVER_COLOR);
        let inner = Rc::clone(inner);
        spawn_local(async move { show_dropdown(&inner).await });
    } else if in_dropdown {
        cancel_hide(inner);
    } else if is_fillable_input(&target) {
        cancel_hide(inner);
        let weak = Rc::downgrade(inner);
        spawn_local(async move {
            if current_page_matches().await.is_empty() {
                return;
            }
            if let Some(inner) = weak.upgrade() {
                show_button(&inner, target);
            }
        });
    }
}

fn on_mouse_out(inner: &Rc<Inner>, event: &MouseEvent) {
    let Some(target) = event_element(event.target()) else {
        return;
    };
    let related = event_element(event.related_target());

    let (button, in_dropdown, related_in_menu) = {
        let state = inner.state.borrow();
        let button = state.button.clone().filter(|_| contains(&state.button, &target));
        let related_in_menu = related
            .as_ref()
            .is_some_and(|r| contains(&state.button, r) || contains(&state.dropdown, r));
        (button, contains(&state.dropdown, &target), related_in_menu)
    };

    if let Some(button) = &button {
        set_style(button, "background", BUTTON_COLOR);
    }
    if (button.is_some() || in_dropdown || is_fillable_input(&target)) && !related_in_menu {
        schedule_hide(inner);
    }
}

fn cancel_hide(inner: &Inner) {
    inner.state.borrow_mut().hide_timer = None;
}

fn schedule_hide(inner: &Rc<Inner>) {
    let weak = Rc::downgrade(inner);
    let timer = Timeout::new(current_config().hide_delay_ms, move || {
        if let Some(inner) = weak.upgrade() {
            hide_all(&inner);
        }
    });
    inner.state.borrow_mut().hide_timer = Some(timer);
}

fn hide_all(inner: &Inner) {
    let mut state = inner.state.borrow_mut();
    state.hovered_input = None;
    for element in [&state.button, &state.dropdown].into_iter().flatten() {
        set_style(element, "display", "none");
    }
}

fn create_overlay(id: &str, style: &str) -> Result<HtmlElement, JsValue> {
    let document = page_document().ok_or_else(|| JsValue::from_str("document がありません"))?;
    let body = document.body().ok_or_else(|| JsValue::from_str("body がありません"))?;
    let element: HtmlElement = document.create_element("div")?.unchecked_into();
    element.set_id(id);
    element.style().set_css_text(style);
    body.append_child(&element)?;
    Ok(element)
}

fn ensure_button(inner: &Inner) -> Option<HtmlElement> {
    let existing = inner.state.borrow().button.clone();
    if existing.is_some() {
        return existing;
    }

    match create_overlay(BUTTON_ID, BUTTON_STYLE) {
        Ok(button) => {
            button.set_text_content(Some(&current_config().button_label));
            inner.state.borrow_mut().button = Some(button.clone());
            Some(button)
        }
        Err(e) => {
            log::error!("ボタンの作成に失敗: {:?}", e);
            None
        }
    }
}

fn ensure_dropdown(inner: &Inner) -> Option<HtmlElement> {
    let existing = inner.state.borrow().dropdown.clone();
    if existing.is_some() {
        return existing;
    }

    match create_overlay(DROPDOWN_ID, DROPDOWN_STYLE) {
        Ok(dropdown) => {
            inner.state.borrow_mut().dropdown = Some(dropdown.clone());
            Some(dropdown)
        }
        Err(e) => {
            log::error!("ドロップダウンの作成に失敗: {:?}", e);
            None
        }
    }
}

/// 入力欄の上にボタンを出す
fn show_button(inner: &Inner, input: Element) {
    let Some(button) = ensure_button(inner) else {
        return;
    };
    let rect = input.get_bounding_client_rect();
    set_style(&button, "left", &format!("{}px", rect.left()));
    set_style(&button, "top", &format!("{}px", rect.top() - current_config().button_offset_px));
    set_style(&button, "display", "block");
    inner.state.borrow_mut().hovered_input = Some(input);
}

async fn show_dropdown(inner: &Rc<Inner>) {
    let candidates = disambiguate_tags(current_page_matches().await);
    if candidates.is_empty() {
        return;
    }
    let (Some(document), Some(dropdown)) = (page_document(), ensure_dropdown(inner)) else {
        return;
    };

    dropdown.set_inner_html("");
    let title: HtmlElement = match document.create_element("div") {
        Ok(title) => title.unchecked_into(),
        Err(e) => {
            log::error!("ドロップダウンの作成に失敗: {:?}", e);
            return;
        }
    };
    title.style().set_css_text(TITLE_STYLE);
    title.set_text_content(Some(&current_config().dropdown_title));
    if let Err(e) = dropdown.append_child(&title) {
        log::error!("ドロップダウンの作成に失敗: {:?}", e);
        return;
    }

    let mut handlers = Vec::new();
    for candidate in candidates {
        match build_option(inner, &document, candidate) {
            Ok((option, handler)) => {
                if let Err(e) = dropdown.append_child(&option) {
                    log::error!("候補の追加に失敗: {:?}", e);
                    continue;
                }
                handlers.push(handler);
            }
            Err(e) => log::error!("候補の作成に失敗: {:?}", e),
        }
    }

    let button = inner.state.borrow().button.clone();
    if let Some(button) = button {
        let rect = button.get_bounding_client_rect();
        set_style(&dropdown, "left", &format!("{}px", rect.left()));
        set_style(&dropdown, "top", &format!("{}px", rect.bottom() + 4.0));
    }
    set_style(&dropdown, "display", "block");
    inner.state.borrow_mut().option_handlers = handlers;
}

fn build_option(
    inner: &Rc<Inner>,
    document: &Document,
    candidate: MatchCandidate,
) -> Result<(HtmlElement, Closure<dyn FnMut(Event)>), JsValue> {
    let option: HtmlElement = document.create_element("div")?.unchecked_into();
    option.style().set_css_text(OPTION_STYLE);

    let tag = document.create_element("div")?;
    tag.set_text_content(Some(&candidate.tag));
    let detail: HtmlElement = document.create_element("div")?.unchecked_into();
    detail.style().set_css_text(DETAIL_STYLE);
    detail.set_text_content(Some(&format!(
        "{} ・ {} ・ {}項目",
        candidate.match_type.label(),
        candidate.page_title,
        candidate.test_data_count
    )));
    option.append_child(&tag)?;
    option.append_child(&detail)?;

    let weak = Rc::downgrade(inner);
    let tag_name = candidate.tag;
    let data = candidate.data;
    let handler = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
        event.prevent_default();
        event.stop_propagation();
        let filled = fill_page(&data);
        log::info!("{} を入力しました（{}件）", tag_name, filled);
        if let Some(inner) = weak.upgrade() {
            hide_all(&inner);
        }
    });
    option.add_event_listener_with_callback("click", handler.as_ref().unchecked_ref())?;
    Ok((option, handler))
}

/// スクロール/リサイズ時にボタンを入力欄に追従させる
fn update_position(inner: &Inner) {
    let (button, input) = {
        let state = inner.state.borrow();
        (state.button.clone(), state.hovered_input.clone())
    };
    let (Some(button), Some(input)) = (button, input) else {
        return;
    };
    let visible = button
        .style()
        .get_property_value("display")
        .is_ok_and(|display| display != "none");
    if !visible {
        return;
    }

    let rect = input.get_bounding_client_rect();
    if rect.width() == 0.0 && rect.height() == 0.0 {
        hide_all(inner);
        return;
    }
    set_style(&button, "left", &format!("{}px", rect.left()));
    set_style(&button, "top", &format!("{}px", rect.top() - current_config().button_offset_px));
}

#[cfg(all(target_arch = "wasm32", test))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn init_is_idempotent_and_cleanup_resets() {
        let controller = FillMenuController::new();
        controller.init();
        controller.init();
        assert!(controller.is_initialized());

        controller.cleanup();
        assert!(!controller.is_initialized());
        let document = page_document().expect("document");
        assert!(document.get_element_by_id(BUTTON_ID).is_none());
    }

    #[wasm_bindgen_test]
    fn show_button_positions_above_input() {
        let document = page_document().expect("document");
        let body = document.body().expect("body");
        let input = document.create_element("input").expect("input");
        body.append_child(&input).expect("append");

        let controller = FillMenuController::new();
        show_button(&controller.inner, input.clone());
        let button = document
            .get_element_by_id(BUTTON_ID)
            .expect("button")
            .unchecked_into::<HtmlElement>();
        assert_eq!(button.style().get_property_value("display").expect("display"), "block");

        controller.cleanup();
        input.remove();
        assert!(document.get_element_by_id(BUTTON_ID).is_none());
    }
}
