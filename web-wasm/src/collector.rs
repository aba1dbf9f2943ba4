//! 入力要素の収集
//!
//! 文書順に input/select/textarea を集め、同一オリジンの iframe の中も辿る。
//! 取得できない iframe は警告を出して飛ばす。

use crate::form_element::FormElement;
use formfill_common::{should_collect, CollectCandidate, CollectMode, ElementKind};
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlIFrameElement, HtmlInputElement};

const INPUT_SELECTOR: &str = "input, select, textarea";

/// 文書（と配下の iframe）から入力要素を集める
pub fn collect(document: &Document, mode: CollectMode) -> Vec<FormElement> {
    let mut collected = Vec::new();
    collect_into(document, mode, &mut collected);
    collected
}

fn collect_into(document: &Document, mode: CollectMode, out: &mut Vec<FormElement>) {
    for element in query_all(document, INPUT_SELECTOR) {
        if is_collectable(&element, mode) {
            out.push(FormElement::classify(element));
        }
    }

    for frame in query_all(document, "iframe") {
        let frame: HtmlIFrameElement = frame.unchecked_into();
        // クロスオリジンの場合 contentDocument は null になる
        match frame.content_document() {
            Some(inner) => collect_into(&inner, mode, out),
            None => log::warn!("iframe の内容にアクセスできません: {}", frame.src()),
        }
    }
}

fn query_all(document: &Document, selector: &str) -> Vec<Element> {
    let nodes = match document.query_selector_all(selector) {
        Ok(nodes) => nodes,
        Err(e) => {
            log::error!("要素の取得に失敗: {} {:?}", selector, e);
            return Vec::new();
        }
    };

    (0..nodes.length())
        .filter_map(|i| nodes.item(i))
        .map(|node| node.unchecked_into::<Element>())
        .collect()
}

fn is_collectable(element: &Element, mode: CollectMode) -> bool {
    let type_attr = element.get_attribute("type");
    let kind = ElementKind::classify(&element.tag_name(), type_attr.as_deref());
    let checked = kind.is_toggle() && element.unchecked_ref::<HtmlInputElement>().checked();

    let candidate = CollectCandidate {
        type_attr: type_attr.as_deref(),
        kind,
        hidden_attr: element.has_attribute("hidden"),
        display_none: is_display_none(element),
        checked,
    };
    should_collect(&candidate, mode)
}

/// 要素が属する window の算出スタイルで判定
fn is_display_none(element: &Element) -> bool {
    let Some(view) = element.owner_document().and_then(|d| d.default_view()) else {
        return false;
    };

    match view.get_computed_style(element) {
        Ok(Some(style)) => style
            .get_property_value("display")
            .map(|display| display == "none")
            .unwrap_or(false),
        _ => false,
    }
}

#[cfg(all(target_arch = "wasm32", test))]
mod wasm_tests {
    use super::*;
    use js_sys::Promise;
    use wasm_bindgen_futures::JsFuture;
    use wasm_bindgen_test::*;
    use web_sys::HtmlElement;

    wasm_bindgen_test_configure!(run_in_browser);

    /// srcdoc の iframe を追加し、読み込み完了まで待つ
    async fn append_frame(container: &HtmlElement, srcdoc: &str, sandboxed: bool) -> HtmlIFrameElement {
        let document = container.owner_document().expect("document");
        let frame: HtmlIFrameElement = document.create_element("iframe").expect("iframe").unchecked_into();
        if sandboxed {
            // allow-same-origin が無いので contentDocument は null になる
            frame.set_attribute("sandbox", "").expect("sandbox");
        }
        frame.set_srcdoc(srcdoc);

        let loaded = Promise::new(&mut |resolve, _reject| {
            frame
                .add_event_listener_with_callback("load", &resolve)
                .expect("load listener");
        });
        container.append_child(&frame).expect("append");
        JsFuture::from(loaded).await.expect("load");
        frame
    }

    fn fixture(document: &Document, id: &str, html: &str) -> HtmlElement {
        let container: HtmlElement = document.create_element("div").expect("div").unchecked_into();
        container.set_id(id);
        container.set_inner_html(html);
        document.body().expect("body").append_child(&container).expect("append");
        container
    }

    #[wasm_bindgen_test]
    async fn inaccessible_frame_does_not_stop_collection() {
        let document = web_sys::window().and_then(|w| w.document()).expect("document");
        let container = fixture(
            &document,
            "cross-origin-fixture",
            r#"<input type="text" value="xo-top-1"><input type="text" value="xo-top-2">"#,
        );
        let open = append_frame(
            &container,
            r#"<input type="text" value="xo-frame-1"><textarea>xo-frame-2</textarea>"#,
            false,
        )
        .await;
        let sealed = append_frame(&container, r#"<input type="text" value="xo-sealed">"#, true).await;
        assert!(open.content_document().is_some());
        assert!(sealed.content_document().is_none());

        let values: Vec<String> = collect(&document, CollectMode::Save)
            .iter()
            .map(FormElement::value)
            .filter(|v| v.starts_with("xo-"))
            .collect();
        assert_eq!(values, vec!["xo-top-1", "xo-top-2", "xo-frame-1", "xo-frame-2"]);

        container.remove();
    }

    #[wasm_bindgen_test]
    async fn repeated_collection_returns_same_elements_in_order() {
        let document = web_sys::window().and_then(|w| w.document()).expect("document");
        let container = fixture(
            &document,
            "repeat-fixture",
            r#"<input type="text" value="1">
               <select><option value="s" selected>s</option></select>
               <input type="checkbox" value="c">
               <textarea>t</textarea>"#,
        );
        append_frame(&container, r#"<input type="radio" name="r" value="r">"#, false).await;

        let first = collect(&document, CollectMode::FillTarget);
        let second = collect(&document, CollectMode::FillTarget);
        assert!(first.len() >= 5);
        assert_eq!(first.len(), second.len());
        assert!(first.iter().zip(&second).all(|(a, b)| a.element() == b.element()));

        container.remove();
    }

    #[wasm_bindgen_test]
    fn hidden_elements_are_skipped_and_toggles_depend_on_mode() {
        let document = web_sys::window().and_then(|w| w.document()).expect("document");
        let container: HtmlElement = document.create_element("div").expect("div").unchecked_into();
        container.set_id("collector-fixture");
        container.set_inner_html(
            r#"<input type="text" value="shown">
               <input type="hidden" value="h">
               <input type="text" hidden value="attr">
               <input type="text" style="display: none" value="styled">
               <input type="checkbox" value="on">
               <input type="radio" name="r" value="x" checked>"#,
        );
        document.body().expect("body").append_child(&container).expect("append");

        let inner = |mode| {
            collect(&document, mode)
                .into_iter()
                .filter(|e| {
                    e.element()
                        .parent_element()
                        .is_some_and(|p| p.id() == "collector-fixture")
                })
                .map(|e| e.value())
                .collect::<Vec<_>>()
        };

        assert_eq!(inner(CollectMode::Save), vec!["shown", "x"]);
        assert_eq!(inner(CollectMode::FillTarget), vec!["shown", "on", "x"]);

        container.remove();
    }
}
