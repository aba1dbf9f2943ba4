//! SPA のページ遷移を検知してホバーメニューを作り直す
//!
//! body 配下の DOM 変化と popstate を監視する。URL が変わったらメニューを片付け、
//! 待ち時間の後、新しいページに保存データがあれば初期化し直す。

use crate::content::{current_config, current_page_matches, page_document, page_url};
use crate::controller::FillMenuController;
use gloo::timers::callback::Timeout;
use js_sys::Array;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Event, MutationObserver, MutationObserverInit};

#[derive(Clone)]
pub struct UrlWatcher {
    inner: Rc<WatcherInner>,
}

struct WatcherInner {
    controller: FillMenuController,
    current_url: RefCell<String>,
    observer: RefCell<Option<(MutationObserver, Closure<dyn FnMut(Array, MutationObserver)>)>>,
    popstate: RefCell<Option<Closure<dyn FnMut(Event)>>>,
    pending: RefCell<Option<Timeout>>,
}

impl UrlWatcher {
    pub fn new(controller: FillMenuController) -> Self {
        Self {
            inner: Rc::new(WatcherInner {
                controller,
                current_url: RefCell::new(String::new()),
                observer: RefCell::new(None),
                popstate: RefCell::new(None),
                pending: RefCell::new(None),
            }),
        }
    }

    pub fn is_watching(&self) -> bool {
        self.inner.observer.borrow().is_some() || self.inner.popstate.borrow().is_some()
    }

    pub fn start(&self) {
        if self.is_watching() {
            return;
        }
        *self.inner.current_url.borrow_mut() = page_url().unwrap_or_default();

        let weak = Rc::downgrade(&self.inner);
        let on_mutation = {
            let weak = weak.clone();
            Closure::<dyn FnMut(Array, MutationObserver)>::new(move |_records: Array, _observer: MutationObserver| {
                if let Some(inner) = weak.upgrade() {
                    check_url(&inner);
                }
            })
        };
        match MutationObserver::new(on_mutation.as_ref().unchecked_ref()) {
            Ok(observer) => {
                let options = MutationObserverInit::new();
                options.set_child_list(true);
                options.set_subtree(true);
                match page_document().and_then(|d| d.body()) {
                    Some(body) => {
                        if let Err(e) = observer.observe_with_options(&body, &options) {
                            log::error!("DOM 監視の開始に失敗: {:?}", e);
                        }
                    }
                    None => log::warn!("body がないため DOM 変化を監視できません"),
                }
                *self.inner.observer.borrow_mut() = Some((observer, on_mutation));
            }
            Err(e) => log::error!("MutationObserver の作成に失敗: {:?}", e),
        }

        let on_popstate = Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
            if let Some(inner) = weak.upgrade() {
                on_url_changed(&inner);
            }
        });
        if let Some(window) = web_sys::window() {
            if let Err(e) = window.add_event_listener_with_callback("popstate", on_popstate.as_ref().unchecked_ref()) {
                log::error!("popstate の登録に失敗: {:?}", e);
            }
        }
        *self.inner.popstate.borrow_mut() = Some(on_popstate);
    }

    pub fn stop(&self) {
        if let Some((observer, _callback)) = self.inner.observer.borrow_mut().take() {
            observer.disconnect();
        }
        if let Some(on_popstate) = self.inner.popstate.borrow_mut().take() {
            if let Some(window) = web_sys::window() {
                if let Err(e) = window.remove_event_listener_with_callback("popstate", on_popstate.as_ref().unchecked_ref()) {
                    log::warn!("popstate の解除に失敗: {:?}", e);
                }
            }
        }
        self.inner.pending.borrow_mut().take();
    }
}

fn check_url(inner: &Rc<WatcherInner>) {
    let Some(url) = page_url() else {
        return;
    };
    if *inner.current_url.borrow() == url {
        return;
    }
    on_url_changed(inner);
}

fn on_url_changed(inner: &Rc<WatcherInner>) {
    let url = page_url().unwrap_or_default();
    log::info!("URL の変化を検知: {}", url);
    *inner.current_url.borrow_mut() = url;
    inner.controller.cleanup();

    let weak = Rc::downgrade(inner);
    let timer = Timeout::new(current_config().url_change_debounce_ms, move || {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let controller = inner.controller.clone();
        spawn_local(async move {
            if current_page_matches().await.is_empty() {
                log::debug!("このページの保存データはありません");
                return;
            }
            controller.init();
        });
    });
    // 連続した変化は最後の1回だけ処理する
    *inner.pending.borrow_mut() = Some(timer);
}

#[cfg(all(target_arch = "wasm32", test))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn start_and_stop() {
        let watcher = UrlWatcher::new(FillMenuController::new());
        watcher.start();
        assert!(watcher.is_watching());
        watcher.start();

        watcher.stop();
        assert!(!watcher.is_watching());
    }
}
