//! Form Fill content script (WASM)
//!
//! ページの入力欄の収集・保存・再入力と、保存データのあるページでのホバーメニュー。

pub mod collector;
pub mod content;
pub mod controller;
pub mod extractor;
pub mod filler;
pub mod form_element;
pub mod logger;
pub mod storage;
pub mod url_watcher;

use controller::FillMenuController;
use std::cell::RefCell;
use url_watcher::UrlWatcher;
use wasm_bindgen::prelude::*;

thread_local! {
    static PAGE: RefCell<Option<(FillMenuController, UrlWatcher)>> = RefCell::new(None);
}

#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    logger::init(log::LevelFilter::Info);
}

/// ホバーメニューと URL 監視を開始する（コンテンツスクリプトから呼ぶ）
#[wasm_bindgen]
pub fn start() {
    PAGE.with(|page| {
        let mut page = page.borrow_mut();
        if page.is_some() {
            log::debug!("開始済み");
            return;
        }

        let controller = FillMenuController::new();
        controller.init();
        let watcher = UrlWatcher::new(controller.clone());
        watcher.start();
        *page = Some((controller, watcher));
    });
}

#[wasm_bindgen]
pub fn stop() {
    let stopped = PAGE.with(|page| page.borrow_mut().take());
    if let Some((controller, watcher)) = stopped {
        watcher.stop();
        controller.cleanup();
    }
}

/// コンソールへ出すログの詳細度（"error" / "warn" / "info" / "debug" / "trace"）
#[wasm_bindgen(js_name = setLogLevel)]
pub fn set_log_level(level: &str) -> Result<(), JsValue> {
    let level: log::LevelFilter = level
        .parse()
        .map_err(|_| JsValue::from_str(&format!("不明なログレベル: {}", level)))?;
    logger::init(level);
    Ok(())
}
