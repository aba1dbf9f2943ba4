//! ページ単位の操作と JS への公開関数

use crate::collector::collect;
use crate::extractor::extract_all;
use crate::filler;
use crate::storage::ChromeStorage;
use formfill_common::store;
use formfill_common::{disambiguate_tags, find_matches, CollectMode, EngineConfig, InputSnapshot, MatchCandidate, SavedValue};
use serde::Serialize;
use std::cell::RefCell;
use wasm_bindgen::prelude::*;
use web_sys::Document;

thread_local! {
    static CONFIG: RefCell<EngineConfig> = RefCell::new(EngineConfig::default());
}

pub fn current_config() -> EngineConfig {
    CONFIG.with(|config| config.borrow().clone())
}

pub fn page_document() -> Option<Document> {
    web_sys::window().and_then(|w| w.document())
}

pub fn page_url() -> Option<String> {
    web_sys::window().and_then(|w| w.location().href().ok())
}

/// 保存用に現在のページの入力を取り出す
pub fn page_snapshots() -> Vec<InputSnapshot> {
    match page_document() {
        Some(document) => extract_all(&collect(&document, CollectMode::Save)),
        None => Vec::new(),
    }
}

pub fn fill_page(snapshots: &[SavedValue]) -> usize {
    match page_document() {
        Some(document) => filler::fill_from_snapshots(&document, snapshots, &current_config()),
        None => 0,
    }
}

/// 現在のページに対する候補。読込に失敗した場合は空
pub async fn current_page_matches() -> Vec<MatchCandidate> {
    let Some(url) = page_url() else {
        return Vec::new();
    };
    let count = page_snapshots().len();

    match find_matches(&ChromeStorage, &url, count).await {
        Ok(candidates) => candidates,
        Err(e) => {
            log::error!("候補の取得に失敗: {}", e);
            Vec::new()
        }
    }
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

fn to_js_error(e: formfill_common::Error) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// 現在のページの入力スナップショット
#[wasm_bindgen(js_name = getInputValues)]
pub fn get_input_values() -> Result<JsValue, JsValue> {
    to_js(&page_snapshots())
}

/// スナップショット列をページへ入力する
#[wasm_bindgen(js_name = fillFromSnapshots)]
pub fn fill_from_snapshots(snapshots: JsValue) -> usize {
    match serde_wasm_bindgen::from_value::<Vec<SavedValue>>(snapshots) {
        Ok(snapshots) => fill_page(&snapshots),
        Err(e) => {
            log::error!("スナップショットの形式が不正です: {}", e);
            0
        }
    }
}

/// 保存済みデータから候補を探す
#[wasm_bindgen(js_name = findMatches)]
pub async fn find_matches_js(url: String, current_input_count: usize) -> Result<JsValue, JsValue> {
    let candidates = match find_matches(&ChromeStorage, &url, current_input_count).await {
        Ok(candidates) => candidates,
        Err(e) => {
            log::error!("候補の取得に失敗: {}", e);
            Vec::new()
        }
    };
    to_js(&candidates)
}

/// 同名タグに出典URLの接尾辞を付ける
#[wasm_bindgen(js_name = disambiguateTags)]
pub fn disambiguate_tags_js(candidates: JsValue) -> Result<JsValue, JsValue> {
    let candidates: Vec<MatchCandidate> =
        serde_wasm_bindgen::from_value(candidates).map_err(|e| JsValue::from_str(&e.to_string()))?;
    to_js(&disambiguate_tags(candidates))
}

#[wasm_bindgen(js_name = clearInputs)]
pub fn clear_inputs() -> usize {
    match page_document() {
        Some(document) => filler::clear_inputs(&collect(&document, CollectMode::FillTarget)),
        None => 0,
    }
}

/// 現在のページの入力をタグ名で保存する。保存した件数を返す
#[wasm_bindgen(js_name = saveInputs)]
pub async fn save_inputs(tag: String) -> Result<usize, JsValue> {
    let document = page_document().ok_or_else(|| JsValue::from_str("document がありません"))?;
    let url = page_url().ok_or_else(|| JsValue::from_str("URL が取得できません"))?;
    let snapshots: Vec<SavedValue> = page_snapshots().into_iter().map(SavedValue::from).collect();
    let timestamp: String = js_sys::Date::new_0().to_iso_string().into();

    store::save_tag(&ChromeStorage, &url, &tag, &snapshots, &document.title(), &timestamp)
        .await
        .map_err(to_js_error)?;
    Ok(snapshots.len())
}

/// タグを削除。サイトのレコードごと消えた場合は true
#[wasm_bindgen(js_name = deleteTag)]
pub async fn delete_tag(url: String, tag: String) -> Result<bool, JsValue> {
    store::delete_tag(&ChromeStorage, &url, &tag).await.map_err(to_js_error)
}

/// 設定を差し替える（省略した項目はデフォルト値）
#[wasm_bindgen]
pub fn configure(config: JsValue) -> Result<(), JsValue> {
    let config: EngineConfig = if config.is_undefined() || config.is_null() {
        EngineConfig::default()
    } else {
        serde_wasm_bindgen::from_value(config).map_err(|e| JsValue::from_str(&e.to_string()))?
    };
    CONFIG.with(|current| *current.borrow_mut() = config);
    Ok(())
}
