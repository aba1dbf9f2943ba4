//! chrome.storage.local をストアとして使う

use async_trait::async_trait;
use formfill_common::{Error, Result, Store, StoreBackend};
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(module = "/js/chrome-storage.js")]
extern "C" {
    #[wasm_bindgen(js_name = "storageGet", catch)]
    async fn storage_get_js(keys: JsValue) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(js_name = "storageSet", catch)]
    async fn storage_set_js(items: JsValue) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(js_name = "storageRemove", catch)]
    async fn storage_remove_js(keys: JsValue) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(js_name = "storageClear", catch)]
    async fn storage_clear_js() -> std::result::Result<JsValue, JsValue>;
}

fn storage_error(context: &str, e: JsValue) -> Error {
    Error::Storage(format!("{}: {:?}", context, e))
}

fn keys_to_js(keys: &[&str]) -> Result<JsValue> {
    serde_wasm_bindgen::to_value(keys).map_err(|e| Error::Storage(e.to_string()))
}

/// JSの素のオブジェクトとして渡す（Mapにしない）
fn store_to_js(store: &Store) -> Result<JsValue> {
    store
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| Error::Storage(e.to_string()))
}

fn store_from_js(value: JsValue) -> Result<Store> {
    if value.is_undefined() || value.is_null() {
        return Ok(Store::new());
    }
    serde_wasm_bindgen::from_value(value).map_err(|e| Error::Storage(e.to_string()))
}

/// 拡張機能のローカルストレージ
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeStorage;

#[async_trait(?Send)]
impl StoreBackend for ChromeStorage {
    async fn get_all(&self) -> Result<Store> {
        let value = storage_get_js(JsValue::NULL)
            .await
            .map_err(|e| storage_error("読込失敗", e))?;
        store_from_js(value)
    }

    async fn get(&self, keys: &[&str]) -> Result<Store> {
        let value = storage_get_js(keys_to_js(keys)?)
            .await
            .map_err(|e| storage_error("読込失敗", e))?;
        store_from_js(value)
    }

    async fn set(&self, entries: Store) -> Result<()> {
        storage_set_js(store_to_js(&entries)?)
            .await
            .map(|_| ())
            .map_err(|e| storage_error("保存失敗", e))
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        storage_remove_js(keys_to_js(keys)?)
            .await
            .map(|_| ())
            .map_err(|e| storage_error("削除失敗", e))
    }

    async fn clear(&self) -> Result<()> {
        storage_clear_js()
            .await
            .map(|_| ())
            .map_err(|e| storage_error("全削除失敗", e))
    }
}
