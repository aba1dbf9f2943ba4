//! 永続ストアの抽象化と操作
//!
//! ブラウザ拡張では `chrome.storage.local`、CLIではJSONファイルが実体。
//! キー・バリュー型の get/set/remove/clear だけを前提にする。

use crate::error::{Error, Result};
use crate::types::{SavedValue, SiteRecord, Store};
use async_trait::async_trait;
use std::cell::RefCell;

/// キー・バリュー型ストレージ
#[async_trait(?Send)]
pub trait StoreBackend {
    /// 全エントリを取得
    async fn get_all(&self) -> Result<Store>;

    /// 指定キーのみ取得（存在しないキーは結果に含まれない）
    async fn get(&self, keys: &[&str]) -> Result<Store>;

    /// エントリを書き込み（既存キーは上書き）
    async fn set(&self, entries: Store) -> Result<()>;

    async fn remove(&self, keys: &[&str]) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// メモリ上のストア
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RefCell<Store>,
}

impl MemoryStore {
    pub fn new(store: Store) -> Self {
        Self {
            inner: RefCell::new(store),
        }
    }

    pub fn snapshot(&self) -> Store {
        self.inner.borrow().clone()
    }
}

#[async_trait(?Send)]
impl StoreBackend for MemoryStore {
    async fn get_all(&self) -> Result<Store> {
        Ok(self.inner.borrow().clone())
    }

    async fn get(&self, keys: &[&str]) -> Result<Store> {
        let inner = self.inner.borrow();
        let mut result = Store::new();
        for key in keys {
            if let Some(value) = inner.get_value(key) {
                result.insert_value(key, value.clone());
            }
        }
        Ok(result)
    }

    async fn set(&self, entries: Store) -> Result<()> {
        self.inner.borrow_mut().extend(entries);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        for key in keys {
            inner.remove(key);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.inner.borrow_mut() = Store::new();
        Ok(())
    }
}

/// 統計情報
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub sites: usize,
    pub tags: usize,
}

/// テストデータのサイト数とタグ総数
pub fn stats(store: &Store) -> StoreStats {
    let sites = store.test_data_sites();
    StoreStats {
        sites: sites.len(),
        tags: sites.site_records().map(|(_, r)| r.tag_count()).sum(),
    }
}

async fn read_record<B>(backend: &B, url: &str) -> Result<Option<SiteRecord>>
where
    B: StoreBackend + ?Sized,
{
    let found = backend.get(&[url]).await?;
    Ok(found.record(url))
}

async fn write_record<B>(backend: &B, url: &str, record: SiteRecord) -> Result<()>
where
    B: StoreBackend + ?Sized,
{
    let mut entries = Store::new();
    entries.insert_record(url, record);
    backend.set(entries).await
}

/// タグを保存（同名タグは置き換え）
pub async fn save_tag<B>(
    backend: &B,
    url: &str,
    tag: &str,
    snapshots: &[SavedValue],
    page_title: &str,
    timestamp: &str,
) -> Result<()>
where
    B: StoreBackend + ?Sized,
{
    let tag = tag.trim();
    if snapshots.is_empty() {
        return Err(Error::InvalidTag(format!("{}: 保存する入力がありません", tag)));
    }

    let mut record = read_record(backend, url).await?.unwrap_or_default();
    record.insert_tag(tag, snapshots)?;
    record.set_page_title(page_title);
    record.touch(timestamp);
    write_record(backend, url, record).await?;

    log::info!("保存しました: {} ({}件) -> {}", tag, snapshots.len(), url);
    Ok(())
}

/// タグを削除。最後のタグならレコードごと削除する
///
/// 戻り値はレコード自体を削除したかどうか。
pub async fn delete_tag<B>(backend: &B, url: &str, tag: &str) -> Result<bool>
where
    B: StoreBackend + ?Sized,
{
    let mut record = read_record(backend, url)
        .await?
        .ok_or_else(|| Error::SiteNotFound(url.to_string()))?;

    if !record.remove_tag(tag) {
        return Err(Error::TagNotFound {
            url: url.to_string(),
            tag: tag.to_string(),
        });
    }

    if record.tag_count() == 0 {
        backend.remove(&[url]).await?;
        log::info!("最後のタグを削除したためレコードを削除: {}", url);
        Ok(true)
    } else {
        write_record(backend, url, record).await?;
        log::info!("タグを削除: {} ({})", tag, url);
        Ok(false)
    }
}

/// サイトのデータを丸ごと削除
pub async fn delete_site<B>(backend: &B, url: &str) -> Result<()>
where
    B: StoreBackend + ?Sized,
{
    if read_record(backend, url).await?.is_none() {
        return Err(Error::SiteNotFound(url.to_string()));
    }
    backend.remove(&[url]).await
}

/// タグを別のサイトへ複製
///
/// 複製先は既存のレコードに限る。同名タグがあれば `overwrite` が必要。
pub async fn copy_tag<B>(backend: &B, from_url: &str, tag: &str, to_url: &str, overwrite: bool) -> Result<()>
where
    B: StoreBackend + ?Sized,
{
    let source = read_record(backend, from_url)
        .await?
        .ok_or_else(|| Error::SiteNotFound(from_url.to_string()))?;
    let entry = source.tag(tag).ok_or_else(|| Error::TagNotFound {
        url: from_url.to_string(),
        tag: tag.to_string(),
    })?;

    let mut target = read_record(backend, to_url)
        .await?
        .ok_or_else(|| Error::SiteNotFound(to_url.to_string()))?;
    if target.contains_tag(tag) && !overwrite {
        return Err(Error::TagExists {
            url: to_url.to_string(),
            tag: tag.to_string(),
        });
    }

    target.insert_tag(tag, &entry)?;
    write_record(backend, to_url, target).await?;
    log::info!("タグを複製: {} ({} -> {})", tag, from_url, to_url);
    Ok(())
}

/// テストデータの形状を持つエントリだけを読み込む
pub async fn load_test_data<B>(backend: &B) -> Result<Store>
where
    B: StoreBackend + ?Sized,
{
    Ok(backend.get_all().await?.test_data_sites())
}

/// 全サイトをエクスポート
pub fn export_all(store: &Store) -> Store {
    store.test_data_sites()
}

/// 1サイト分をエクスポート
pub fn export_site(store: &Store, url: &str) -> Result<Store> {
    let record = store
        .record(url)
        .ok_or_else(|| Error::SiteNotFound(url.to_string()))?;
    let mut exported = Store::new();
    exported.insert_record(url, record);
    Ok(exported)
}

/// 1タグ分をエクスポート（メタデータは含まない）
pub fn export_tag(store: &Store, url: &str, tag: &str) -> Result<Store> {
    let record = store
        .record(url)
        .ok_or_else(|| Error::SiteNotFound(url.to_string()))?;
    let entry = record.tag(tag).ok_or_else(|| Error::TagNotFound {
        url: url.to_string(),
        tag: tag.to_string(),
    })?;

    let mut only_tag = SiteRecord::new();
    only_tag.insert_tag(tag, &entry)?;
    let mut exported = Store::new();
    exported.insert_record(url, only_tag);
    Ok(exported)
}

/// インポート（既存データは全て置き換え）
pub async fn import_store<B>(backend: &B, json: &str) -> Result<usize>
where
    B: StoreBackend + ?Sized,
{
    let imported = Store::from_json(json)?;
    let count = imported.len();
    backend.clear().await?;
    backend.set(imported).await?;
    log::info!("{}件のエントリをインポート", count);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InputSnapshot;
    use futures::executor::block_on;
    use serde_json::json;

    const URL: &str = "https://example.com/signup";
    const OTHER: &str = "https://example.com/profile";
    const NOW: &str = "2025-01-18T09:00:00.000Z";

    fn snapshots() -> Vec<SavedValue> {
        vec![
            InputSnapshot::text("taro", "text").into(),
            InputSnapshot::text("taro@example.com", "email").into(),
        ]
    }

    #[test]
    fn test_save_tag_creates_record() {
        let backend = MemoryStore::default();
        block_on(save_tag(&backend, URL, "会員", &snapshots(), "会員登録", NOW)).expect("保存失敗");

        let record = backend.snapshot().record(URL).expect("レコードがない");
        assert_eq!(record.tag_names(), vec!["会員"]);
        assert_eq!(record.page_title(), Some("会員登録"));
        assert_eq!(record.saved_at(), Some(NOW));
        assert_eq!(record.last_updated(), Some(NOW));
    }

    #[test]
    fn test_save_tag_replaces_existing() {
        let backend = MemoryStore::default();
        block_on(save_tag(&backend, URL, "a", &snapshots(), "t", NOW)).expect("保存失敗");
        let replacement = vec![SavedValue::Raw("only".to_string())];
        block_on(save_tag(&backend, URL, "a", &replacement, "t", NOW)).expect("保存失敗");

        let record = backend.snapshot().record(URL).expect("レコードがない");
        assert_eq!(record.tag("a"), Some(replacement));
    }

    #[test]
    fn test_save_tag_trims_tag_name() {
        let backend = MemoryStore::default();
        block_on(save_tag(&backend, URL, " 会員 ", &snapshots(), "t", NOW)).expect("保存失敗");

        let record = backend.snapshot().record(URL).expect("レコードがない");
        assert_eq!(record.tag_names(), vec!["会員"]);
        assert_eq!(record.tag("会員"), Some(snapshots()));
    }

    #[test]
    fn test_save_tag_rejects_empty_snapshots() {
        let backend = MemoryStore::default();
        let result = block_on(save_tag(&backend, URL, "a", &[], "t", NOW));
        assert!(matches!(result, Err(Error::InvalidTag(_))));
        assert!(backend.snapshot().is_empty());
    }

    #[test]
    fn test_delete_last_tag_removes_record() {
        let backend = MemoryStore::default();
        block_on(save_tag(&backend, URL, "a", &snapshots(), "t", NOW)).expect("保存失敗");
        block_on(save_tag(&backend, URL, "b", &snapshots(), "t", NOW)).expect("保存失敗");

        assert!(!block_on(delete_tag(&backend, URL, "a")).expect("削除失敗"));
        assert!(backend.snapshot().contains(URL));

        assert!(block_on(delete_tag(&backend, URL, "b")).expect("削除失敗"));
        assert!(!backend.snapshot().contains(URL));
    }

    #[test]
    fn test_delete_missing_tag() {
        let backend = MemoryStore::default();
        let result = block_on(delete_tag(&backend, URL, "a"));
        assert!(matches!(result, Err(Error::SiteNotFound(_))));

        block_on(save_tag(&backend, URL, "a", &snapshots(), "t", NOW)).expect("保存失敗");
        let result = block_on(delete_tag(&backend, URL, "zzz"));
        assert!(matches!(result, Err(Error::TagNotFound { .. })));
    }

    #[test]
    fn test_copy_tag_requires_overwrite() {
        let backend = MemoryStore::default();
        block_on(save_tag(&backend, URL, "a", &snapshots(), "t", NOW)).expect("保存失敗");
        block_on(save_tag(&backend, OTHER, "a", &[SavedValue::Raw("x".into())], "p", NOW)).expect("保存失敗");

        let result = block_on(copy_tag(&backend, URL, "a", OTHER, false));
        assert!(matches!(result, Err(Error::TagExists { .. })));

        block_on(copy_tag(&backend, URL, "a", OTHER, true)).expect("複製失敗");
        let target = backend.snapshot().record(OTHER).expect("レコードがない");
        assert_eq!(target.tag("a"), Some(snapshots()));
        assert_eq!(target.page_title(), Some("p"));
    }

    #[test]
    fn test_copy_tag_to_unknown_site() {
        let backend = MemoryStore::default();
        block_on(save_tag(&backend, URL, "a", &snapshots(), "t", NOW)).expect("保存失敗");
        let result = block_on(copy_tag(&backend, URL, "a", OTHER, false));
        assert!(matches!(result, Err(Error::SiteNotFound(_))));
    }

    #[test]
    fn test_import_replaces_everything() {
        let backend = MemoryStore::default();
        block_on(save_tag(&backend, URL, "a", &snapshots(), "t", NOW)).expect("保存失敗");

        let json = json!({OTHER: {"b": [{"value": "1", "type": "text"}]}}).to_string();
        let count = block_on(import_store(&backend, &json)).expect("インポート失敗");

        assert_eq!(count, 1);
        let store = backend.snapshot();
        assert!(!store.contains(URL));
        assert!(store.contains(OTHER));
    }

    #[test]
    fn test_import_rejects_non_object() {
        let backend = MemoryStore::default();
        block_on(save_tag(&backend, URL, "a", &snapshots(), "t", NOW)).expect("保存失敗");

        let result = block_on(import_store(&backend, "[]"));
        assert!(matches!(result, Err(Error::InvalidImport(_))));
        assert!(backend.snapshot().contains(URL));
    }

    #[test]
    fn test_stats_and_exports() {
        let backend = MemoryStore::new(Store::from(
            json!({"settings": {"theme": "dark"}}).as_object().cloned().unwrap_or_default(),
        ));
        block_on(save_tag(&backend, URL, "a", &snapshots(), "t", NOW)).expect("保存失敗");
        block_on(save_tag(&backend, URL, "b", &snapshots(), "t", NOW)).expect("保存失敗");
        block_on(save_tag(&backend, OTHER, "c", &snapshots(), "p", NOW)).expect("保存失敗");

        let store = backend.snapshot();
        assert_eq!(stats(&store), StoreStats { sites: 2, tags: 3 });
        assert_eq!(export_all(&store).len(), 2);
        assert_eq!(block_on(load_test_data(&backend)).expect("読込失敗").len(), 2);

        let site = export_site(&store, URL).expect("エクスポート失敗");
        assert_eq!(site.record(URL).map(|r| r.tag_count()), Some(2));

        let tag = export_tag(&store, URL, "b").expect("エクスポート失敗");
        let record = tag.record(URL).expect("レコードがない");
        assert_eq!(record.tag_names(), vec!["b"]);
        assert_eq!(record.page_title(), None);
    }
}
