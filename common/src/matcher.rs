//! 保存データ照合モジュール
//!
//! 現在のURLと入力要素数から、適用できる保存データを探す。
//!
//! 1. 厳密キーが一致するURLの全タグを候補にする
//! 2. 厳密一致が1件でもあればそれだけを返す
//! 3. なければ緩いキーで探し、入力数の差が最小のものだけを残す

use crate::error::Result;
use crate::store::StoreBackend;
use crate::types::{MatchCandidate, MatchType, SiteRecord, Store};
use crate::url_key::{loose_key, strict_key};
use std::collections::HashMap;

const DUPLICATE_SUFFIX_CHARS: usize = 8;

fn candidates_for(
    url: &str,
    record: &SiteRecord,
    current_input_count: usize,
    match_type: MatchType,
) -> Vec<MatchCandidate> {
    let page_title = record.page_title().unwrap_or(url).to_string();

    record
        .tags()
        .into_iter()
        .map(|(tag, data)| {
            let test_data_count = data.len();
            let count_difference = test_data_count.abs_diff(current_input_count);
            log::debug!(
                "[{}] {} ({}件, 差: {})",
                match_type,
                tag,
                test_data_count,
                count_difference
            );
            MatchCandidate {
                tag: tag.to_string(),
                data,
                source_url: url.to_string(),
                page_title: page_title.clone(),
                test_data_count,
                count_difference,
                match_type,
            }
        })
        .collect()
}

fn collect_by_key<F>(
    store: &Store,
    key: &str,
    key_fn: F,
    current_input_count: usize,
    match_type: MatchType,
) -> Vec<MatchCandidate>
where
    F: Fn(&str) -> Option<String>,
{
    store
        .site_records()
        .filter(|(stored_url, _)| key_fn(stored_url).as_deref() == Some(key))
        .flat_map(|(stored_url, record)| {
            candidates_for(stored_url, &record, current_input_count, match_type)
        })
        .collect()
}

/// ストアから現在のページに合う候補を探す
pub fn resolve(store: &Store, current_url: &str, current_input_count: usize) -> Vec<MatchCandidate> {
    let (strict, loose) = match (strict_key(current_url), loose_key(current_url)) {
        (Some(strict), Some(loose)) => (strict, loose),
        _ => return Vec::new(),
    };

    log::debug!(
        "照合開始: 入力数 {}, 厳密キー {}, 緩いキー {}",
        current_input_count,
        strict,
        loose
    );

    let strict_matches = collect_by_key(
        store,
        &strict,
        strict_key,
        current_input_count,
        MatchType::Strict,
    );
    if !strict_matches.is_empty() {
        log::debug!("厳密一致 {}件、緩い照合はスキップ", strict_matches.len());
        return strict_matches;
    }

    let loose_matches = collect_by_key(
        store,
        &loose,
        loose_key,
        current_input_count,
        MatchType::Loose,
    );
    let Some(min_difference) = loose_matches.iter().map(|c| c.count_difference).min() else {
        return Vec::new();
    };

    let filtered: Vec<MatchCandidate> = loose_matches
        .into_iter()
        .filter(|c| c.count_difference == min_difference)
        .collect();
    log::debug!("緩い一致: 最小差 {} の {}件を採用", min_difference, filtered.len());
    filtered
}

/// バックエンドを読み込んで照合する
pub async fn find_matches<B>(
    backend: &B,
    current_url: &str,
    current_input_count: usize,
) -> Result<Vec<MatchCandidate>>
where
    B: StoreBackend + ?Sized,
{
    let store = backend.get_all().await?;
    Ok(resolve(&store, current_url, current_input_count))
}

/// URLの最後の `/` 以降（先頭8文字）
fn url_suffix(url: &str) -> String {
    url.rsplit('/')
        .next()
        .unwrap_or("")
        .chars()
        .take(DUPLICATE_SUFFIX_CHARS)
        .collect()
}

/// 同名タグの2件目以降に取得元URLの末尾を付けて区別する
pub fn disambiguate_tags(candidates: Vec<MatchCandidate>) -> Vec<MatchCandidate> {
    let mut seen: HashMap<String, usize> = HashMap::new();

    candidates
        .into_iter()
        .map(|mut candidate| {
            let count = seen.entry(candidate.tag.clone()).or_insert(0);
            *count += 1;
            if *count > 1 {
                candidate.tag = format!("{}_{}", candidate.tag, url_suffix(&candidate.source_url));
            }
            candidate
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn entry(count: usize) -> Value {
        Value::Array(
            (0..count)
                .map(|i| json!({"value": format!("v{}", i), "type": "text"}))
                .collect(),
        )
    }

    fn store(value: Value) -> Store {
        Store::from(value.as_object().cloned().unwrap_or_default())
    }

    #[test]
    fn test_strict_supersedes_loose() {
        let store = store(json!({
            "https://example.com/orders/edit?id=1": {"strict": entry(8)},
            "https://example.com/items/edit?id=9": {"loose": entry(3)}
        }));

        let matches = resolve(&store, "https://example.com/orders/edit?id=1#x", 3);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].tag, "strict");
        assert_eq!(matches[0].count_difference, 5);
        assert_eq!(matches[0].match_type, MatchType::Strict);
    }

    #[test]
    fn test_loose_keeps_only_minimum_difference() {
        let store = store(json!({
            "https://example.com/orders/edit-1": {"far": entry(6)},
            "https://example.com/orders/edit-2": {"near1": entry(3)},
            "https://example.com/orders/edit-3": {"near2": entry(3)}
        }));

        let matches = resolve(&store, "https://example.com/orders/edit-4", 3);
        let tags: Vec<&str> = matches.iter().map(|m| m.tag.as_str()).collect();
        assert_eq!(tags, vec!["near1", "near2"]);
        assert!(matches.iter().all(|m| m.match_type == MatchType::Loose));
        assert!(matches.iter().all(|m| m.count_difference == 0));
    }

    #[test]
    fn test_strict_returns_all_tags_regardless_of_difference() {
        let store = store(json!({
            "https://example.com/form": {
                "_pageTitle": "申込フォーム",
                "a": entry(1),
                "b": entry(10)
            }
        }));

        let matches = resolve(&store, "https://example.com/form", 2);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].page_title, "申込フォーム");
        assert_eq!(matches[1].count_difference, 8);
        assert_eq!(matches[1].test_data_count, 10);
    }

    #[test]
    fn test_page_title_falls_back_to_url() {
        let store = store(json!({"https://example.com/form": {"a": entry(1)}}));
        let matches = resolve(&store, "https://example.com/form", 1);
        assert_eq!(matches[0].page_title, "https://example.com/form");
    }

    #[test]
    fn test_unrelated_keys_are_ignored() {
        let store = store(json!({
            "settings": {"theme": "dark"},
            "not a url": {"tag": entry(1)},
            "https://example.com/form": "oops"
        }));
        assert!(resolve(&store, "https://example.com/form", 1).is_empty());
    }

    #[test]
    fn test_tags_with_unreadable_entries_are_still_offered() {
        let store = store(json!({
            "https://example.com/form": {
                "t": [{"value": "a", "type": "text"}, null, "c"],
                "n": [{"value": 5, "type": "number"}]
            }
        }));

        let matches = resolve(&store, "https://example.com/form", 3);
        let tags: Vec<(&str, usize)> = matches.iter().map(|m| (m.tag.as_str(), m.test_data_count)).collect();
        assert_eq!(tags, vec![("t", 3), ("n", 1)]);
        assert_eq!(matches[0].count_difference, 0);
    }

    #[test]
    fn test_unparseable_current_url() {
        let store = store(json!({"https://example.com/form": {"a": entry(3)}}));
        assert!(resolve(&store, "not a url", 3).is_empty());
    }

    #[test]
    fn test_no_matches() {
        let store = store(json!({"https://other.test/form": {"a": entry(3)}}));
        assert!(resolve(&store, "https://example.com/form", 3).is_empty());
    }

    #[test]
    fn test_disambiguate_tags() {
        let make = |tag: &str, url: &str| MatchCandidate {
            tag: tag.to_string(),
            data: vec![],
            source_url: url.to_string(),
            page_title: url.to_string(),
            test_data_count: 0,
            count_difference: 0,
            match_type: MatchType::Loose,
        };

        let result = disambiguate_tags(vec![
            make("default", "https://example.com/orders/edit-123456789"),
            make("default", "https://example.com/orders/edit-987654321"),
            make("other", "https://example.com/orders/edit-5"),
        ]);

        assert_eq!(result[0].tag, "default");
        assert_eq!(result[1].tag, "default_edit-987");
        assert_eq!(result[2].tag, "other");
    }
}
