//! 一覧・候補の表示用整形

use chrono::{DateTime, Local};
use formfill_common::{MatchCandidate, SavedValue, Store};

/// サイト一覧の1行分
#[derive(Debug, Clone, PartialEq)]
pub struct SiteSummary {
    pub url: String,
    pub title: String,
    pub tags: Vec<String>,
    pub last_updated: Option<String>,
}

/// テストデータを持つサイトの一覧（ストアの順序のまま）
///
/// `filter` はタイトルまたはURLの部分一致（大文字小文字を区別しない）。
pub fn site_summaries(store: &Store, filter: Option<&str>) -> Vec<SiteSummary> {
    let query = filter.map(|q| q.to_lowercase());

    store
        .test_data_sites()
        .site_records()
        .map(|(url, record)| SiteSummary {
            url: url.to_string(),
            title: record.display_title(url),
            tags: record.tag_names().into_iter().map(String::from).collect(),
            last_updated: record.last_updated().map(String::from),
        })
        .filter(|summary| match &query {
            Some(q) => summary.title.to_lowercase().contains(q) || summary.url.to_lowercase().contains(q),
            None => true,
        })
        .collect()
}

/// ISO 8601 の時刻をローカル時刻で表示。解釈できなければそのまま
pub fn format_timestamp(timestamp: Option<&str>) -> String {
    let Some(timestamp) = timestamp else {
        return "不明".to_string();
    };
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(parsed) => parsed.with_timezone(&Local).format("%Y/%m/%d %H:%M").to_string(),
        Err(_) => timestamp.to_string(),
    }
}

pub fn candidate_line(candidate: &MatchCandidate) -> String {
    format!(
        "{} [{}] {} ({}項目, 差 {})",
        candidate.tag,
        candidate.match_type.label(),
        candidate.page_title,
        candidate.test_data_count,
        candidate.count_difference
    )
}

pub fn entry_line(index: usize, saved: &SavedValue) -> String {
    match saved {
        SavedValue::Snapshot(snapshot) => {
            let mut line = format!("{:>3}. [{}] {}", index + 1, snapshot.input_type, snapshot.value);
            if let Some(checked) = snapshot.checked {
                line.push_str(if checked { " ☑" } else { " ☐" });
            }
            if let Some(name) = &snapshot.name {
                line.push_str(&format!(" (name={})", name));
            }
            line
        }
        SavedValue::Raw(value) => format!("{:>3}. {}", index + 1, value),
        SavedValue::Other(value) => format!("{:>3}. ({})", index + 1, value),
    }
}
