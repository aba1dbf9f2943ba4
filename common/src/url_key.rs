//! URL照合キー生成
//!
//! - 厳密キー: ホスト + パス + クエリ（フラグメントは無視）
//! - 緩いキー: ホスト + "/" + 最後のパスセグメント先頭4文字
//!
//! 解析できないURLは None（照合不能として扱う）。

use url::Url;

const LOOSE_SEGMENT_CHARS: usize = 4;

fn parse(url: &str) -> Option<Url> {
    match Url::parse(url) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            log::debug!("URLを解析できません: {} ({})", url, e);
            None
        }
    }
}

fn hostname(url: &Url) -> &str {
    url.host_str().unwrap_or("")
}

/// `location.search` 相当（空クエリは空文字）
fn search(url: &Url) -> String {
    match url.query() {
        Some(query) if !query.is_empty() => format!("?{}", query),
        _ => String::new(),
    }
}

/// 厳密照合キー
pub fn strict_key(url: &str) -> Option<String> {
    let parsed = parse(url)?;
    Some(format!("{}{}{}", hostname(&parsed), parsed.path(), search(&parsed)))
}

/// 緩い照合キー
pub fn loose_key(url: &str) -> Option<String> {
    let parsed = parse(url)?;
    let path = parsed.path();
    let last_segment = path.rsplit('/').next().unwrap_or("");
    let last_segment = last_segment.split('?').next().unwrap_or("");
    let prefix: String = last_segment.chars().take(LOOSE_SEGMENT_CHARS).collect();
    Some(format!("{}/{}", hostname(&parsed), prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_key_includes_query() {
        assert_eq!(
            strict_key("https://shop.example.com/orders/new?step=2#top").as_deref(),
            Some("shop.example.com/orders/new?step=2")
        );
    }

    #[test]
    fn test_strict_key_ignores_fragment_only() {
        let a = strict_key("https://example.com/form?a=1#one");
        let b = strict_key("https://example.com/form?a=1#two");
        assert_eq!(a, b);
        assert_ne!(a, strict_key("https://example.com/form?a=2"));
    }

    #[test]
    fn test_strict_key_empty_query() {
        assert_eq!(
            strict_key("https://example.com/form?").as_deref(),
            Some("example.com/form")
        );
    }

    #[test]
    fn test_loose_key_uses_segment_prefix() {
        assert_eq!(
            loose_key("https://example.com/orders/ord-1234?x=1").as_deref(),
            Some("example.com/ord-")
        );
        assert_eq!(
            loose_key("https://example.com/orders/ord-1234"),
            loose_key("https://example.com/orders/ord-5678")
        );
    }

    #[test]
    fn test_loose_key_short_and_trailing_segments() {
        assert_eq!(loose_key("https://example.com/ab").as_deref(), Some("example.com/ab"));
        assert_eq!(loose_key("https://example.com/users/").as_deref(), Some("example.com/"));
        assert_eq!(loose_key("https://example.com").as_deref(), Some("example.com/"));
    }

    #[test]
    fn test_loose_key_requires_same_host() {
        assert_ne!(
            loose_key("https://a.example.com/edit"),
            loose_key("https://b.example.com/edit")
        );
    }

    #[test]
    fn test_unparseable_url() {
        assert_eq!(strict_key("not a url"), None);
        assert_eq!(loose_key("not a url"), None);
        assert_eq!(strict_key(""), None);
    }
}
