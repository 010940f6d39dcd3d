use serde::Serialize;

/// A single `name=value` pair taken from the `Cookie` request header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cookie {
    pub key: String,
    pub value: String,
}

impl Cookie {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Parse a raw `Cookie` header into ordered pairs.
///
/// Pairs keep header order. Segments without `=` or with an empty name are
/// skipped; when a name repeats, the first value wins. Values are trimmed,
/// unquoted and percent-decoded (the raw value is kept if decoding fails).
pub fn parse_cookies(header: Option<&str>) -> Vec<Cookie> {
    let mut cookies: Vec<Cookie> = Vec::new();

    for segment in header.unwrap_or_default().split(';') {
        let Some((key, value)) = segment.split_once('=') else {
            continue;
        };

        let key = key.trim();
        if key.is_empty() || cookies.iter().any(|c| c.key == key) {
            continue;
        }

        cookies.push(Cookie::new(key, decode_value(value.trim())));
    }

    cookies
}

fn decode_value(raw: &str) -> String {
    let unquoted = raw
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(raw);

    match urlencoding::decode(unquoted) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => unquoted.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_pairs_in_header_order() {
        let cookies = parse_cookies(Some("a=1; b=2"));
        assert_eq!(cookies, vec![Cookie::new("a", "1"), Cookie::new("b", "2")]);
    }

    #[test]
    fn test_empty_or_missing_header() {
        assert!(parse_cookies(Some("")).is_empty());
        assert!(parse_cookies(None).is_empty());
    }

    #[test]
    fn test_skips_malformed_pairs() {
        let cookies = parse_cookies(Some("junk; =nokey; ok=yes;;"));
        assert_eq!(cookies, vec![Cookie::new("ok", "yes")]);
    }

    #[test]
    fn test_first_duplicate_wins() {
        let cookies = parse_cookies(Some("id=first; id=second"));
        assert_eq!(cookies, vec![Cookie::new("id", "first")]);
    }

    #[test]
    fn test_unquotes_and_decodes_values() {
        let cookies = parse_cookies(Some(r#"name="hello%20world"; raw=%E0%A4%A"#));
        assert_eq!(cookies[0], Cookie::new("name", "hello world"));
        // Invalid UTF-8 after decoding keeps the raw text
        assert_eq!(cookies[1], Cookie::new("raw", "%E0%A4%A"));
    }

    #[test]
    fn test_value_may_contain_equals() {
        let cookies = parse_cookies(Some("token=abc=def"));
        assert_eq!(cookies, vec![Cookie::new("token", "abc=def")]);
    }
}
