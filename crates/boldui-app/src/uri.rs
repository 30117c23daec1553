//! Relative-path parsing for `R2AOpen`.
//!
//! A path looks like `/counter/widget?session=abc&theme=dark`: `/`-separated
//! segments followed by an optional `?`-prefixed, `&`-joined query string.
//! `session` is a reserved query key, split out on its own so callers don't
//! have to special-case it among the rest.

use rustc_hash::FxHashMap;
use zng_txt::Txt;

/// The result of splitting an opened path into its routing pieces.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedUri {
    /// Non-empty `/`-separated segments, in order (`"/a/b"` → `["a", "b"]`).
    pub segments: Vec<Txt>,
    /// Every query parameter except `session`.
    pub query: FxHashMap<Txt, Txt>,
    /// The `session=` query parameter, if present.
    pub session: Option<Txt>,
}

/// Splits `path` into segments and query parameters. A missing or empty
/// query string yields an empty map; a query key with no `=value` is
/// recorded with an empty value.
pub fn parse_relative_path(path: &str) -> ParsedUri {
    let (path_part, query_part) = match path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path, None),
    };

    let segments = path_part.split('/').filter(|s| !s.is_empty()).map(Txt::from).collect();

    let mut query = FxHashMap::default();
    let mut session = None;
    if let Some(query_part) = query_part {
        for pair in query_part.split('&').filter(|s| !s.is_empty()) {
            let (key, value) = match pair.split_once('=') {
                Some((k, v)) => (k, v),
                None => (pair, ""),
            };
            if key == "session" {
                session = Some(Txt::from(value));
            } else {
                query.insert(Txt::from(key), Txt::from(value));
            }
        }
    }

    ParsedUri { segments, query, session }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_segments_and_drops_empty_ones() {
        let parsed = parse_relative_path("/counter/widget");
        assert_eq!(parsed.segments, vec![Txt::from("counter"), Txt::from("widget")]);
    }

    #[test]
    fn extracts_reserved_session_param() {
        let parsed = parse_relative_path("/counter?session=abc&theme=dark");
        assert_eq!(parsed.session, Some(Txt::from("abc")));
        assert_eq!(parsed.query.get(&Txt::from("theme")), Some(&Txt::from("dark")));
        assert!(!parsed.query.contains_key(&Txt::from("session")));
    }

    #[test]
    fn root_path_has_no_segments() {
        let parsed = parse_relative_path("/");
        assert!(parsed.segments.is_empty());
        assert!(parsed.session.is_none());
    }

    #[test]
    fn key_without_equals_sign_gets_empty_value() {
        let parsed = parse_relative_path("/a?flag");
        assert_eq!(parsed.query.get(&Txt::from("flag")), Some(&Txt::from("")));
    }
}
