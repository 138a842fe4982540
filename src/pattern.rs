use serde_derive::{Deserialize, Serialize};

use crate::config::Dialect;

const EOW_CHAR: char = '$';
const WILDCARD_CHAR: char = '*';
const ESCAPED_SLASH: &str = "%2F";
const ESCAPED_PERCENT: &str = "%25";

/// A path pattern from an `Allow` or `Disallow` line, compiled for both
/// dialects up front so the same parsed document can be queried under
/// either one.
///
/// Under the classic dialect the whole pattern is a literal prefix. Under
/// the wildcard dialect it is split into literal runs around each `*`. A
/// trailing `$` anchors a pattern without any `*` to the end of the path;
/// once a `*` is present every `$` is an ordinary character. So
/// `Disallow: /*.php$` only matches paths that contain `.php$` literally and
/// does not block `/index.php`. Write `Disallow: /*.php` to block those.
///
/// Literal runs are percent-decoded, except for `%2F` and `%25` which stay
/// escaped (with an upper case hex digit). An escaped slash never matches a
/// real `/`, and an escaped percent sign never turns into part of another
/// escape.
/// Query paths go through the same [`normalize_path`] before matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledPattern {
    raw: String,
    prefix: String,
    segments: Vec<String>,
    anchored: bool,
}

impl CompiledPattern {
    pub fn compile(raw: &str) -> Self {
        let (body, anchored) = match raw.strip_suffix(EOW_CHAR) {
            Some(body) if !body.contains(WILDCARD_CHAR) => (body, true),
            _ => (raw, false),
        };

        // Split before decoding so that an escaped %2A stays a literal '*'.
        let segments = body.split(WILDCARD_CHAR).map(normalize_path).collect();

        Self {
            raw: raw.to_string(),
            prefix: normalize_path(raw),
            segments,
            anchored,
        }
    }

    /// The pattern as written in the document.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// An empty pattern matches every path.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Number of literal characters in the pattern. Longer patterns are more
    /// specific and take precedence over shorter ones.
    pub fn specificity(&self, dialect: Dialect) -> usize {
        match dialect {
            Dialect::Classic => self.prefix.chars().count(),
            Dialect::WildcardExtended => self.segments.iter().map(|s| s.chars().count()).sum(),
        }
    }

    /// Match a path that has already been through [`normalize_path`].
    pub fn matches(&self, path: &str, dialect: Dialect) -> bool {
        match dialect {
            Dialect::Classic => path.starts_with(&self.prefix[..]),
            Dialect::WildcardExtended => self.matches_wildcard(path),
        }
    }

    fn matches_wildcard(&self, path: &str) -> bool {
        let (first, rest) = match self.segments.split_first() {
            Some(split) => split,
            None => return true,
        };

        let mut remaining = match path.strip_prefix(&first[..]) {
            Some(remaining) => remaining,
            None => return false,
        };

        let (last, middle) = match rest.split_last() {
            Some(split) => split,
            // No wildcard at all: a plain prefix, or an exact match if anchored.
            None => return !self.anchored || remaining.is_empty(),
        };

        // Taking the leftmost occurrence of each middle run leaves the most
        // room for the runs after it.
        for segment in middle {
            match remaining.find(&segment[..]) {
                Some(at) => remaining = &remaining[at + segment.len()..],
                None => return false,
            }
        }

        remaining.contains(&last[..])
    }
}

/// Percent-decode a path for comparison, leaving `%2F` and `%25` escaped.
///
/// Escapes that decode to invalid UTF-8 are left as they are.
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut rest = path;

    while let Some((at, escape)) = find_kept_escape(rest) {
        out.push_str(&decode(&rest[..at]));
        out.push_str(escape);
        rest = &rest[at + 3..];
    }
    out.push_str(&decode(rest));
    out
}

/// Find the first `%2F` or `%25`, in either case, and its canonical form.
fn find_kept_escape(s: &str) -> Option<(usize, &'static str)> {
    s.as_bytes()
        .windows(3)
        .enumerate()
        .find_map(|(at, w)| match (w[0], w[1], w[2]) {
            (b'%', b'2', b'f') | (b'%', b'2', b'F') => Some((at, ESCAPED_SLASH)),
            (b'%', b'2', b'5') => Some((at, ESCAPED_PERCENT)),
            _ => None,
        })
}

fn decode(s: &str) -> String {
    if !s.contains('%') {
        return s.to_string();
    }
    let bytes = urlencoding::decode_binary(s.as_bytes());
    String::from_utf8(bytes.into_owned()).unwrap_or_else(|_| s.to_string())
}
