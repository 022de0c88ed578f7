//! URL path segment codec
//!
//! A signed image URL ends in `<basename>.<token>.<ext>`, where the token is
//! unpadded base64url text and the extension is 3–4 word characters. The
//! basename itself may contain dots, so the segment parses greedily from the
//! left.

use std::sync::OnceLock;

use regex::Regex;

/// A parsed `<basename>.<token>.<ext>` path segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub basename: String,
    pub token: String,
    pub ext: String,
}

fn segment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<basename>.*)\.(?P<token>[A-Za-z0-9_-]+)\.(?P<ext>\w{3,4})$")
            .expect("segment pattern is static and must compile")
    })
}

/// Render a path segment from its parts
pub fn format_segment(basename: &str, token: &str, ext: &str) -> String {
    format!("{}.{}.{}", basename, token, ext)
}

/// Parse a path segment; None when it does not follow the token format
pub fn parse_segment(segment: &str) -> Option<PathSegment> {
    let caps = segment_pattern().captures(segment)?;
    Some(PathSegment {
        basename: caps["basename"].to_string(),
        token: caps["token"].to_string(),
        ext: caps["ext"].to_string(),
    })
}
