//! Block extraction from document text.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::canonical::canonicalize;
use crate::syntax::BlockSyntax;

static ATTR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_][\w-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|(\S+))"#).unwrap()
});

/// A diagram block found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedBlock {
    /// Zero-based position of this block within its document.
    pub ordinal: usize,
    /// Text between the markers with the fence wrapper stripped.
    ///
    /// Internal whitespace is preserved exactly; use
    /// [`canonical`](Self::canonical) for hashing.
    pub raw: String,
    /// Attributes from the opening marker (`alt="..."`).
    pub attrs: BTreeMap<String, String>,
    /// Byte range of the whole shortcode in the document.
    pub span: Range<usize>,
}

impl EmbeddedBlock {
    /// Canonical content used for fingerprinting.
    #[must_use]
    pub fn canonical(&self) -> &str {
        canonicalize(&self.raw)
    }
}

/// Extract all diagram blocks from `text`, in document order.
///
/// Matching is lazy up to the next closing marker, so nested markers are not
/// supported: an inner opener becomes part of the outer block's body and the
/// outer closer is left unmatched. Unterminated blocks are ignored.
#[must_use]
pub fn extract(text: &str, syntax: &BlockSyntax) -> Vec<EmbeddedBlock> {
    syntax
        .block
        .captures_iter(text)
        .filter_map(|caps| {
            let span = caps.get(0)?.range();
            let body = caps.name("body").map_or("", |m| m.as_str());
            let attrs = caps
                .name("attrs")
                .map(|m| parse_attrs(m.as_str()))
                .unwrap_or_default();
            Some((span, syntax.strip_fence(body).to_owned(), attrs))
        })
        .enumerate()
        .map(|(ordinal, (span, raw, attrs))| EmbeddedBlock {
            ordinal,
            raw,
            attrs,
            span,
        })
        .collect()
}

/// Parse `key="value"` pairs from an opening marker.
fn parse_attrs(s: &str) -> BTreeMap<String, String> {
    ATTR_PATTERN
        .captures_iter(s)
        .filter_map(|caps| {
            let key = caps.get(1)?.as_str().to_owned();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str())
                .to_owned();
            Some((key, value))
        })
        .collect()
}
