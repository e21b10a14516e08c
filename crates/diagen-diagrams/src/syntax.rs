//! Shortcode syntax for embedded diagram blocks.
//!
//! A block looks like this in a document:
//!
//! ````text
//! {{< plantuml alt="Login flow" >}}
//! ```plantuml
//! @startuml
//! A -> B
//! @enduml
//! ```
//! {{< /plantuml >}}
//! ````
//!
//! The marker name (`plantuml`) and the fence language are configurable.

use regex::Regex;

use crate::consts::{DEFAULT_LANGUAGE, DEFAULT_MARKER};

/// Error building a [`BlockSyntax`].
#[derive(Debug, thiserror::Error)]
pub enum SyntaxError {
    /// Marker name is empty or contains characters that cannot appear in a shortcode name.
    #[error("invalid marker name '{0}' (use letters, digits, '-', '_' or '/')")]
    InvalidMarker(String),
    /// Fence language is empty or contains whitespace.
    #[error("invalid fence language '{0}'")]
    InvalidLanguage(String),
    /// Pattern compilation failed.
    #[error("pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

/// Compiled patterns for one marker/fence-language pair.
#[derive(Debug, Clone)]
pub struct BlockSyntax {
    marker: String,
    language: String,
    /// Open marker, lazy body, close marker.
    pub(crate) block: Regex,
    /// Fence opener anchored at the very start of the body.
    pub(crate) fence_open: Regex,
    /// Fence closer anchored at the very end of the body.
    pub(crate) fence_close: Regex,
}

impl BlockSyntax {
    /// Build the syntax for a marker name and fence language.
    ///
    /// # Errors
    ///
    /// Returns [`SyntaxError`] if either name is empty or malformed.
    pub fn new(marker: &str, language: &str) -> Result<Self, SyntaxError> {
        let marker_ok = !marker.is_empty()
            && marker
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/'));
        if !marker_ok {
            return Err(SyntaxError::InvalidMarker(marker.to_owned()));
        }
        if language.is_empty() || language.chars().any(char::is_whitespace) {
            return Err(SyntaxError::InvalidLanguage(language.to_owned()));
        }

        let m = regex::escape(marker);
        let l = regex::escape(language);

        // Attributes must be separated from the marker by whitespace so that
        // `{{< plantumlx >}}` is not taken for a `plantuml` block.
        let block = Regex::new(&format!(
            r"\{{\{{<\s*{m}(?:\s+(?P<attrs>[^>]*?))?\s*>\}}\}}(?P<body>(?s:.*?))\{{\{{<\s*/{m}\s*>\}}\}}"
        ))?;
        let fence_open = Regex::new(&format!(r"\A```{l}\s*\n"))?;
        let fence_close = Regex::new(r"\n```\z")?;

        Ok(Self {
            marker: marker.to_owned(),
            language: language.to_owned(),
            block,
            fence_open,
            fence_close,
        })
    }

    /// Shortcode marker name.
    #[must_use]
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Fence language stripped from block bodies.
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Strip the fence wrapper from a block body.
    ///
    /// The opener is removed only at the very start of the body and the
    /// closer only at the very end, each independently. A body that starts
    /// with a newline before the fence keeps its fence, which is what the
    /// site template hashes as well.
    #[must_use]
    pub fn strip_fence<'a>(&self, body: &'a str) -> &'a str {
        let start = self.fence_open.find(body).map_or(0, |m| m.end());
        let rest = &body[start..];
        let end = self.fence_close.find(rest).map_or(rest.len(), |m| m.start());
        &rest[..end]
    }
}

impl Default for BlockSyntax {
    fn default() -> Self {
        // The default names are known-good identifiers.
        Self::new(DEFAULT_MARKER, DEFAULT_LANGUAGE).unwrap()
    }
}
