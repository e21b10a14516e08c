//! Diagram block handling for diagen.
//!
//! This crate turns document text into hashable diagram blocks:
//! - [`extract`] finds `{{< plantuml >}}` shortcode blocks in document order
//! - [`canonicalize`] trims block content into its hashing form
//! - [`Fingerprint`] derives the short content-addressed cache key
//!
//! # Example
//!
//! ```
//! use diagen_diagrams::{BlockSyntax, Fingerprint, extract};
//!
//! let text = "{{< plantuml >}}\nA -> B\n{{< /plantuml >}}";
//! let blocks = extract(text, &BlockSyntax::default());
//! assert_eq!(blocks.len(), 1);
//!
//! let fp = Fingerprint::of(blocks[0].canonical());
//! assert_eq!(fp.as_str(), "299af3f1");
//! ```

mod canonical;
pub mod consts;
mod extract;
mod fingerprint;
mod syntax;

pub use canonical::canonicalize;
pub use extract::{EmbeddedBlock, extract};
pub use fingerprint::Fingerprint;
pub use syntax::{BlockSyntax, SyntaxError};
