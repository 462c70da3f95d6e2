//! wikicheck Common Library
//!
//! Text normalization and word-set comparison used to decide whether two
//! independently extracted texts carry the same content, plus the run
//! configuration shared by the e2e crate.

pub mod config;
pub mod error;
pub mod text;

// Re-export commonly used types
pub use config::{Browser, Viewport, WikiConfig};
pub use error::{Error, Result};
pub use text::{
    collapse_whitespace, compare, count_unique_words, normalize, strip_reference_markers,
    unique_words, WordSet, WordSetDiff,
};

/// wikicheck version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
