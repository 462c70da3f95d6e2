//! Error types for E2E testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Test spec parse error: {0}")]
    SpecParse(String),

    #[error("Step failed: {step} - {reason}")]
    StepFailed {
        step: String,
        reason: String,
        screenshot: Option<std::path::PathBuf>,
    },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("MediaWiki API error: {0}")]
    MediaWiki(String),

    #[error("Section '{section}' not found on page '{page}'")]
    SectionNotFound { page: String, section: String },

    #[error("Heading '{0}' not found in section HTML")]
    HeadingNotFound(String),

    #[error("Extracted content is empty: {0}")]
    EmptyContent(String),

    #[error("Script produced no value named '{0}'")]
    MissingValue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] wikicheck_common::Error),
}

impl E2eError {
    /// Screenshot captured when a browser step failed
    pub fn screenshot(&self) -> Option<&std::path::Path> {
        match self {
            E2eError::StepFailed { screenshot, .. } => screenshot.as_deref(),
            _ => None,
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
