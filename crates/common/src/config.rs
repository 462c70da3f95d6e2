//! Test run configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

use crate::error::{Error, Result};

/// Browser engine Playwright launches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl FromStr for Browser {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(Error::InvalidConfig(format!("unknown browser: {}", other))),
        }
    }
}

impl std::fmt::Display for Browser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: 1280, height: 720 }
    }
}

/// Settings shared by every check in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WikiConfig {
    /// Wiki origin, without a trailing slash
    pub base_url: String,

    /// Article used by the built-in scenarios
    pub default_page_title: String,

    /// Run the browser without a window
    pub headless: bool,

    /// Default Playwright timeout for actions and waits
    pub default_timeout_ms: u64,

    pub browser: Browser,

    pub viewport: Viewport,

    /// Where screenshots are written
    pub screenshot_dir: PathBuf,

    /// Where results and the run report are written
    pub report_dir: PathBuf,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://en.wikipedia.org".to_string(),
            default_page_title: "Playwright_(software)".to_string(),
            headless: false,
            default_timeout_ms: 30_000,
            browser: Browser::Chromium,
            viewport: Viewport::default(),
            screenshot_dir: PathBuf::from("test-results/screenshots"),
            report_dir: PathBuf::from("test-results"),
        }
    }
}

impl WikiConfig {
    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut config: Self = serde_yaml::from_str(yaml)?;
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Ok(config)
    }

    /// Parse configuration from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load from an optional file, then apply `WIKICHECK_*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides looked up by environment variable name
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("WIKICHECK_BASE_URL") {
            self.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(title) = lookup("WIKICHECK_PAGE_TITLE") {
            self.default_page_title = title;
        }
        if let Some(value) = lookup("WIKICHECK_HEADLESS") {
            self.headless = parse_bool("WIKICHECK_HEADLESS", &value)?;
        }
        if let Some(value) = lookup("WIKICHECK_TIMEOUT_MS") {
            self.default_timeout_ms = value.trim().parse().map_err(|_| {
                Error::InvalidConfig(format!("WIKICHECK_TIMEOUT_MS is not a number: {}", value))
            })?;
        }
        if let Some(value) = lookup("WIKICHECK_BROWSER") {
            self.browser = value.parse()?;
        }
        if let Some(dir) = lookup("WIKICHECK_SCREENSHOT_DIR") {
            self.screenshot_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("WIKICHECK_REPORT_DIR") {
            self.report_dir = PathBuf::from(dir);
        }

        debug!("Resolved configuration: {:?}", self);
        Ok(())
    }

    /// MediaWiki Action API endpoint
    pub fn api_url(&self) -> String {
        format!("{}/w/api.php", self.base_url)
    }

    /// Article URL for a page title such as `Python_(programming_language)`
    pub fn page_url(&self, title: &str) -> String {
        format!("{}/wiki/{}", self.base_url, title)
    }

    pub fn default_page_url(&self) -> String {
        self.page_url(&self.default_page_title)
    }

    /// Create the screenshot and report directories
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.screenshot_dir)?;
        std::fs::create_dir_all(&self.report_dir)?;
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::InvalidConfig(format!("{} is not a boolean: {}", key, value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_urls() {
        let config = WikiConfig::default();
        assert_eq!(config.api_url(), "https://en.wikipedia.org/w/api.php");
        assert_eq!(
            config.default_page_url(),
            "https://en.wikipedia.org/wiki/Playwright_(software)"
        );
        assert_eq!(
            config.page_url("Python_(programming_language)"),
            "https://en.wikipedia.org/wiki/Python_(programming_language)"
        );
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
base_url: https://de.wikipedia.org/
browser: firefox
viewport:
  width: 1920
  height: 1080
"#;
        let config = WikiConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.base_url, "https://de.wikipedia.org");
        assert_eq!(config.browser, Browser::Firefox);
        assert_eq!(config.viewport.width, 1920);
        assert_eq!(config.default_timeout_ms, 30_000);
        assert_eq!(config.default_page_title, "Playwright_(software)");
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = WikiConfig::default();
        config
            .apply_overrides(lookup_from(&[
                ("WIKICHECK_BASE_URL", "http://localhost:8080/"),
                ("WIKICHECK_HEADLESS", "yes"),
                ("WIKICHECK_TIMEOUT_MS", "5000"),
                ("WIKICHECK_BROWSER", "WebKit"),
            ]))
            .unwrap();

        assert_eq!(config.base_url, "http://localhost:8080");
        assert!(config.headless);
        assert_eq!(config.default_timeout_ms, 5000);
        assert_eq!(config.browser, Browser::Webkit);
    }

    #[test]
    fn test_invalid_overrides_are_rejected() {
        let mut config = WikiConfig::default();
        let err = config
            .apply_overrides(lookup_from(&[("WIKICHECK_TIMEOUT_MS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let err = config
            .apply_overrides(lookup_from(&[("WIKICHECK_BROWSER", "lynx")]))
            .unwrap_err();
        assert!(err.to_string().contains("unknown browser"));
    }

    #[test]
    fn test_ensure_dirs_and_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wikicheck.yaml");
        let yaml = format!(
            "screenshot_dir: {}\nreport_dir: {}\n",
            dir.path().join("shots").display(),
            dir.path().join("reports").display()
        );
        std::fs::write(&path, yaml).unwrap();

        let config = WikiConfig::from_file(&path).unwrap();
        config.ensure_dirs().unwrap();
        assert!(dir.path().join("shots").is_dir());
        assert!(dir.path().join("reports").is_dir());
    }
}
