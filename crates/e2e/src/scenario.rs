//! Scenarios: named checks the runner executes and reports on
//!
//! Built-in scenarios cover section content (UI against API), navbox links
//! and theme switching. YAML [`TestSpec`]s run through the same trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::sync::OnceCell;
use wikicheck_common::{compare, count_unique_words, normalize, Viewport, WikiConfig, WordSetDiff};

use crate::error::{E2eError, E2eResult};
use crate::mediawiki::MediaWikiClient;
use crate::pages::{Theme, WikipediaPage};
use crate::playwright::{PlaywrightConfig, PlaywrightHandle, ScriptOutput};
use crate::report::TestLog;
use crate::spec::{TestSpec, TestStep};

pub const DEBUGGING_SECTION: &str = "Debugging features";
pub const DEVTOOLS_NAVBOX: &str = "Microsoft&#95;development&#95;tools6288";
pub const EXPECTED_DEVTOOLS: &[&str] = &["Visual Studio Code", "Visual Studio", "Azure DevOps"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Integration,
    Ui,
    Api,
    Example,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Integration => "integration",
            Category::Ui => "ui",
            Category::Api => "api",
            Category::Example => "example",
        }
    }
}

impl FromStr for Category {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "integration" => Ok(Category::Integration),
            "ui" => Ok(Category::Ui),
            "api" => Ok(Category::Api),
            "example" => Ok(Category::Example),
            other => Err(E2eError::SpecParse(format!("unknown category: {}", other))),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named check
#[async_trait]
pub trait Scenario: Send + Sync {
    fn name(&self) -> String;

    fn category(&self) -> Category;

    /// Explicit scenarios only run when selected by name or category
    fn explicit(&self) -> bool {
        false
    }

    async fn run(&self, ctx: &ScenarioContext, log: &mut TestLog) -> E2eResult<()>;
}

/// Shared collaborators for a run
///
/// The browser handle is created on first use so API-only runs never need
/// Playwright installed.
#[derive(Debug)]
pub struct ScenarioContext {
    config: WikiConfig,
    playwright: PlaywrightConfig,
    api: MediaWikiClient,
    browser: OnceCell<PlaywrightHandle>,
    page: WikipediaPage,
}

impl ScenarioContext {
    pub fn new(config: WikiConfig, playwright: PlaywrightConfig) -> E2eResult<Self> {
        let api = MediaWikiClient::new(&config)?;
        Ok(Self {
            config,
            playwright,
            api,
            browser: OnceCell::new(),
            page: WikipediaPage::new(),
        })
    }

    pub fn config(&self) -> &WikiConfig {
        &self.config
    }

    pub fn api(&self) -> &MediaWikiClient {
        &self.api
    }

    pub fn page(&self) -> &WikipediaPage {
        &self.page
    }

    pub async fn browser(&self) -> E2eResult<&PlaywrightHandle> {
        self.browser
            .get_or_try_init(|| PlaywrightHandle::new(self.playwright.clone()))
            .await
    }

    /// A separate handle for a viewport other than the configured one
    pub async fn browser_with_viewport(&self, viewport: Viewport) -> E2eResult<PlaywrightHandle> {
        PlaywrightHandle::new(PlaywrightConfig {
            viewport,
            ..self.playwright.clone()
        })
        .await
    }

    pub async fn run_steps(&self, label: &str, steps: &[TestStep]) -> E2eResult<ScriptOutput> {
        self.browser().await?.run_steps(label, steps).await
    }

    /// Section text as a reader sees it in the rendered article
    pub async fn ui_section_text(&self, page_title: &str, section: &str) -> E2eResult<String> {
        let mut steps = self.page.open(&self.config.page_url(page_title));
        steps.extend(self.page.section_text_steps(&section.replace(' ', "_")));

        let output = self.run_steps(&format!("ui-section-{}", section), &steps).await?;
        self.page.combine_section_text(&output)
    }
}

fn preview(text: &str) -> String {
    let head: String = text.chars().take(100).collect();
    if head.len() < text.len() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Outcome of comparing two extractions of the same section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionComparison {
    pub left_words: usize,
    pub right_words: usize,
    pub diff: WordSetDiff,
}

impl SectionComparison {
    pub fn new(left: &str, right: &str) -> Self {
        let left = normalize(left);
        let right = normalize(right);
        Self {
            left_words: count_unique_words(&left),
            right_words: count_unique_words(&right),
            diff: compare(&left, &right),
        }
    }

    pub fn is_match(&self) -> bool {
        self.diff.is_empty() && self.left_words == self.right_words
    }
}

/// UI and API extractions of a section carry the same vocabulary
#[derive(Debug, Clone)]
pub struct SectionUiVsApi {
    pub page_title: String,
    pub section: String,
}

#[async_trait]
impl Scenario for SectionUiVsApi {
    fn name(&self) -> String {
        "debugging-features-ui-vs-api".to_string()
    }

    fn category(&self) -> Category {
        Category::Integration
    }

    async fn run(&self, ctx: &ScenarioContext, log: &mut TestLog) -> E2eResult<()> {
        log.info(format!("Extracting '{}' via UI", self.section));
        let ui = ctx.ui_section_text(&self.page_title, &self.section).await?;
        log.info(format!("UI text: {}", preview(&ui)));

        log.info(format!("Extracting '{}' via MediaWiki API", self.section));
        let api = ctx.api().section_text(&self.page_title, &self.section).await?;
        log.info(format!("API text: {}", preview(&api)));

        let result = SectionComparison::new(&ui, &api);
        log.info(format!("UI unique word count: {}", result.left_words));
        log.info(format!("API unique word count: {}", result.right_words));

        if !result.diff.only_in_left.is_empty() {
            log.fail(format!(
                "Words only in UI ({}): {}",
                result.diff.only_in_left.len(),
                result.diff.only_in_left.join(", ")
            ));
        }
        if !result.diff.only_in_right.is_empty() {
            log.fail(format!(
                "Words only in API ({}): {}",
                result.diff.only_in_right.len(),
                result.diff.only_in_right.join(", ")
            ));
        }

        if !result.is_match() {
            return Err(E2eError::AssertionFailed(format!(
                "UI ({} words) and API ({} words) differ; {}",
                result.left_words, result.right_words, result.diff
            )));
        }

        log.pass(format!("UI and API both have {} unique words", result.left_words));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Ui,
    Api,
}

/// A section can be extracted from one source and is non-empty
#[derive(Debug, Clone)]
pub struct SectionExtraction {
    pub source: Source,
    pub page_title: String,
    pub section: String,
}

#[async_trait]
impl Scenario for SectionExtraction {
    fn name(&self) -> String {
        match self.source {
            Source::Ui => "debugging-features-ui".to_string(),
            Source::Api => "debugging-features-api".to_string(),
        }
    }

    fn category(&self) -> Category {
        match self.source {
            Source::Ui => Category::Ui,
            Source::Api => Category::Api,
        }
    }

    async fn run(&self, ctx: &ScenarioContext, log: &mut TestLog) -> E2eResult<()> {
        let text = match self.source {
            Source::Ui => ctx.ui_section_text(&self.page_title, &self.section).await?,
            Source::Api => ctx.api().section_text(&self.page_title, &self.section).await?,
        };
        if text.trim().is_empty() {
            return Err(E2eError::EmptyContent(format!("section '{}'", self.section)));
        }

        let normalized = normalize(&text);
        log.info(format!("Normalized text: {}", preview(&normalized)));

        let words = count_unique_words(&normalized);
        if words == 0 {
            return Err(E2eError::AssertionFailed(format!(
                "section '{}' has no words",
                self.section
            )));
        }

        log.pass(format!("Extracted '{}' with {} unique words", self.section, words));
        Ok(())
    }
}

/// Every technology in the developer tools navbox is a link
#[derive(Debug, Clone)]
pub struct DevToolsLinks {
    pub page_title: String,
}

impl DevToolsLinks {
    async fn technologies(
        ctx: &ScenarioContext,
        page_title: &str,
        log: &mut TestLog,
    ) -> E2eResult<Vec<crate::pages::Technology>> {
        let page = ctx.page();
        let mut steps = page.open(&ctx.config().page_url(page_title));
        steps.extend(page.navbox_links_steps(DEVTOOLS_NAVBOX));

        let output = ctx.run_steps("devtools-navbox", &steps).await?;
        let technologies = page.technologies(&output)?;
        log.info(format!("Found {} technologies", technologies.len()));
        Ok(technologies)
    }

    /// Expected technologies that do not appear in the navbox at all
    fn absent_expected(technologies: &[crate::pages::Technology]) -> Vec<&'static str> {
        EXPECTED_DEVTOOLS
            .iter()
            .copied()
            .filter(|expected| !technologies.iter().any(|t| t.name == *expected))
            .collect()
    }
}

#[async_trait]
impl Scenario for DevToolsLinks {
    fn name(&self) -> String {
        "devtools-links".to_string()
    }

    fn category(&self) -> Category {
        Category::Ui
    }

    async fn run(&self, ctx: &ScenarioContext, log: &mut TestLog) -> E2eResult<()> {
        let technologies = Self::technologies(ctx, &self.page_title, log).await?;
        if technologies.is_empty() {
            return Err(E2eError::EmptyContent(
                "developer tools navbox has no technologies".to_string(),
            ));
        }

        for absent in Self::absent_expected(&technologies) {
            log.warn(format!("'{}' not found in the navbox", absent));
        }

        let mut missing = Vec::new();
        for tech in &technologies {
            if tech.is_link {
                log.pass(format!("'{}' is a link", tech.name));
            } else {
                log.fail(format!("'{}' is NOT a link", tech.name));
                missing.push(tech.name.as_str());
            }
        }

        if !missing.is_empty() {
            return Err(E2eError::AssertionFailed(format!(
                "the following technology names are NOT links: {}",
                missing.join(", ")
            )));
        }

        log.pass(format!("All {} technology names are links", technologies.len()));
        Ok(())
    }
}

/// One named technology exists in the navbox and is a link
#[derive(Debug, Clone)]
pub struct DevToolLink {
    pub page_title: String,
    pub technology: String,
}

#[async_trait]
impl Scenario for DevToolLink {
    fn name(&self) -> String {
        format!("devtools-link:{}", self.technology)
    }

    fn category(&self) -> Category {
        Category::Ui
    }

    async fn run(&self, ctx: &ScenarioContext, log: &mut TestLog) -> E2eResult<()> {
        let technologies = DevToolsLinks::technologies(ctx, &self.page_title, log).await?;
        let tech = technologies
            .iter()
            .find(|t| t.name == self.technology)
            .ok_or_else(|| {
                E2eError::AssertionFailed(format!("technology '{}' should exist", self.technology))
            })?;

        if !tech.is_link {
            return Err(E2eError::AssertionFailed(format!(
                "technology '{}' should be a link",
                self.technology
            )));
        }

        log.pass(format!("'{}' is a link", self.technology));
        Ok(())
    }
}

/// Switching the colour theme flips the `<html>` theme class
#[derive(Debug, Clone)]
pub struct ColorThemeToggle {
    pub page_title: String,
}

#[async_trait]
impl Scenario for ColorThemeToggle {
    fn name(&self) -> String {
        "color-theme-toggle".to_string()
    }

    fn category(&self) -> Category {
        Category::Ui
    }

    async fn run(&self, ctx: &ScenarioContext, log: &mut TestLog) -> E2eResult<()> {
        let page = ctx.page();
        let url = ctx.config().page_url(&self.page_title);

        let mut initial_steps = page.open(&url);
        initial_steps.extend(page.theme_class_steps());
        let output = ctx.run_steps("theme-initial", &initial_steps).await?;
        log.info(format!("Initial HTML classes: {}", page.theme_class(&output)?));

        let initial = page.theme(&output)?;
        log.info(format!("Initial theme: {}", initial));
        if initial == Theme::Unknown {
            log.fail("Initial theme is neither day nor night");
            return Err(E2eError::AssertionFailed(
                "html element has neither 'skin-theme-clientpref-day' nor 'skin-theme-clientpref-night'"
                    .to_string(),
            ));
        }

        let target = initial.toggled();
        log.info(format!("Switching from {} to {}", initial, target));

        let mut steps = page.open(&url);
        steps.push(TestStep::Screenshot {
            name: format!("before_theme_change_{}", initial),
            selector: None,
            full_page: false,
        });
        steps.extend(page.switch_theme_steps(target)?);
        steps.push(TestStep::Screenshot {
            name: format!("after_theme_change_to_{}", target),
            selector: None,
            full_page: false,
        });

        let output = ctx.run_steps("theme-toggle", &steps).await?;
        for shot in &output.screenshots {
            log.attach_screenshot(shot.clone());
        }
        log.info(format!("Final HTML classes: {}", page.theme_class(&output)?));

        let now = page.theme(&output)?;
        if now != target {
            return Err(E2eError::AssertionFailed(format!(
                "theme should be {} after clicking the {} toggle, found {}",
                target, target, now
            )));
        }

        log.pass(format!("Theme changed from {} to {}", initial, target));
        Ok(())
    }
}

/// The appearance menu opens and offers a dark option
#[derive(Debug, Clone)]
pub struct AppearanceMenu {
    pub page_title: String,
}

#[async_trait]
impl Scenario for AppearanceMenu {
    fn name(&self) -> String {
        "appearance-menu".to_string()
    }

    fn category(&self) -> Category {
        Category::Ui
    }

    async fn run(&self, ctx: &ScenarioContext, log: &mut TestLog) -> E2eResult<()> {
        let page = ctx.page();
        let mut steps = page.open(&ctx.config().page_url(&self.page_title));
        steps.extend(page.appearance_menu_steps());

        ctx.run_steps("appearance-menu", &steps).await?;
        log.pass("Appearance menu is accessible and the dark option is available");
        Ok(())
    }
}

/// API text of a section on another page mentions a keyword
#[derive(Debug, Clone)]
pub struct ExampleSection {
    pub page_title: String,
    pub section: String,
    pub keyword: String,
}

#[async_trait]
impl Scenario for ExampleSection {
    fn name(&self) -> String {
        format!("example-section:{}/{}", self.page_title, self.section)
    }

    fn category(&self) -> Category {
        Category::Example
    }

    fn explicit(&self) -> bool {
        true
    }

    async fn run(&self, ctx: &ScenarioContext, log: &mut TestLog) -> E2eResult<()> {
        log.info(format!(
            "Extracting '{}' from {} via API",
            self.section, self.page_title
        ));
        let text = ctx.api().section_text(&self.page_title, &self.section).await?;
        if text.trim().is_empty() {
            return Err(E2eError::EmptyContent(format!("section '{}'", self.section)));
        }

        let keyword = self.keyword.to_lowercase();
        if !text.to_lowercase().contains(&keyword) {
            return Err(E2eError::AssertionFailed(format!(
                "section '{}' should mention '{}'",
                self.section, self.keyword
            )));
        }

        log.info(format!("Extracted text length: {} characters", text.chars().count()));
        log.pass(format!(
            "Extracted '{}' section from {}",
            self.section, self.page_title
        ));
        Ok(())
    }
}

#[async_trait]
impl Scenario for TestSpec {
    fn name(&self) -> String {
        self.name.clone()
    }

    /// First tag that names a category; untagged specs are UI checks
    fn category(&self) -> Category {
        self.tags
            .iter()
            .find_map(|tag| tag.parse().ok())
            .unwrap_or(Category::Ui)
    }

    fn explicit(&self) -> bool {
        self.explicit
    }

    async fn run(&self, ctx: &ScenarioContext, log: &mut TestLog) -> E2eResult<()> {
        if !self.description.is_empty() {
            log.info(self.description.clone());
        }

        let output = match self.viewport {
            Some(viewport) => {
                ctx.browser_with_viewport(viewport)
                    .await?
                    .run_steps(&self.name, &self.steps)
                    .await?
            }
            None => ctx.run_steps(&self.name, &self.steps).await?,
        };

        for shot in &output.screenshots {
            log.attach_screenshot(shot.clone());
        }
        for (name, value) in &output.values {
            log.info(format!("{} = {}", name, value));
        }

        log.pass(format!("{} step(s) passed", self.steps.len()));
        Ok(())
    }
}

/// Scenarios that ship with the crate, in execution order
pub fn builtin_scenarios(config: &WikiConfig) -> Vec<Box<dyn Scenario>> {
    let page_title = config.default_page_title.clone();

    let mut scenarios: Vec<Box<dyn Scenario>> = vec![
        Box::new(SectionUiVsApi {
            page_title: page_title.clone(),
            section: DEBUGGING_SECTION.to_string(),
        }),
        Box::new(SectionExtraction {
            source: Source::Ui,
            page_title: page_title.clone(),
            section: DEBUGGING_SECTION.to_string(),
        }),
        Box::new(SectionExtraction {
            source: Source::Api,
            page_title: page_title.clone(),
            section: DEBUGGING_SECTION.to_string(),
        }),
        Box::new(DevToolsLinks {
            page_title: page_title.clone(),
        }),
    ];

    for technology in EXPECTED_DEVTOOLS {
        scenarios.push(Box::new(DevToolLink {
            page_title: page_title.clone(),
            technology: technology.to_string(),
        }));
    }

    scenarios.push(Box::new(ColorThemeToggle {
        page_title: page_title.clone(),
    }));
    scenarios.push(Box::new(AppearanceMenu { page_title }));
    scenarios.push(Box::new(ExampleSection {
        page_title: "JavaScript".to_string(),
        section: "History".to_string(),
        keyword: "javascript".to_string(),
    }));

    scenarios
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::Technology;

    #[test]
    fn test_section_comparison_ignores_markers_and_punctuation() {
        let result = SectionComparison::new(
            "Debugging[1] features include: logging, tracing.",
            "Debugging features include: logging, tracing. [1]",
        );
        assert!(result.is_match());
        assert_eq!(result.left_words, 5);
    }

    #[test]
    fn test_section_comparison_reports_both_sides() {
        let result = SectionComparison::new("trace viewer logs", "trace inspector logs");
        assert!(!result.is_match());
        assert_eq!(result.diff.only_in_left, vec!["viewer"]);
        assert_eq!(result.diff.only_in_right, vec!["inspector"]);
    }

    #[test]
    fn test_absent_expected_devtools() {
        let technologies = vec![
            Technology { name: "Visual Studio".to_string(), is_link: true },
            Technology { name: "Azure DevOps".to_string(), is_link: false },
            Technology { name: "Dev Home".to_string(), is_link: true },
        ];
        assert_eq!(DevToolsLinks::absent_expected(&technologies), vec!["Visual Studio Code"]);
        assert_eq!(DevToolsLinks::absent_expected(&[]).len(), EXPECTED_DEVTOOLS.len());
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!("UI".parse::<Category>().unwrap(), Category::Ui);
        assert_eq!(" integration ".parse::<Category>().unwrap(), Category::Integration);
        assert!("smoke".parse::<Category>().is_err());
        assert_eq!(Category::Example.to_string(), "example");
    }

    #[test]
    fn test_builtin_scenarios() {
        let scenarios = builtin_scenarios(&WikiConfig::default());
        let names: Vec<_> = scenarios.iter().map(|s| s.name()).collect();

        assert_eq!(names[0], "debugging-features-ui-vs-api");
        assert!(names.contains(&"devtools-link:Azure DevOps".to_string()));
        assert!(names.contains(&"example-section:JavaScript/History".to_string()));

        let explicit: Vec<_> = scenarios.iter().filter(|s| s.explicit()).map(|s| s.name()).collect();
        assert_eq!(explicit, vec!["example-section:JavaScript/History"]);

        let mut unique = names.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_spec_category_from_tags() {
        let spec = TestSpec::from_yaml(
            "name: t\ntags: [smoke, example]\nsteps:\n  - action: wait_for_load\n",
        )
        .unwrap();
        assert_eq!(Scenario::category(&spec), Category::Example);

        let untagged = TestSpec::from_yaml("name: u\nsteps:\n  - action: wait_for_load\n").unwrap();
        assert_eq!(Scenario::category(&untagged), Category::Ui);
    }

    #[test]
    fn test_preview_truncates_long_text() {
        assert_eq!(preview("short"), "short");
        let long = "a".repeat(150);
        assert_eq!(preview(&long), format!("{}...", "a".repeat(100)));
    }
}
