//! Main test runner that selects scenarios, runs them and records the report

use std::path::PathBuf;
use std::time::Instant;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use wikicheck_common::WikiConfig;

use crate::error::{E2eError, E2eResult};
use crate::playwright::PlaywrightConfig;
use crate::report::{Report, ReportStatus, TestLog};
use crate::scenario::{builtin_scenarios, Category, Scenario, ScenarioContext};
use crate::spec::TestSpec;

/// Result of running a single test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub category: Category,
    pub success: bool,
    #[serde(default)]
    pub skipped: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
    #[serde(default)]
    pub screenshots: Vec<PathBuf>,
}

/// Result of running all tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Main E2E test runner
pub struct TestRunner {
    context: ScenarioContext,

    /// Run built-in scenarios alongside YAML specs
    include_builtin: bool,

    /// Test specs directory
    specs_dir: PathBuf,

    /// Output directory for results
    output_dir: PathBuf,

    report: Report,
}

impl TestRunner {
    /// Create a test runner with default configuration
    pub fn new() -> E2eResult<Self> {
        Self::with_config(RunnerConfig::default())
    }

    /// Create a test runner with custom configuration
    pub fn with_config(config: RunnerConfig) -> E2eResult<Self> {
        let mut report = Report::new("wikicheck");
        report.set_info("base_url", config.wiki.base_url.as_str());
        report.set_info("page", config.wiki.default_page_title.as_str());
        report.set_info("browser", config.playwright.browser.as_str());
        report.set_info("headless", config.playwright.headless.to_string());

        Ok(Self {
            context: ScenarioContext::new(config.wiki, config.playwright)?,
            include_builtin: config.include_builtin,
            specs_dir: config.specs_dir,
            output_dir: config.output_dir,
            report,
        })
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Built-in scenarios followed by YAML specs from the specs directory
    pub fn scenarios(&self) -> E2eResult<Vec<Box<dyn Scenario>>> {
        let mut scenarios = if self.include_builtin {
            builtin_scenarios(self.context.config())
        } else {
            Vec::new()
        };

        for spec in TestSpec::load_all(&self.specs_dir)? {
            scenarios.push(Box::new(spec));
        }
        Ok(scenarios)
    }

    /// Run every scenario; explicit ones are counted as skipped
    pub async fn run_all(&mut self) -> E2eResult<TestSuiteResult> {
        let scenarios = self.scenarios()?;
        Ok(self.run_scenarios(&scenarios, false).await)
    }

    /// Run scenarios of one category, explicit ones included
    pub async fn run_category(&mut self, category: Category) -> E2eResult<TestSuiteResult> {
        let scenarios: Vec<_> = self
            .scenarios()?
            .into_iter()
            .filter(|s| s.category() == category)
            .collect();
        Ok(self.run_scenarios(&scenarios, true).await)
    }

    /// Run a specific test by name
    pub async fn run_named(&mut self, name: &str) -> E2eResult<TestSuiteResult> {
        let scenario = self
            .scenarios()?
            .into_iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| E2eError::SpecParse(format!("Test not found: {}", name)))?;
        Ok(self.run_scenarios(&[scenario], true).await)
    }

    /// Run scenarios in order; a failure never stops the rest
    pub async fn run_scenarios(
        &mut self,
        scenarios: &[Box<dyn Scenario>],
        include_explicit: bool,
    ) -> TestSuiteResult {
        let start = Instant::now();
        let mut results = Vec::new();
        let mut passed = 0;
        let mut failed = 0;
        let mut skipped = 0;

        info!("Running {} test(s)...", scenarios.len());

        for scenario in scenarios {
            if scenario.explicit() && !include_explicit {
                skipped += 1;
                info!("- {} (explicit, skipped)", scenario.name());
                results.push(self.skip(scenario.as_ref()));
                continue;
            }

            let result = self.run_scenario(scenario.as_ref()).await;
            if result.success {
                passed += 1;
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                failed += 1;
                error!("✗ {} - {}", result.name, result.error.as_deref().unwrap_or("unknown error"));
            }
            results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!("Test Results: {} passed, {} failed, {} skipped ({} ms)",
            passed, failed, skipped, duration_ms);

        TestSuiteResult {
            total: scenarios.len(),
            passed,
            failed,
            skipped,
            duration_ms,
            results,
        }
    }

    /// Run a single scenario and record it in the report
    pub async fn run_scenario(&mut self, scenario: &dyn Scenario) -> TestResult {
        let start = Instant::now();
        let name = scenario.name();
        debug!("Running test: {}", name);

        let mut log = TestLog::new(name.clone());
        let outcome = scenario.run(&self.context, &mut log).await;

        let error = match outcome {
            Ok(()) => None,
            Err(e) => {
                if let Some(path) = e.screenshot() {
                    log.attach_screenshot(path);
                }
                log.fail(e.to_string());
                Some(e.to_string())
            }
        };

        let screenshots = log.screenshots().to_vec();
        let status = match &error {
            Some(_) => ReportStatus::Fail,
            None if log.has_warnings() => ReportStatus::Warning,
            None => ReportStatus::Pass,
        };
        self.report.record(log.finish(status, error.clone()));

        TestResult {
            name,
            category: scenario.category(),
            success: error.is_none(),
            skipped: false,
            duration_ms: start.elapsed().as_millis() as u64,
            error,
            screenshots,
        }
    }

    fn skip(&mut self, scenario: &dyn Scenario) -> TestResult {
        let mut log = TestLog::new(scenario.name());
        log.info("explicit test, not selected");
        self.report.record(log.finish(ReportStatus::Skip, None));

        TestResult {
            name: scenario.name(),
            category: scenario.category(),
            success: true,
            skipped: true,
            duration_ms: 0,
            error: None,
            screenshots: Vec::new(),
        }
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }

    /// Write the run report next to the results
    pub fn write_report(&self) -> E2eResult<PathBuf> {
        self.report.flush(&self.output_dir)
    }
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub wiki: WikiConfig,
    pub playwright: PlaywrightConfig,
    pub include_builtin: bool,
    pub specs_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl RunnerConfig {
    pub fn from_wiki_config(wiki: WikiConfig) -> Self {
        Self {
            playwright: PlaywrightConfig::from_wiki_config(&wiki),
            include_builtin: true,
            specs_dir: PathBuf::from("tests/specs"),
            output_dir: wiki.report_dir.clone(),
            wiki,
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::from_wiki_config(WikiConfig::default())
    }
}
