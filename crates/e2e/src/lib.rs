//! wikicheck E2E Test Framework
//!
//! This crate provides a Rust-controlled E2E testing framework that:
//! - Reads article sections through the MediaWiki Action API
//! - Drives Playwright by generating a Node script per step list
//! - Parses declarative YAML test specs
//! - Cross-checks UI and API extractions with the common text normalizer
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── scenarios() -> builtin + YAML specs                  │
//! │    ├── run_scenario(s) -> TestResult                        │
//! │    └── Report (report.json) + test-results.json             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioContext                                            │
//! │    ├── MediaWikiClient  (action=parse, section text)        │
//! │    ├── PlaywrightHandle (steps -> node script -> values)    │
//! │    └── WikipediaPage    (step builders, output readers)     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestSpec (YAML)                                            │
//! │    ├── name, description, tags, explicit                    │
//! │    └── steps: navigate | wait | click | assert | extract_*  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod mediawiki;
pub mod pages;
pub mod playwright;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod spec;

pub use error::{E2eError, E2eResult};
pub use mediawiki::{MediaWikiClient, Section};
pub use pages::{Technology, Theme, WikipediaPage};
pub use report::{Report, ReportStatus, TestLog};
pub use runner::{RunnerConfig, TestResult, TestRunner, TestSuiteResult};
pub use scenario::{Category, Scenario, ScenarioContext};
pub use spec::{TestSpec, TestStep};
