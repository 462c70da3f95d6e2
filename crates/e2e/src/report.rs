//! Run report: per-test status, timestamped log entries and screenshots

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::error::E2eResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pass,
    Fail,
    Skip,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Pass,
    Warning,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

/// Log for one running test
///
/// Every entry is mirrored to `tracing` as it is recorded.
#[derive(Debug, Clone)]
pub struct TestLog {
    name: String,
    started: DateTime<Local>,
    entries: Vec<LogEntry>,
    screenshots: Vec<PathBuf>,
}

impl TestLog {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            started: Local::now(),
            entries: Vec::new(),
            screenshots: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn screenshots(&self) -> &[PathBuf] {
        &self.screenshots
    }

    pub fn has_warnings(&self) -> bool {
        self.entries.iter().any(|e| e.level == LogLevel::Warning)
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("[{}] {}", self.name, message);
        self.push(LogLevel::Info, message);
    }

    pub fn pass(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("[{}] ✓ {}", self.name, message);
        self.push(LogLevel::Pass, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("[{}] {}", self.name, message);
        self.push(LogLevel::Warning, message);
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("[{}] ✗ {}", self.name, message);
        self.push(LogLevel::Fail, message);
    }

    pub fn attach_screenshot(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        info!("[{}] screenshot: {}", self.name, path.display());
        self.screenshots.push(path);
    }

    fn push(&mut self, level: LogLevel, message: String) {
        self.entries.push(LogEntry {
            timestamp: Local::now(),
            level,
            message,
        });
    }

    /// Close the log with a final status
    pub fn finish(self, status: ReportStatus, error: Option<String>) -> TestEntry {
        TestEntry {
            name: self.name,
            status,
            started: self.started,
            finished: Local::now(),
            error,
            logs: self.entries,
            screenshots: self.screenshots,
        }
    }
}

/// A finished test in the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestEntry {
    pub name: String,
    pub status: ReportStatus,
    pub started: DateTime<Local>,
    pub finished: DateTime<Local>,
    #[serde(default)]
    pub error: Option<String>,
    pub logs: Vec<LogEntry>,
    pub screenshots: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub title: String,
    pub created: DateTime<Local>,
    pub system_info: BTreeMap<String, String>,
    pub tests: Vec<TestEntry>,
}

impl Report {
    pub fn new(title: impl Into<String>) -> Self {
        let mut system_info = BTreeMap::new();
        system_info.insert("os".to_string(), std::env::consts::OS.to_string());
        system_info.insert("arch".to_string(), std::env::consts::ARCH.to_string());
        system_info.insert("version".to_string(), wikicheck_common::VERSION.to_string());

        Self {
            title: title.into(),
            created: Local::now(),
            system_info,
            tests: Vec::new(),
        }
    }

    pub fn set_info(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.system_info.insert(key.into(), value.into());
    }

    pub fn record(&mut self, entry: TestEntry) {
        self.tests.push(entry);
    }

    pub fn count(&self, status: ReportStatus) -> usize {
        self.tests.iter().filter(|t| t.status == status).count()
    }

    /// Write `report.json` into `dir`
    pub fn flush(&self, dir: &Path) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join("report.json");
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        info!("Report written to: {}", path.display());
        Ok(path)
    }
}
