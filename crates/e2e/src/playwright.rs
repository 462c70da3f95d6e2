//! Playwright browser automation
//!
//! Steps are compiled into a single Node script that runs in one browser
//! context. Values recorded by `extract_*` and named `evaluate` steps come
//! back as a JSON line on the script's output.

use std::path::PathBuf;
use std::process::Stdio;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::process::Command as TokioCommand;
use tracing::{debug, info, warn};
use wikicheck_common::{Browser, Viewport, WikiConfig};

use crate::error::{E2eError, E2eResult};
use crate::spec::{AttributeAssertion, TestStep};

/// Playwright browser handle
#[derive(Debug)]
pub struct PlaywrightHandle {
    config: PlaywrightConfig,
}

/// Values and artifacts produced by a successful script run
#[derive(Debug, Clone, Default)]
pub struct ScriptOutput {
    pub values: serde_json::Map<String, serde_json::Value>,
    pub screenshots: Vec<PathBuf>,
}

impl ScriptOutput {
    /// Deserialize a recorded value
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> E2eResult<T> {
        let value = self
            .values
            .get(name)
            .cloned()
            .ok_or_else(|| E2eError::MissingValue(name.to_string()))?;
        Ok(serde_json::from_value(value)?)
    }

    /// Recorded value as text; `null` reads as empty
    pub fn text(&self, name: &str) -> E2eResult<String> {
        match self.values.get(name) {
            Some(serde_json::Value::String(s)) => Ok(s.clone()),
            Some(serde_json::Value::Null) => Ok(String::new()),
            Some(other) => Ok(other.to_string()),
            None => Err(E2eError::MissingValue(name.to_string())),
        }
    }
}

/// Final line a generated script prints
#[derive(Debug, Deserialize)]
struct ScriptReport {
    success: bool,
    #[serde(default)]
    values: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    step: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    screenshot: Option<PathBuf>,
}

impl PlaywrightHandle {
    /// Create a new Playwright handle
    pub async fn new(config: PlaywrightConfig) -> E2eResult<Self> {
        // Verify playwright is installed
        Self::check_playwright_installed().await?;

        // Create screenshot directory
        std::fs::create_dir_all(&config.screenshot_dir)?;

        Ok(Self::from_config(config))
    }

    fn from_config(config: PlaywrightConfig) -> Self {
        Self { config }
    }

    /// Check if Playwright is installed
    async fn check_playwright_installed() -> E2eResult<()> {
        Self::check_installed("npx").await
    }

    async fn check_installed(npx: &str) -> E2eResult<()> {
        let output = TokioCommand::new(npx)
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    pub fn config(&self) -> &PlaywrightConfig {
        &self.config
    }

    pub fn screenshot_path(&self, name: &str) -> PathBuf {
        self.config.screenshot_dir.join(format!("{}.png", name))
    }

    /// Run steps in a fresh browser context and collect recorded values
    pub async fn run_steps(&self, label: &str, steps: &[TestStep]) -> E2eResult<ScriptOutput> {
        info!("Running {} step(s) for '{}'", steps.len(), label);
        let script = self.build_script(label, steps);
        let mut output = self.run_script(&script).await?;

        output.screenshots = steps
            .iter()
            .filter_map(|step| match step {
                TestStep::Screenshot { name, .. } => Some(self.screenshot_path(name)),
                _ => None,
            })
            .collect();

        Ok(output)
    }

    /// Generate a script name for a step
    pub fn step_name(step: &TestStep) -> String {
        match step {
            TestStep::Navigate { url, .. } => format!("navigate:{}", url),
            TestStep::WaitForLoad => "wait_for_load".to_string(),
            TestStep::Wait { selector, .. } => format!("wait:{}", selector),
            TestStep::Click { selector, .. } => format!("click:{}", selector),
            TestStep::Sleep { ms } => format!("sleep:{}ms", ms),
            TestStep::Assert { selector, .. } => format!("assert:{}", selector),
            TestStep::AssertTitle { contains } => format!("assert_title:{}", contains),
            TestStep::Screenshot { name, .. } => format!("screenshot:{}", name),
            TestStep::ExtractText { name, .. } => format!("extract_text:{}", name),
            TestStep::ExtractAttribute { name, .. } => format!("extract_attribute:{}", name),
            TestStep::ExtractLinks { name, .. } => format!("extract_links:{}", name),
            TestStep::ExtractTitle { name } => format!("extract_title:{}", name),
            TestStep::Evaluate { name, .. } => {
                format!("evaluate:{}", name.as_deref().unwrap_or("anonymous"))
            }
            TestStep::Log { message } => {
                format!("log:{}", message.chars().take(30).collect::<String>())
            }
        }
    }

    /// Build the Playwright script for a set of steps
    pub fn build_script(&self, label: &str, steps: &[TestStep]) -> String {
        let config = &self.config;
        let mut script = String::new();

        let failure_shot = if config.screenshot_on_failure {
            let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
            let path = config
                .screenshot_dir
                .join(format!("{}_{}_failure.png", file_safe(label), stamp));
            js_str(&path.to_string_lossy())
        } else {
            "null".to_string()
        };

        // Header
        script.push_str(&format!(r#"
const {{ chromium, firefox, webkit }} = require('playwright');

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  context.setDefaultTimeout({timeout});
  const page = await context.newPage();
  const baseUrl = {base_url};
  const resolveUrl = (url) => url.startsWith('/') ? baseUrl + url : url;
  const values = {{}};
  let currentStep = null;

  try {{
"#,
            browser = config.browser.as_str(),
            headless = config.headless,
            width = config.viewport.width,
            height = config.viewport.height,
            timeout = config.default_timeout_ms,
            base_url = js_str(&config.base_url),
        ));

        // Generate step code
        for (i, step) in steps.iter().enumerate() {
            let name = Self::step_name(step);
            script.push_str(&format!("\n    // Step {}: {}\n", i + 1, name));
            script.push_str(&format!("    currentStep = {};\n", js_str(&name)));
            script.push_str(&self.step_to_js(step));
            script.push('\n');
        }

        // Footer
        script.push_str(&format!(r#"
    console.log(JSON.stringify({{ success: true, values }}));
  }} catch (error) {{
    let screenshot = null;
    const failurePath = {failure_shot};
    if (failurePath) {{
      try {{
        await page.screenshot({{ path: failurePath, fullPage: true }});
        screenshot = failurePath;
      }} catch (_) {{}}
    }}
    console.error(JSON.stringify({{ success: false, step: currentStep, error: error.message, screenshot }}));
    process.exitCode = 1;
  }} finally {{
    await browser.close();
  }}
}})();
"#,
            failure_shot = failure_shot,
        ));

        script
    }

    /// Convert a step to JavaScript code
    fn step_to_js(&self, step: &TestStep) -> String {
        match step {
            TestStep::Navigate { url, wait_for_selector } => {
                let wait = wait_for_selector
                    .as_ref()
                    .map(|s| format!("\n    await page.waitForSelector({});", js_str(s)))
                    .unwrap_or_default();
                format!("    await page.goto(resolveUrl({}));{}", js_str(url), wait)
            }
            TestStep::WaitForLoad => {
                "    await page.waitForLoadState('networkidle');".to_string()
            }
            TestStep::Wait { selector, timeout_ms, state } => {
                format!(
                    "    await page.waitForSelector({}, {{ state: '{}', timeout: {} }});",
                    js_str(selector),
                    state.as_str(),
                    timeout_ms
                )
            }
            TestStep::Click { selector, timeout_ms, optional } => {
                let options = timeout_ms
                    .map(|t| format!("{{ timeout: {} }}", t))
                    .unwrap_or_default();
                if *optional {
                    format!(
                        r#"    {{
      const target = page.locator({}).first();
      if (await target.count() > 0 && await target.isVisible()) {{
        await target.click({});
        await page.waitForTimeout(1000);
      }}
    }}"#,
                        js_str(selector),
                        options
                    )
                } else {
                    format!(
                        "    await page.locator({}).first().click({});",
                        js_str(selector),
                        options
                    )
                }
            }
            TestStep::Sleep { ms } => {
                format!("    await page.waitForTimeout({});", ms)
            }
            TestStep::Assert { selector, visible, text, text_contains, attribute, count } => {
                self.assert_to_js(
                    selector,
                    *visible,
                    text.as_deref(),
                    text_contains.as_deref(),
                    attribute.as_ref(),
                    *count,
                )
            }
            TestStep::AssertTitle { contains } => {
                format!(
                    r#"    {{
      const title = await page.title();
      if (!title.includes({expected})) throw new Error({message} + title);
    }}"#,
                    expected = js_str(contains),
                    message = js_str(&format!("expected title to contain '{}', got: ", contains)),
                )
            }
            TestStep::Screenshot { name, selector, full_page } => {
                let path = self.screenshot_path(name);
                let path = js_str(&path.to_string_lossy());

                if let Some(sel) = selector {
                    format!("    await page.locator({}).first().screenshot({{ path: {} }});", js_str(sel), path)
                } else {
                    format!("    await page.screenshot({{ path: {}, fullPage: {} }});", path, full_page)
                }
            }
            TestStep::ExtractText { name, selector } => {
                format!(
                    "    values[{}] = (await page.locator({}).first().textContent()) ?? '';",
                    js_str(name),
                    js_str(selector)
                )
            }
            TestStep::ExtractAttribute { name, selector, attribute } => {
                format!(
                    "    values[{}] = (await page.locator({}).first().getAttribute({})) ?? '';",
                    js_str(name),
                    js_str(selector),
                    js_str(attribute)
                )
            }
            TestStep::ExtractLinks { name, selector } => {
                format!(
                    r#"    values[{}] = await page.locator({}).first().locator('a').evaluateAll(
      (anchors) => anchors.map((a) => ({{ text: a.textContent ?? '', has_href: !!a.getAttribute('href') }}))
    );"#,
                    js_str(name),
                    js_str(selector)
                )
            }
            TestStep::ExtractTitle { name } => {
                format!("    values[{}] = await page.title();", js_str(name))
            }
            TestStep::Evaluate { name, script } => {
                let store = name
                    .as_ref()
                    .map(|n| format!("\n      values[{}] = result;", js_str(n)))
                    .unwrap_or_default();
                format!(
                    "    {{\n      const result = await page.evaluate(() => {{ {} }});{}\n    }}",
                    script, store
                )
            }
            TestStep::Log { message } => {
                format!("    console.log({});", js_str(&format!("[TEST] {}", message)))
            }
        }
    }

    fn assert_to_js(
        &self,
        selector: &str,
        visible: Option<bool>,
        text: Option<&str>,
        text_contains: Option<&str>,
        attribute: Option<&AttributeAssertion>,
        count: Option<usize>,
    ) -> String {
        let mut checks = Vec::new();

        if let Some(vis) = visible {
            let (negate, word) = if vis { ("!", "visible") } else { ("", "hidden") };
            checks.push(format!(
                "      if ({}(await locator.first().isVisible())) throw new Error({});",
                negate,
                js_str(&format!("expected {} to be {}", selector, word))
            ));
        }

        if text.is_some() || text_contains.is_some() {
            checks.push("      const text = ((await locator.first().textContent()) ?? '').trim();".to_string());
        }

        if let Some(t) = text {
            checks.push(format!(
                "      if (text !== {}) throw new Error({} + text);",
                js_str(t),
                js_str(&format!("expected {} to have text '{}', got: ", selector, t))
            ));
        }

        if let Some(tc) = text_contains {
            checks.push(format!(
                "      if (!text.includes({})) throw new Error({} + text);",
                js_str(tc),
                js_str(&format!("expected {} to contain '{}', got: ", selector, tc))
            ));
        }

        if let Some(attr) = attribute {
            checks.push(format!(
                "      const attr = await locator.first().getAttribute({});",
                js_str(&attr.name)
            ));
            let message = js_str(&format!("unexpected {} on {}: ", attr.name, selector));
            let condition = match (&attr.value, &attr.contains) {
                (Some(val), _) => format!("attr !== {}", js_str(val)),
                (None, Some(part)) => format!("attr === null || !attr.includes({})", js_str(part)),
                (None, None) => "attr === null".to_string(),
            };
            checks.push(format!("      if ({}) throw new Error({} + attr);", condition, message));
        }

        if let Some(c) = count {
            checks.push(format!(
                "      const count = await locator.count();\n      if (count !== {}) throw new Error({} + count);",
                c,
                js_str(&format!("expected {} element(s) for {}, found: ", c, selector))
            ));
        }

        format!(
            "    {{\n      const locator = page.locator({});\n{}\n    }}",
            js_str(selector),
            checks.join("\n")
        )
    }

    /// Execute the full script via Playwright
    pub async fn run_script(&self, script: &str) -> E2eResult<ScriptOutput> {
        // Write script to temp file
        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("test.js");
        std::fs::write(&script_path, script)?;

        debug!("Running Playwright script: {}", script_path.display());

        // Run with node
        let mut cmd = TokioCommand::new("node");
        cmd.arg(&script_path).current_dir(temp_dir.path());
        if let Some(node_path) = &self.config.node_path {
            cmd.env("NODE_PATH", node_path);
        }
        let output = cmd.output().await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        for line in stdout.lines().filter(|l| l.starts_with("[TEST]")) {
            info!("{}", line);
        }

        match parse_report(&stdout, &stderr) {
            Some(report) if report.success && output.status.success() => Ok(ScriptOutput {
                values: report.values,
                screenshots: Vec::new(),
            }),
            Some(report) => {
                if let Some(path) = &report.screenshot {
                    warn!("Failure screenshot saved to {}", path.display());
                }
                Err(E2eError::StepFailed {
                    step: report.step.unwrap_or_else(|| "setup".to_string()),
                    reason: report.error.unwrap_or_else(|| "unknown error".to_string()),
                    screenshot: report.screenshot,
                })
            }
            None => Err(E2eError::Playwright(format!(
                "Script failed:\nstdout: {}\nstderr: {}",
                stdout, stderr
            ))),
        }
    }
}

/// Find the last report line, checking stdout before stderr
fn parse_report(stdout: &str, stderr: &str) -> Option<ScriptReport> {
    [stdout, stderr].into_iter().find_map(|stream| {
        stream
            .lines()
            .rev()
            .filter(|line| line.trim_start().starts_with('{'))
            .find_map(|line| serde_json::from_str::<ScriptReport>(line).ok())
    })
}

/// Quote a string as a JavaScript literal
fn js_str(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

fn file_safe(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub screenshot_dir: PathBuf,
    pub viewport: Viewport,
    pub browser: Browser,
    pub headless: bool,
    pub default_timeout_ms: u64,
    pub screenshot_on_failure: bool,
    /// Directory exported as `NODE_PATH` so the script can `require('playwright')`
    pub node_path: Option<PathBuf>,
}

impl PlaywrightConfig {
    pub fn from_wiki_config(config: &WikiConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            screenshot_dir: config.screenshot_dir.clone(),
            viewport: config.viewport,
            browser: config.browser,
            headless: config.headless,
            default_timeout_ms: config.default_timeout_ms,
            ..Default::default()
        }
    }
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "https://en.wikipedia.org".to_string(),
            screenshot_dir: PathBuf::from("test-results/screenshots"),
            viewport: Viewport::default(),
            browser: Browser::Chromium,
            headless: true,
            default_timeout_ms: 30_000,
            screenshot_on_failure: true,
            node_path: local_node_modules(),
        }
    }
}

fn local_node_modules() -> Option<PathBuf> {
    let dir = std::env::current_dir().ok()?.join("node_modules");
    dir.is_dir().then_some(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> PlaywrightHandle {
        PlaywrightHandle::from_config(PlaywrightConfig {
            screenshot_dir: PathBuf::from("shots"),
            screenshot_on_failure: false,
            node_path: None,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_missing_npx_reports_playwright_not_found() {
        let (check, ticked) = tokio::join!(
            PlaywrightHandle::check_installed("wikicheck-missing-npx"),
            async {
                tokio::task::yield_now().await;
                true
            }
        );
        assert!(matches!(check, Err(E2eError::PlaywrightNotFound)));
        assert!(ticked);
    }

    #[test]
    fn test_script_uses_browser_settings() {
        let pw = PlaywrightHandle::from_config(PlaywrightConfig {
            browser: Browser::Firefox,
            headless: false,
            default_timeout_ms: 1234,
            screenshot_on_failure: false,
            node_path: None,
            ..Default::default()
        });
        let script = pw.build_script("settings", &[TestStep::WaitForLoad]);

        assert!(script.contains("await firefox.launch({ headless: false })"));
        assert!(script.contains("context.setDefaultTimeout(1234);"));
        assert!(script.contains("const baseUrl = \"https://en.wikipedia.org\";"));
        assert!(script.contains("const failurePath = null;"));
        assert!(script.contains("await page.waitForLoadState('networkidle');"));
    }

    #[test]
    fn test_selectors_are_escaped() {
        let step = TestStep::ExtractText {
            name: "para".to_string(),
            selector: "h3#Debugging_features >> xpath=ancestor::div[1] >> xpath=following::p[1]"
                .to_string(),
        };
        let js = handle().step_to_js(&step);
        assert_eq!(
            js,
            "    values[\"para\"] = (await page.locator(\"h3#Debugging_features >> xpath=ancestor::div[1] >> xpath=following::p[1]\").first().textContent()) ?? '';"
        );

        let step = TestStep::Click {
            selector: "[for='skin-client-pref-skin-theme-value-night']".to_string(),
            timeout_ms: None,
            optional: false,
        };
        assert_eq!(
            handle().step_to_js(&step),
            "    await page.locator(\"[for='skin-client-pref-skin-theme-value-night']\").first().click();"
        );
    }

    #[test]
    fn test_optional_click_checks_visibility() {
        let step = TestStep::Click {
            selector: "button".to_string(),
            timeout_ms: Some(500),
            optional: true,
        };
        let js = handle().step_to_js(&step);
        assert!(js.contains("if (await target.count() > 0 && await target.isVisible())"));
        assert!(js.contains("await target.click({ timeout: 500 });"));
        assert!(js.contains("await page.waitForTimeout(1000);"));
    }

    #[test]
    fn test_assert_builds_each_check() {
        let step = TestStep::Assert {
            selector: "html".to_string(),
            visible: Some(true),
            text: None,
            text_contains: Some("Play\"wright".to_string()),
            attribute: Some(AttributeAssertion {
                name: "class".to_string(),
                value: None,
                contains: Some("skin-theme-clientpref-night".to_string()),
            }),
            count: Some(1),
        };
        let js = handle().step_to_js(&step);
        assert!(js.contains("const locator = page.locator(\"html\");"));
        assert!(js.contains("if (!(await locator.first().isVisible()))"));
        assert!(js.contains("text.includes(\"Play\\\"wright\")"));
        assert!(js.contains("!attr.includes(\"skin-theme-clientpref-night\")"));
        assert!(js.contains("if (count !== 1)"));
    }

    #[test]
    fn test_screenshot_and_relative_navigation() {
        let pw = handle();
        let steps = vec![
            TestStep::Navigate {
                url: "/wiki/Playwright_(software)".to_string(),
                wait_for_selector: Some("#firstHeading".to_string()),
            },
            TestStep::Screenshot {
                name: "before".to_string(),
                selector: None,
                full_page: true,
            },
        ];
        let script = pw.build_script("nav", &steps);
        assert!(script.contains("await page.goto(resolveUrl(\"/wiki/Playwright_(software)\"));"));
        assert!(script.contains("await page.waitForSelector(\"#firstHeading\");"));
        assert!(script.contains("// Step 2: screenshot:before"));
        assert!(script.contains("fullPage: true"));
        assert_eq!(pw.screenshot_path("before"), PathBuf::from("shots/before.png"));
    }

    #[test]
    fn test_failure_screenshot_path_in_script() {
        let pw = PlaywrightHandle::from_config(PlaywrightConfig {
            screenshot_dir: PathBuf::from("shots"),
            screenshot_on_failure: true,
            node_path: None,
            ..Default::default()
        });
        let script = pw.build_script("devtools-link:Visual Studio", &[]);
        assert!(script.contains("const failurePath = \"shots/devtools-link_Visual_Studio_"));
        assert!(script.contains("_failure.png\";"));
    }

    #[test]
    fn test_step_names() {
        let long = "x".repeat(80);
        assert_eq!(
            PlaywrightHandle::step_name(&TestStep::Log { message: long }),
            format!("log:{}", "x".repeat(30))
        );
        assert_eq!(
            PlaywrightHandle::step_name(&TestStep::Evaluate { name: None, script: "1".into() }),
            "evaluate:anonymous"
        );
    }

    #[test]
    fn test_parse_success_report() {
        let stdout = "[TEST] hello\n{\"success\":true,\"values\":{\"title\":\"Playwright - Wikipedia\",\"n\":3}}\n";
        let report = parse_report(stdout, "").unwrap();
        assert!(report.success);

        let output = ScriptOutput { values: report.values, screenshots: vec![] };
        assert_eq!(output.text("title").unwrap(), "Playwright - Wikipedia");
        assert_eq!(output.get::<u32>("n").unwrap(), 3);
        assert_eq!(output.text("n").unwrap(), "3");
        assert!(matches!(output.text("missing"), Err(E2eError::MissingValue(_))));
    }

    #[test]
    fn test_parse_failure_report_from_stderr() {
        let stderr = "some node warning\n{\"success\":false,\"step\":\"click:button\",\"error\":\"Timeout 30000ms exceeded\",\"screenshot\":\"shots/x_failure.png\"}";
        let report = parse_report("", stderr).unwrap();
        assert!(!report.success);
        assert_eq!(report.step.as_deref(), Some("click:button"));
        assert_eq!(report.screenshot, Some(PathBuf::from("shots/x_failure.png")));
    }

    #[test]
    fn test_unparseable_output() {
        assert!(parse_report("Error: Cannot find module 'playwright'", "").is_none());
    }
}
