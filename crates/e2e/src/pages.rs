//! Page objects for Wikipedia articles
//!
//! A page object turns intent ("read the theme", "collect navbox links")
//! into [`TestStep`]s and interprets the values those steps record.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{E2eError, E2eResult};
use crate::playwright::ScriptOutput;
use crate::spec::{TestStep, WaitState};

const HTML_ELEMENT: &str = "html";
const APPEARANCE_BUTTON: &str = "xpath=//button[contains(@class, 'vector-appearance')]";
const DARK_OPTION: &str = "xpath=//label[contains(., 'Dark')]";
const NIGHT_CLASS: &str = "skin-theme-clientpref-night";
const DAY_CLASS: &str = "skin-theme-clientpref-day";

const THEME_VALUE: &str = "theme_class";
const PARAGRAPH_VALUE: &str = "section_paragraph";
const LIST_VALUE: &str = "section_list";
const LINKS_VALUE: &str = "navbox_links";

/// Colour theme applied by the Vector skin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Day,
    Night,
    Unknown,
}

impl Theme {
    /// Read the theme from the `<html>` class list; night wins if both appear
    pub fn from_class_list(classes: &str) -> Self {
        let has = |class: &str| classes.split_whitespace().any(|c| c == class);
        if has(NIGHT_CLASS) {
            Theme::Night
        } else if has(DAY_CLASS) {
            Theme::Day
        } else {
            Theme::Unknown
        }
    }

    /// The theme a toggle switches to; `Unknown` stays `Unknown`
    pub fn toggled(self) -> Self {
        match self {
            Theme::Day => Theme::Night,
            Theme::Night => Theme::Day,
            Theme::Unknown => Theme::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Day => "day",
            Theme::Night => "night",
            Theme::Unknown => "unknown",
        }
    }

    fn toggle_selector(self) -> Option<String> {
        match self {
            Theme::Day | Theme::Night => Some(format!(
                "[for='skin-client-pref-skin-theme-value-{}']",
                self.as_str()
            )),
            Theme::Unknown => None,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A navbox entry and whether it carries an `href`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Technology {
    pub name: String,
    pub is_link: bool,
}

#[derive(Debug, Deserialize)]
struct RawLink {
    text: String,
    has_href: bool,
}

/// Page object for a Wikipedia article
#[derive(Debug, Clone, Default)]
pub struct WikipediaPage;

impl WikipediaPage {
    pub fn new() -> Self {
        Self
    }

    /// Navigate and wait for the network to go idle
    pub fn open(&self, url: &str) -> Vec<TestStep> {
        vec![
            TestStep::Navigate {
                url: url.to_string(),
                wait_for_selector: None,
            },
            TestStep::WaitForLoad,
        ]
    }

    /// Record the paragraph and list that follow a section heading
    pub fn section_text_steps(&self, heading_id: &str) -> Vec<TestStep> {
        let heading = format!("[id='{}']", heading_id);
        let paragraph = format!("{} >> xpath=ancestor::div[1] >> xpath=following::p[1]", heading);
        let list = format!("{} >> xpath=following::ul[1]", paragraph);

        vec![
            TestStep::Wait {
                selector: heading,
                timeout_ms: 10_000,
                state: Default::default(),
            },
            TestStep::ExtractText {
                name: PARAGRAPH_VALUE.to_string(),
                selector: paragraph,
            },
            TestStep::ExtractText {
                name: LIST_VALUE.to_string(),
                selector: list,
            },
        ]
    }

    /// Paragraph and list text joined the way a reader sees them
    pub fn combine_section_text(&self, output: &ScriptOutput) -> E2eResult<String> {
        let paragraph = output.text(PARAGRAPH_VALUE)?;
        let list = output.text(LIST_VALUE)?;
        let combined = format!("{} {}", paragraph.trim(), list.trim()).trim().to_string();

        if combined.is_empty() {
            return Err(E2eError::EmptyContent("section content is empty".to_string()));
        }
        Ok(combined)
    }

    /// Expand a navbox identified by its `aria-labelledby` and record its links
    pub fn navbox_links_steps(&self, labelled_by: &str) -> Vec<TestStep> {
        let navbox = format!("div[aria-labelledby*='{}']", labelled_by);

        vec![
            TestStep::Wait {
                selector: navbox.clone(),
                timeout_ms: 10_000,
                state: WaitState::Attached,
            },
            TestStep::Click {
                selector: format!("{} button", navbox),
                timeout_ms: None,
                optional: true,
            },
            TestStep::ExtractLinks {
                name: LINKS_VALUE.to_string(),
                selector: navbox,
            },
        ]
    }

    /// Named links from a navbox; anchors without visible text are dropped
    pub fn technologies(&self, output: &ScriptOutput) -> E2eResult<Vec<Technology>> {
        let links: Vec<RawLink> = output.get(LINKS_VALUE)?;
        Ok(links
            .into_iter()
            .filter(|link| !link.text.trim().is_empty())
            .map(|link| Technology {
                name: link.text.trim().to_string(),
                is_link: link.has_href,
            })
            .collect())
    }

    pub fn theme_class_steps(&self) -> Vec<TestStep> {
        vec![TestStep::ExtractAttribute {
            name: THEME_VALUE.to_string(),
            selector: HTML_ELEMENT.to_string(),
            attribute: "class".to_string(),
        }]
    }

    pub fn theme_class(&self, output: &ScriptOutput) -> E2eResult<String> {
        output.text(THEME_VALUE)
    }

    pub fn theme(&self, output: &ScriptOutput) -> E2eResult<Theme> {
        Ok(Theme::from_class_list(&self.theme_class(output)?))
    }

    /// Switch to `target` and record the resulting class list
    pub fn switch_theme_steps(&self, target: Theme) -> E2eResult<Vec<TestStep>> {
        let toggle = target.toggle_selector().ok_or_else(|| {
            E2eError::AssertionFailed("cannot switch to an unknown theme".to_string())
        })?;

        let mut steps = vec![
            TestStep::Click {
                selector: APPEARANCE_BUTTON.to_string(),
                timeout_ms: None,
                optional: true,
            },
            TestStep::Wait {
                selector: toggle.clone(),
                timeout_ms: 10_000,
                state: Default::default(),
            },
            TestStep::Click {
                selector: toggle,
                timeout_ms: None,
                optional: false,
            },
            TestStep::Sleep { ms: 2000 },
        ];
        steps.extend(self.theme_class_steps());
        Ok(steps)
    }

    /// Appearance button is visible and opening it offers a dark option
    pub fn appearance_menu_steps(&self) -> Vec<TestStep> {
        vec![
            TestStep::Assert {
                selector: APPEARANCE_BUTTON.to_string(),
                visible: Some(true),
                text: None,
                text_contains: None,
                attribute: None,
                count: None,
            },
            TestStep::Click {
                selector: APPEARANCE_BUTTON.to_string(),
                timeout_ms: None,
                optional: false,
            },
            TestStep::Wait {
                selector: DARK_OPTION.to_string(),
                timeout_ms: 5000,
                state: WaitState::Visible,
            },
        ]
    }
}
