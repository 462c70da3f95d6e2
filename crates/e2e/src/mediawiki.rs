//! MediaWiki Action API client and section text extraction

use scraper::node::Node;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};
use wikicheck_common::{collapse_whitespace, strip_reference_markers, WikiConfig};

use crate::error::{E2eError, E2eResult};

const USER_AGENT: &str = concat!(
    "wikicheck/",
    env!("CARGO_PKG_VERSION"),
    " (end-to-end content checks)"
);

/// Elements whose text never belongs to article prose
const SKIP_TAGS: &[&str] = &["sup", "style", "script"];

/// A section entry from `action=parse&prop=sections`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Section {
    #[serde(rename = "line")]
    pub title: String,
    #[serde(deserialize_with = "number_or_string")]
    pub index: u32,
    #[serde(default)]
    pub anchor: String,
    #[serde(default, deserialize_with = "number_or_string")]
    pub level: u32,
}

impl Section {
    /// Heading id to look for in rendered HTML
    pub fn heading_id(&self) -> String {
        if self.anchor.is_empty() {
            self.title.replace(' ', "_")
        } else {
            self.anchor.clone()
        }
    }
}

#[derive(Debug, Deserialize)]
struct ParseResponse {
    #[serde(default)]
    parse: Option<ParsePayload>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ParsePayload {
    #[serde(default)]
    sections: Option<Vec<Section>>,
    #[serde(default)]
    text: Option<TextBlob>,
}

#[derive(Debug, Deserialize)]
struct TextBlob {
    #[serde(rename = "*")]
    html: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    #[serde(default)]
    info: String,
}

impl ParseResponse {
    fn into_payload(self, page: &str) -> E2eResult<ParsePayload> {
        match (self.parse, self.error) {
            (Some(payload), _) => Ok(payload),
            (None, Some(err)) => Err(E2eError::MediaWiki(format!(
                "{} ({}) for page '{}'",
                err.info, err.code, page
            ))),
            (None, None) => Err(E2eError::MediaWiki(format!(
                "response for page '{}' has no parse payload",
                page
            ))),
        }
    }
}

/// The API returns indices and levels as strings ("3"); accept numbers too.
fn number_or_string<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Client for the `action=parse` endpoint
#[derive(Debug, Clone)]
pub struct MediaWikiClient {
    client: reqwest::Client,
    api_url: String,
}

impl MediaWikiClient {
    pub fn new(config: &WikiConfig) -> E2eResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_millis(config.default_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    async fn parse(&self, page: &str, extra: &[(&str, &str)]) -> E2eResult<ParsePayload> {
        let mut query = vec![("action", "parse"), ("page", page), ("format", "json")];
        query.extend_from_slice(extra);

        debug!("MediaWiki request: {} {:?}", self.api_url, query);

        let response: ParseResponse = self
            .client
            .get(&self.api_url)
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response.into_payload(page)
    }

    /// All sections of a page, in document order
    pub async fn sections(&self, page: &str) -> E2eResult<Vec<Section>> {
        let payload = self.parse(page, &[("prop", "sections")]).await?;
        payload
            .sections
            .ok_or_else(|| E2eError::MediaWiki(format!("no sections found for page '{}'", page)))
    }

    /// First section whose title contains `title`, ignoring case
    pub async fn find_section(&self, page: &str, title: &str) -> E2eResult<Section> {
        let sections = self.sections(page).await?;
        find_section(&sections, title).cloned().ok_or_else(|| E2eError::SectionNotFound {
            page: page.to_string(),
            section: title.to_string(),
        })
    }

    /// Rendered HTML of one section
    pub async fn section_html(&self, page: &str, index: u32) -> E2eResult<String> {
        let index = index.to_string();
        let payload = self
            .parse(page, &[("prop", "text"), ("section", index.as_str())])
            .await?;
        payload
            .text
            .map(|blob| blob.html)
            .ok_or_else(|| E2eError::MediaWiki(format!("section {} of '{}' has no text", index, page)))
    }

    /// Plain text of a section's lead paragraph and first list
    pub async fn section_text(&self, page: &str, title: &str) -> E2eResult<String> {
        let section = self.find_section(page, title).await?;
        info!(
            "Section '{}' of '{}' has index {}",
            section.title, page, section.index
        );

        let html = self.section_html(page, section.index).await?;
        let text = extract_section_text(&html, &section.heading_id())?;
        debug!("API text ({} chars): {}", text.len(), text);
        Ok(text)
    }
}

pub fn find_section<'a>(sections: &'a [Section], title: &str) -> Option<&'a Section> {
    let needle = title.to_lowercase();
    sections
        .iter()
        .find(|section| section.title.to_lowercase().contains(&needle))
}

/// Extract the paragraph and list text that follow a section heading.
///
/// The heading is the element whose `id` equals `heading_id`. Its nearest
/// `div` ancestor (the heading wrapper in current skins) anchors the search:
/// the first `<p>` after it and the `<li>` items of the first `<ul>` after it
/// are collected, in that order.
pub fn extract_section_text(html: &str, heading_id: &str) -> E2eResult<String> {
    let document = Html::parse_fragment(html);

    let heading = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().id() == Some(heading_id))
        .ok_or_else(|| E2eError::HeadingNotFound(heading_id.to_string()))?;

    let anchor = heading
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "div")
        .unwrap_or(heading);

    // Document-order position of every node, for the XPath `following` axis.
    let order: HashMap<_, usize> = document
        .tree
        .root()
        .descendants()
        .enumerate()
        .map(|(pos, node)| (node.id(), pos))
        .collect();

    let after = anchor
        .descendants()
        .last()
        .and_then(|node| order.get(&node.id()).copied())
        .unwrap_or(0);

    let following = |tag: &str| {
        document
            .tree
            .root()
            .descendants()
            .skip(after + 1)
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == tag)
    };

    let mut pieces = Vec::new();

    if let Some(paragraph) = following("p") {
        pieces.push(element_text(paragraph));
    }

    if let Some(list) = following("ul") {
        pieces.extend(
            list.children()
                .filter_map(ElementRef::wrap)
                .filter(|el| el.value().name() == "li")
                .map(element_text),
        );
    }

    let joined = pieces
        .into_iter()
        .filter(|piece| !piece.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    Ok(collapse_whitespace(&strip_reference_markers(&joined)))
}

/// Text of an element as `textContent` reads it, minus citation superscripts
/// and inline styles
fn element_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    collect_text(element, &mut text);
    text
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if SKIP_TAGS.contains(&el.name()) => {}
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, out);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wikicheck_common::{compare, normalize};

    const SECTION_HTML: &str = r##"
<div class="mw-content-ltr mw-parser-output" lang="en" dir="ltr">
  <div class="mw-heading mw-heading3"><h3 id="Debugging_features">Debugging features</h3><span class="mw-editsection"><span class="mw-editsection-bracket">[</span><a href="/w/index.php?action=edit">edit</a><span class="mw-editsection-bracket">]</span></span></div>
  <p>Playwright supports the following debugging features:<sup id="cite_ref-1" class="reference"><a href="#cite_note-1">&#91;1&#93;</a></sup>
  </p>
  <ul>
    <li>Logging with <a href="/wiki/Trace">traces</a> &amp; snapshots</li>
    <li>Step-by-step <b>inspection</b>[2]</li>
  </ul>
  <p>Another paragraph.</p>
  <ul><li>Another list</li></ul>
</div>
"##;

    #[test]
    fn test_extracts_paragraph_and_first_list() {
        let text = extract_section_text(SECTION_HTML, "Debugging_features").unwrap();
        assert_eq!(
            text,
            "Playwright supports the following debugging features: Logging with traces & snapshots Step-by-step inspection"
        );
    }

    #[test]
    fn test_matches_ui_text_vocabulary() {
        let api = extract_section_text(SECTION_HTML, "Debugging_features").unwrap();
        let ui = "Playwright supports the following debugging features:[1]\n\n\
                  Logging with traces & snapshots\nStep-by-step inspection[2]";
        let diff = compare(&normalize(ui), &normalize(&api));
        assert!(diff.is_empty(), "{}", diff);
    }

    #[test]
    fn test_heading_without_wrapper_div() {
        let html = r#"<h2 id="History">History</h2><p>JavaScript was created in 1995.</p>"#;
        let text = extract_section_text(html, "History").unwrap();
        assert_eq!(text, "JavaScript was created in 1995.");
    }

    #[test]
    fn test_inline_markup_does_not_split_words() {
        let html = r#"<div class="mw-heading"><h3 id="X">X</h3></div><p>A &amp; B<sup>[1]</sup> <i>c</i>d Java<b>Script</b></p>"#;
        let text = extract_section_text(html, "X").unwrap();
        assert_eq!(text, "A & B cd JavaScript");
    }

    #[test]
    fn test_missing_heading() {
        let err = extract_section_text(SECTION_HTML, "Nope").unwrap_err();
        assert!(matches!(err, E2eError::HeadingNotFound(id) if id == "Nope"));
    }

    #[test]
    fn test_section_index_accepts_strings_and_numbers() {
        let json = r#"{"parse":{"title":"Playwright (software)","pageid":1,"sections":[
            {"toclevel":1,"level":"2","line":"History","number":"1","index":"1","anchor":"History"},
            {"toclevel":2,"level":"3","line":"Debugging features","number":"2.1","index":4,"anchor":"Debugging_features"}
        ]}}"#;
        let response: ParseResponse = serde_json::from_str(json).unwrap();
        let sections = response.into_payload("Playwright_(software)").unwrap().sections.unwrap();

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].index, 1);
        assert_eq!(sections[1].index, 4);
        assert_eq!(sections[1].level, 3);

        let found = find_section(&sections, "debugging FEATURES").unwrap();
        assert_eq!(found.heading_id(), "Debugging_features");
        assert!(find_section(&sections, "Reception").is_none());
    }

    #[test]
    fn test_heading_id_falls_back_to_title() {
        let section = Section {
            title: "Debugging features".to_string(),
            index: 3,
            anchor: String::new(),
            level: 3,
        };
        assert_eq!(section.heading_id(), "Debugging_features");
    }

    #[test]
    fn test_api_error_is_reported() {
        let json = r#"{"error":{"code":"missingtitle","info":"The page you specified doesn't exist."}}"#;
        let response: ParseResponse = serde_json::from_str(json).unwrap();
        let err = response.into_payload("No_such_page").unwrap_err();
        assert!(err.to_string().contains("missingtitle"));
        assert!(err.to_string().contains("No_such_page"));
    }

    #[test]
    fn test_section_text_blob() {
        let json = r#"{"parse":{"title":"X","text":{"*":"<p>hi</p>"}}}"#;
        let response: ParseResponse = serde_json::from_str(json).unwrap();
        let payload = response.into_payload("X").unwrap();
        assert_eq!(payload.text.unwrap().html, "<p>hi</p>");
        assert!(payload.sections.is_none());
    }

    #[test]
    fn test_client_uses_configured_endpoint() {
        let config = WikiConfig {
            base_url: "http://localhost:8080".to_string(),
            ..Default::default()
        };
        let client = MediaWikiClient::new(&config).unwrap();
        assert_eq!(client.api_url(), "http://localhost:8080/w/api.php");
    }
}
