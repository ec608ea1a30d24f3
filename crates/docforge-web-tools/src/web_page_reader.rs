//! Web page reader
//!
//! Fetches a page and reduces it to its title and readable text. The
//! extraction is deliberately simple: drop script and style blocks, strip
//! tags, collapse whitespace.

use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use url::Url;

use crate::{USER_AGENT, WebToolError};

/// Cap on extracted text, keeping responses bounded for huge pages.
const MAX_TEXT_LEN: usize = 100_000;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContent {
    pub url: String,
    pub title: Option<String>,
    pub text: String,
    pub fetched_at: String,
}

pub struct WebPageReader {
    client: reqwest::Client,
}

impl WebPageReader {
    pub fn new(timeout: Duration) -> Result<Self, WebToolError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|error| WebToolError::Http(error.to_string()))?;
        Ok(Self { client })
    }

    pub async fn read(&self, url: &str) -> Result<PageContent, WebToolError> {
        let parsed = Url::parse(url)
            .map_err(|error| WebToolError::InvalidInput(format!("invalid URL {url:?}: {error}")))?;

        tracing::debug!(%parsed, "fetching page content");

        let html = self
            .client
            .get(parsed.clone())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let mut text = extract_text(&html);
        truncate_to_char_boundary(&mut text, MAX_TEXT_LEN);

        Ok(PageContent {
            url: parsed.into(),
            title: extract_title(&html),
            text,
            fetched_at: Utc::now().to_rfc3339(),
        })
    }
}

fn truncate_to_char_boundary(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}

pub(crate) fn extract_title(html: &str) -> Option<String> {
    // ASCII lowering keeps byte offsets aligned with the original
    let lower = html.to_ascii_lowercase();
    let start = lower.find("<title")?;
    let open_end = html[start..].find('>')? + start + 1;
    let close = lower[open_end..].find("</title>")? + open_end;
    let title = decode_entities(html[open_end..close].trim());
    if title.is_empty() { None } else { Some(title) }
}

/// Strip markup down to readable text.
pub(crate) fn extract_text(html: &str) -> String {
    let without_scripts = drop_element_blocks(html, "script");
    let without_styles = drop_element_blocks(&without_scripts, "style");

    let mut text = String::with_capacity(without_styles.len() / 2);
    let mut in_tag = false;
    for c in without_styles.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    let decoded = decode_entities(&text);
    let mut collapsed = String::with_capacity(decoded.len());
    let mut last_was_space = true;
    for c in decoded.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                collapsed.push(' ');
                last_was_space = true;
            }
        } else {
            collapsed.push(c);
            last_was_space = false;
        }
    }
    collapsed.trim().to_string()
}

/// Remove `<tag ...>...</tag>` blocks wholesale, case-insensitively.
fn drop_element_blocks(html: &str, tag: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    let mut result = String::with_capacity(html.len());
    let mut cursor = 0;

    while let Some(found) = lower[cursor..].find(&open) {
        let start = cursor + found;
        result.push_str(&html[cursor..start]);
        match lower[start..].find(&close) {
            Some(end) => cursor = start + end + close.len(),
            None => {
                cursor = html.len();
                break;
            }
        }
    }
    result.push_str(&html[cursor..]);
    result
}

pub(crate) fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_title() {
        let html = "<html><head><title>  Docforge &amp; Friends </title></head></html>";
        assert_eq!(extract_title(html), Some("Docforge & Friends".to_string()));
        assert_eq!(extract_title("<html></html>"), None);
    }

    #[test]
    fn test_extract_text_drops_scripts_and_tags() {
        let html = "<body><script>var x = 1;</script><p>Hello <b>world</b></p>\
<style>p { color: red }</style><p>again</p></body>";
        let text = extract_text(html);
        assert_eq!(text, "Hello world again");
        assert!(!text.contains("var x"));
        assert!(!text.contains("color"));
    }

    #[test]
    fn test_extract_text_decodes_entities() {
        assert_eq!(extract_text("<p>a &amp; b&nbsp;c</p>"), "a & b c");
    }

    #[test]
    fn test_unterminated_script_block() {
        let text = extract_text("<p>kept</p><script>never closed");
        assert_eq!(text, "kept");
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected_before_network() {
        let reader = WebPageReader::new(Duration::from_secs(1)).unwrap();
        let result = reader.read("not a url").await;
        assert!(matches!(result, Err(WebToolError::InvalidInput(_))));
    }
}
