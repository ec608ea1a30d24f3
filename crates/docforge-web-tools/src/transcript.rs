//! Video transcript fetcher
//!
//! Resolves a video id from a URL or bare id, discovers the first caption
//! track on the watch page, and flattens the track's timed-text XML into
//! plain segments.

use std::time::Duration;

use serde::Serialize;
use url::Url;

use crate::web_page_reader::decode_entities;
use crate::{USER_AGENT, WebToolError};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSegment {
    pub start_secs: f64,
    pub duration_secs: f64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub video_id: String,
    pub text: String,
    pub segments: Vec<TranscriptSegment>,
}

pub struct TranscriptFetcher {
    client: reqwest::Client,
}

impl TranscriptFetcher {
    pub fn new(timeout: Duration) -> Result<Self, WebToolError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|error| WebToolError::Http(error.to_string()))?;
        Ok(Self { client })
    }

    pub async fn fetch(&self, video: &str) -> Result<Transcript, WebToolError> {
        let video_id = extract_video_id(video)?;
        tracing::debug!(%video_id, "fetching transcript");

        let watch_page = self
            .client
            .get(format!("https://www.youtube.com/watch?v={video_id}"))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let track_url = extract_caption_track(&watch_page).ok_or_else(|| {
            WebToolError::Payload(format!("no caption track found for video {video_id}"))
        })?;

        let timed_text = self
            .client
            .get(&track_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let segments = parse_timed_text(&timed_text);
        if segments.is_empty() {
            return Err(WebToolError::Payload(format!(
                "caption track for video {video_id} was empty"
            )));
        }

        let text = segments
            .iter()
            .map(|segment| segment.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        Ok(Transcript {
            video_id,
            text,
            segments,
        })
    }
}

/// Accepts watch URLs, short links, embed URLs, and bare 11-character ids.
pub(crate) fn extract_video_id(input: &str) -> Result<String, WebToolError> {
    let is_id = |candidate: &str| {
        candidate.len() == 11
            && candidate
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    };

    if is_id(input) {
        return Ok(input.to_string());
    }

    let url = Url::parse(input)
        .map_err(|_| WebToolError::InvalidInput(format!("unrecognized video reference {input:?}")))?;

    if let Some(id) = url.query_pairs().find(|(key, _)| key == "v").map(|(_, v)| v.into_owned()) {
        if is_id(&id) {
            return Ok(id);
        }
    }

    if let Some(segment) = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
    {
        if is_id(segment) {
            return Ok(segment.to_string());
        }
    }

    Err(WebToolError::InvalidInput(format!(
        "unrecognized video reference {input:?}"
    )))
}

/// First `baseUrl` inside the watch page's `captionTracks` JSON blob.
pub(crate) fn extract_caption_track(watch_page: &str) -> Option<String> {
    let tracks_start = watch_page.find("\"captionTracks\":")?;
    let tail = &watch_page[tracks_start..];

    let marker = "\"baseUrl\":\"";
    let url_start = tail.find(marker)? + marker.len();
    let url_end = tail[url_start..].find('"')? + url_start;

    let raw = &tail[url_start..url_end];
    Some(raw.replace("\\u0026", "&").replace("\\/", "/"))
}

/// Flatten `<text start=".." dur="..">..</text>` entries.
pub(crate) fn parse_timed_text(xml: &str) -> Vec<TranscriptSegment> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    while let Some(found) = xml[cursor..].find("<text ") {
        let tag_start = cursor + found;
        let Some(tag_end) = xml[tag_start..].find('>').map(|i| tag_start + i) else {
            break;
        };
        let Some(close) = xml[tag_end..].find("</text>").map(|i| tag_end + i) else {
            break;
        };

        let attrs = &xml[tag_start..tag_end];
        let body = &xml[tag_end + 1..close];
        let text = decode_entities(body).trim().to_string();

        if !text.is_empty() {
            segments.push(TranscriptSegment {
                start_secs: attr_value(attrs, "start").unwrap_or(0.0),
                duration_secs: attr_value(attrs, "dur").unwrap_or(0.0),
                text,
            });
        }

        cursor = close + "</text>".len();
    }

    segments
}

fn attr_value(attrs: &str, name: &str) -> Option<f64> {
    let marker = format!("{name}=\"");
    let start = attrs.find(&marker)? + marker.len();
    let end = attrs[start..].find('"')? + start;
    attrs[start..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_video_id_variants() {
        for input in [
            "dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
        ] {
            assert_eq!(extract_video_id(input).unwrap(), "dQw4w9WgXcQ", "{input}");
        }
    }

    #[test]
    fn test_extract_video_id_rejects_noise() {
        assert!(extract_video_id("short").is_err());
        assert!(extract_video_id("https://example.com/").is_err());
    }

    #[test]
    fn test_extract_caption_track_unescapes() {
        let page = r#"stuff "captionTracks":[{"baseUrl":"https:\/\/example.com\/api\/timedtext?v=x&lang=en","name":{}}] more"#;
        assert_eq!(
            extract_caption_track(page).unwrap(),
            "https://example.com/api/timedtext?v=x&lang=en"
        );
        assert_eq!(extract_caption_track("no tracks here"), None);
    }

    #[test]
    fn test_parse_timed_text() {
        let xml = r#"<transcript>
<text start="0.5" dur="2.1">Hello &amp; welcome</text>
<text start="2.6" dur="1.0"></text>
<text start="3.6" dur="2.0">to the show</text>
</transcript>"#;

        let segments = parse_timed_text(xml);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Hello & welcome");
        assert_eq!(segments[0].start_secs, 0.5);
        assert_eq!(segments[1].text, "to the show");
    }
}
