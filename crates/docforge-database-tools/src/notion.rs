//! Notion REST client

use std::time::Duration;

use reqwest::Method;
use serde_json::{Value, json};
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";

#[derive(Error, Debug)]
pub enum NotionError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Notion request timed out: {0}")]
    Timeout(String),

    #[error("Notion request failed: {0}")]
    Http(String),

    /// Notion answered with an error payload; the upstream message is kept
    /// verbatim so callers can diagnose key and schema problems.
    #[error("Notion API error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl From<reqwest::Error> for NotionError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            NotionError::Timeout(error.to_string())
        } else {
            NotionError::Http(error.to_string())
        }
    }
}

pub struct NotionClient {
    client: reqwest::Client,
    base_url: String,
}

impl NotionClient {
    pub fn new(timeout: Duration) -> Result<Self, NotionError> {
        Self::with_base_url(timeout, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(timeout: Duration, base_url: &str) -> Result<Self, NotionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| NotionError::Http(error.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Database property names and types, without the full schema payload.
    pub async fn view_structure(
        &self,
        api_key: &str,
        database_id: &str,
    ) -> Result<Value, NotionError> {
        let database = self
            .send(api_key, Method::GET, &format!("/databases/{database_id}"), None)
            .await?;

        let mut structure = serde_json::Map::new();
        if let Some(properties) = database.get("properties").and_then(Value::as_object) {
            for (name, property) in properties {
                let property_type = property
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                structure.insert(name.clone(), Value::String(property_type.to_string()));
            }
        }

        Ok(json!({
            "databaseId": database_id,
            "structure": structure,
        }))
    }

    pub async fn query_pages(
        &self,
        api_key: &str,
        database_id: &str,
        filter: Option<Value>,
        sorts: Option<Value>,
        page_size: u32,
        start_cursor: Option<String>,
    ) -> Result<Value, NotionError> {
        let mut body = serde_json::Map::new();
        body.insert("page_size".to_string(), json!(page_size.min(100)));
        if let Some(filter) = filter {
            if filter.as_object().is_some_and(|map| !map.is_empty()) {
                body.insert("filter".to_string(), filter);
            }
        }
        if let Some(sorts) = sorts {
            if sorts.as_array().is_some_and(|list| !list.is_empty()) {
                body.insert("sorts".to_string(), sorts);
            }
        }
        if let Some(cursor) = start_cursor {
            body.insert("start_cursor".to_string(), Value::String(cursor));
        }

        self.send(
            api_key,
            Method::POST,
            &format!("/databases/{database_id}/query"),
            Some(Value::Object(body)),
        )
        .await
    }

    pub async fn create_page(
        &self,
        api_key: &str,
        database_id: &str,
        properties: Value,
    ) -> Result<Value, NotionError> {
        self.send(
            api_key,
            Method::POST,
            "/pages",
            Some(json!({
                "parent": { "database_id": database_id },
                "properties": properties,
            })),
        )
        .await
    }

    pub async fn update_page(
        &self,
        api_key: &str,
        page_id: &str,
        properties: Value,
    ) -> Result<Value, NotionError> {
        self.send(
            api_key,
            Method::PATCH,
            &format!("/pages/{page_id}"),
            Some(json!({ "properties": properties })),
        )
        .await
    }

    pub async fn archive_page(&self, api_key: &str, page_id: &str) -> Result<Value, NotionError> {
        self.send(
            api_key,
            Method::PATCH,
            &format!("/pages/{page_id}"),
            Some(json!({ "archived": true })),
        )
        .await
    }

    async fn send(
        &self,
        api_key: &str,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, NotionError> {
        if api_key.is_empty() {
            return Err(NotionError::InvalidInput("Notion Key is required!".to_string()));
        }

        let url = format!("{}{path}", self.base_url);
        tracing::debug!(%method, %url, "notion request");

        let mut request = self
            .client
            .request(method, &url)
            .bearer_auth(api_key)
            .header("Notion-Version", NOTION_VERSION);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|error| NotionError::Http(error.to_string()))?;

        if !status.is_success() {
            let message = payload
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(NotionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_api_key_fails_before_network() {
        let client = NotionClient::new(Duration::from_secs(1)).unwrap();
        let result = client.view_structure("", "db-id").await;
        assert!(matches!(result, Err(NotionError::InvalidInput(_))));
    }

    #[test]
    fn test_base_url_is_normalized() {
        let client =
            NotionClient::with_base_url(Duration::from_secs(1), "http://localhost:1234/").unwrap();
        assert_eq!(client.base_url, "http://localhost:1234");
    }
}
