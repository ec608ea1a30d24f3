//! Pass-through integration endpoints
//!
//! Thin HTTP fronts over the outbound clients: web page reading, video
//! transcripts, the Notion database operations, SMTP relay, and image
//! generation. Each validates its inputs, delegates, and wraps the result
//! in the uniform envelope.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use docforge_core::ServiceResponse;
use docforge_mail::{MailReceipt, MailRequest};
use docforge_web_tools::PageContent;

use crate::{AppError, AppState};

// --- web page reader ---

#[derive(Debug, Deserialize)]
pub(crate) struct WebPageQuery {
    url: Option<String>,
}

pub(crate) async fn read_web_page(
    State(state): State<AppState>,
    Query(query): Query<WebPageQuery>,
) -> Result<Json<ServiceResponse<PageContent>>, AppError> {
    let url = query
        .url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| AppError::validation("URL is required!"))?;

    let content = state.web_reader.read(&url).await?;
    Ok(Json(ServiceResponse::success(
        "Content fetched successfully",
        content,
        200,
    )))
}

// --- video transcript ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TranscriptQuery {
    video_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TranscriptPayload {
    text_only: String,
}

pub(crate) async fn get_transcript(
    State(state): State<AppState>,
    Query(query): Query<TranscriptQuery>,
) -> Result<Json<ServiceResponse<TranscriptPayload>>, AppError> {
    let video_id = query
        .video_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::validation("Please provide a videoId query parameter."))?;

    let transcript = state.transcripts.fetch(&video_id).await?;
    Ok(Json(ServiceResponse::success(
        "Transcript fetched successfully",
        TranscriptPayload {
            text_only: transcript.text,
        },
        200,
    )))
}

// --- notion database ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotionRequest {
    notion_api_key: Option<String>,
    database_id: Option<String>,
    page_id: Option<String>,
    #[serde(default)]
    filter: Option<Value>,
    #[serde(default)]
    sorts: Option<Value>,
    #[serde(default = "default_page_size")]
    page_size: u32,
    start_cursor: Option<String>,
    #[serde(default)]
    properties: Option<Value>,
}

fn default_page_size() -> u32 {
    100
}

impl NotionRequest {
    fn parse(body: Value) -> Result<Self, AppError> {
        serde_json::from_value(body).map_err(|error| AppError::validation(error.to_string()))
    }

    fn api_key(&self, state: &AppState) -> Result<String, AppError> {
        self.notion_api_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| state.config.upstream.notion_api_key.clone())
            .ok_or_else(|| {
                AppError::validation_with_hint(
                    "Notion Key is required!",
                    "Please make sure you have sent the Notion integration key.",
                )
            })
    }

    fn database_id(&self) -> Result<&str, AppError> {
        self.database_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                AppError::validation_with_hint(
                    "Database ID is required!",
                    "Please make sure you have sent the Database ID.",
                )
            })
    }

    fn page_id(&self) -> Result<&str, AppError> {
        self.page_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::validation("Page ID is required!"))
    }

    fn properties(&self) -> Result<Value, AppError> {
        self.properties
            .clone()
            .filter(|properties| properties.is_object())
            .ok_or_else(|| AppError::validation("Properties are required!"))
    }
}

pub(crate) async fn notion_query_pages(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<ServiceResponse<Value>>, AppError> {
    let request = NotionRequest::parse(body)?;
    let api_key = request.api_key(&state)?;

    let pages = state
        .notion
        .query_pages(
            &api_key,
            request.database_id()?,
            request.filter.clone(),
            request.sorts.clone(),
            request.page_size,
            request.start_cursor.clone(),
        )
        .await?;

    Ok(Json(ServiceResponse::success(
        "Pages retrieved successfully",
        pages,
        200,
    )))
}

pub(crate) async fn notion_view_structure(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<ServiceResponse<Value>>, AppError> {
    let request = NotionRequest::parse(body)?;
    let api_key = request.api_key(&state)?;

    let structure = state
        .notion
        .view_structure(&api_key, request.database_id()?)
        .await?;

    Ok(Json(ServiceResponse::success(
        "Structure retrieved successfully",
        structure,
        200,
    )))
}

pub(crate) async fn notion_create_page(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<ServiceResponse<Value>>, AppError> {
    let request = NotionRequest::parse(body)?;
    let api_key = request.api_key(&state)?;

    let page = state
        .notion
        .create_page(&api_key, request.database_id()?, request.properties()?)
        .await?;

    Ok(Json(ServiceResponse::success(
        "Page created successfully",
        page,
        200,
    )))
}

pub(crate) async fn notion_update_page(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<ServiceResponse<Value>>, AppError> {
    let request = NotionRequest::parse(body)?;
    let api_key = request.api_key(&state)?;

    let page = state
        .notion
        .update_page(&api_key, request.page_id()?, request.properties()?)
        .await?;

    Ok(Json(ServiceResponse::success(
        "Page updated successfully",
        page,
        200,
    )))
}

pub(crate) async fn notion_archive_page(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<ServiceResponse<Value>>, AppError> {
    let request = NotionRequest::parse(body)?;
    let api_key = request.api_key(&state)?;

    let page = state
        .notion
        .archive_page(&api_key, request.page_id()?)
        .await?;

    Ok(Json(ServiceResponse::success(
        "Page archived successfully",
        page,
        200,
    )))
}

// --- outbound mail ---

pub(crate) async fn send_mail(
    Json(body): Json<Value>,
) -> Result<Json<ServiceResponse<MailReceipt>>, AppError> {
    let request: MailRequest = serde_json::from_value(body)
        .map_err(|error| AppError::validation(error.to_string()))?;

    let receipt = docforge_mail::send(&request).await?;
    Ok(Json(ServiceResponse::success(
        "Mail sent successfully",
        receipt,
        200,
    )))
}

// --- image generation ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateImageRequest {
    api_key: Option<String>,
    #[serde(default)]
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImageLink {
    image_url: String,
}

pub(crate) async fn generate_image(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<ServiceResponse<ImageLink>>, AppError> {
    let request: GenerateImageRequest = serde_json::from_value(body)
        .map_err(|error| AppError::validation(error.to_string()))?;

    let api_key = request
        .api_key
        .filter(|key| !key.is_empty())
        .or_else(|| state.config.upstream.stability_api_key.clone())
        .ok_or_else(|| AppError::validation("Missing Stability AI API Key"))?;

    if request.prompt.is_empty() {
        return Err(AppError::validation("Prompt is required!"));
    }

    let image = state.stability.generate(&api_key, &request.prompt).await?;

    let file_name = format!("{}.png", Uuid::new_v4());
    state
        .store
        .write_image(&file_name, &image.bytes)
        .await
        .map_err(AppError::from)?;

    let base = state.config.downloads.public_base_url.trim_end_matches('/');
    Ok(Json(ServiceResponse::success(
        "Image generated successfully",
        ImageLink {
            image_url: format!("{base}/images/{file_name}"),
        },
        200,
    )))
}

/// Generated images are public, mirroring the open `/images` route of the
/// rest of the surface; path traversal is still rejected.
pub(crate) async fn serve_image(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Response, AppError> {
    let bytes = state.store.read_image(&file_name).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], bytes).into_response())
}
