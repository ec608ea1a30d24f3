//! Generation endpoints
//!
//! One pipeline shared by every artifact kind: validate the primary
//! content array, render, write through the store, issue a token, and
//! answer with the download URL. The response is only sent after the
//! write returns, so a client can never hold a link to a file that is
//! not yet durable.

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;

use docforge_auth::Claims;
use docforge_core::{ArtifactKind, ServiceResponse};
use docforge_render::RenderError;

use crate::gate::strip_token_marker;
use crate::{AppError, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DownloadLink {
    pub download_url: String,
}

pub(crate) async fn generate_spreadsheet(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<Value>,
) -> Result<Json<ServiceResponse<DownloadLink>>, AppError> {
    run_generation(&state, ArtifactKind::Spreadsheet, &claims, &body).await
}

pub(crate) async fn generate_presentation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<Value>,
) -> Result<Json<ServiceResponse<DownloadLink>>, AppError> {
    run_generation(&state, ArtifactKind::Presentation, &claims, &body).await
}

pub(crate) async fn generate_document(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<Value>,
) -> Result<Json<ServiceResponse<DownloadLink>>, AppError> {
    run_generation(&state, ArtifactKind::Document, &claims, &body).await
}

async fn run_generation(
    state: &AppState,
    kind: ArtifactKind,
    claims: &Claims,
    body: &Value,
) -> Result<Json<ServiceResponse<DownloadLink>>, AppError> {
    let renderer = state.renderer_for(kind);

    let primary_filled = body
        .get(renderer.primary_field())
        .and_then(Value::as_array)
        .is_some_and(|items| !items.is_empty());
    if !primary_filled {
        return Err(AppError::validation_with_hint(
            format!("{} is required!", renderer.primary_label()),
            format!(
                "Please make sure you have sent the {} content to generate.",
                kind_label(kind)
            ),
        ));
    }

    let bytes = renderer.render(body).map_err(|error| match error {
        RenderError::InvalidSpec(detail) => AppError::validation(detail),
        RenderError::Package(detail) => generation_failed(kind, detail),
    })?;

    let file_name = state.store.next_file_name(kind);
    state
        .store
        .write(kind, &file_name, &bytes)
        .await
        .map_err(|error| generation_failed(kind, error.to_string()))?;

    let token = state.tokens.issue(&claims.sub, &claims.email)?;

    let base = state.config.downloads.public_base_url.trim_end_matches('/');
    let download_url = format!(
        "{base}/{}/downloads/{file_name}?token={token}",
        kind.route_base()
    );

    tracing::info!(kind = ?kind, %file_name, "artifact generated");

    Ok(Json(ServiceResponse::success(
        "File generated successfully",
        DownloadLink { download_url },
        200,
    )))
}

pub(crate) async fn download_spreadsheet(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Response, AppError> {
    serve_artifact(&state, ArtifactKind::Spreadsheet, &file_name).await
}

pub(crate) async fn download_presentation(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Response, AppError> {
    serve_artifact(&state, ArtifactKind::Presentation, &file_name).await
}

pub(crate) async fn download_document(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Response, AppError> {
    serve_artifact(&state, ArtifactKind::Document, &file_name).await
}

async fn serve_artifact(
    state: &AppState,
    kind: ArtifactKind,
    file_name: &str,
) -> Result<Response, AppError> {
    // Token markers embedded in the name are not part of the stored name.
    let file_name = strip_token_marker(file_name);
    let bytes = state.store.read(kind, &file_name).await?;

    let headers = [
        (header::CONTENT_TYPE, kind.content_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        ),
    ];

    Ok((headers, bytes).into_response())
}

fn generation_failed(kind: ArtifactKind, detail: String) -> AppError {
    AppError::Generation {
        detail,
        apology: format!("Sorry, we couldn't generate the {} file.", kind_label(kind)),
    }
}

fn kind_label(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::Spreadsheet => "excel",
        ArtifactKind::Presentation => "presentation",
        ArtifactKind::Document => "word",
    }
}
