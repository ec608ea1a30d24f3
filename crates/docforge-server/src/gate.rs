//! Download gate
//!
//! Single authorization checkpoint in front of file serving. Browser
//! downloads cannot set headers, so a token is accepted from any of three
//! locations, first match wins: the Authorization header, the `token`
//! query parameter, or a bracket-delimited marker inside the file name.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, Uri, header};
use axum::middleware::Next;
use axum::response::Response;

use docforge_auth::AuthError;

use crate::{AppError, AppState};

/// Middleware for download routes: all three token locations.
pub async fn download_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token =
        extract_token(request.headers(), request.uri()).ok_or(AuthError::Missing)?;
    let claims = state.tokens.verify(&token).map_err(AppError::from)?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Middleware for API routes: Authorization header only.
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers()).ok_or(AuthError::Missing)?;
    let claims = state.tokens.verify(&token).map_err(AppError::from)?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Token lookup across the three accepted locations, in order.
pub(crate) fn extract_token(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    if let Some(token) = bearer_token(headers) {
        return Some(token);
    }

    if let Some(query) = uri.query() {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if key == "token" && !value.is_empty() {
                return Some(value.into_owned());
            }
        }
    }

    // Browsers percent-encode brackets, so decode the segment first.
    let final_segment = percent_decode(uri.path().rsplit('/').next()?);
    bracketed_token(&final_segment)
}

/// Decode `%XX` escapes in a path segment.
fn percent_decode(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;

    while index < bytes.len() {
        if bytes[index] == b'%' && index + 3 <= bytes.len() {
            let hex = std::str::from_utf8(&bytes[index + 1..index + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                decoded.push(byte);
                index += 3;
                continue;
            }
        }
        decoded.push(bytes[index]);
        index += 1;
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// A `[...]`-wrapped token inside a path segment.
fn bracketed_token(segment: &str) -> Option<String> {
    let open = segment.find('[')?;
    let close = segment[open + 1..].find(']')? + open + 1;
    let token = &segment[open + 1..close];
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Remove a `[...]` marker from a file name so it resolves to the stored
/// artifact: `word-file-1[abc].docx` becomes `word-file-1.docx`.
pub(crate) fn strip_token_marker(file_name: &str) -> String {
    let Some(open) = file_name.find('[') else {
        return file_name.to_string();
    };
    let Some(close) = file_name[open..].find(']').map(|i| open + i) else {
        return file_name.to_string();
    };

    let mut cleaned = String::with_capacity(file_name.len());
    cleaned.push_str(&file_name[..open]);
    cleaned.push_str(&file_name[close + 1..]);
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(auth: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = auth {
            headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[test]
    fn test_header_token_wins() {
        let headers = headers_with(Some("Bearer from-header"));
        let uri: Uri = "/word-generator/downloads/f.docx?token=from-query"
            .parse()
            .unwrap();
        assert_eq!(
            extract_token(&headers, &uri),
            Some("from-header".to_string())
        );
    }

    #[test]
    fn test_query_token_when_no_header() {
        let headers = headers_with(None);
        let uri: Uri = "/word-generator/downloads/f.docx?token=from-query"
            .parse()
            .unwrap();
        assert_eq!(
            extract_token(&headers, &uri),
            Some("from-query".to_string())
        );
    }

    #[test]
    fn test_path_token_as_last_resort() {
        let headers = headers_with(None);
        let uri: Uri = "/word-generator/downloads/word-file-1%5Bfrom-path%5D.docx"
            .parse()
            .unwrap();
        assert_eq!(
            extract_token(&headers, &uri),
            Some("from-path".to_string())
        );
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("a%5Bb%5D.docx"), "a[b].docx");
        assert_eq!(percent_decode("plain.docx"), "plain.docx");
        assert_eq!(percent_decode("trailing%"), "trailing%");
    }

    #[test]
    fn test_no_token_anywhere() {
        let headers = headers_with(None);
        let uri: Uri = "/word-generator/downloads/f.docx".parse().unwrap();
        assert_eq!(extract_token(&headers, &uri), None);
    }

    #[test]
    fn test_malformed_bearer_header_is_ignored() {
        let headers = headers_with(Some("Token abc"));
        let uri: Uri = "/x".parse().unwrap();
        assert_eq!(extract_token(&headers, &uri), None);
    }

    #[test]
    fn test_strip_token_marker() {
        assert_eq!(
            strip_token_marker("word-file-1[abc].docx"),
            "word-file-1.docx"
        );
        assert_eq!(strip_token_marker("word-file-1.docx"), "word-file-1.docx");
        assert_eq!(strip_token_marker("odd[unclosed.docx"), "odd[unclosed.docx");
    }
}
