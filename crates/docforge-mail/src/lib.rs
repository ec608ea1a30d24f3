//! Outbound SMTP relay for docforge
//!
//! Relays one message per request through the SMTP server named in the
//! request itself; no relay configuration lives in the service.

use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("invalid mail request: {0}")]
    InvalidRequest(String),

    #[error("SMTP relay failed: {0}")]
    Smtp(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailRequest {
    pub host: String,
    pub port: u16,
    /// `true` for implicit TLS (port 465), `false` for STARTTLS/plain.
    #[serde(default)]
    pub secure: bool,
    pub auth: SmtpAuth,
    pub mail_content: MailContent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpAuth {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailContent {
    /// Sender address, plain or `Name <addr>` form.
    pub from: String,
    /// Comma separated recipient list.
    pub to: String,
    pub subject: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub cc: Option<String>,
    #[serde(default)]
    pub bcc: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailReceipt {
    pub message_id: Option<String>,
    pub response: String,
}

/// Send one message per the request's own SMTP settings.
pub async fn send(request: &MailRequest) -> Result<MailReceipt, MailError> {
    let message = build_message(&request.mail_content)?;

    let builder = if request.secure {
        AsyncSmtpTransport::<Tokio1Executor>::relay(&request.host)
            .map_err(|error| MailError::Smtp(error.to_string()))?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&request.host)
            .map_err(|error| MailError::Smtp(error.to_string()))?
    };

    let transport = builder
        .port(request.port)
        .credentials(Credentials::new(
            request.auth.username.clone(),
            request.auth.password.clone(),
        ))
        .build();

    tracing::debug!(host = %request.host, port = request.port, "relaying mail");

    let response = transport
        .send(message)
        .await
        .map_err(|error| MailError::Smtp(error.to_string()))?;

    Ok(MailReceipt {
        message_id: None,
        response: response.message().collect::<Vec<_>>().join(" "),
    })
}

/// Assemble the message. Pure, so address and body validation is testable
/// without a relay.
pub fn build_message(content: &MailContent) -> Result<Message, MailError> {
    let mut builder = Message::builder().subject(&content.subject);

    for from in split_addresses(&content.from) {
        builder = builder.from(parse_mailbox(&from)?);
    }
    for to in split_addresses(&content.to) {
        builder = builder.to(parse_mailbox(&to)?);
    }
    if let Some(cc) = &content.cc {
        for address in split_addresses(cc) {
            builder = builder.cc(parse_mailbox(&address)?);
        }
    }
    if let Some(bcc) = &content.bcc {
        for address in split_addresses(bcc) {
            builder = builder.bcc(parse_mailbox(&address)?);
        }
    }

    let message = match (&content.text, &content.html) {
        (Some(text), Some(html)) => builder
            .multipart(MultiPart::alternative_plain_html(
                text.clone(),
                html.clone(),
            ))
            .map_err(|error| MailError::InvalidRequest(error.to_string()))?,
        (None, Some(html)) => builder
            .header(lettre::message::header::ContentType::TEXT_HTML)
            .body(html.clone())
            .map_err(|error| MailError::InvalidRequest(error.to_string()))?,
        (text, None) => builder
            .body(text.clone().unwrap_or_default())
            .map_err(|error| MailError::InvalidRequest(error.to_string()))?,
    };

    Ok(message)
}

fn split_addresses(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse()
        .map_err(|error| MailError::InvalidRequest(format!("bad address {address:?}: {error}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content() -> MailContent {
        MailContent {
            from: "Sender <sender@example.com>".to_string(),
            to: "a@example.com, b@example.com".to_string(),
            subject: "Weekly report".to_string(),
            text: Some("body".to_string()),
            html: None,
            cc: None,
            bcc: None,
        }
    }

    #[test]
    fn test_build_message_with_multiple_recipients() {
        let message = build_message(&content()).unwrap();
        let rendered = String::from_utf8(message.formatted()).unwrap();
        assert!(rendered.contains("Subject: Weekly report"));
        assert!(rendered.contains("a@example.com"));
        assert!(rendered.contains("b@example.com"));
    }

    #[test]
    fn test_bad_address_is_rejected() {
        let mut bad = content();
        bad.to = "not-an-address".to_string();
        assert!(matches!(
            build_message(&bad),
            Err(MailError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_html_and_text_build_multipart() {
        let mut both = content();
        both.html = Some("<p>body</p>".to_string());
        let message = build_message(&both).unwrap();
        let rendered = String::from_utf8(message.formatted()).unwrap();
        assert!(rendered.contains("multipart/alternative"));
    }

    #[test]
    fn test_request_deserializes_from_camel_case() {
        let request: MailRequest = serde_json::from_value(serde_json::json!({
            "host": "smtp.example.com",
            "port": 465,
            "secure": true,
            "auth": {"username": "u", "password": "p"},
            "mailContent": {
                "from": "s@example.com",
                "to": "r@example.com",
                "subject": "hi"
            }
        }))
        .unwrap();
        assert!(request.secure);
        assert_eq!(request.mail_content.subject, "hi");
    }
}
