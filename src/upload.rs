//! Upload gateway: validate an uploaded file, extract its text, and shape
//! the JSON body the HTTP boundary returns.
//!
//! Routing and authentication stay with the host application; this module
//! only turns `(filename, content type, bytes)` into an [`UploadResponse`] or
//! an [`ErrorResponse`] plus status code.

use crate::document::Document;
use crate::error::{Error, ValidationError};
use crate::extract::ExtractionPipeline;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Largest accepted upload, inclusive.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Media types the gateway accepts.
pub const ACCEPTED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "application/pdf"];

const FILE_TOO_LARGE: &str = "File size should be less than 5MB";
const UNSUPPORTED_TYPE: &str = "File type should be JPEG, PNG, or PDF";
const PROCESSING_FAILED: &str = "Failed to process request";

/// A file as received from the client.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// Successful upload body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// `data:<content type>;base64,<bytes>` of the original upload.
    pub url: String,
    /// `/uploads/<timestamp ms>-<filename>`.
    pub pathname: String,
    pub content_type: String,
    pub text: String,
}

/// Error body: `{"error": "<message>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    /// Status code and body for `err`.
    ///
    /// Validation failures echo their messages. Anything else is logged and
    /// answered with a generic message so internal detail never leaks.
    pub fn from_error(err: &Error) -> (u16, Self) {
        let status = err.status_code();
        let message = match err {
            Error::Validation(v) => v.to_string(),
            other => {
                error!("Upload processing failed: {}", other);
                PROCESSING_FAILED.to_string()
            }
        };
        (status, Self { error: message })
    }
}

/// Check size and media type, reporting every rule that fails.
pub fn validate(upload: &Upload) -> Result<(), ValidationError> {
    let mut messages = Vec::new();

    if upload.content.len() > MAX_UPLOAD_BYTES {
        messages.push(FILE_TOO_LARGE.to_string());
    }
    if !ACCEPTED_CONTENT_TYPES.contains(&upload.content_type.as_str()) {
        messages.push(UNSUPPORTED_TYPE.to_string());
    }

    if messages.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { messages })
    }
}

/// Validate, extract, and build the response body.
pub async fn process_upload(
    pipeline: &ExtractionPipeline,
    upload: Upload,
) -> Result<UploadResponse, Error> {
    validate(&upload)?;

    let Upload {
        filename,
        content_type,
        content,
    } = upload;
    info!(
        "Processing upload '{}' ({}, {} bytes)",
        filename,
        content_type,
        content.len()
    );

    let url = data_url(&content_type, &content);
    let document = Document::new(content, content_type.clone());
    let text = pipeline.extract(&document).await?;

    Ok(UploadResponse {
        url,
        pathname: format!("/uploads/{}-{}", Utc::now().timestamp_millis(), filename),
        content_type,
        text,
    })
}

/// RFC 2397 data URL with base64 payload.
pub fn data_url(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", content_type, STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractionError;

    fn upload(len: usize, content_type: &str) -> Upload {
        Upload {
            filename: "scan.png".into(),
            content_type: content_type.into(),
            content: vec![0u8; len],
        }
    }

    #[test]
    fn accepts_limit_exactly() {
        assert!(validate(&upload(MAX_UPLOAD_BYTES, "application/pdf")).is_ok());
        assert!(validate(&upload(10, "image/jpeg")).is_ok());
        assert!(validate(&upload(10, "image/png")).is_ok());
    }

    #[test]
    fn rejects_oversize() {
        let err = validate(&upload(MAX_UPLOAD_BYTES + 1, "image/png")).unwrap_err();
        assert_eq!(err.messages, vec![FILE_TOO_LARGE]);
    }

    #[test]
    fn rejects_type() {
        let err = validate(&upload(1, "image/gif")).unwrap_err();
        assert_eq!(err.messages, vec![UNSUPPORTED_TYPE]);
    }

    #[test]
    fn collects_every_failure() {
        let err = validate(&upload(MAX_UPLOAD_BYTES + 1, "text/html")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "File size should be less than 5MB, File type should be JPEG, PNG, or PDF"
        );
    }

    #[test]
    fn data_url_format() {
        assert_eq!(data_url("image/png", b"hi"), "data:image/png;base64,aGk=");
    }

    #[test]
    fn error_bodies() {
        let (status, body) = ErrorResponse::from_error(&Error::Validation(ValidationError {
            messages: vec!["a".into(), "b".into()],
        }));
        assert_eq!(status, 400);
        assert_eq!(body.error, "a, b");

        let (status, body) = ErrorResponse::from_error(&Error::Extraction(
            ExtractionError::OcrFailed {
                page: Some(2),
                detail: "secret internals".into(),
            },
        ));
        assert_eq!(status, 500);
        assert_eq!(body.error, "Failed to process request");
    }

    #[test]
    fn response_uses_camel_case() {
        let r = UploadResponse {
            url: "data:image/png;base64,".into(),
            pathname: "/uploads/1-a.png".into(),
            content_type: "image/png".into(),
            text: "t".into(),
        };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["contentType"], "image/png");
        assert!(json.get("content_type").is_none());
    }
}
