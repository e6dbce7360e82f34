//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for [`fc_core::Error`] so that route handlers
//! can return `Result<T, AppError>` and use `?` on core results.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::middleware::request_id::RequestId;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: fc_core::Error,
    request_id: Option<String>,
}

impl AppError {
    pub fn new(inner: fc_core::Error) -> Self {
        Self {
            inner,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, id: String) -> Self {
        self.request_id = Some(id);
        self
    }
}

impl From<fc_core::Error> for AppError {
    fn from(e: fc_core::Error) -> Self {
        Self::new(e)
    }
}

/// Build a mapper that tags core errors with the current request id.
pub fn tagged(request_id: &RequestId) -> impl Fn(fc_core::Error) -> AppError + '_ {
    move |e| AppError::new(e).with_request_id(request_id.0.clone())
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                request_id = ?self.request_id,
                "Server error in API handler"
            );
        } else if let fc_core::Error::ArtifactMissing { id, path } = &self.inner {
            tracing::error!(
                file_id = %id,
                path = %path,
                request_id = ?self.request_id,
                "Integrity fault: catalog record without artifact"
            );
        }

        let body = json!({
            "error": self.inner.to_string(),
            "code": self.inner.code(),
            "request_id": self.request_id,
        });

        let mut response = (status, axum::Json(body)).into_response();

        if let fc_core::Error::RangeNotSatisfiable { size } = &self.inner {
            if let Ok(value) = HeaderValue::from_str(&format!("bytes */{size}")) {
                response.headers_mut().insert(header::CONTENT_RANGE, value);
            }
        }

        response
    }
}
