//! Folded response values.

use serde::Deserialize;

use crate::error::OneLakeError;
use crate::http_client::HttpResponse;

/// A non-success response, folded into a value instead of raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEnvelope {
    /// HTTP status code.
    pub status: u16,
    /// Canonical reason phrase for `status`.
    pub status_text: String,
    /// Service error code, when the body carried one.
    pub code: Option<String>,
    /// Service error message, or the raw body when it was not structured.
    pub message: Option<String>,
}

#[derive(Deserialize)]
struct ServiceErrorBody {
    error: ServiceError,
}

#[derive(Deserialize)]
struct ServiceError {
    code: Option<String>,
    message: Option<String>,
}

impl ErrorEnvelope {
    pub(crate) fn from_response(response: &HttpResponse) -> Self {
        let (code, message) = match serde_json::from_slice::<ServiceErrorBody>(&response.body) {
            Ok(parsed) => (parsed.error.code, parsed.error.message),
            Err(_) if response.body.is_empty() => (None, None),
            Err(_) => (None, Some(response.text())),
        };
        Self {
            status: response.status.as_u16(),
            status_text: response
                .status
                .canonical_reason()
                .unwrap_or_default()
                .to_owned(),
            code,
            message,
        }
    }

    /// Convert into the raised form.
    #[must_use]
    pub fn into_error(self) -> OneLakeError {
        OneLakeError::Api {
            status: self.status,
            body: self.message.unwrap_or(self.status_text),
        }
    }
}

/// Result of a folded call: either the decoded payload or the error envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiResponse<T> {
    /// 2xx response with its decoded body.
    Success(T),
    /// Any other status.
    Error(ErrorEnvelope),
}

impl<T> ApiResponse<T> {
    /// Opt into strict handling: a folded error becomes [`OneLakeError::Api`].
    pub fn error_for_status(self) -> Result<T, OneLakeError> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Error(envelope) => Err(envelope.into_error()),
        }
    }

    /// Whether this is [`ApiResponse::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The payload, discarding any error.
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Error(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderMap, StatusCode};

    fn response(status: StatusCode, body: &'static str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HeaderMap::new(),
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[test]
    fn parses_structured_service_error() {
        let env = ErrorEnvelope::from_response(&response(
            StatusCode::NOT_FOUND,
            r#"{"error":{"code":"PathNotFound","message":"The specified path does not exist."}}"#,
        ));
        assert_eq!(env.status, 404);
        assert_eq!(env.status_text, "Not Found");
        assert_eq!(env.code.as_deref(), Some("PathNotFound"));
        assert_eq!(env.message.as_deref(), Some("The specified path does not exist."));
    }

    #[test]
    fn keeps_unstructured_body_as_message() {
        let env = ErrorEnvelope::from_response(&response(StatusCode::BAD_GATEWAY, "upstream down"));
        assert_eq!(env.code, None);
        assert_eq!(env.message.as_deref(), Some("upstream down"));

        match ApiResponse::<()>::Error(env).error_for_status() {
            Err(OneLakeError::Api { status, body }) => {
                assert_eq!(status, 502);
                assert_eq!(body, "upstream down");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
