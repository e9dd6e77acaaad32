use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// OpenAI-style error body: `{"error":{"message","type","code"}}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub code: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>, kind: &str, code: &str) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                kind: kind.to_string(),
                code: code.to_string(),
            },
        }
    }
}

#[derive(Debug)]
pub enum TtsError {
    // Request validation (sanitizer, chunker inputs, request builder)
    Validation {
        message: String,
        field: Option<String>,
    },

    // Upstream said no
    Authentication(String),
    Forbidden(String),
    NotFound(String),
    RateLimited {
        message: String,
        retry_after: Option<f64>,
    },
    Upstream {
        message: String,
        status: u16,
    },

    // Transport failure talking to the upstream
    Network {
        message: String,
        retries: u32,
    },

    // Audio pipeline failures (combine, container surgery, chunking)
    Processing(String),

    // Everything else
    Internal(String),
}

impl TtsError {
    pub fn validation(message: impl Into<String>, field: &str) -> Self {
        TtsError::Validation {
            message: message.into(),
            field: if field.is_empty() {
                None
            } else {
                Some(field.to_string())
            },
        }
    }

    /// Map an upstream error response to a typed error.
    ///
    /// Total over the status code; extracts `error.message` from the body
    /// when the upstream returned the OpenAI error shape.
    pub fn from_upstream_response(status: u16, body: &[u8], default_message: &str) -> Self {
        let message = serde_json::from_slice::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(|m| m.as_str())
                    .map(|m| m.to_string())
            })
            .unwrap_or_else(|| default_message.to_string());

        match status {
            400 => TtsError::Validation {
                message,
                field: None,
            },
            401 => TtsError::Authentication(message),
            403 => TtsError::Forbidden(message),
            404 => TtsError::NotFound(message),
            429 => TtsError::RateLimited {
                message,
                retry_after: None,
            },
            _ => TtsError::Upstream { message, status },
        }
    }

    fn response_parts(&self) -> (StatusCode, &'static str, &'static str, String) {
        match self {
            TtsError::Validation { message, .. } => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "validation_error",
                message.clone(),
            ),
            TtsError::Authentication(_) => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "invalid_api_key",
                "Invalid API key".to_string(),
            ),
            TtsError::RateLimited { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limit_error",
                "rate_limit_exceeded",
                "Rate limit exceeded".to_string(),
            ),
            TtsError::Network { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable_error",
                "service_unavailable",
                "TTS service is currently unavailable".to_string(),
            ),
            TtsError::Forbidden(_) | TtsError::NotFound(_) | TtsError::Upstream { .. } => {
                let status = match self {
                    TtsError::Forbidden(_) => 403,
                    TtsError::NotFound(_) => 404,
                    TtsError::Upstream { status, .. } => *status,
                    _ => unreachable!(),
                };
                let status = StatusCode::from_u16(status)
                    .ok()
                    .filter(|s| s.is_client_error() || s.is_server_error())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (
                    status,
                    "api_error",
                    "tts_error",
                    "Text-to-speech generation failed".to_string(),
                )
            }
            TtsError::Processing(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "api_error",
                "audio_processing_error",
                "Audio processing failed".to_string(),
            ),
            TtsError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal_error",
                "An unexpected error occurred".to_string(),
            ),
        }
    }
}

impl fmt::Display for TtsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TtsError::Validation { message, field } => match field {
                Some(field) => write!(f, "validation error ({}): {}", field, message),
                None => write!(f, "validation error: {}", message),
            },
            TtsError::Authentication(msg) => write!(f, "authentication error: {}", msg),
            TtsError::Forbidden(msg) => write!(f, "forbidden: {}", msg),
            TtsError::NotFound(msg) => write!(f, "not found: {}", msg),
            TtsError::RateLimited { message, .. } => write!(f, "rate limited: {}", message),
            TtsError::Upstream { message, status } => {
                write!(f, "upstream error ({}): {}", status, message)
            }
            TtsError::Network { message, retries } => {
                write!(f, "network error after {} retries: {}", retries, message)
            }
            TtsError::Processing(msg) => write!(f, "processing error: {}", msg),
            TtsError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for TtsError {}

impl From<std::io::Error> for TtsError {
    fn from(err: std::io::Error) -> Self {
        TtsError::Internal(err.to_string())
    }
}

impl From<reqwest::Error> for TtsError {
    fn from(err: reqwest::Error) -> Self {
        TtsError::Network {
            message: err.to_string(),
            retries: 0,
        }
    }
}

impl From<serde_json::Error> for TtsError {
    fn from(err: serde_json::Error) -> Self {
        TtsError::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for TtsError {
    fn from(err: tokio::task::JoinError) -> Self {
        TtsError::Internal(err.to_string())
    }
}

impl From<hound::Error> for TtsError {
    fn from(err: hound::Error) -> Self {
        TtsError::Processing(err.to_string())
    }
}

// Axum integration
impl IntoResponse for TtsError {
    fn into_response(self) -> Response {
        let (status, kind, code, message) = self.response_parts();

        if status.is_server_error() {
            tracing::error!("request error: {}", self);
        }

        let mut response =
            (status, axum::Json(ErrorBody::new(message, kind, code))).into_response();

        if let TtsError::RateLimited {
            retry_after: Some(secs),
            ..
        } = self
        {
            if let Ok(value) = format!("{}", secs.ceil() as u64).parse() {
                response.headers_mut().insert("Retry-After", value);
            }
        }

        response
    }
}

pub type Result<T> = std::result::Result<T, TtsError>;
