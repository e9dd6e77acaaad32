use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as CorsAny, CorsLayer};

use crate::auth::ApiKeys;
use crate::chunking::ChunkingConfig;
use crate::config::constants::{DEFAULT_MAX_LENGTH, POWERED_BY, SERVICE_NAME};
use crate::error::ErrorBody;
use crate::models::{
    AudioFormat, FormatInfo, FormatsResponse, HealthResponse, SpeechRequest, Voice, VoiceInfo,
    VoicesResponse,
};
use crate::rate_limit::GatewayRateLimiter;
use crate::services::streaming::{generate_long_text_stream, LongTextStreamConfig};
use crate::upstream::{SpeechStream, SynthesisRequest, TtsClient};

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<TtsClient>,
    pub api_keys: ApiKeys,
    pub rate_limiter: Option<GatewayRateLimiter>,
    pub auto_combine_default: bool,
}

// HTTP Handlers

/// OpenAI-compatible speech generation
/// POST /v1/audio/speech (also mounted at /api/speech)
async fn openai_speech(State(state): State<AppState>, body: Bytes) -> Response {
    let req: SpeechRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            tracing::warn!("failed to parse request: {}", e);
            return error_json(
                StatusCode::BAD_REQUEST,
                "Invalid JSON data provided",
                "invalid_request_error",
                "invalid_json",
            );
        }
    };

    let voice_name = if req.voice.trim().is_empty() {
        "alloy"
    } else {
        req.voice.trim()
    };
    let format_name = if req.response_format.trim().is_empty() {
        "mp3"
    } else {
        req.response_format.trim()
    };
    let max_length = if req.max_length == 0 {
        DEFAULT_MAX_LENGTH
    } else {
        req.max_length
    };
    let auto_combine = req.auto_combine.unwrap_or(state.auto_combine_default);

    if req.input.trim().is_empty() {
        return error_json(
            StatusCode::BAD_REQUEST,
            "Input text is required",
            "invalid_request_error",
            "missing_input",
        );
    }

    let Some(voice) = Voice::parse(voice_name) else {
        return error_json(
            StatusCode::BAD_REQUEST,
            format!(
                "Invalid voice: {}. Must be one of: {}",
                voice_name,
                Voice::valid_names()
            ),
            "invalid_request_error",
            "invalid_voice",
        );
    };

    let Some(format) = AudioFormat::parse(format_name) else {
        return error_json(
            StatusCode::BAD_REQUEST,
            format!(
                "Invalid response_format: {}. Must be one of: {}",
                format_name,
                AudioFormat::valid_names()
            ),
            "invalid_request_error",
            "invalid_format",
        );
    };

    tracing::info!(
        "generating speech: text_len={}, voice={}, format={}, auto_combine={}, max_length={}",
        req.input.len(),
        voice,
        format,
        auto_combine,
        max_length
    );

    let text_length = req.input.len();

    if text_length > max_length && !auto_combine {
        return error_json(
            StatusCode::BAD_REQUEST,
            format!(
                "Input text is too long ({} characters). Maximum allowed length is {} characters. \
                 Enable auto_combine to automatically split and combine long text.",
                text_length, max_length
            ),
            "invalid_request_error",
            "text_too_long",
        );
    }

    let mut template = SynthesisRequest::new(req.input.clone())
        .with_voice(voice)
        .with_format(format)
        .with_max_length(max_length);
    if !req.instructions.trim().is_empty() {
        template = template.with_instructions(req.instructions.clone());
    }
    if req.speed != 0.0 {
        template = template.with_speed(req.speed);
    }

    if text_length > max_length {
        handle_long_text_stream(state, req, template).await
    } else {
        handle_short_text_stream(state, template, auto_combine).await
    }
}

/// Short path: one upstream stream copied to the client.
async fn handle_short_text_stream(
    state: AppState,
    request: SynthesisRequest,
    auto_combine: bool,
) -> Response {
    let start = Instant::now();

    let stream = match state.client.generate_speech_stream(&request).await {
        Ok(stream) => stream,
        Err(e) => return e.into_response(),
    };

    tracing::debug!(
        "short text stream ready as {} in {:?}",
        stream.format,
        start.elapsed()
    );

    let headers = [
        ("X-Chunks-Combined".to_string(), "1".to_string()),
        ("X-Auto-Combine".to_string(), auto_combine.to_string()),
    ];
    stream_response(stream, &headers)
}

/// Long path: chunked parallel fetch stitched into one ordered stream.
async fn handle_long_text_stream(
    state: AppState,
    req: SpeechRequest,
    template: SynthesisRequest,
) -> Response {
    tracing::info!(
        "long text detected ({} chars), auto-combining enabled (streaming)",
        req.input.len()
    );

    let chunking = ChunkingConfig {
        max_length: template.max_length,
        preserve_words: true,
        append_terminator: true,
    };

    let stream = match generate_long_text_stream(
        state.client.clone(),
        &req.input,
        &chunking,
        &template,
        &LongTextStreamConfig::default(),
    )
    .await
    {
        Ok(stream) => stream,
        Err(e) => return e.into_response(),
    };

    let chunks_total = stream
        .metadata
        .get("chunks_total")
        .cloned()
        .unwrap_or_else(|| "0".to_string());

    let headers = [
        ("X-Chunks-Combined".to_string(), chunks_total),
        (
            "X-Original-Text-Length".to_string(),
            req.input.len().to_string(),
        ),
        ("X-Auto-Combine".to_string(), "true".to_string()),
    ];
    stream_response(stream, &headers)
}

/// 200 + headers first, then the body streams; errors past this point can
/// only truncate the connection.
fn stream_response(stream: SpeechStream, extra_headers: &[(String, String)]) -> Response {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, &stream.content_type)
        .header(header::TRANSFER_ENCODING, "chunked")
        .header("X-Audio-Format", stream.format.as_str());

    for (name, value) in extra_headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder = builder.header("X-Powered-By", POWERED_BY);

    builder.body(Body::from_stream(stream.body)).unwrap()
}

fn error_json(
    status: StatusCode,
    message: impl Into<String>,
    kind: &str,
    code: &str,
) -> Response {
    (status, Json(ErrorBody::new(message, kind, code))).into_response()
}

/// List all available voices
async fn list_voices() -> Json<VoicesResponse> {
    let voices = Voice::ALL
        .iter()
        .map(|v| VoiceInfo {
            id: v.to_string(),
            name: v.to_string(),
        })
        .collect();

    Json(VoicesResponse { voices })
}

/// List supported audio formats
async fn list_formats() -> Json<FormatsResponse> {
    let formats = AudioFormat::ALL
        .iter()
        .map(|f| FormatInfo {
            id: f.to_string(),
            name: f.to_string(),
            content_type: f.content_type().to_string(),
        })
        .collect();

    Json(FormatsResponse { formats })
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Access logging: method, path, status, latency
async fn access_log_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    tracing::info!(
        "[{}] {} {} {:?}",
        method,
        path,
        response.status().as_u16(),
        start.elapsed()
    );

    response
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> axum::http::Response<Body> {
    let detail = err
        .downcast_ref::<String>()
        .map(|s| s.as_str())
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("panic recovered: {}", detail);

    let body = serde_json::to_string(&ErrorBody::new(
        "An unexpected error occurred",
        "internal_error",
        "internal_error",
    ))
    .unwrap_or_default();

    axum::http::Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

/// Create and configure the HTTP server router
pub fn create_router(state: AppState) -> Router<()> {
    let cors = CorsLayer::new()
        .allow_origin(CorsAny)
        .allow_methods(CorsAny)
        .allow_headers(CorsAny)
        .expose_headers([
            header::CONTENT_LENGTH,
            "X-Audio-Format".parse().unwrap(),
            "X-Audio-Size".parse().unwrap(),
            "X-Chunks-Combined".parse().unwrap(),
            "X-Auto-Combine".parse().unwrap(),
            "X-Powered-By".parse().unwrap(),
        ]);

    let api_keys = state.api_keys.clone();

    let mut router = Router::new()
        .route("/v1/audio/speech", post(openai_speech))
        .route("/api/speech", post(openai_speech))
        .route("/v1/voices", get(list_voices))
        .route("/v1/formats", get(list_formats))
        .route("/health", get(health_check))
        .route("/", get(health_check));

    // Authentication (skips health endpoints when enabled)
    router = router.layer(middleware::from_fn_with_state(api_keys, crate::auth::auth_middleware));

    // Rate limiting (if enabled)
    if let Some(rate_limiter) = state.rate_limiter.clone() {
        router = router.layer(middleware::from_fn_with_state(
            rate_limiter,
            crate::rate_limit::rate_limit_middleware,
        ));
    }

    router
        .with_state(state)
        .layer(middleware::from_fn(access_log_middleware))
        .layer(cors)
        .layer(CatchPanicLayer::custom(handle_panic))
}
