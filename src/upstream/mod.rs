pub mod headers;
pub mod request;

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::Form;
use reqwest::redirect::Policy;
use reqwest::{StatusCode, Url};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use uuid::Uuid;

use crate::audio::duration::estimate_speech_duration_secs;
use crate::chunking::{split_text, ChunkingConfig};
use crate::config::constants::{
    DEFAULT_BASE_URL, DEFAULT_CLIENT_TIMEOUT_SECS, DEFAULT_INSTRUCTIONS, DEFAULT_MAX_CONCURRENT,
    DEFAULT_MAX_RETRIES,
};
use crate::error::{Result, TtsError};
use crate::models::AudioFormat;
use crate::text_processing::sanitize_text;

pub use request::SynthesisRequest;

/// Upstream client configuration, populated via chainable setters.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub max_retries: u32,
    pub verify_ssl: bool,
    pub max_concurrent: usize,
    pub proxy_url: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_CLIENT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            verify_ssl: true,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            proxy_url: None,
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn with_proxy_url(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = Some(proxy_url.into());
        self
    }

    pub fn without_ssl_verification(mut self) -> Self {
        self.verify_ssl = false;
        self
    }
}

/// Streaming synthesis response.
///
/// The body is a lazy byte stream backed by the upstream connection; the
/// global concurrency permit is held until the stream is dropped. The format
/// reflects the response Content-Type, not the request.
pub struct SpeechStream {
    pub body: BoxStream<'static, Result<Bytes>>,
    pub content_type: String,
    pub format: AudioFormat,
    pub metadata: HashMap<String, String>,
}

/// Fully buffered synthesis response.
#[derive(Debug, Clone)]
pub struct SpeechAudio {
    pub audio_data: Vec<u8>,
    pub content_type: String,
    pub format: AudioFormat,
    pub size: usize,
    pub duration_secs: f64,
    pub metadata: HashMap<String, String>,
}

/// Ties a semaphore permit to a response body stream so the global
/// concurrency gate is released on every exit path.
struct PermitStream<S> {
    inner: S,
    _permit: OwnedSemaphorePermit,
}

impl<S: Stream + Unpin> Stream for PermitStream<S> {
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Browser-impersonating HTTPS client for the upstream TTS service.
///
/// One reqwest client per process: HTTP/1.1 forced, cookie jar enabled,
/// redirects disabled, content decoding delegated to reqwest. A counting
/// semaphore caps concurrent upstream requests across all callers.
pub struct TtsClient {
    http: reqwest::Client,
    config: ClientConfig,
    semaphore: Arc<Semaphore>,
}

impl TtsClient {
    pub fn new(mut config: ClientConfig) -> Result<Self> {
        let parsed = Url::parse(&config.base_url)
            .map_err(|_| TtsError::validation(
                format!("Invalid base URL: {}", config.base_url),
                "base_url",
            ))?;
        if parsed.host_str().is_none() || !matches!(parsed.scheme(), "http" | "https") {
            return Err(TtsError::validation(
                format!("Invalid base URL: {}", config.base_url),
                "base_url",
            ));
        }

        if config.max_concurrent == 0 {
            config.max_concurrent = DEFAULT_MAX_CONCURRENT;
        }
        if config.timeout.is_zero() {
            config.timeout = Duration::from_secs(DEFAULT_CLIENT_TIMEOUT_SECS);
        }

        let mut builder = reqwest::Client::builder()
            .http1_only()
            .cookie_store(true)
            .redirect(Policy::none())
            .timeout(config.timeout);

        if !config.verify_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(proxy_url) = config.proxy_url.as_deref() {
            let proxy = reqwest::Proxy::all(proxy_url.trim())
                .map_err(|e| TtsError::validation(
                    format!("Invalid proxy URL: {}", e),
                    "proxy_url",
                ))?;
            builder = builder.proxy(proxy);
        }

        let http = builder
            .build()
            .map_err(|e| TtsError::Internal(format!("failed to create HTTP client: {}", e)))?;

        tracing::info!("initialized TTS client with base URL: {}", config.base_url);

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
            http,
            config,
        })
    }

    /// Process-wide cap on concurrent upstream requests.
    pub fn max_concurrent(&self) -> usize {
        self.config.max_concurrent
    }

    /// Synthesize one request and stream the audio back.
    ///
    /// The input is sanitized before validation; failures surface before any
    /// bytes are produced.
    pub async fn generate_speech_stream(&self, request: &SynthesisRequest) -> Result<SpeechStream> {
        let clean = sanitize_text(&request.input)?;
        let effective = request.clone().with_input(clean);
        effective.validate()?;

        let (response, permit) = self.make_request(&effective).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let format = self.classify_format(&effective, &content_type);

        let metadata = self.response_metadata(&effective, format, response.status());

        let inner = response
            .bytes_stream()
            .map(|item| {
                item.map_err(|e| TtsError::Network {
                    message: format!("Failed to read response: {}", e),
                    retries: 0,
                })
            })
            .boxed();

        Ok(SpeechStream {
            body: PermitStream {
                inner,
                _permit: permit,
            }
            .boxed(),
            content_type: if content_type.is_empty() {
                format.content_type().to_string()
            } else {
                content_type
            },
            format,
            metadata,
        })
    }

    /// Synthesize one request fully into memory.
    pub async fn generate_speech(&self, request: &SynthesisRequest) -> Result<SpeechAudio> {
        let mut stream = self.generate_speech_stream(request).await?;

        let mut audio_data = Vec::new();
        while let Some(chunk) = stream.body.next().await {
            audio_data.extend_from_slice(&chunk?);
        }

        if audio_data.is_empty() {
            return Err(TtsError::Upstream {
                message: "Received empty audio data from upstream".to_string(),
                status: 200,
            });
        }

        let duration_secs = estimate_speech_duration_secs(&request.input, 150.0);

        tracing::info!(
            "generated {} of {} audio using voice '{}'",
            format_file_size(audio_data.len()),
            stream.format,
            request.voice
        );

        Ok(SpeechAudio {
            size: audio_data.len(),
            audio_data,
            content_type: stream.content_type,
            format: stream.format,
            duration_secs,
            metadata: stream.metadata,
        })
    }

    /// Synthesize a batch concurrently, preserving request order.
    ///
    /// All requests run to completion; the first failure by index wins.
    pub async fn generate_speech_batch(
        &self,
        requests: &[SynthesisRequest],
    ) -> Result<Vec<SpeechAudio>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let results =
            futures::future::join_all(requests.iter().map(|r| self.generate_speech(r))).await;

        let mut responses = Vec::with_capacity(results.len());
        for (i, result) in results.into_iter().enumerate() {
            match result {
                Ok(audio) => responses.push(audio),
                Err(e) => {
                    tracing::warn!("batch request {} failed: {}", i, e);
                    return Err(e);
                }
            }
        }

        Ok(responses)
    }

    /// Sanitize, chunk, and synthesize long text as an ordered batch.
    pub async fn generate_speech_long_text(
        &self,
        text: &str,
        chunking: &ChunkingConfig,
        template: &SynthesisRequest,
    ) -> Result<Vec<SpeechAudio>> {
        let clean = sanitize_text(text)?;
        let chunks = split_text(&clean, chunking);
        if chunks.is_empty() {
            return Err(TtsError::Processing(
                "no valid text chunks found after processing".to_string(),
            ));
        }

        let requests: Vec<SynthesisRequest> = chunks
            .into_iter()
            .map(|chunk| {
                template
                    .clone()
                    .with_input(chunk)
                    .without_length_validation()
            })
            .collect();

        self.generate_speech_batch(&requests).await
    }

    /// One upstream POST with the global gate held, retrying per policy.
    ///
    /// Retries transport errors and 429/5xx with exponential backoff;
    /// 400/401/403/404 surface immediately. The permit is returned alongside
    /// the response so it survives for the life of the body stream.
    async fn make_request(
        &self,
        request: &SynthesisRequest,
    ) -> Result<(reqwest::Response, OwnedSemaphorePermit)> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| TtsError::Internal("client is shut down".to_string()))?;

        let url = build_url(&self.config.base_url, "api/generate");
        let generation = Uuid::new_v4().to_string();

        tracing::info!(
            "generating speech for text: '{}' with voice: {}",
            truncate(&request.input, 50),
            request.voice
        );

        let mut last_err: Option<TtsError> = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = headers::exponential_backoff(attempt - 1, 1.0, 60.0);
                tracing::info!("retrying request after {:?} (attempt {})", delay, attempt + 1);
                tokio::time::sleep(delay).await;
            }

            let mut builder = self
                .http
                .post(url.as_str())
                .headers(headers::realistic_headers())
                .multipart(build_form(request, &generation));

            if let Some(api_key) = &self.config.api_key {
                builder = builder.bearer_auth(api_key);
            }

            let response = match builder.send().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("request error, retrying: {}", e);
                    last_err = Some(TtsError::Network {
                        message: format!("Request error: {}", e),
                        retries: attempt,
                    });
                    continue;
                }
            };

            let status = response.status();
            if status == StatusCode::OK {
                return Ok((response, permit));
            }

            let body = response.bytes().await.unwrap_or_default();
            let err = TtsError::from_upstream_response(
                status.as_u16(),
                &body,
                &format!("TTS request failed with status {}", status.as_u16()),
            );

            if matches!(status.as_u16(), 400 | 401 | 403 | 404) {
                return Err(err);
            }

            tracing::warn!("request failed with status {}, retrying...", status.as_u16());
            last_err = Some(err);
        }

        Err(last_err
            .unwrap_or_else(|| TtsError::Internal("maximum retries exceeded".to_string())))
    }

    /// The delivered format is whatever the Content-Type says it is.
    fn classify_format(&self, request: &SynthesisRequest, content_type: &str) -> AudioFormat {
        let actual = AudioFormat::from_content_type(content_type);
        let requested = request.response_format;

        if actual != requested {
            if requested.maps_to_wav() && actual == AudioFormat::Wav {
                tracing::debug!("format '{}' requested, returning WAV format", requested);
            } else {
                tracing::warn!(
                    "requested format '{}' but received '{}' from service",
                    requested,
                    actual
                );
            }
        }

        actual
    }

    fn response_metadata(
        &self,
        request: &SynthesisRequest,
        actual: AudioFormat,
        status: StatusCode,
    ) -> HashMap<String, String> {
        let mut metadata = HashMap::new();
        metadata.insert("status_code".to_string(), status.as_u16().to_string());
        metadata.insert("service".to_string(), "openai.fm".to_string());
        metadata.insert("voice".to_string(), request.voice.to_string());
        metadata.insert(
            "requested_format".to_string(),
            request.response_format.to_string(),
        );
        metadata.insert("actual_format".to_string(), actual.to_string());
        metadata
    }
}

/// Multipart body for one generation request.
fn build_form(request: &SynthesisRequest, generation: &str) -> Form {
    let prompt = request
        .instructions
        .clone()
        .filter(|i| !i.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string());

    Form::new()
        .text("input", request.input.clone())
        .text("voice", request.voice.as_str())
        .text("generation", generation.to_string())
        .text("vibe", "dramatic")
        .text("response_format", request.response_format.as_str())
        .text("prompt", prompt)
}

fn build_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{}/{}", base, path)
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

/// Human-readable byte count for log lines.
pub fn format_file_size(size_bytes: usize) -> String {
    if size_bytes == 0 {
        return "0 B".to_string();
    }

    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = size_bytes as f64;
    let mut unit = 0;

    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    format!("{:.1} {}", size, UNITS[unit])
}
