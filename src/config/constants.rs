/// Maximum input size the sanitizer will accept (in bytes)
///
/// Requests above this limit are rejected before any upstream call.
pub const MAX_SANITIZE_LENGTH: usize = 50_000;

/// Default per-request chunk length for the OpenAI-compatible endpoint
pub const DEFAULT_MAX_LENGTH: usize = 2048;

/// Default chunk length bound for direct client use
pub const CLIENT_DEFAULT_MAX_LENGTH: usize = 4096;

/// Default upstream service base URL
pub const DEFAULT_BASE_URL: &str = "https://www.openai.fm";

/// Default upstream request timeout (seconds)
pub const DEFAULT_CLIENT_TIMEOUT_SECS: u64 = 30;

/// Default server-side request timeout (seconds), passed to the client
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Default number of retries for retryable upstream failures
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Process-wide cap on concurrent upstream requests
pub const DEFAULT_MAX_CONCURRENT: usize = 10;

/// Default per-request parallelism for long-text chunk fetches
pub const DEFAULT_CHUNK_CONCURRENCY: usize = 3;

/// Default copy buffer size for the streaming pipeline (bytes)
pub const DEFAULT_CHUNK_BUFFER_SIZE: usize = 32 * 1024;

/// Value of the X-Powered-By response header
pub const POWERED_BY: &str = "TTSFM-OpenAI-Compatible";

/// Service identifier reported by the health endpoint
pub const SERVICE_NAME: &str = "ttsfm";

/// Prompt sent upstream when the request carries no instructions
pub const DEFAULT_INSTRUCTIONS: &str = "Affect/personality: Natural and clear

Tone: Friendly and professional, creating a pleasant listening experience.

Pronunciation: Clear, articulate, and steady, ensuring each word is easily understood while maintaining a natural, conversational flow.

Pause: Brief, purposeful pauses between sentences to allow time for the listener to process the information.

Emotion: Warm and engaging, conveying the intended message effectively.";
