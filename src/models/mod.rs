pub mod format;
pub mod requests;
pub mod responses;
pub mod voice;

pub use format::AudioFormat;
pub use requests::SpeechRequest;
pub use responses::{FormatInfo, FormatsResponse, HealthResponse, VoiceInfo, VoicesResponse};
pub use voice::Voice;
