use serde::Deserialize;

/// JSON body of `POST /v1/audio/speech`, OpenAI-compatible.
///
/// Every field is optional on the wire; missing values are normalized by the
/// handler (voice alloy, format mp3, max_length 2048, auto_combine from the
/// server default).
#[derive(Debug, Deserialize)]
pub struct SpeechRequest {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub voice: String,
    #[serde(default)]
    pub response_format: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub auto_combine: Option<bool>,
    #[serde(default)]
    pub max_length: usize,
}
