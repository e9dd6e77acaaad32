use crate::config::constants::CLIENT_DEFAULT_MAX_LENGTH;
use crate::error::{Result, TtsError};
use crate::models::{AudioFormat, Voice};

/// One synthesis request against the upstream generation endpoint.
///
/// Built with chainable setters over sensible defaults; `validate` is called
/// by the client before anything goes on the wire.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub input: String,
    pub voice: Voice,
    pub response_format: AudioFormat,
    pub instructions: Option<String>,
    pub model: Option<String>,
    pub speed: f64,
    pub max_length: usize,
    pub validate_length: bool,
}

impl SynthesisRequest {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            voice: Voice::Alloy,
            response_format: AudioFormat::Mp3,
            instructions: None,
            model: None,
            speed: 0.0,
            max_length: CLIENT_DEFAULT_MAX_LENGTH,
            validate_length: true,
        }
    }

    pub fn with_voice(mut self, voice: Voice) -> Self {
        self.voice = voice;
        self
    }

    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.response_format = format;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn without_length_validation(mut self) -> Self {
        self.validate_length = false;
        self
    }

    /// Replace the input text, keeping every other parameter.
    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = input.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.input.trim().is_empty() {
            return Err(TtsError::validation("Input text cannot be empty", "input"));
        }

        if self.max_length == 0 {
            return Err(TtsError::validation(
                "max_length must be a positive integer",
                "max_length",
            ));
        }

        if self.validate_length && self.input.len() > self.max_length {
            return Err(TtsError::validation(
                format!(
                    "Input text is too long ({} characters). Maximum allowed length is {} characters. \
                     Consider splitting your text into smaller chunks or disable length validation.",
                    self.input.len(),
                    self.max_length
                ),
                "input",
            ));
        }

        if self.speed != 0.0 && !(0.25..=4.0).contains(&self.speed) {
            return Err(TtsError::validation(
                "Speed must be between 0.25 and 4.0",
                "speed",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let req = SynthesisRequest::new("hello");

        assert_eq!(req.voice, Voice::Alloy);
        assert_eq!(req.response_format, AudioFormat::Mp3);
        assert_eq!(req.max_length, CLIENT_DEFAULT_MAX_LENGTH);
        assert!(req.validate_length);
        assert!(req.instructions.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_builder_order_independent() {
        let a = SynthesisRequest::new("hi")
            .with_voice(Voice::Nova)
            .with_format(AudioFormat::Wav)
            .with_speed(1.5);
        let b = SynthesisRequest::new("hi")
            .with_speed(1.5)
            .with_format(AudioFormat::Wav)
            .with_voice(Voice::Nova);

        assert_eq!(a.voice, b.voice);
        assert_eq!(a.response_format, b.response_format);
        assert_eq!(a.speed, b.speed);
    }

    #[test]
    fn test_rejects_empty_input() {
        assert!(SynthesisRequest::new("").validate().is_err());
        assert!(SynthesisRequest::new("   \n\t ").validate().is_err());
    }

    #[test]
    fn test_length_validation() {
        let req = SynthesisRequest::new("a".repeat(100)).with_max_length(50);
        assert!(req.validate().is_err());

        let req = SynthesisRequest::new("a".repeat(100))
            .with_max_length(50)
            .without_length_validation();
        assert!(req.validate().is_ok());

        let req = SynthesisRequest::new("a".repeat(50)).with_max_length(50);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_zero_max_length_rejected() {
        let req = SynthesisRequest::new("hi").with_max_length(0);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_speed_bounds() {
        for speed in [0.25, 1.0, 4.0] {
            assert!(
                SynthesisRequest::new("hi").with_speed(speed).validate().is_ok(),
                "speed {} should be valid",
                speed
            );
        }
        for speed in [0.1, 4.5, -1.0] {
            assert!(
                SynthesisRequest::new("hi").with_speed(speed).validate().is_err(),
                "speed {} should be invalid",
                speed
            );
        }
        // zero means "unset"
        assert!(SynthesisRequest::new("hi").with_speed(0.0).validate().is_ok());
    }

    #[test]
    fn test_with_input_keeps_parameters() {
        let req = SynthesisRequest::new("one")
            .with_voice(Voice::Sage)
            .with_format(AudioFormat::Flac)
            .without_length_validation()
            .with_input("two");

        assert_eq!(req.input, "two");
        assert_eq!(req.voice, Voice::Sage);
        assert_eq!(req.response_format, AudioFormat::Flac);
        assert!(!req.validate_length);
    }
}
