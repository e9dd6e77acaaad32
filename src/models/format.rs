use std::fmt;

/// Audio output formats the gateway understands.
///
/// The upstream only ever produces MP3 or WAV; requesting any other format
/// yields WAV. The format of a response is always classified from its
/// Content-Type header, never assumed from the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioFormat {
    Mp3,
    Wav,
    Opus,
    Aac,
    Flac,
    Pcm,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 6] = [
        AudioFormat::Mp3,
        AudioFormat::Wav,
        AudioFormat::Opus,
        AudioFormat::Aac,
        AudioFormat::Flac,
        AudioFormat::Pcm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::Opus => "opus",
            AudioFormat::Aac => "aac",
            AudioFormat::Flac => "flac",
            AudioFormat::Pcm => "pcm",
        }
    }

    pub fn parse(s: &str) -> Option<AudioFormat> {
        AudioFormat::ALL.iter().copied().find(|f| f.as_str() == s)
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Opus => "audio/opus",
            AudioFormat::Aac => "audio/aac",
            AudioFormat::Flac => "audio/flac",
            AudioFormat::Pcm => "audio/pcm",
        }
    }

    /// Classify a format from a Content-Type header value.
    ///
    /// Parameters are stripped, `audio/mp3` and `audio/mpeg` both map to
    /// MP3, and anything unrecognized falls back to MP3.
    pub fn from_content_type(content_type: &str) -> AudioFormat {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "audio/mpeg" | "audio/mp3" => AudioFormat::Mp3,
            "audio/wav" => AudioFormat::Wav,
            "audio/opus" => AudioFormat::Opus,
            "audio/aac" => AudioFormat::Aac,
            "audio/flac" => AudioFormat::Flac,
            "audio/pcm" => AudioFormat::Pcm,
            _ => AudioFormat::Mp3,
        }
    }

    /// The upstream returns WAV for every non-MP3 request.
    pub fn maps_to_wav(&self) -> bool {
        !matches!(self, AudioFormat::Mp3)
    }

    /// The format actually deliverable for a requested format.
    pub fn supported_fallback(&self) -> AudioFormat {
        if *self == AudioFormat::Mp3 {
            AudioFormat::Mp3
        } else {
            AudioFormat::Wav
        }
    }

    /// Comma-separated list of valid format names, for error messages.
    pub fn valid_names() -> String {
        AudioFormat::ALL
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        AudioFormat::Mp3
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_mapping() {
        assert_eq!(AudioFormat::Mp3.content_type(), "audio/mpeg");
        assert_eq!(AudioFormat::Wav.content_type(), "audio/wav");
        assert_eq!(AudioFormat::Opus.content_type(), "audio/opus");
        assert_eq!(AudioFormat::Aac.content_type(), "audio/aac");
        assert_eq!(AudioFormat::Flac.content_type(), "audio/flac");
        assert_eq!(AudioFormat::Pcm.content_type(), "audio/pcm");
    }

    #[test]
    fn test_from_content_type_mp3_aliases() {
        assert_eq!(AudioFormat::from_content_type("audio/mpeg"), AudioFormat::Mp3);
        assert_eq!(AudioFormat::from_content_type("audio/mp3"), AudioFormat::Mp3);
    }

    #[test]
    fn test_from_content_type_strips_parameters() {
        assert_eq!(
            AudioFormat::from_content_type("audio/wav; charset=binary"),
            AudioFormat::Wav
        );
        assert_eq!(
            AudioFormat::from_content_type("  audio/flac ; q=1"),
            AudioFormat::Flac
        );
    }

    #[test]
    fn test_from_content_type_unknown_is_mp3() {
        assert_eq!(AudioFormat::from_content_type(""), AudioFormat::Mp3);
        assert_eq!(AudioFormat::from_content_type("text/html"), AudioFormat::Mp3);
        assert_eq!(
            AudioFormat::from_content_type("application/octet-stream"),
            AudioFormat::Mp3
        );
    }

    #[test]
    fn test_maps_to_wav() {
        assert!(!AudioFormat::Mp3.maps_to_wav());
        assert!(AudioFormat::Wav.maps_to_wav());
        assert!(AudioFormat::Opus.maps_to_wav());
        assert!(AudioFormat::Aac.maps_to_wav());
        assert!(AudioFormat::Flac.maps_to_wav());
        assert!(AudioFormat::Pcm.maps_to_wav());
    }

    #[test]
    fn test_supported_fallback() {
        assert_eq!(AudioFormat::Mp3.supported_fallback(), AudioFormat::Mp3);
        for format in [
            AudioFormat::Wav,
            AudioFormat::Opus,
            AudioFormat::Aac,
            AudioFormat::Flac,
            AudioFormat::Pcm,
        ] {
            assert_eq!(format.supported_fallback(), AudioFormat::Wav);
        }
    }

    #[test]
    fn test_parse_roundtrip() {
        for format in AudioFormat::ALL {
            assert_eq!(AudioFormat::parse(format.as_str()), Some(format));
        }
        assert!(AudioFormat::parse("ogg").is_none());
    }
}
