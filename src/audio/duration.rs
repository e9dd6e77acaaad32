use std::io::Cursor;

use hound::WavReader;

use crate::error::Result;

/// Duration in seconds of a buffered WAV file.
pub fn wav_duration_secs(wav_bytes: &[u8]) -> Result<f64> {
    let reader = WavReader::new(Cursor::new(wav_bytes))?;
    let spec = reader.spec();
    let frames = reader.duration() as f64;
    Ok(frames / spec.sample_rate as f64)
}

/// Rough MP3 duration assuming a 128 kbps constant bitrate.
pub fn estimate_mp3_duration_secs(data: &[u8]) -> f64 {
    const BYTES_PER_SECOND: f64 = 128_000.0 / 8.0;
    data.len() as f64 / BYTES_PER_SECOND
}

/// Estimate speech duration from text length at a given speaking rate.
///
/// Adds a 10% margin for pauses.
pub fn estimate_speech_duration_secs(text: &str, words_per_minute: f64) -> f64 {
    if text.is_empty() {
        return 0.0;
    }

    let wpm = if words_per_minute == 0.0 {
        150.0
    } else {
        words_per_minute
    };

    let words = text.split_whitespace().count() as f64;
    (words / wpm) * 60.0 * 1.1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::wav::{build_wav_file, WavHeader};

    #[test]
    fn test_wav_duration() {
        // 1 second of 16-bit mono at 8 kHz = 16000 bytes
        let header = WavHeader {
            audio_format: 1,
            num_channels: 1,
            sample_rate: 8_000,
            byte_rate: 16_000,
            block_align: 2,
            bits_per_sample: 16,
        };
        let file = build_wav_file(&header, &vec![0u8; 16_000]);

        let secs = wav_duration_secs(&file).unwrap();
        assert!((secs - 1.0).abs() < 1e-9, "got {}", secs);
    }

    #[test]
    fn test_wav_duration_rejects_garbage() {
        assert!(wav_duration_secs(b"not a wav").is_err());
    }

    #[test]
    fn test_mp3_estimate() {
        // 16000 bytes at 128 kbps is one second
        assert!((estimate_mp3_duration_secs(&vec![0u8; 16_000]) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_speech_estimate() {
        assert_eq!(estimate_speech_duration_secs("", 150.0), 0.0);

        // 150 words at 150 wpm is 60 seconds, plus the 10% margin
        let text = "word ".repeat(150);
        let secs = estimate_speech_duration_secs(&text, 150.0);
        assert!((secs - 66.0).abs() < 1e-9, "got {}", secs);
    }

    #[test]
    fn test_speech_estimate_zero_rate_defaults() {
        let a = estimate_speech_duration_secs("one two three", 0.0);
        let b = estimate_speech_duration_secs("one two three", 150.0);
        assert_eq!(a, b);
    }
}
