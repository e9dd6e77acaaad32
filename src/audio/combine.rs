use crate::audio::{mp3, wav};
use crate::error::{Result, TtsError};
use crate::models::AudioFormat;

/// Combine buffered audio chunks into one playable file.
///
/// MP3 chunks concatenate after stripping ID3 tags from non-first chunks.
/// WAV chunks are re-framed under a fresh header whose data size is the sum
/// of the extracted payloads. Everything else concatenates as-is.
pub fn combine_audio_chunks(chunks: &[Vec<u8>], format: AudioFormat) -> Result<Vec<u8>> {
    if chunks.is_empty() {
        return Err(TtsError::Processing(
            "no audio chunks to combine".to_string(),
        ));
    }
    if chunks.len() == 1 {
        return Ok(chunks[0].clone());
    }

    match format {
        AudioFormat::Mp3 => Ok(combine_mp3_chunks(chunks)),
        AudioFormat::Wav => combine_wav_chunks(chunks),
        _ => Ok(combine_raw_chunks(chunks)),
    }
}

fn combine_mp3_chunks(chunks: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();

    for (i, chunk) in chunks.iter().enumerate() {
        if chunk.is_empty() {
            continue;
        }
        if i > 0 {
            out.extend_from_slice(mp3::skip_id3_tag(chunk));
        } else {
            out.extend_from_slice(chunk);
        }
    }

    out
}

fn combine_wav_chunks(chunks: &[Vec<u8>]) -> Result<Vec<u8>> {
    let header = match wav::parse_wav_header(&chunks[0]) {
        Ok(h) => h,
        // not a standard WAV; fall back to raw concatenation
        Err(_) => return Ok(combine_raw_chunks(chunks)),
    };

    let mut audio_data = Vec::new();
    for chunk in chunks {
        match wav::extract_wav_data(chunk) {
            Ok(data) => audio_data.extend_from_slice(data),
            Err(e) => {
                if wav::looks_like_wav(chunk) {
                    return Err(TtsError::Processing(format!(
                        "failed to extract wav data: {}",
                        e
                    )));
                }
                // bare PCM from the upstream; append as-is
                audio_data.extend_from_slice(chunk);
            }
        }
    }

    Ok(wav::build_wav_file(&header, &audio_data))
}

fn combine_raw_chunks(chunks: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in chunks {
        out.extend_from_slice(chunk);
    }
    out
}

/// Rough container validation of combined output.
pub fn validate_audio_data(data: &[u8], format: AudioFormat) -> Result<()> {
    if data.is_empty() {
        return Err(TtsError::Processing("empty audio data".to_string()));
    }

    match format {
        AudioFormat::Mp3 => validate_mp3(data),
        AudioFormat::Wav => validate_wav(data),
        _ => Ok(()),
    }
}

fn validate_mp3(data: &[u8]) -> Result<()> {
    if data.len() < 4 {
        return Err(TtsError::Processing("data too short for MP3".to_string()));
    }

    if &data[..3] == b"ID3" {
        return Ok(());
    }

    // MP3 frame sync: 0xFFEx
    if data[0] == 0xFF && (data[1] & 0xE0) == 0xE0 {
        return Ok(());
    }

    Err(TtsError::Processing("invalid MP3 data".to_string()))
}

fn validate_wav(data: &[u8]) -> Result<()> {
    if data.len() < 12 {
        return Err(TtsError::Processing("data too short for WAV".to_string()));
    }
    if !wav::looks_like_wav(data) {
        return Err(TtsError::Processing("invalid WAV header".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::wav::{build_wav_file, WavHeader, WAV_HEADER_LEN};

    fn header() -> WavHeader {
        WavHeader {
            audio_format: 1,
            num_channels: 2,
            sample_rate: 44_100,
            byte_rate: 176_400,
            block_align: 4,
            bits_per_sample: 16,
        }
    }

    #[test]
    fn test_combine_empty_fails() {
        assert!(combine_audio_chunks(&[], AudioFormat::Mp3).is_err());
    }

    #[test]
    fn test_combine_single_chunk_identity() {
        let chunk = vec![1u8, 2, 3];
        let out = combine_audio_chunks(&[chunk.clone()], AudioFormat::Wav).unwrap();
        assert_eq!(out, chunk);
    }

    #[test]
    fn test_combine_wav_reframes_header() {
        let a = build_wav_file(&header(), &[1, 2, 3, 4]);
        let b = build_wav_file(&header(), &[5, 6]);

        let out = combine_audio_chunks(&[a, b], AudioFormat::Wav).unwrap();

        assert_eq!(out.len(), WAV_HEADER_LEN + 6);
        assert_eq!(&out[0..4], b"RIFF");
        assert_eq!(&out[8..12], b"WAVE");

        let file_size = u32::from_le_bytes(out[4..8].try_into().unwrap());
        assert_eq!(file_size as usize, out.len() - 8);

        let data_size = u32::from_le_bytes(out[40..44].try_into().unwrap());
        assert_eq!(data_size, 6);

        assert_eq!(&out[WAV_HEADER_LEN..], &[1, 2, 3, 4, 5, 6]);
        assert_eq!(crate::audio::wav::parse_wav_header(&out).unwrap(), header());
    }

    #[test]
    fn test_combine_wav_rejects_corrupt_member() {
        let good = build_wav_file(&header(), &[1, 2]);
        // RIFF/WAVE magic but no data chunk
        let mut bad = Vec::new();
        bad.extend_from_slice(b"RIFF");
        bad.extend_from_slice(&36u32.to_le_bytes());
        bad.extend_from_slice(b"WAVE");
        bad.extend_from_slice(&[0u8; 40]);

        assert!(combine_audio_chunks(&[good, bad], AudioFormat::Wav).is_err());
    }

    #[test]
    fn test_combine_mp3_strips_later_tags() {
        let tag: &[u8] = &[b'I', b'D', b'3', 4, 0, 0, 0, 0, 0, 2, 0xAA, 0xAA];
        let frame1 = vec![0xFF, 0xFB, 0x01];
        let mut chunk2 = tag.to_vec();
        chunk2.extend_from_slice(&[0xFF, 0xFB, 0x02]);

        let out = combine_audio_chunks(&[frame1.clone(), chunk2], AudioFormat::Mp3).unwrap();

        assert_eq!(out, vec![0xFF, 0xFB, 0x01, 0xFF, 0xFB, 0x02]);
    }

    #[test]
    fn test_combine_mp3_keeps_first_tag() {
        let mut chunk1 = vec![b'I', b'D', b'3', 4, 0, 0, 0, 0, 0, 2, 0xAA, 0xAA];
        chunk1.extend_from_slice(&[0xFF, 0xFB]);
        let chunk2 = vec![0xFF, 0xFB];

        let out = combine_audio_chunks(&[chunk1.clone(), chunk2], AudioFormat::Mp3).unwrap();

        assert!(out.starts_with(b"ID3"));
        assert_eq!(out.len(), chunk1.len() + 2);
    }

    #[test]
    fn test_combine_raw_concatenates() {
        let out =
            combine_audio_chunks(&[vec![1, 2], vec![3], vec![4, 5]], AudioFormat::Opus).unwrap();
        assert_eq!(out, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_validate_mp3() {
        assert!(validate_audio_data(&[0xFF, 0xFB, 0, 0], AudioFormat::Mp3).is_ok());
        assert!(validate_audio_data(b"ID3\x04....", AudioFormat::Mp3).is_ok());
        assert!(validate_audio_data(b"nope", AudioFormat::Mp3).is_err());
        assert!(validate_audio_data(&[], AudioFormat::Mp3).is_err());
    }

    #[test]
    fn test_validate_wav() {
        let file = build_wav_file(&header(), &[0, 0]);
        assert!(validate_audio_data(&file, AudioFormat::Wav).is_ok());
        assert!(validate_audio_data(b"RIFFxxWAV", AudioFormat::Wav).is_err());
    }

    #[test]
    fn test_validate_other_formats_accept_anything() {
        assert!(validate_audio_data(&[0u8], AudioFormat::Flac).is_ok());
        assert!(validate_audio_data(&[0u8], AudioFormat::Pcm).is_ok());
    }
}
