use bytes::{Buf, Bytes, BytesMut};

use crate::error::{Result, TtsError};

/// Canonical WAV file header length: RIFF header + 16-byte `fmt ` + `data` header
pub const WAV_HEADER_LEN: usize = 44;

const RIFF_HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

/// Fields of the 16-byte PCM `fmt ` subchunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub audio_format: u16,
    pub num_channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
}

pub fn looks_like_wav(data: &[u8]) -> bool {
    data.len() >= RIFF_HEADER_LEN && &data[0..4] == b"RIFF" && &data[8..12] == b"WAVE"
}

/// Parse the `fmt ` subchunk out of a buffered WAV file.
pub fn parse_wav_header(data: &[u8]) -> Result<WavHeader> {
    if data.len() < WAV_HEADER_LEN {
        return Err(TtsError::Processing(
            "data too short for WAV header".to_string(),
        ));
    }
    if !looks_like_wav(data) {
        return Err(TtsError::Processing("not a valid WAV file".to_string()));
    }

    let mut offset = RIFF_HEADER_LEN;
    while offset + CHUNK_HEADER_LEN <= data.len() {
        let chunk_id = &data[offset..offset + 4];
        let chunk_size =
            u32::from_le_bytes(data[offset + 4..offset + 8].try_into().unwrap()) as usize;

        if chunk_id == b"fmt " {
            if offset + CHUNK_HEADER_LEN + chunk_size > data.len() {
                return Err(TtsError::Processing(
                    "fmt chunk extends beyond file".to_string(),
                ));
            }
            if chunk_size < 16 {
                return Err(TtsError::Processing("fmt chunk too small".to_string()));
            }

            let base = offset + CHUNK_HEADER_LEN;
            return Ok(WavHeader {
                audio_format: u16::from_le_bytes(data[base..base + 2].try_into().unwrap()),
                num_channels: u16::from_le_bytes(data[base + 2..base + 4].try_into().unwrap()),
                sample_rate: u32::from_le_bytes(data[base + 4..base + 8].try_into().unwrap()),
                byte_rate: u32::from_le_bytes(data[base + 8..base + 12].try_into().unwrap()),
                block_align: u16::from_le_bytes(data[base + 12..base + 14].try_into().unwrap()),
                bits_per_sample: u16::from_le_bytes(data[base + 14..base + 16].try_into().unwrap()),
            });
        }

        offset += CHUNK_HEADER_LEN + chunk_size;
        if chunk_size % 2 != 0 {
            offset += 1;
        }
    }

    Err(TtsError::Processing("fmt chunk not found".to_string()))
}

/// Extract the `data` chunk payload from a buffered WAV file.
///
/// A declared size running past the end of the buffer is clamped.
pub fn extract_wav_data(data: &[u8]) -> Result<&[u8]> {
    if data.len() < WAV_HEADER_LEN {
        return Err(TtsError::Processing("data too short".to_string()));
    }
    if !looks_like_wav(data) {
        return Err(TtsError::Processing("not a WAV file".to_string()));
    }

    let mut offset = RIFF_HEADER_LEN;
    while offset + CHUNK_HEADER_LEN <= data.len() {
        let chunk_id = &data[offset..offset + 4];
        let chunk_size =
            u32::from_le_bytes(data[offset + 4..offset + 8].try_into().unwrap()) as usize;

        if chunk_id == b"data" {
            let start = offset + CHUNK_HEADER_LEN;
            let end = (start + chunk_size).min(data.len());
            return Ok(&data[start..end]);
        }

        offset += CHUNK_HEADER_LEN + chunk_size;
        if chunk_size % 2 != 0 {
            offset += 1;
        }
    }

    Err(TtsError::Processing("data chunk not found".to_string()))
}

/// Build a canonical 44-byte-header WAV file around a PCM payload.
pub fn build_wav_file(header: &WavHeader, audio_data: &[u8]) -> Vec<u8> {
    let data_size = audio_data.len() as u32;
    let file_size = 36 + data_size;

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + audio_data.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&file_size.to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&header.audio_format.to_le_bytes());
    out.extend_from_slice(&header.num_channels.to_le_bytes());
    out.extend_from_slice(&header.sample_rate.to_le_bytes());
    out.extend_from_slice(&header.byte_rate.to_le_bytes());
    out.extend_from_slice(&header.block_align.to_le_bytes());
    out.extend_from_slice(&header.bits_per_sample.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_size.to_le_bytes());
    out.extend_from_slice(audio_data);

    out
}

/// Streaming extractor that emits only the `data` chunk payload of a WAV
/// container.
///
/// Walks the RIFF chunk list as bytes arrive: discards non-`data` chunks,
/// streams exactly the declared `data` size (consuming the pad byte when the
/// size is odd), and ignores anything after it. Input that does not start
/// with `RIFF....WAVE` passes through unmodified, header bytes included.
pub struct WavDataExtract {
    state: WavState,
}

enum WavState {
    RiffHeader(BytesMut),
    ChunkHeader(BytesMut),
    Data { remaining: usize, pad: bool },
    Skip { remaining: usize, pad: bool },
    Done,
    Raw,
}

impl WavDataExtract {
    pub fn new() -> Self {
        Self {
            state: WavState::RiffHeader(BytesMut::new()),
        }
    }

    pub fn push(&mut self, mut chunk: Bytes) -> Bytes {
        let mut out = BytesMut::new();

        loop {
            match &mut self.state {
                WavState::Raw => {
                    out.extend_from_slice(&chunk);
                    break;
                }
                WavState::Done => break,
                WavState::RiffHeader(buf) => {
                    let need = RIFF_HEADER_LEN - buf.len();
                    let take = need.min(chunk.len());
                    buf.extend_from_slice(&chunk[..take]);
                    chunk.advance(take);

                    if buf.len() < RIFF_HEADER_LEN {
                        break;
                    }

                    let header = std::mem::take(buf);
                    if &header[0..4] == b"RIFF" && &header[8..12] == b"WAVE" {
                        self.state = WavState::ChunkHeader(BytesMut::new());
                    } else {
                        out.extend_from_slice(&header);
                        self.state = WavState::Raw;
                    }
                }
                WavState::ChunkHeader(buf) => {
                    let need = CHUNK_HEADER_LEN - buf.len();
                    let take = need.min(chunk.len());
                    buf.extend_from_slice(&chunk[..take]);
                    chunk.advance(take);

                    if buf.len() < CHUNK_HEADER_LEN {
                        break;
                    }

                    let header = std::mem::take(buf);
                    let size =
                        u32::from_le_bytes(header[4..8].try_into().unwrap()) as usize;
                    let pad = size % 2 != 0;
                    if &header[0..4] == b"data" {
                        self.state = WavState::Data {
                            remaining: size,
                            pad,
                        };
                    } else {
                        self.state = WavState::Skip {
                            remaining: size,
                            pad,
                        };
                    }
                }
                WavState::Data { remaining, pad } => {
                    if *remaining == 0 {
                        if *pad {
                            if chunk.is_empty() {
                                break;
                            }
                            chunk.advance(1);
                        }
                        self.state = WavState::Done;
                        continue;
                    }
                    if chunk.is_empty() {
                        break;
                    }
                    let take = chunk.len().min(*remaining);
                    out.extend_from_slice(&chunk[..take]);
                    chunk.advance(take);
                    *remaining -= take;
                }
                WavState::Skip { remaining, pad } => {
                    if *remaining == 0 {
                        if *pad {
                            if chunk.is_empty() {
                                break;
                            }
                            chunk.advance(1);
                        }
                        self.state = WavState::ChunkHeader(BytesMut::new());
                        continue;
                    }
                    if chunk.is_empty() {
                        break;
                    }
                    let take = chunk.len().min(*remaining);
                    chunk.advance(take);
                    *remaining -= take;
                }
            }

            if chunk.is_empty() && !self.ready_to_transition() {
                break;
            }
        }

        out.freeze()
    }

    /// A state that can advance without more input (zero-size chunk body).
    fn ready_to_transition(&self) -> bool {
        matches!(
            self.state,
            WavState::Data {
                remaining: 0,
                pad: false
            } | WavState::Skip {
                remaining: 0,
                pad: false
            }
        )
    }

    /// Validate completion at end of stream.
    ///
    /// Errors when the container ended before a `data` chunk was found; a
    /// truncated `data` payload is tolerated.
    pub fn finish(&mut self) -> Result<()> {
        match self.state {
            WavState::Data { .. } | WavState::Done | WavState::Raw => Ok(()),
            _ => Err(TtsError::Processing(
                "wav data chunk not found in stream".to_string(),
            )),
        }
    }
}

impl Default for WavDataExtract {
    fn default() -> Self {
        Self::new()
    }
}
