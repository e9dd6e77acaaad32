pub mod combine;
pub mod duration;
pub mod mp3;
pub mod wav;

use bytes::Bytes;

use crate::error::Result;
use crate::models::AudioFormat;

/// Streaming container surgery applied to non-first chunks so concatenation
/// yields one valid audio stream.
///
/// MP3 drops a leading ID3v2 tag, WAV extracts the `data` payload, and
/// every other format passes through untouched.
pub enum Surgery {
    Mp3(mp3::Id3Skip),
    Wav(wav::WavDataExtract),
    Raw,
}

impl Surgery {
    pub fn for_format(format: AudioFormat) -> Self {
        match format {
            AudioFormat::Mp3 => Surgery::Mp3(mp3::Id3Skip::new()),
            AudioFormat::Wav => Surgery::Wav(wav::WavDataExtract::new()),
            _ => Surgery::Raw,
        }
    }

    /// Feed one chunk of the incoming stream; returns the bytes to forward.
    pub fn push(&mut self, chunk: Bytes) -> Bytes {
        match self {
            Surgery::Mp3(skip) => skip.push(chunk),
            Surgery::Wav(extract) => extract.push(chunk),
            Surgery::Raw => chunk,
        }
    }

    /// Signal end of input; returns any held-back bytes.
    pub fn finish(&mut self) -> Result<Bytes> {
        match self {
            Surgery::Mp3(skip) => Ok(skip.finish()),
            Surgery::Wav(extract) => extract.finish().map(|_| Bytes::new()),
            Surgery::Raw => Ok(Bytes::new()),
        }
    }
}
