use bytes::{Bytes, BytesMut};

/// ID3v2 header length (tag magic + version + flags + size)
const ID3_HEADER_LEN: usize = 10;

/// Syncsafe 28-bit size from ID3v2 header bytes 6-9.
fn syncsafe_size(b: &[u8]) -> usize {
    ((b[0] as usize) << 21) | ((b[1] as usize) << 14) | ((b[2] as usize) << 7) | (b[3] as usize)
}

/// Drop a leading ID3v2 tag from a buffered MP3, if present.
///
/// MP3 frames concatenate legally; the only hazard when joining chunks is a
/// duplicate tag. Inputs shorter than a tag header are returned unchanged.
pub fn skip_id3_tag(data: &[u8]) -> &[u8] {
    if data.len() < ID3_HEADER_LEN {
        return data;
    }

    if &data[..3] == b"ID3" {
        let total = syncsafe_size(&data[6..10]) + ID3_HEADER_LEN;
        if total < data.len() {
            return &data[total..];
        }
    }

    data
}

/// Streaming ID3v2 skipper.
///
/// Buffers until the first 10 bytes are available, discards the tag when one
/// is found, and passes everything after it through untouched. A stream that
/// ends before 10 bytes is flushed intact by `finish`.
pub struct Id3Skip {
    state: State,
}

enum State {
    Probing(BytesMut),
    Discarding(usize),
    Passthrough,
}

impl Id3Skip {
    pub fn new() -> Self {
        Self {
            state: State::Probing(BytesMut::new()),
        }
    }

    pub fn push(&mut self, chunk: Bytes) -> Bytes {
        if matches!(self.state, State::Passthrough) {
            return chunk;
        }
        if matches!(self.state, State::Discarding(_)) {
            return self.discard(chunk);
        }

        let State::Probing(buf) = &mut self.state else {
            unreachable!()
        };
        buf.extend_from_slice(&chunk);
        if buf.len() < ID3_HEADER_LEN {
            return Bytes::new();
        }

        let buffered = std::mem::take(buf).freeze();
        if &buffered[..3] == b"ID3" {
            let total = syncsafe_size(&buffered[6..10]) + ID3_HEADER_LEN;
            self.state = State::Discarding(total);
            self.discard(buffered)
        } else {
            self.state = State::Passthrough;
            buffered
        }
    }

    fn discard(&mut self, mut chunk: Bytes) -> Bytes {
        let State::Discarding(remaining) = &mut self.state else {
            return chunk;
        };

        if chunk.len() <= *remaining {
            *remaining -= chunk.len();
            return Bytes::new();
        }

        let rest = chunk.split_off(*remaining);
        self.state = State::Passthrough;
        rest
    }

    /// Flush anything still buffered at end of stream.
    pub fn finish(&mut self) -> Bytes {
        match std::mem::replace(&mut self.state, State::Passthrough) {
            State::Probing(buf) => buf.freeze(),
            _ => Bytes::new(),
        }
    }
}

impl Default for Id3Skip {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id3_tag(payload_len: usize) -> Vec<u8> {
        // syncsafe encoding of payload_len, 7 bits per byte
        let mut tag = vec![
            b'I',
            b'D',
            b'3',
            0x04,
            0x00,
            0x00,
            ((payload_len >> 21) & 0x7f) as u8,
            ((payload_len >> 14) & 0x7f) as u8,
            ((payload_len >> 7) & 0x7f) as u8,
            (payload_len & 0x7f) as u8,
        ];
        tag.extend(std::iter::repeat(0xAA).take(payload_len));
        tag
    }

    #[test]
    fn test_syncsafe_size() {
        assert_eq!(syncsafe_size(&[0, 0, 0, 0]), 0);
        assert_eq!(syncsafe_size(&[0, 0, 0, 0x7f]), 127);
        assert_eq!(syncsafe_size(&[0, 0, 0x01, 0x00]), 128);
        assert_eq!(syncsafe_size(&[0x01, 0x00, 0x00, 0x00]), 1 << 21);
    }

    #[test]
    fn test_skip_id3_tag_buffered() {
        let mut data = id3_tag(100);
        data.extend_from_slice(b"mp3-frames");

        assert_eq!(skip_id3_tag(&data), b"mp3-frames");
    }

    #[test]
    fn test_skip_id3_tag_absent_is_identity() {
        let data = [0xFF, 0xFB, 0x90, 0x00, 1, 2, 3, 4, 5, 6, 7, 8];
        assert_eq!(skip_id3_tag(&data), &data[..]);
    }

    #[test]
    fn test_skip_id3_tag_short_input_untouched() {
        let data = b"ID3\x04\x00";
        assert_eq!(skip_id3_tag(data), &data[..]);
    }

    #[test]
    fn test_streaming_skip_single_push() {
        let mut data = id3_tag(64);
        data.extend_from_slice(b"audio");

        let mut skip = Id3Skip::new();
        let mut out = Vec::new();
        out.extend_from_slice(&skip.push(Bytes::from(data)));
        out.extend_from_slice(&skip.finish());

        assert_eq!(out, b"audio");
        assert_ne!(&out[..3.min(out.len())], b"ID3");
    }

    #[test]
    fn test_streaming_skip_byte_by_byte() {
        let mut data = id3_tag(33);
        data.extend_from_slice(b"frame-data");

        let mut skip = Id3Skip::new();
        let mut out = Vec::new();
        for byte in data {
            out.extend_from_slice(&skip.push(Bytes::copy_from_slice(&[byte])));
        }
        out.extend_from_slice(&skip.finish());

        assert_eq!(out, b"frame-data");
    }

    #[test]
    fn test_streaming_no_tag_is_identity() {
        let data = b"\xFF\xFBmp3 audio frames with no tag at all";

        let mut skip = Id3Skip::new();
        let mut out = Vec::new();
        out.extend_from_slice(&skip.push(Bytes::from_static(&data[..7])));
        out.extend_from_slice(&skip.push(Bytes::from_static(&data[7..])));
        out.extend_from_slice(&skip.finish());

        assert_eq!(out, data);
    }

    #[test]
    fn test_streaming_short_stream_flushed_intact() {
        // fewer than 10 bytes; left alone even if it starts with ID3
        let mut skip = Id3Skip::new();
        assert!(skip.push(Bytes::from_static(b"ID3\x04")).is_empty());
        assert_eq!(skip.finish(), Bytes::from_static(b"ID3\x04"));
    }

    #[test]
    fn test_streaming_tag_split_across_chunks() {
        let mut data = id3_tag(20);
        data.extend_from_slice(b"tail");

        let mut skip = Id3Skip::new();
        let mut out = Vec::new();
        // split inside the tag payload
        out.extend_from_slice(&skip.push(Bytes::copy_from_slice(&data[..15])));
        out.extend_from_slice(&skip.push(Bytes::copy_from_slice(&data[15..])));
        out.extend_from_slice(&skip.finish());

        assert_eq!(out, b"tail");
    }
}
