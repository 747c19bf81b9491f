//! Newline-delimited framing that never fails on bad input.
//!
//! `FramedRead` stops yielding after any decoder error, so frames that are
//! too long are reported as [`Frame::Oversized`] items instead of errors.
//! Bytes are passed through undecoded. A line that is not UTF-8 or not JSON
//! is the reader's concern, not the codec's.

use std::io;

use tokio_util::bytes::{Bytes, BytesMut};
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, Decoder, Encoder};

/// Longest accepted line, in bytes.
pub const MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// One decoded line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// The line's bytes, without the trailing newline.
    Line(Bytes),
    /// A line longer than the limit. Its bytes are discarded up to the next
    /// newline.
    Oversized,
}

#[derive(Debug)]
pub struct MessageCodec {
    inner: AnyDelimiterCodec,
}

impl MessageCodec {
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_BYTES)
    }

    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            inner: AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), b"\n".to_vec(), max_length),
        }
    }
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn frame(result: Result<Option<Bytes>, AnyDelimiterCodecError>) -> Result<Option<Frame>, io::Error> {
    match result {
        Ok(line) => Ok(line.map(Frame::Line)),
        Err(AnyDelimiterCodecError::MaxChunkLengthExceeded) => Ok(Some(Frame::Oversized)),
        Err(AnyDelimiterCodecError::Io(err)) => Err(err),
    }
}

impl Decoder for MessageCodec {
    type Item = Frame;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, io::Error> {
        frame(self.inner.decode(src))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, io::Error> {
        frame(self.inner.decode_eof(src))
    }
}

impl Encoder<String> for MessageCodec {
    type Error = io::Error;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), io::Error> {
        self.inner.encode(line, dst).map_err(|err| match err {
            AnyDelimiterCodecError::Io(err) => err,
            AnyDelimiterCodecError::MaxChunkLengthExceeded => {
                io::Error::new(io::ErrorKind::InvalidInput, "line length limit exceeded")
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::transport::codec::{Frame, MessageCodec};
    use tokio_util::bytes::BytesMut;
    use tokio_util::codec::Decoder;

    #[test]
    fn invalid_utf8_is_a_line_like_any_other() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::from(&b"\xff\xfe garbage\n{}\n"[..]);
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Frame::Line(b"\xff\xfe garbage"[..].to_vec().into()))
        );
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Frame::Line(b"{}"[..].to_vec().into()))
        );
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn oversized_line_is_reported_then_skipped() {
        let mut codec = MessageCodec::with_max_length(8);
        let mut buf = BytesMut::from(&b"0123456789abcdef\nok\n"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Frame::Oversized));
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Frame::Line(b"ok"[..].to_vec().into()))
        );
    }
}
