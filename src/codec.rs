use bytes::{Buf, BytesMut};
use encoding_rs::{Decoder as CharsetDecoder, Encoding};
use std::io;
use tokio_util::codec::Decoder;

/// Streams legacy-charset bytes (e.g. windows-1256 sheets exported from
/// Excel) out as UTF-8. Malformed sequences become U+FFFD; the first one is
/// logged so a wrong `--charset` is visible.
pub struct Utf8Transcoder {
    decoder: CharsetDecoder,
    charset: &'static Encoding,
    reported_malformed: bool,
    finished: bool,
}

impl Utf8Transcoder {
    pub fn new(charset: &'static Encoding) -> Self {
        Self {
            decoder: charset.new_decoder(),
            charset,
            reported_malformed: false,
            finished: false,
        }
    }

    fn transcode(&mut self, src: &mut BytesMut, last: bool) -> Option<BytesMut> {
        let capacity = self
            .decoder
            .max_utf8_buffer_length(src.len())
            .unwrap_or(src.len() * 3 + 16);
        let mut out = vec![0u8; capacity];

        let (_result, read, written, had_errors) = self.decoder.decode_to_utf8(src, &mut out, last);
        if had_errors && !self.reported_malformed {
            self.reported_malformed = true;
            tracing::warn!(
                charset = self.charset.name(),
                "lead file has bytes invalid for its charset, replaced with U+FFFD"
            );
        }
        if last {
            src.clear();
        } else {
            src.advance(read);
        }
        (written > 0).then(|| BytesMut::from(&out[..written]))
    }
}

impl Decoder for Utf8Transcoder {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        Ok(self.transcode(src, false))
    }

    // The final call flushes any incomplete sequence held by the decoder.
    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.finished {
            return Ok(None);
        }
        self.finished = true;
        Ok(self.transcode(buf, true))
    }
}
