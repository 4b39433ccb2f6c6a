use crate::codec::Utf8Transcoder;
use crate::{IngestError, IngestResult};
use async_compression::tokio::bufread::{GzipDecoder, ZstdDecoder};
use encoding_rs::Encoding;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;

#[derive(Debug, Clone)]
pub struct SourceMeta {
    /// e.g. "application/gzip" or "text/csv"
    pub content_type: String,
    /// e.g. "gzip", "zstd", or empty
    pub content_encoding: String,
    /// File name, used for the extension fallback.
    pub name_hint: String,
    /// Character set of the sheet; anything but UTF-8 is transcoded.
    pub charset: &'static Encoding,
}

impl Default for SourceMeta {
    fn default() -> Self {
        Self {
            content_type: String::new(),
            content_encoding: String::new(),
            name_hint: String::new(),
            charset: encoding_rs::UTF_8,
        }
    }
}

impl SourceMeta {
    /// Meta guessed from a file name: `.gz`/`.zst` pick the decompressor.
    pub fn for_file_name(name: &str, charset: &'static Encoding) -> Self {
        let mut meta = Self {
            name_hint: name.to_string(),
            charset,
            ..Default::default()
        };
        if name.ends_with(".gz") {
            meta.content_type = "application/gzip".into();
            meta.content_encoding = "gzip".into();
        } else if name.ends_with(".zst") {
            meta.content_type = "application/zstd".into();
            meta.content_encoding = "zstd".into();
        } else {
            meta.content_type = "text/csv".into();
        }
        meta
    }

    fn is_gzip(&self) -> bool {
        let ce = self.content_encoding.to_ascii_lowercase();
        let ct = self.content_type.to_ascii_lowercase();
        ce.split(',').any(|s| s.trim() == "gzip")
            || matches!(ct.as_str(), "application/gzip" | "application/x-gzip")
            || self.name_hint.ends_with(".gz")
    }

    fn is_zstd(&self) -> bool {
        let ce = self.content_encoding.to_ascii_lowercase();
        ce.split(',').any(|s| s.trim() == "zstd")
            || self.content_type.eq_ignore_ascii_case("application/zstd")
            || self.name_hint.ends_with(".zst")
    }
}

/// Resolve a charset label such as `windows-1256` or `latin1`.
pub fn charset_for_label(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
}

/// Wrap `raw` with decompression (encoding, then type, then extension) and,
/// for non-UTF-8 charsets, transcoding. The result yields UTF-8 bytes.
pub fn build_source_reader<R>(raw: R, meta: &SourceMeta) -> Box<dyn AsyncRead + Unpin + Send>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let buf = BufReader::with_capacity(1 << 16, raw);
    let decompressed: Box<dyn AsyncRead + Unpin + Send> = if meta.is_gzip() {
        Box::new(GzipDecoder::new(buf))
    } else if meta.is_zstd() {
        Box::new(ZstdDecoder::new(buf))
    } else {
        Box::new(buf)
    };

    if meta.charset == encoding_rs::UTF_8 {
        decompressed
    } else {
        let framed = FramedRead::new(decompressed, Utf8Transcoder::new(meta.charset));
        Box::new(StreamReader::new(framed))
    }
}

/// Open a lead file, picking decompression from its extension.
pub async fn reader_from_path(
    path: &Path,
    charset: &'static Encoding,
) -> IngestResult<(Box<dyn AsyncRead + Unpin + Send>, SourceMeta)> {
    let file = File::open(path).await?;
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let meta = SourceMeta::for_file_name(name, charset);
    Ok((build_source_reader(file, &meta), meta))
}

/// Read a whole lead file into UTF-8 text, ready for [`crate::parse_leads`].
pub async fn read_lead_file(path: &Path, charset: &'static Encoding) -> IngestResult<String> {
    let (mut reader, meta) = reader_from_path(path, charset).await?;
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).await?;
    tracing::debug!(
        file = %meta.name_hint,
        charset = meta.charset.name(),
        bytes = bytes.len(),
        "read lead file"
    );
    String::from_utf8(bytes)
        .map_err(|e| IngestError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}
