//! Image-to-data-URL encoding pipeline.
//!
//! # Responsibility
//! - Turn caller-supplied image sources into self-contained `data:` URLs
//!   that render directly, with no path or blob handle left behind.
//! - Sniff the MIME type from magic numbers.
//!
//! # Invariants
//! - Output is always `data:<mime>;base64,<payload>`.
//! - Unrecognized formats are encoded as `application/octet-stream`, never
//!   rejected.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::PathBuf;

pub type MediaResult<T> = Result<T, MediaError>;

/// Encoding-pipeline error.
#[derive(Debug)]
pub enum MediaError {
    /// Reading the source file failed.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Display for MediaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read image `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for MediaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
        }
    }
}

/// Binary image payload supplied with an insert/update operation.
///
/// File sources are read when the owning operation executes, not when the
/// draft is built.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Read and encode this file at operation time.
    File(PathBuf),
    /// Already-loaded binary data.
    Bytes(Vec<u8>),
}

/// Encodes one image source into a self-contained `data:` URL.
pub fn encode_to_data_url(source: ImageSource) -> MediaResult<String> {
    let bytes = match source {
        ImageSource::File(path) => fs::read(&path).map_err(|err| MediaError::Io {
            path,
            source: err,
        })?,
        ImageSource::Bytes(data) => data,
    };

    Ok(format!(
        "data:{};base64,{}",
        sniff_mime(&bytes),
        BASE64.encode(&bytes)
    ))
}

/// Best-effort MIME detection from magic numbers.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else if bytes.starts_with(b"BM") {
        "image/bmp"
    } else {
        "application/octet-stream"
    }
}

#[cfg(test)]
mod tests {
    use super::{encode_to_data_url, sniff_mime, ImageSource, MediaError};
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use std::path::PathBuf;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\nrest-of-file";

    #[test]
    fn sniffs_known_magic_numbers() {
        assert_eq!(sniff_mime(PNG_MAGIC), "image/png");
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(sniff_mime(b"GIF89a..."), "image/gif");
        assert_eq!(sniff_mime(b"RIFF\x00\x00\x00\x00WEBPVP8 "), "image/webp");
        assert_eq!(sniff_mime(b"BMxxxx"), "image/bmp");
    }

    #[test]
    fn unknown_bytes_fall_back_to_octet_stream() {
        assert_eq!(sniff_mime(b"plain text"), "application/octet-stream");
        assert_eq!(sniff_mime(&[]), "application/octet-stream");
    }

    #[test]
    fn bytes_source_encodes_to_expected_data_url() {
        let url = encode_to_data_url(ImageSource::Bytes(PNG_MAGIC.to_vec())).unwrap();
        let expected = format!("data:image/png;base64,{}", BASE64.encode(PNG_MAGIC));
        assert_eq!(url, expected);
    }

    #[test]
    fn missing_file_reports_io_error_with_path() {
        let path = PathBuf::from("/nonexistent/charadex-image.png");
        let err = encode_to_data_url(ImageSource::File(path.clone())).unwrap_err();
        match err {
            MediaError::Io { path: reported, .. } => assert_eq!(reported, path),
        }
    }
}
