use std::fmt;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};

use crate::error::ConvertError;

pub const DEFAULT_CHARSET: &str = "utf-8";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionSource {
    Bom,
    Detector,
    AssumedUtf8,
}

impl fmt::Display for DetectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DetectionSource::Bom => "bom",
            DetectionSource::Detector => "detector",
            DetectionSource::AssumedUtf8 => "assumed-utf8",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Detection {
    pub encoding: &'static Encoding,
    pub source: DetectionSource,
}

impl Detection {
    pub fn name(&self) -> String {
        if self.encoding == UTF_8 {
            DEFAULT_CHARSET.to_string()
        } else {
            self.encoding.name().to_ascii_lowercase()
        }
    }
}

#[derive(Debug, Clone)]
pub struct Decoded {
    pub text: String,
    pub encoding: &'static Encoding,
    pub had_errors: bool,
}

/// Best-guess charset for a raw buffer: BOM, then strict UTF-8, then the
/// statistical detector. Empty input is treated as UTF-8.
pub fn detect_charset(bytes: &[u8]) -> Detection {
    if let Some(encoding) = detect_bom(bytes) {
        return Detection {
            encoding,
            source: DetectionSource::Bom,
        };
    }

    if std::str::from_utf8(bytes).is_ok() {
        return Detection {
            encoding: UTF_8,
            source: DetectionSource::AssumedUtf8,
        };
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);

    Detection {
        encoding,
        source: DetectionSource::Detector,
    }
}

pub fn resolve_charset(label: &str) -> Result<&'static Encoding, ConvertError> {
    let trimmed = label.trim();
    Encoding::for_label(trimmed.as_bytes()).ok_or_else(|| ConvertError::EncodingUnsupported {
        label: trimmed.to_string(),
    })
}

/// Decodes `bytes` with the named charset into UTF-8 text. A leading BOM is
/// dropped; malformed sequences become U+FFFD and set `had_errors`.
pub fn decode(bytes: &[u8], charset: &str) -> Result<Decoded, ConvertError> {
    let encoding = resolve_charset(charset)?;
    let (cow, encoding_used, had_errors) = encoding.decode(bytes);
    Ok(Decoded {
        text: cow.into_owned(),
        encoding: encoding_used,
        had_errors,
    })
}

fn detect_bom(bytes: &[u8]) -> Option<&'static Encoding> {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return Some(UTF_8);
    }
    if bytes.starts_with(&[0xFF, 0xFE]) {
        return Some(UTF_16LE);
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        return Some(UTF_16BE);
    }

    None
}
