use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

pub const DEFAULT_IMAGE_MIME: &str = "image/png";

const DATA_URI_SCHEME: &str = "data:";
const BASE64_MARKER: &str = "base64,";

/// Image bytes in transit: a mime label plus a `data:<mime>;base64,<bytes>` payload.
///
/// Values are built once (at intake or from a model response) and never
/// mutated afterwards; every accessor borrows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    mime_type: String,
    payload: String,
}

impl EncodedImage {
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        let mime_type = mime_type.into();
        let payload = format!("data:{mime_type};base64,{}", BASE64.encode(bytes));
        Self { mime_type, payload }
    }

    /// Accepts either a full data URI or bare base64. Bare input is labelled
    /// `image/png`.
    pub fn from_data_uri(raw: &str) -> Self {
        let raw = raw.trim();
        let mime_type = detect_mime(raw).to_string();
        let payload = if raw.starts_with(DATA_URI_SCHEME) && raw.contains(BASE64_MARKER) {
            raw.to_string()
        } else {
            format!("data:{mime_type};base64,{}", strip_data_prefix(raw))
        };
        Self { mime_type, payload }
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn data_uri(&self) -> &str {
        &self.payload
    }

    pub fn raw_base64(&self) -> &str {
        strip_data_prefix(&self.payload)
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(self.raw_base64().as_bytes())
            .with_context(|| format!("invalid base64 payload for {}", self.mime_type))
    }

    /// Approximate decoded size, without decoding.
    pub fn byte_len(&self) -> usize {
        let raw = self.raw_base64().trim_end();
        let padding = raw.chars().rev().take_while(|ch| *ch == '=').count();
        (raw.len() / 4 * 3).saturating_sub(padding)
    }
}

/// Mime type from a `data:image/<subtype>;base64,` prefix, `image/png` otherwise.
///
/// Only `image/*` labels whose subtype is letters and `+` are recognised.
pub fn detect_mime(raw: &str) -> &str {
    let Some(rest) = raw.strip_prefix(DATA_URI_SCHEME) else {
        return DEFAULT_IMAGE_MIME;
    };
    let Some((mime, _)) = rest.split_once(";base64,") else {
        return DEFAULT_IMAGE_MIME;
    };
    let Some(subtype) = mime.strip_prefix("image/") else {
        return DEFAULT_IMAGE_MIME;
    };
    if subtype.is_empty()
        || !subtype
            .chars()
            .all(|ch| ch.is_ascii_alphabetic() || ch == '+')
    {
        return DEFAULT_IMAGE_MIME;
    }
    mime
}

pub fn strip_data_prefix(raw: &str) -> &str {
    raw.split_once(BASE64_MARKER)
        .map(|(_, tail)| tail)
        .unwrap_or(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bytes_round_trips_original_bytes() -> anyhow::Result<()> {
        let bytes = vec![0x89, b'P', b'N', b'G', 0, 1, 2, 254, 255];
        let image = EncodedImage::from_bytes("image/jpeg", &bytes);

        assert_eq!(image.mime_type(), "image/jpeg");
        assert!(image.data_uri().starts_with("data:image/jpeg;base64,"));
        assert_eq!(image.decode()?, bytes);
        assert_eq!(image.byte_len(), bytes.len());
        Ok(())
    }

    #[test]
    fn detect_mime_reads_prefix_and_defaults_to_png() {
        assert_eq!(detect_mime("data:image/webp;base64,AAAA"), "image/webp");
        assert_eq!(detect_mime("data:image/svg+xml;base64,AAAA"), "image/svg+xml");
        assert_eq!(detect_mime("AAAA"), "image/png");
        assert_eq!(detect_mime("data:text/plain;base64,AAAA"), "image/png");
        assert_eq!(detect_mime("data:image/x-icon;base64,AAAA"), "image/png");
    }

    #[test]
    fn strip_data_prefix_leaves_bare_payload_alone() {
        assert_eq!(strip_data_prefix("data:image/png;base64,ZZZZ"), "ZZZZ");
        assert_eq!(strip_data_prefix("ZZZZ"), "ZZZZ");
    }

    #[test]
    fn from_data_uri_wraps_bare_base64() {
        let image = EncodedImage::from_data_uri("AAAA");
        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.data_uri(), "data:image/png;base64,AAAA");
        assert_eq!(image.raw_base64(), "AAAA");

        let jpeg = EncodedImage::from_data_uri("data:image/jpeg;base64,BBBB");
        assert_eq!(jpeg.mime_type(), "image/jpeg");
        assert_eq!(jpeg.data_uri(), "data:image/jpeg;base64,BBBB");
    }
}
