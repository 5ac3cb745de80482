use base64::Engine as _;

use super::ExtractionError;
use crate::pipeline::model::InlineImage;

/// Largest decoded document image accepted (10 MiB).
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Mime type assumed when the caller sends none.
pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// Validate a caller-supplied base64 image and its mime type.
///
/// Accepts a bare base64 string or a `data:<mime>;base64,<payload>` URL.
/// The payload is decoded only to check it and measure its size; the
/// original base64 text is what gets forwarded.
pub fn prepare_inline_image(
    image_base64: &str,
    mime_type: Option<&str>,
) -> Result<InlineImage, ExtractionError> {
    let (url_mime, payload) = split_data_url(image_base64.trim());
    if payload.is_empty() {
        return Err(ExtractionError::InvalidImage("imageBase64 is empty".into()));
    }

    let mime = mime_type
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .or(url_mime)
        .unwrap_or(DEFAULT_MIME_TYPE)
        .to_ascii_lowercase();
    if !(mime.starts_with("image/") || mime == "application/pdf") {
        return Err(ExtractionError::InvalidImage(format!(
            "unsupported mime type {mime}"
        )));
    }

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| ExtractionError::InvalidImage(format!("base64 decode failed: {e}")))?;
    if decoded.len() > MAX_IMAGE_BYTES {
        return Err(ExtractionError::InvalidImage(format!(
            "image exceeds {} MiB ({} bytes)",
            MAX_IMAGE_BYTES / (1024 * 1024),
            decoded.len()
        )));
    }

    Ok(InlineImage {
        mime_type: mime,
        data_base64: payload.to_string(),
    })
}

/// Split `data:image/png;base64,AAAA` into (Some("image/png"), "AAAA").
fn split_data_url(input: &str) -> (Option<&str>, &str) {
    let Some(rest) = input.strip_prefix("data:") else {
        return (None, input);
    };
    match rest.split_once(',') {
        Some((header, payload)) => {
            let mime = header.strip_suffix(";base64").unwrap_or(header);
            (Some(mime).filter(|m| !m.is_empty()), payload)
        }
        None => (None, input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_base64_defaults_to_jpeg() {
        let image = prepare_inline_image("aGVsbG8=", None).unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.data_base64, "aGVsbG8=");
    }

    #[test]
    fn explicit_mime_type_wins() {
        let image = prepare_inline_image("data:image/png;base64,aGVsbG8=", Some("image/webp")).unwrap();
        assert_eq!(image.mime_type, "image/webp");
        assert_eq!(image.data_base64, "aGVsbG8=");
    }

    #[test]
    fn data_url_supplies_mime_type() {
        let image = prepare_inline_image("data:image/png;base64,aGVsbG8=", None).unwrap();
        assert_eq!(image.mime_type, "image/png");
    }

    #[test]
    fn pdf_accepted() {
        assert!(prepare_inline_image("aGVsbG8=", Some("application/pdf")).is_ok());
    }

    #[test]
    fn non_image_mime_rejected() {
        let err = prepare_inline_image("aGVsbG8=", Some("text/html")).unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidImage(_)));
    }

    #[test]
    fn invalid_base64_rejected() {
        let err = prepare_inline_image("not base64!!", None).unwrap_err();
        assert!(err.is_caller_error());
    }

    #[test]
    fn empty_payload_rejected() {
        assert!(prepare_inline_image("   ", None).is_err());
        assert!(prepare_inline_image("data:image/png;base64,", None).is_err());
    }
}
