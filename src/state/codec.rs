//! Shareable-link payload encoding.
//!
//! A payload is the document's wire JSON compressed with lz-string's
//! URI-component variant, so links produced here open in any client that
//! speaks the same format and vice versa.

use super::{DecodeError, DiagramDocument, Theme};

/// Compress a document into a URL-safe payload.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn encode(doc: &DiagramDocument) -> Result<String, serde_json::Error> {
    let json = doc.to_json()?;
    Ok(lz_str::compress_to_encoded_uri_component(json.as_str()))
}

/// Decode a URL-safe payload back into a document.
///
/// # Errors
///
/// Returns [`DecodeError::Decompress`] if the payload is not a valid
/// compressed stream, otherwise whatever [`DiagramDocument::from_json`]
/// reports.
pub fn decode(payload: &str, fallback_theme: Theme) -> Result<DiagramDocument, DecodeError> {
    // Form decoding turns the alphabet's '+' into a space.
    let payload = payload.trim().replace(' ', "+");
    if payload.is_empty() {
        return Err(DecodeError::Decompress);
    }
    let wide = lz_str::decompress_from_encoded_uri_component(payload.as_str())
        .ok_or(DecodeError::Decompress)?;
    let json = String::from_utf16(&wide).map_err(|_| DecodeError::Decompress)?;
    if json.is_empty() {
        return Err(DecodeError::Decompress);
    }
    DiagramDocument::from_json(&json, fallback_theme)
}

/// Absolute link for `encoded` on the given origin and path.
pub fn share_url(origin: &str, path: &str, encoded: &str) -> String {
    let origin = origin.trim_end_matches('/');
    let path = if path.is_empty() { "/" } else { path };
    format!("{origin}{path}?data={encoded}")
}
