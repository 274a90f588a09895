//! Base64 transcoding for request and response images.

use std::fs;
use std::path::Path;

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::{CommonError, Result};

/// Decode an image payload, accepting raw base64 or a `data:<mime>;base64,` URL.
/// Whitespace anywhere in the payload (line-wrapped encoders) is ignored.
pub fn decode_base64_image(payload: &str) -> Result<Vec<u8>> {
    let trimmed = payload.trim();
    let encoded = match trimmed.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => trimmed,
    };

    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(CommonError::EmptyPayload);
    }

    Ok(STANDARD.decode(compact.as_bytes())?)
}

/// Read a file and encode it as standard, padded base64
pub fn encode_image_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(STANDARD.encode(bytes))
}
