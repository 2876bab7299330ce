#[cfg(test)]
#[path = "codec_test.rs"]
mod tests;

use anyhow::Context;
use anyhow::Result;
use base64::engine::general_purpose::STANDARD as b64;
use base64::Engine;

use crate::domain::models::ImageBlob;

pub fn blob_to_base64(blob: &ImageBlob) -> String {
    return b64.encode(&blob.bytes);
}

pub fn base64_to_blob(data: &str, mime_type: &str) -> Result<ImageBlob> {
    let bytes = b64.decode(data).context("invalid base64 image data")?;
    return Ok(ImageBlob::new(bytes, mime_type));
}

/// Builds the displayable resource reference for a payload.
pub fn data_url(blob: &ImageBlob) -> String {
    return format!(
        "data:{};base64,{}",
        blob.mime_type,
        b64.encode(&blob.bytes)
    );
}

/// Magic-byte MIME detection for uploaded files.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        return "image/png";
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "image/jpeg";
    }
    if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        return "image/webp";
    }
    if bytes.starts_with(b"GIF8") {
        return "image/gif";
    }

    return "application/octet-stream";
}
