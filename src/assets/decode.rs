use anyhow::Context;
use base64::Engine;

use crate::foundation::error::{KinegraphError, KinegraphResult};
use crate::render::picture::DecodedImage;

const DATA_URI_PREFIX: &str = "data:";

/// Decode an encoded bitmap (PNG, JPEG, ...) into a premultiplied image.
pub fn decode_image(bytes: &[u8]) -> KinegraphResult<DecodedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    DecodedImage::from_rgba8(rgba.into_raw(), width, height)
}

/// `true` when `path` is an inline `data:` URI.
pub fn is_data_uri(path: &str) -> bool {
    path.starts_with(DATA_URI_PREFIX)
}

/// Payload bytes of a base64 `data:` URI.
pub fn decode_data_uri(uri: &str) -> KinegraphResult<Vec<u8>> {
    let rest = uri
        .strip_prefix(DATA_URI_PREFIX)
        .ok_or_else(|| KinegraphError::invalid_arguments("URI does not start with 'data:'"))?;
    let (metadata, data) = rest
        .split_once(',')
        .ok_or_else(|| KinegraphError::invalid_arguments("missing comma in data URI"))?;
    if !metadata
        .split(';')
        .any(|p| p.trim().eq_ignore_ascii_case("base64"))
    {
        return Err(KinegraphError::invalid_arguments(
            "only base64 data URIs carry bitmaps",
        ));
    }

    let cleaned: Vec<u8> = data.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&cleaned)
        .context("decode base64 payload")?;
    Ok(bytes)
}
