//! Decode stage: interpret fetched bytes as a raster image.

use image::DynamicImage;
use thiserror::Error;

/// Errors produced by the decode stage.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// Bytes are not a supported raster format, or the data is truncated.
    #[error("failed to decode image: {0}")]
    Malformed(#[from] image::ImageError),
}

/// Decode raw bytes into an image, sniffing the format from the content.
///
/// The declared filename or URL extension is deliberately ignored; only the
/// bytes decide whether this is a decodable image.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
    let image = image::load_from_memory(bytes)?;
    tracing::debug!(
        width = image.width(),
        height = image.height(),
        "decode_complete"
    );
    Ok(image)
}
