//! Downlink compression for detection crops.
//!
//! A crop is PNG-encoded and the PNG stream is then zlib-compressed at best
//! compression, matching the ground segment's decoder. The double encode
//! buys little on most frames but keeps the downlink format identical to
//! the heritage tooling.

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};
use std::io::{Read, Write};
use thiserror::Error;

/// Compression/decompression failures.
#[derive(Debug, Error)]
pub enum CompressError {
    #[error("PNG encode failed: {0}")]
    Png(#[from] image::ImageError),

    #[error("zlib stream error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decompressed payload is not a decodable image")]
    Decode,
}

/// Encode a crop for downlink: PNG, then zlib at best compression.
pub fn compress_crop(crop: &RgbImage) -> Result<Vec<u8>, CompressError> {
    let mut png = Vec::new();
    PngEncoder::new(&mut png).write_image(
        crop.as_raw(),
        crop.width(),
        crop.height(),
        ExtendedColorType::Rgb8,
    )?;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(&png)?;
    Ok(encoder.finish()?)
}

/// Invert [`compress_crop`]; used by tests and the ground tooling.
pub fn decompress_crop(payload: &[u8]) -> Result<RgbImage, CompressError> {
    let mut png = Vec::new();
    ZlibDecoder::new(payload).read_to_end(&mut png)?;

    let image = image::load_from_memory(&png).map_err(|_| CompressError::Decode)?;
    Ok(image.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn test_crop() -> RgbImage {
        RgbImage::from_fn(64, 64, |col, row| {
            Rgb([(col * 4) as u8, (row * 4) as u8, ((col + row) * 2) as u8])
        })
    }

    #[test]
    fn test_roundtrip_preserves_pixels() {
        let crop = test_crop();
        let payload = compress_crop(&crop).unwrap();
        let restored = decompress_crop(&payload).unwrap();

        assert_eq!(restored.dimensions(), crop.dimensions());
        assert_eq!(restored.as_raw(), crop.as_raw());
    }

    #[test]
    fn test_flat_crop_compresses_well() {
        let crop = RgbImage::from_pixel(256, 256, Rgb([30, 30, 30]));
        let payload = compress_crop(&crop).unwrap();

        // 196608 bytes of flat image should shrink by orders of magnitude.
        assert!(payload.len() < 10_000, "payload is {} bytes", payload.len());
    }

    #[test]
    fn test_garbage_payload_is_rejected() {
        assert!(decompress_crop(&[1, 2, 3, 4, 5]).is_err());
    }
}
