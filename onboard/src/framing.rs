//! Pipe framing protocol for the IEU integration.
//!
//! The wire format, unchanged from the heritage integration:
//!
//! - The processor announces itself with a single ready byte (21).
//! - The IEU writes raw frames as exactly `frame_bytes` of mosaic (or
//!   interleaved RGB) data; the processor performs fixed-size blocking
//!   reads, so a frame is consumed in one piece even when the pipe delivers
//!   it in fragments.
//! - Results flow back as a little-endian `u32` payload length followed by
//!   the payload. Length 0 is the no-detection sentinel and carries no
//!   payload.

use image::RgbImage;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use shared::ImageSize;
use std::io::{self, Read, Write};
use thiserror::Error;

/// Byte written once at startup to signal readiness.
pub const READY_BYTE: u8 = 21;

/// Raw frame layout on the pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum FrameFormat {
    /// Single-channel BGGR mosaic (the flight camera)
    Ieu,
    /// Interleaved 8-bit RGB, three bytes per pixel
    Ieu2,
}

impl FrameFormat {
    /// Bytes per pixel on the wire.
    pub fn channels(&self) -> usize {
        match self {
            FrameFormat::Ieu => 1,
            FrameFormat::Ieu2 => 3,
        }
    }

    /// Total bytes in one frame of the given dimensions.
    pub fn frame_bytes(&self, size: ImageSize) -> usize {
        size.pixel_count() * self.channels()
    }
}

/// Frame decoding failures.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame buffer has {got} bytes, expected {expected}")]
    Size { expected: usize, got: usize },
}

/// Decode one raw frame buffer into an RGB image.
///
/// Mosaic frames are demosaicked; RGB frames are reinterpreted in place.
pub fn decode_frame(
    bytes: &[u8],
    format: FrameFormat,
    size: ImageSize,
) -> Result<RgbImage, FrameError> {
    let expected = format.frame_bytes(size);
    if bytes.len() != expected {
        return Err(FrameError::Size {
            expected,
            got: bytes.len(),
        });
    }

    match format {
        FrameFormat::Ieu => {
            let mosaic = Array2::from_shape_vec((size.height, size.width), bytes.to_vec())
                .expect("dimensions checked above");
            Ok(shared::image_proc::demosaic_bilinear(&mosaic))
        }
        FrameFormat::Ieu2 => Ok(RgbImage::from_raw(
            size.width as u32,
            size.height as u32,
            bytes.to_vec(),
        )
        .expect("dimensions checked above")),
    }
}

/// Fixed-size blocking frame reads over any byte stream.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    frame_bytes: usize,
}

impl<R: Read> FrameReader<R> {
    /// Wrap a stream, reading `frame_bytes` per frame.
    pub fn new(inner: R, frame_bytes: usize) -> Self {
        Self { inner, frame_bytes }
    }

    /// For the given format and frame dimensions.
    pub fn for_format(inner: R, format: FrameFormat, size: ImageSize) -> Self {
        Self::new(inner, format.frame_bytes(size))
    }

    /// Read exactly one frame, blocking until it is complete.
    ///
    /// A clean end of stream before the first byte returns `Ok(None)`;
    /// end of stream mid-frame is an error, never a truncated frame.
    pub fn read_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut buffer = vec![0u8; self.frame_bytes];

        // Distinguish clean EOF from a torn frame.
        let mut filled = 0usize;
        while filled < buffer.len() {
            match self.inner.read(&mut buffer[filled..]) {
                Ok(0) => {
                    if filled == 0 {
                        return Ok(None);
                    }
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("stream ended {filled} bytes into a frame"),
                    ));
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(Some(buffer))
    }
}

/// Length-prefixed result writes over any byte stream.
#[derive(Debug)]
pub struct ResultWriter<W> {
    inner: W,
}

impl<W: Write> ResultWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Announce readiness with the ready byte.
    pub fn ready(&mut self) -> io::Result<()> {
        self.inner.write_all(&[READY_BYTE])?;
        self.inner.flush()
    }

    /// Write a detection payload: u32 LE length, then the bytes.
    pub fn detection(&mut self, payload: &[u8]) -> io::Result<()> {
        let length = u32::try_from(payload.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "payload exceeds u32"))?;
        self.inner.write_all(&length.to_le_bytes())?;
        self.inner.write_all(payload)?;
        self.inner.flush()
    }

    /// Write the zero-length no-detection sentinel.
    pub fn no_detection(&mut self) -> io::Result<()> {
        self.inner.write_all(&0u32.to_le_bytes())?;
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_frame_bytes() {
        let size = ImageSize::from_width_height(1920, 1200);
        assert_eq!(FrameFormat::Ieu.frame_bytes(size), 2_304_000);
        assert_eq!(FrameFormat::Ieu2.frame_bytes(size), 3 * 2_304_000);
    }

    #[test]
    fn test_read_full_frames() {
        let data: Vec<u8> = (0..20u8).collect();
        let mut reader = FrameReader::new(Cursor::new(data), 10);

        let first = reader.read_frame().unwrap().unwrap();
        assert_eq!(first, (0..10u8).collect::<Vec<_>>());
        let second = reader.read_frame().unwrap().unwrap();
        assert_eq!(second, (10..20u8).collect::<Vec<_>>());
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    fn test_torn_frame_is_an_error() {
        let data = vec![1u8; 7];
        let mut reader = FrameReader::new(Cursor::new(data), 10);

        let err = reader.read_frame().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_result_writer_framing() {
        let mut buffer = Vec::new();
        {
            let mut writer = ResultWriter::new(&mut buffer);
            writer.ready().unwrap();
            writer.detection(&[0xAA, 0xBB, 0xCC]).unwrap();
            writer.no_detection().unwrap();
        }

        assert_eq!(buffer[0], READY_BYTE);
        assert_eq!(&buffer[1..5], &3u32.to_le_bytes());
        assert_eq!(&buffer[5..8], &[0xAA, 0xBB, 0xCC]);
        assert_eq!(&buffer[8..12], &0u32.to_le_bytes());
    }

    #[test]
    fn test_decode_mosaic_frame() {
        let size = ImageSize::from_width_height(8, 6);
        let bytes = vec![50u8; size.pixel_count()];

        let rgb = decode_frame(&bytes, FrameFormat::Ieu, size).unwrap();
        assert_eq!(rgb.dimensions(), (8, 6));
        // Uniform mosaic demosaics to uniform gray
        assert_eq!(rgb.get_pixel(3, 3).0, [50, 50, 50]);
    }

    #[test]
    fn test_decode_rgb_frame() {
        let size = ImageSize::from_width_height(2, 2);
        let bytes = vec![
            10, 20, 30, 40, 50, 60, //
            70, 80, 90, 100, 110, 120,
        ];

        let rgb = decode_frame(&bytes, FrameFormat::Ieu2, size).unwrap();
        assert_eq!(rgb.get_pixel(0, 0).0, [10, 20, 30]);
        assert_eq!(rgb.get_pixel(1, 1).0, [100, 110, 120]);
    }

    #[test]
    fn test_decode_rejects_wrong_size() {
        let size = ImageSize::from_width_height(4, 4);
        let err = decode_frame(&[0u8; 15], FrameFormat::Ieu, size).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Size {
                expected: 16,
                got: 15
            }
        ));
    }
}
