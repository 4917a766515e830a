//! Per-frame processing chain and the pipe service loop.
//!
//! One frame flows decode -> auto-crop -> resize -> classify, and on a
//! positive classification the crop is compressed for downlink. A failed
//! limb search or an off-nominal pointing fix suppresses the downlink the
//! same way a negative classification does; the IEU always gets exactly one
//! result per frame.

use crate::compress::{compress_crop, CompressError};
use crate::framing::{decode_frame, FrameError, FrameFormat, FrameReader, ResultWriter};
use serde::{Deserialize, Serialize};
use shared::image_proc::resize_rgb;
use shared::ImageSize;
use std::io::{Read, Write};
use std::time::Instant;
use substorm::autocrop::{auto_crop, CropConfig, CropError, Pointing};
use substorm::classify::{SubstormClassifier, CROP_SIZE};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Static configuration for the processing chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Raw frame layout on the pipe
    pub format: FrameFormat,
    /// Frame dimensions in pixels
    pub size: ImageSize,
    /// Limb search tuning
    pub crop: CropConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            format: FrameFormat::Ieu,
            size: shared::image_size::IEU_FRAME,
            crop: CropConfig::default(),
        }
    }
}

/// Why a frame produced no crop to classify.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CropFailure {
    /// The limb search exhausted its radius range
    NoCircle {
        /// Largest radius window center that was searched
        searched_to: usize,
    },
    /// A disk was found but it crosses a frame border
    Pointing(Pointing),
}

/// Result of processing one frame.
#[derive(Debug, Clone)]
pub enum FrameOutcome {
    /// Positive classification; the payload goes to the downlink
    Detection {
        /// Classifier score
        score: f32,
        /// Compressed crop
        payload: Vec<u8>,
    },
    /// Crop classified below threshold
    NoDetection {
        /// Classifier score
        score: f32,
    },
    /// No usable crop; treated as no detection on the wire
    CropFailed(CropFailure),
}

impl FrameOutcome {
    /// True for outcomes that put a payload on the downlink.
    pub fn is_detection(&self) -> bool {
        matches!(self, FrameOutcome::Detection { .. })
    }
}

/// Hard processing failures. Crop failures are not errors; they are a
/// [`FrameOutcome`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("frame decode failed: {0}")]
    Frame(#[from] FrameError),

    #[error("crop compression failed: {0}")]
    Compress(#[from] CompressError),

    #[error("pipe I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Counters accumulated by [`Pipeline::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Frames read from the pipe
    pub frames: usize,
    /// Frames that produced a downlink payload
    pub detections: usize,
    /// Frames with no usable crop
    pub crop_failures: usize,
}

/// The processing chain, generic over the classifier.
pub struct Pipeline<C> {
    config: PipelineConfig,
    classifier: C,
}

impl<C: SubstormClassifier> Pipeline<C> {
    pub fn new(config: PipelineConfig, classifier: C) -> Self {
        Self { config, classifier }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one raw frame buffer through the chain.
    ///
    /// # Errors
    /// Decode and compression failures; a failed limb search is reported
    /// through the outcome, not as an error.
    pub fn process_frame(&self, raw: &[u8]) -> Result<FrameOutcome, PipelineError> {
        let rgb = decode_frame(raw, self.config.format, self.config.size)?;

        let cropped = match auto_crop(&rgb, &self.config.crop) {
            Ok(result) => result,
            Err(CropError::NoCircleFound { searched_to }) => {
                return Ok(FrameOutcome::CropFailed(CropFailure::NoCircle {
                    searched_to,
                }));
            }
        };
        if !cropped.pointing.is_nominal() {
            return Ok(FrameOutcome::CropFailed(CropFailure::Pointing(
                cropped.pointing,
            )));
        }

        let crop = resize_rgb(&cropped.crop, CROP_SIZE, CROP_SIZE);
        let score = self.classifier.score(&crop);
        if score > self.classifier.threshold() {
            let payload = compress_crop(&crop)?;
            Ok(FrameOutcome::Detection { score, payload })
        } else {
            Ok(FrameOutcome::NoDetection { score })
        }
    }

    /// Service the pipe until the frame stream ends.
    ///
    /// Writes the ready byte, then answers every frame with either a
    /// detection payload or the no-detection sentinel.
    pub fn run<R: Read, W: Write>(
        &self,
        reader: &mut FrameReader<R>,
        writer: &mut ResultWriter<W>,
    ) -> Result<RunStats, PipelineError> {
        writer.ready()?;
        info!(
            format = ?self.config.format,
            size = %self.config.size,
            "Pipeline ready"
        );

        let mut stats = RunStats::default();
        while let Some(raw) = reader.read_frame()? {
            let started = Instant::now();
            let outcome = self.process_frame(&raw)?;
            stats.frames += 1;

            match &outcome {
                FrameOutcome::Detection { score, payload } => {
                    stats.detections += 1;
                    info!(
                        frame = stats.frames,
                        score,
                        bytes = payload.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Substorm detected"
                    );
                    writer.detection(payload)?;
                }
                FrameOutcome::NoDetection { score } => {
                    debug!(
                        frame = stats.frames,
                        score,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "No detection"
                    );
                    writer.no_detection()?;
                }
                FrameOutcome::CropFailed(failure) => {
                    stats.crop_failures += 1;
                    warn!(frame = stats.frames, ?failure, "Crop failed");
                    writer.no_detection()?;
                }
            }
        }

        info!(
            frames = stats.frames,
            detections = stats.detections,
            crop_failures = stats.crop_failures,
            "Frame stream ended"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::decompress_crop;
    use crate::framing::READY_BYTE;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    /// Classifier returning the same score for every crop.
    struct FixedScore(f32);

    impl SubstormClassifier for FixedScore {
        fn score(&self, _crop: &RgbImage) -> f32 {
            self.0
        }
    }

    fn test_config() -> PipelineConfig {
        PipelineConfig {
            format: FrameFormat::Ieu2,
            size: ImageSize::from_width_height(300, 300),
            crop: CropConfig {
                blur_kernel: 5,
                blur_passes: 1,
                starting_radius: 40,
                radius_delta: 10,
                ending_radius: 90,
                starting_votes: 120,
                min_votes: 10,
                min_circles: 1,
                border_pad: 60,
                ..CropConfig::default()
            },
        }
    }

    /// Raw RGB frame bytes with a filled disk at (cx, cy).
    fn disk_frame_bytes(cx: f32, cy: f32, radius: f32) -> Vec<u8> {
        RgbImage::from_fn(300, 300, |col, row| {
            let dx = col as f32 - cx;
            let dy = row as f32 - cy;
            if (dx * dx + dy * dy).sqrt() <= radius {
                Rgb([200, 210, 220])
            } else {
                Rgb([8, 8, 12])
            }
        })
        .into_raw()
    }

    #[test]
    fn test_positive_frame_produces_payload() {
        let pipeline = Pipeline::new(test_config(), FixedScore(0.9));
        let outcome = pipeline
            .process_frame(&disk_frame_bytes(150.0, 150.0, 50.0))
            .unwrap();

        match outcome {
            FrameOutcome::Detection { score, payload } => {
                assert_eq!(score, 0.9);
                let crop = decompress_crop(&payload).unwrap();
                assert_eq!(crop.dimensions(), (CROP_SIZE, CROP_SIZE));
            }
            other => panic!("expected detection, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_frame_produces_no_detection() {
        let pipeline = Pipeline::new(test_config(), FixedScore(0.1));
        let outcome = pipeline
            .process_frame(&disk_frame_bytes(150.0, 150.0, 50.0))
            .unwrap();

        assert!(matches!(
            outcome,
            FrameOutcome::NoDetection { score } if score == 0.1
        ));
    }

    #[test]
    fn test_blank_frame_is_crop_failure() {
        let pipeline = Pipeline::new(test_config(), FixedScore(0.9));
        let raw = vec![10u8; 300 * 300 * 3];
        let outcome = pipeline.process_frame(&raw).unwrap();

        assert!(matches!(
            outcome,
            FrameOutcome::CropFailed(CropFailure::NoCircle { .. })
        ));
    }

    #[test]
    fn test_off_nominal_pointing_suppresses_downlink() {
        let pipeline = Pipeline::new(test_config(), FixedScore(0.9));
        let outcome = pipeline
            .process_frame(&disk_frame_bytes(20.0, 150.0, 50.0))
            .unwrap();

        assert!(matches!(
            outcome,
            FrameOutcome::CropFailed(CropFailure::Pointing(Pointing::TooFarLeft))
        ));
    }

    #[test]
    fn test_wrong_frame_size_is_an_error() {
        let pipeline = Pipeline::new(test_config(), FixedScore(0.9));
        let err = pipeline.process_frame(&[0u8; 100]).unwrap_err();
        assert!(matches!(err, PipelineError::Frame(FrameError::Size { .. })));
    }

    #[test]
    fn test_run_answers_every_frame() {
        let config = test_config();
        let pipeline = Pipeline::new(config, FixedScore(0.9));

        // One good frame, then one blank frame.
        let mut stream = disk_frame_bytes(150.0, 150.0, 50.0);
        stream.extend(vec![10u8; 300 * 300 * 3]);

        let mut reader =
            FrameReader::for_format(Cursor::new(stream), config.format, config.size);
        let mut output = Vec::new();
        let stats = {
            let mut writer = ResultWriter::new(&mut output);
            pipeline.run(&mut reader, &mut writer).unwrap()
        };

        assert_eq!(stats.frames, 2);
        assert_eq!(stats.detections, 1);
        assert_eq!(stats.crop_failures, 1);

        // Ready byte, detection length + payload, then the zero sentinel.
        assert_eq!(output[0], READY_BYTE);
        let length = u32::from_le_bytes(output[1..5].try_into().unwrap()) as usize;
        assert!(length > 0);
        assert_eq!(output.len(), 1 + 4 + length + 4);
        assert_eq!(&output[1 + 4 + length..], &0u32.to_le_bytes());
    }
}
