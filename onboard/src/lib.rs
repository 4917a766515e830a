//! Onboard image processing pipeline.
//!
//! Raw mosaic frames arrive over a named pipe from the instrument
//! electronics unit; each frame is demosaicked, auto-cropped around the
//! Earth's limb, classified for auroral substorm activity, and, on a
//! detection, PNG-encoded, zlib-compressed and written back over the pipe
//! with a length-prefixed framing. A zero length is the no-detection
//! sentinel.

pub mod compress;
pub mod framing;
pub mod pipeline;

pub use framing::{FrameFormat, FrameReader, ResultWriter, READY_BYTE};
pub use pipeline::{FrameOutcome, Pipeline, PipelineConfig};
