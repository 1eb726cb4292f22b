//! Reader for the MotionCam raw video container (`.mcraw`).
//!
//! A `.mcraw` file stores a sequence of bit-plane-compressed Bayer sensor
//! frames, per-frame JSON metadata, optional interleaved audio and
//! container-level camera calibration metadata. This crate parses the
//! container, decodes frames back into 16-bit-per-sample Bayer mosaics and
//! can emit each frame as a standards-compliant DNG.
//!
//! # Examples
//!
//! ```no_run
//! use mcraw::McrawReader;
//!
//! let mut reader = McrawReader::open("clip.mcraw").expect("couldnt open container");
//! let timestamps = reader.frames().to_vec();
//! for ts in timestamps {
//!     let (pixels, meta) = reader.load_frame(ts).expect("couldnt decode frame");
//!     println!("{ts}: {}x{} ({} samples)", meta.width, meta.height, pixels.len());
//! }
//! ```

pub mod byte_order_rw;
pub mod dng;
pub mod format;
pub mod metadata;
pub mod raw;
pub mod reader;

use std::io;
use thiserror::Error;

pub use metadata::{ContainerMetadata, FrameMetadata, SensorArrangement};
pub use reader::{AudioChunk, McrawReader};

/// The error type produced by every fallible operation in this crate.
///
/// Structural problems (bad magic, unexpected item type, truncated stream,
/// decode failure, malformed writer call sequence) are reported as
/// [`McrawError::Format`] with a human-readable reason.
#[derive(Error, Debug)]
pub enum McrawError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Format(String),
    #[error("metadata error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McrawError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, McrawError>;
