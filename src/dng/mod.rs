//! DNG emission.
//!
//! [`DngImage`] collects the tag set for one image, [`DngWriter`] streams a
//! chain of them as a TIFF byte stream, and [`write_frame_dng`] assembles a
//! standards-compliant DNG from a decoded frame plus container metadata.

mod frame;
mod ifd;
mod image;
pub mod rational;
pub mod tags;
mod writer;

pub use frame::{build_frame_image, write_frame_dng};
pub use ifd::{Ifd, IfdEntry, IfdValue, Offsets};
pub use image::DngImage;
pub use writer::DngWriter;
