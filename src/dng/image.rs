use crate::dng::ifd::{Ifd, IfdValue};
use crate::dng::rational::{to_rational, to_srational};
use crate::dng::tags::{ifd, values};
use crate::{McrawError, Result};
use std::sync::Arc;

/// One image being assembled for a DNG file: a bag of IFD entries plus the
/// strip data, with the call-order and range checks the tag set requires.
///
/// `set_samples_per_pixel` must be called before `set_bits_per_sample`,
/// `set_black_level_rational`, `set_white_level_rational` and
/// `set_sample_format`; those tags are per-sample and the builder refuses to
/// guess the sample count.
#[derive(Debug, Clone)]
pub struct DngImage {
    pub(crate) ifd: Ifd,
    pub(crate) is_little_endian: bool,
    samples_per_pixel: u16,
    bits_per_sample: Vec<u16>,
    pub(crate) strip_len: Option<u32>,
}

impl DngImage {
    /// Creates an image that will serialize its samples with the given
    /// endianness. The writer rejects images whose endianness differs from
    /// the file's.
    pub fn new(is_little_endian: bool) -> Self {
        Self {
            ifd: Ifd::new(),
            is_little_endian,
            samples_per_pixel: 0,
            bits_per_sample: Vec::new(),
            strip_len: None,
        }
    }

    fn require_samples_per_pixel(&self, count: usize, caller: &str) -> Result<()> {
        if self.samples_per_pixel == 0 {
            return Err(McrawError::format(format!(
                "set_samples_per_pixel must be called before {caller}"
            )));
        }
        if count != usize::from(self.samples_per_pixel) {
            return Err(McrawError::format(format!(
                "{caller} got {count} values for {} samples per pixel",
                self.samples_per_pixel
            )));
        }
        Ok(())
    }

    fn srational_list(values: &[f32]) -> Result<IfdValue> {
        let list = values
            .iter()
            .map(|&v| {
                let (n, d) = to_srational(v);
                if d == 0 && n == 0 {
                    return Err(McrawError::format("rational value is not a number"));
                }
                Ok(IfdValue::SignedRational(n, d))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(IfdValue::List(list))
    }

    fn rational_list(values: &[f32]) -> Result<IfdValue> {
        let list = values
            .iter()
            .map(|&v| {
                let (n, d) = to_rational(v);
                if d == 0 && n == 0 {
                    return Err(McrawError::format("rational value is not a number"));
                }
                Ok(IfdValue::Rational(n, d))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(IfdValue::List(list))
    }

    fn ascii(&mut self, tag: crate::dng::tags::TiffTag, text: &str, max_len: usize) -> Result<()> {
        if text.is_empty() {
            return Err(McrawError::format(format!("{tag} must not be empty")));
        }
        if text.len() + 1 > max_len {
            return Err(McrawError::format(format!("{tag} is too long")));
        }
        self.ifd.insert(tag, text);
        Ok(())
    }

    pub fn set_subfile_type(&mut self, reduced_image: bool, page: bool, mask: bool) {
        let mut bits = 0u32;
        if reduced_image {
            bits |= 1;
        }
        if page {
            bits |= 2;
        }
        if mask {
            bits |= 4;
        }
        self.ifd.insert(ifd::NewSubfileType, bits);
    }

    pub fn set_image_width(&mut self, value: u32) {
        self.ifd.insert(ifd::ImageWidth, value);
    }

    pub fn set_image_length(&mut self, value: u32) {
        self.ifd.insert(ifd::ImageLength, value);
    }

    pub fn set_rows_per_strip(&mut self, value: u32) -> Result<()> {
        if value == 0 {
            return Err(McrawError::format("rows per strip must be positive"));
        }
        self.ifd.insert(ifd::RowsPerStrip, value);
        Ok(())
    }

    pub fn set_samples_per_pixel(&mut self, value: u16) -> Result<()> {
        if value == 0 || value > 4 {
            return Err(McrawError::format(format!(
                "samples per pixel must be between 1 and 4, got {value}"
            )));
        }
        self.samples_per_pixel = value;
        self.ifd.insert(ifd::SamplesPerPixel, value);
        Ok(())
    }

    pub fn set_bits_per_sample(&mut self, bits: &[u16]) -> Result<()> {
        self.require_samples_per_pixel(bits.len(), "set_bits_per_sample")?;
        if bits.iter().any(|&b| b == 0 || b != bits[0]) {
            return Err(McrawError::format(
                "bits per sample must be positive and uniform",
            ));
        }
        self.bits_per_sample = bits.to_vec();
        self.ifd.insert(ifd::BitsPerSample, bits);
        Ok(())
    }

    pub fn set_photometric(&mut self, value: u16) -> Result<()> {
        match value {
            0 | 1 | 2 | values::PHOTOMETRIC_CFA | values::PHOTOMETRIC_LINEAR_RAW => {
                self.ifd.insert(ifd::PhotometricInterpretation, value);
                Ok(())
            }
            _ => Err(McrawError::format(format!(
                "unsupported photometric interpretation {value}"
            ))),
        }
    }

    pub fn set_planar_config(&mut self, value: u16) -> Result<()> {
        if value != 1 && value != 2 {
            return Err(McrawError::format(format!(
                "unsupported planar configuration {value}"
            )));
        }
        self.ifd.insert(ifd::PlanarConfiguration, value);
        Ok(())
    }

    pub fn set_compression(&mut self, value: u16) -> Result<()> {
        if value != values::COMPRESSION_NONE {
            return Err(McrawError::format(format!(
                "unsupported compression {value}"
            )));
        }
        self.ifd.insert(ifd::Compression, value);
        Ok(())
    }

    pub fn set_sample_format(&mut self, formats: &[u16]) -> Result<()> {
        self.require_samples_per_pixel(formats.len(), "set_sample_format")?;
        if formats.iter().any(|&f| !(1..=3).contains(&f)) {
            return Err(McrawError::format("invalid sample format"));
        }
        self.ifd.insert(ifd::SampleFormat, formats);
        Ok(())
    }

    pub fn set_orientation(&mut self, value: u16) -> Result<()> {
        if !(1..=8).contains(&value) {
            return Err(McrawError::format(format!("invalid orientation {value}")));
        }
        self.ifd.insert(ifd::Orientation, value);
        Ok(())
    }

    pub fn set_image_description(&mut self, text: &str) -> Result<()> {
        self.ascii(ifd::ImageDescription, text, 1024 * 1024)
    }

    pub fn set_unique_camera_model(&mut self, text: &str) -> Result<()> {
        self.ascii(ifd::UniqueCameraModel, text, 1024 * 1024)
    }

    pub fn set_software(&mut self, text: &str) -> Result<()> {
        self.ascii(ifd::Software, text, 4096)
    }

    pub fn set_active_area(&mut self, area: [u32; 4]) {
        self.ifd.insert(ifd::ActiveArea, area);
    }

    pub fn set_dng_version(&mut self, version: [u8; 4]) {
        self.ifd.insert(ifd::DNGVersion, version);
    }

    pub fn set_dng_backward_version(&mut self, version: [u8; 4]) {
        self.ifd.insert(ifd::DNGBackwardVersion, version);
    }

    pub fn set_black_level(&mut self, levels: &[u16]) {
        self.ifd.insert(ifd::BlackLevel, levels);
    }

    pub fn set_black_level_rational(&mut self, levels: &[f32]) -> Result<()> {
        self.require_samples_per_pixel(levels.len(), "set_black_level_rational")?;
        let value = Self::rational_list(levels)?;
        self.ifd.insert(ifd::BlackLevel, value);
        Ok(())
    }

    pub fn set_white_level(&mut self, level: u16) {
        self.ifd.insert(ifd::WhiteLevel, level);
    }

    pub fn set_white_level_rational(&mut self, levels: &[f32]) -> Result<()> {
        self.require_samples_per_pixel(levels.len(), "set_white_level_rational")?;
        let value = Self::rational_list(levels)?;
        self.ifd.insert(ifd::WhiteLevel, value);
        Ok(())
    }

    pub fn set_cfa_repeat_pattern_dim(&mut self, width: u16, height: u16) {
        self.ifd.insert(ifd::CFARepeatPatternDim, [width, height]);
    }

    pub fn set_black_level_repeat_dim(&mut self, width: u16, height: u16) {
        self.ifd.insert(ifd::BlackLevelRepeatDim, [width, height]);
    }

    pub fn set_cfa_pattern(&mut self, pattern: &[u8]) -> Result<()> {
        if pattern.is_empty() {
            return Err(McrawError::format("CFA pattern must not be empty"));
        }
        self.ifd.insert(ifd::CFAPattern, pattern);
        Ok(())
    }

    pub fn set_cfa_layout(&mut self, value: u16) {
        self.ifd.insert(ifd::CFALayout, value);
    }

    pub fn set_calibration_illuminant1(&mut self, value: u16) {
        self.ifd.insert(ifd::CalibrationIlluminant1, value);
    }

    pub fn set_calibration_illuminant2(&mut self, value: u16) {
        self.ifd.insert(ifd::CalibrationIlluminant2, value);
    }

    /// XYZ-to-camera matrix under illuminant 1, `3 * plane_count` values.
    pub fn set_color_matrix1(&mut self, matrix: &[f32]) -> Result<()> {
        let value = Self::srational_list(matrix)?;
        self.ifd.insert(ifd::ColorMatrix1, value);
        Ok(())
    }

    pub fn set_color_matrix2(&mut self, matrix: &[f32]) -> Result<()> {
        let value = Self::srational_list(matrix)?;
        self.ifd.insert(ifd::ColorMatrix2, value);
        Ok(())
    }

    pub fn set_forward_matrix1(&mut self, matrix: &[f32]) -> Result<()> {
        let value = Self::srational_list(matrix)?;
        self.ifd.insert(ifd::ForwardMatrix1, value);
        Ok(())
    }

    pub fn set_forward_matrix2(&mut self, matrix: &[f32]) -> Result<()> {
        let value = Self::srational_list(matrix)?;
        self.ifd.insert(ifd::ForwardMatrix2, value);
        Ok(())
    }

    /// Camera calibration matrix, `plane_count * plane_count` values.
    pub fn set_camera_calibration1(&mut self, matrix: &[f32]) -> Result<()> {
        let value = Self::srational_list(matrix)?;
        self.ifd.insert(ifd::CameraCalibration1, value);
        Ok(())
    }

    pub fn set_camera_calibration2(&mut self, matrix: &[f32]) -> Result<()> {
        let value = Self::srational_list(matrix)?;
        self.ifd.insert(ifd::CameraCalibration2, value);
        Ok(())
    }

    pub fn set_analog_balance(&mut self, balance: &[f32]) -> Result<()> {
        let value = Self::rational_list(balance)?;
        self.ifd.insert(ifd::AnalogBalance, value);
        Ok(())
    }

    pub fn set_as_shot_neutral(&mut self, neutral: &[f32]) -> Result<()> {
        let value = Self::rational_list(neutral)?;
        self.ifd.insert(ifd::AsShotNeutral, value);
        Ok(())
    }

    pub fn set_as_shot_white_xy(&mut self, x: f32, y: f32) -> Result<()> {
        let value = Self::rational_list(&[x, y])?;
        self.ifd.insert(ifd::AsShotWhiteXY, value);
        Ok(())
    }

    pub fn set_exposure_time(&mut self, seconds: f32) -> Result<()> {
        let value = Self::rational_list(&[seconds])?;
        self.ifd.insert(ifd::ExposureTime, value);
        Ok(())
    }

    pub fn set_iso(&mut self, iso: u16) {
        self.ifd.insert(ifd::IsoSpeedRatings, iso);
    }

    pub fn set_frame_rate(&mut self, fps: f32) -> Result<()> {
        let value = Self::rational_list(&[fps])?;
        self.ifd.insert(ifd::FrameRate, value);
        Ok(())
    }

    pub fn set_time_code(&mut self, timecode: [u8; 8]) {
        self.ifd.insert(ifd::TimeCode, timecode);
    }

    /// Checks that an image carrying strip data also carries the tags a raw
    /// processor needs to interpret it. Called by the writer before emission.
    pub(crate) fn validate_for_write(&self) -> Result<()> {
        if self.ifd.entries().is_empty() {
            return Err(McrawError::format("image has no tags"));
        }
        if self.strip_len.is_some() {
            if self.samples_per_pixel == 0 {
                return Err(McrawError::format("samples per pixel is not set"));
            }
            if self.bits_per_sample.is_empty() {
                return Err(McrawError::format("bits per sample is not set"));
            }
        }
        Ok(())
    }

    /// Stores the image strip. Samples are serialized in the endianness the
    /// image was created with; the strip byte count is set alongside, and
    /// the strip offset is resolved when the file is written.
    pub fn set_image_data(&mut self, samples: &[u16]) -> Result<()> {
        if samples.is_empty() {
            return Err(McrawError::format("image data must not be empty"));
        }

        let mut bytes = Vec::with_capacity(samples.len() * 2);
        for &sample in samples {
            if self.is_little_endian {
                bytes.extend_from_slice(&sample.to_le_bytes());
            } else {
                bytes.extend_from_slice(&sample.to_be_bytes());
            }
        }

        self.strip_len = Some(bytes.len() as u32);
        self.ifd.insert(ifd::StripByteCounts, bytes.len() as u32);
        self.ifd
            .insert(ifd::StripOffsets, IfdValue::Offsets(Arc::new(bytes)));
        Ok(())
    }
}
