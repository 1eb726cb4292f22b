use crate::dng::image::DngImage;
use crate::dng::tags::values;
use crate::dng::writer::DngWriter;
use crate::metadata::{ContainerMetadata, FrameMetadata};
use crate::{McrawError, Result};
use std::io::{Seek, Write};

const DNG_VERSION: [u8; 4] = [1, 4, 0, 0];
const DNG_BACKWARD_VERSION: [u8; 4] = [1, 1, 0, 0];

fn matrix9<'a>(name: &str, matrix: &'a [f32]) -> Result<&'a [f32]> {
    if matrix.len() != 9 {
        return Err(McrawError::format(format!(
            "{name} must hold 9 values, got {}",
            matrix.len()
        )));
    }
    Ok(matrix)
}

/// Assembles the DNG tag set for one decoded frame.
///
/// `pixels` is the `width * height` Bayer mosaic produced by the frame
/// decoder; calibration comes from the container metadata, per-shot values
/// from the frame metadata.
pub fn build_frame_image(
    pixels: &[u16],
    frame: &FrameMetadata,
    container: &ContainerMetadata,
    is_little_endian: bool,
) -> Result<DngImage> {
    let width = frame.width;
    let height = frame.height;
    if pixels.len() != (width as usize) * (height as usize) {
        return Err(McrawError::format(format!(
            "pixel buffer holds {} samples for a {width}x{height} frame",
            pixels.len()
        )));
    }
    if container.black_level.len() != 4 {
        return Err(McrawError::format(format!(
            "black level must hold one value per CFA position, got {}",
            container.black_level.len()
        )));
    }
    if !(0.0..=65535.0).contains(&container.white_level) {
        return Err(McrawError::format(format!(
            "white level {} does not fit a 16-bit sample",
            container.white_level
        )));
    }

    let mut image = DngImage::new(is_little_endian);

    image.set_subfile_type(false, false, false);
    image.set_image_width(width);
    image.set_image_length(height);
    image.set_samples_per_pixel(1)?;
    image.set_bits_per_sample(&[16])?;
    image.set_compression(values::COMPRESSION_NONE)?;
    image.set_photometric(values::PHOTOMETRIC_CFA)?;
    image.set_planar_config(values::PLANAR_CONFIG_CONTIG)?;
    image.set_rows_per_strip(height)?;

    if let Some(orientation) = frame.orientation.or(container.orientation) {
        image.set_orientation(orientation)?;
    }
    if let Some(software) = &container.software {
        image.set_software(software)?;
    }
    image.set_unique_camera_model(container.model.as_deref().unwrap_or("MotionCam"))?;
    image.set_dng_version(DNG_VERSION);
    image.set_dng_backward_version(DNG_BACKWARD_VERSION);

    image.set_cfa_repeat_pattern_dim(2, 2);
    image.set_cfa_pattern(&container.sensor_arrangement.cfa_pattern())?;
    image.set_cfa_layout(values::CFA_LAYOUT_RECTANGULAR);

    image.set_black_level_repeat_dim(2, 2);
    let black: Vec<u16> = container
        .black_level
        .iter()
        .map(|&l| l.round().clamp(0.0, 65535.0) as u16)
        .collect();
    image.set_black_level(&black);
    image.set_white_level(container.white_level.round() as u16);

    image.set_color_matrix1(matrix9("colorMatrix1", &container.color_matrix1)?)?;
    image.set_color_matrix2(matrix9("colorMatrix2", &container.color_matrix2)?)?;
    image.set_forward_matrix1(matrix9("forwardMatrix1", &container.forward_matrix1)?)?;
    image.set_forward_matrix2(matrix9("forwardMatrix2", &container.forward_matrix2)?)?;

    image.set_analog_balance(&[1.0, 1.0, 1.0])?;
    image.set_as_shot_neutral(&frame.as_shot_neutral)?;
    image.set_calibration_illuminant1(values::ILLUMINANT_D65);
    image.set_calibration_illuminant2(values::ILLUMINANT_STANDARD_A);
    image.set_active_area([0, 0, height, width]);

    if let Some(iso) = frame.iso {
        image.set_iso(iso.min(u32::from(u16::MAX)) as u16);
    }
    if let Some(exposure) = frame.exposure_time {
        image.set_exposure_time(exposure as f32)?;
    }

    image.set_image_data(pixels)?;
    Ok(image)
}

/// Writes one decoded frame as a little-endian single-IFD DNG.
pub fn write_frame_dng<W: Write + Seek>(
    writer: W,
    pixels: &[u16],
    frame: &FrameMetadata,
    container: &ContainerMetadata,
) -> Result<()> {
    let image = build_frame_image(pixels, frame, container, true)?;
    DngWriter::write_dng(writer, true, vec![image])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::SensorArrangement;

    fn container() -> ContainerMetadata {
        ContainerMetadata {
            black_level: vec![64.0; 4],
            white_level: 1023.0,
            sensor_arrangement: SensorArrangement::Bggr,
            color_matrix1: identity(),
            color_matrix2: identity(),
            forward_matrix1: identity(),
            forward_matrix2: identity(),
            software: Some("MotionCam 1.0".to_string()),
            orientation: None,
            model: None,
            extra_data: None,
        }
    }

    fn frame() -> FrameMetadata {
        FrameMetadata {
            width: 64,
            height: 4,
            compression_type: 7,
            as_shot_neutral: [0.5, 1.0, 0.5],
            orientation: None,
            iso: Some(400),
            exposure_time: Some(0.01),
        }
    }

    fn identity() -> Vec<f32> {
        vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]
    }

    #[test]
    fn builds_the_full_tag_set() {
        use crate::dng::tags::ifd;

        let pixels = vec![0u16; 64 * 4];
        let image = build_frame_image(&pixels, &frame(), &container(), true).unwrap();

        for tag in [
            ifd::NewSubfileType,
            ifd::ImageWidth,
            ifd::ImageLength,
            ifd::BitsPerSample,
            ifd::Compression,
            ifd::PhotometricInterpretation,
            ifd::StripOffsets,
            ifd::StripByteCounts,
            ifd::SamplesPerPixel,
            ifd::RowsPerStrip,
            ifd::Software,
            ifd::DNGVersion,
            ifd::UniqueCameraModel,
            ifd::CFARepeatPatternDim,
            ifd::CFAPattern,
            ifd::CFALayout,
            ifd::BlackLevel,
            ifd::WhiteLevel,
            ifd::ColorMatrix1,
            ifd::ColorMatrix2,
            ifd::ForwardMatrix1,
            ifd::ForwardMatrix2,
            ifd::AnalogBalance,
            ifd::AsShotNeutral,
            ifd::CalibrationIlluminant1,
            ifd::CalibrationIlluminant2,
            ifd::ActiveArea,
            ifd::IsoSpeedRatings,
            ifd::ExposureTime,
        ] {
            assert!(image.ifd.contains(tag), "missing {tag}");
        }
    }

    #[test]
    fn pixel_count_must_match_dimensions() {
        let pixels = vec![0u16; 10];
        assert!(build_frame_image(&pixels, &frame(), &container(), true).is_err());
    }

    #[test]
    fn black_level_needs_four_entries() {
        let pixels = vec![0u16; 64 * 4];
        let mut bad = container();
        bad.black_level = vec![64.0; 2];
        assert!(build_frame_image(&pixels, &frame(), &bad, true).is_err());
    }

    #[test]
    fn oversized_white_level_is_rejected() {
        let pixels = vec![0u16; 64 * 4];
        let mut bad = container();
        bad.white_level = 70000.0;
        assert!(build_frame_image(&pixels, &frame(), &bad, true).is_err());
    }

    #[test]
    fn truncated_color_matrix_is_rejected() {
        let pixels = vec![0u16; 64 * 4];
        let mut bad = container();
        bad.color_matrix2 = vec![1.0; 6];
        assert!(build_frame_image(&pixels, &frame(), &bad, true).is_err());
    }
}
