//! Typed mirrors of the JSON metadata carried by the container.
//!
//! The container exposes two JSON documents: one container-level document
//! written at the start of the file (camera calibration) and one per frame.
//! Consumers depend on a fixed set of keys; those are parsed into the structs
//! below. Required keys missing from the JSON fail the parse, optional keys
//! fall back to defaults.

use serde::{Deserialize, Serialize};

/// Order of the 2x2 color-filter-array tile on the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(from = "String", into = "&'static str")]
pub enum SensorArrangement {
    #[default]
    Rggb,
    Bggr,
    Grbg,
    Gbrg,
}

impl From<String> for SensorArrangement {
    /// Anything other than the four documented strings maps to `rggb`.
    fn from(s: String) -> Self {
        match s.as_str() {
            "bggr" => Self::Bggr,
            "grbg" => Self::Grbg,
            "gbrg" => Self::Gbrg,
            _ => Self::Rggb,
        }
    }
}

impl From<SensorArrangement> for &'static str {
    fn from(s: SensorArrangement) -> Self {
        match s {
            SensorArrangement::Rggb => "rggb",
            SensorArrangement::Bggr => "bggr",
            SensorArrangement::Grbg => "grbg",
            SensorArrangement::Gbrg => "gbrg",
        }
    }
}

impl SensorArrangement {
    /// DNG CFAPattern bytes (0 = red, 1 = green, 2 = blue), left-to-right,
    /// top-to-bottom.
    pub fn cfa_pattern(&self) -> [u8; 4] {
        match self {
            Self::Rggb => [0, 1, 1, 2],
            Self::Bggr => [2, 1, 1, 0],
            Self::Grbg => [1, 0, 2, 1],
            Self::Gbrg => [1, 2, 0, 1],
        }
    }
}

/// Audio parameters stored under the container's `extraData` key.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct ExtraData {
    #[serde(rename = "audioSampleRate", default)]
    pub audio_sample_rate: u32,
    #[serde(rename = "audioChannels", default)]
    pub audio_channels: u32,
}

/// Container-level camera calibration metadata.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerMetadata {
    /// One value per CFA position of the 2x2 pattern.
    pub black_level: Vec<f32>,
    pub white_level: f32,
    // the key is misspelled in the on-disk format
    #[serde(rename = "sensorArrangment", default)]
    pub sensor_arrangement: SensorArrangement,
    /// Row-major 3x3, XYZ to camera space under illuminant 1.
    pub color_matrix1: Vec<f32>,
    /// Row-major 3x3, XYZ to camera space under illuminant 2.
    pub color_matrix2: Vec<f32>,
    pub forward_matrix1: Vec<f32>,
    pub forward_matrix2: Vec<f32>,
    #[serde(default)]
    pub software: Option<String>,
    #[serde(default)]
    pub orientation: Option<u16>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub extra_data: Option<ExtraData>,
}

/// Per-frame metadata, attached right after each frame's compressed buffer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameMetadata {
    pub width: u32,
    pub height: u32,
    pub compression_type: u32,
    pub as_shot_neutral: [f32; 3],
    #[serde(default)]
    pub orientation: Option<u16>,
    #[serde(default)]
    pub iso: Option<u32>,
    #[serde(default)]
    pub exposure_time: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_arrangement_defaults_to_rggb() {
        for (input, expected) in [
            ("\"rggb\"", SensorArrangement::Rggb),
            ("\"bggr\"", SensorArrangement::Bggr),
            ("\"grbg\"", SensorArrangement::Grbg),
            ("\"gbrg\"", SensorArrangement::Gbrg),
            ("\"ryyb\"", SensorArrangement::Rggb),
            ("\"\"", SensorArrangement::Rggb),
        ] {
            let parsed: SensorArrangement = serde_json::from_str(input).unwrap();
            assert_eq!(parsed, expected, "for {input}");
        }
    }

    #[test]
    fn cfa_patterns() {
        assert_eq!(SensorArrangement::Rggb.cfa_pattern(), [0, 1, 1, 2]);
        assert_eq!(SensorArrangement::Bggr.cfa_pattern(), [2, 1, 1, 0]);
        assert_eq!(SensorArrangement::Grbg.cfa_pattern(), [1, 0, 2, 1]);
        assert_eq!(SensorArrangement::Gbrg.cfa_pattern(), [1, 2, 0, 1]);
    }

    #[test]
    fn container_metadata_parses() {
        let json = r#"{
            "blackLevel": [64.0, 64.0, 64.0, 64.0],
            "whiteLevel": 1023,
            "sensorArrangment": "bggr",
            "colorMatrix1": [1,0,0, 0,1,0, 0,0,1],
            "colorMatrix2": [1,0,0, 0,1,0, 0,0,1],
            "forwardMatrix1": [1,0,0, 0,1,0, 0,0,1],
            "forwardMatrix2": [1,0,0, 0,1,0, 0,0,1],
            "extraData": { "audioSampleRate": 48000, "audioChannels": 2 }
        }"#;
        let meta: ContainerMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.sensor_arrangement, SensorArrangement::Bggr);
        assert_eq!(meta.white_level, 1023.0);
        assert_eq!(meta.extra_data.unwrap().audio_channels, 2);
        assert!(meta.software.is_none());
    }

    #[test]
    fn container_metadata_requires_black_level() {
        let json = r#"{
            "whiteLevel": 1023,
            "colorMatrix1": [], "colorMatrix2": [],
            "forwardMatrix1": [], "forwardMatrix2": []
        }"#;
        assert!(serde_json::from_str::<ContainerMetadata>(json).is_err());
    }

    #[test]
    fn frame_metadata_parses() {
        let json = r#"{
            "width": 4032, "height": 3024,
            "compressionType": 7,
            "asShotNeutral": [0.45, 1.0, 0.55],
            "iso": 100
        }"#;
        let meta: FrameMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.width, 4032);
        assert_eq!(meta.compression_type, 7);
        assert_eq!(meta.iso, Some(100));
        assert!(meta.exposure_time.is_none());
    }
}
