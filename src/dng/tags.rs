//! The TIFF/DNG tag vocabulary this writer emits.

use std::fmt::{Display, Formatter};

/// A 2-byte IFD key together with its spec name.
#[derive(Debug, Copy, Clone, Eq)]
pub struct TiffTag {
    pub name: &'static str,
    pub code: u16,
}

impl PartialEq for TiffTag {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Display for TiffTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.name.fmt(f)
    }
}

macro_rules! tags {
    ($($name:ident = $code:expr;)*) => {
        $(
            pub const $name: TiffTag = TiffTag { name: stringify!($name), code: $code };
        )*
    };
}

/// Tags of the baseline-TIFF and DNG namespaces used by this crate.
#[allow(non_upper_case_globals)]
pub mod ifd {
    use super::TiffTag;

    tags! {
        NewSubfileType = 254;
        ImageWidth = 256;
        ImageLength = 257;
        BitsPerSample = 258;
        Compression = 259;
        PhotometricInterpretation = 262;
        ImageDescription = 270;
        StripOffsets = 273;
        Orientation = 274;
        PlanarConfiguration = 284;
        SamplesPerPixel = 277;
        RowsPerStrip = 278;
        StripByteCounts = 279;
        Software = 305;
        SampleFormat = 339;
        CFARepeatPatternDim = 33421;
        CFAPattern = 33422;
        ExposureTime = 33434;
        IsoSpeedRatings = 34855;
        DNGVersion = 50706;
        DNGBackwardVersion = 50707;
        UniqueCameraModel = 50708;
        CFALayout = 50711;
        BlackLevelRepeatDim = 50713;
        BlackLevel = 50714;
        WhiteLevel = 50717;
        ColorMatrix1 = 50721;
        ColorMatrix2 = 50722;
        CameraCalibration1 = 50723;
        CameraCalibration2 = 50724;
        AnalogBalance = 50727;
        AsShotNeutral = 50728;
        AsShotWhiteXY = 50729;
        CalibrationIlluminant1 = 50778;
        CalibrationIlluminant2 = 50779;
        ActiveArea = 50829;
        ForwardMatrix1 = 50964;
        ForwardMatrix2 = 50965;
        TimeCode = 51043;
        FrameRate = 51044;
    }
}

/// Well-known values for the enumerated tags above.
pub mod values {
    pub const COMPRESSION_NONE: u16 = 1;
    pub const PHOTOMETRIC_CFA: u16 = 32803;
    pub const PHOTOMETRIC_LINEAR_RAW: u16 = 34892;
    pub const PLANAR_CONFIG_CONTIG: u16 = 1;
    pub const CFA_LAYOUT_RECTANGULAR: u16 = 1;
    pub const SAMPLE_FORMAT_UINT: u16 = 1;
    pub const ILLUMINANT_D65: u16 = 21;
    pub const ILLUMINANT_STANDARD_A: u16 = 17;
    pub const ORIENTATION_TOP_LEFT: u16 = 1;
}

/// The data-type of an IFD value as encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfdValueType {
    Byte,
    Ascii,
    Short,
    Long,
    Rational,
    SByte,
    Undefined,
    SShort,
    SLong,
    SRational,
    Float,
    Double,
}

impl IfdValueType {
    pub fn from_u16(n: u16) -> Option<Self> {
        match n {
            1 => Some(Self::Byte),
            2 => Some(Self::Ascii),
            3 => Some(Self::Short),
            4 => Some(Self::Long),
            5 => Some(Self::Rational),
            6 => Some(Self::SByte),
            7 => Some(Self::Undefined),
            8 => Some(Self::SShort),
            9 => Some(Self::SLong),
            10 => Some(Self::SRational),
            11 => Some(Self::Float),
            12 => Some(Self::Double),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            Self::Byte => 1,
            Self::Ascii => 2,
            Self::Short => 3,
            Self::Long => 4,
            Self::Rational => 5,
            Self::SByte => 6,
            Self::Undefined => 7,
            Self::SShort => 8,
            Self::SLong => 9,
            Self::SRational => 10,
            Self::Float => 11,
            Self::Double => 12,
        }
    }

    pub fn needed_bytes(&self) -> u32 {
        match self {
            Self::Byte | Self::Ascii | Self::SByte | Self::Undefined => 1,
            Self::Short | Self::SShort => 2,
            Self::Long | Self::SLong | Self::Float => 4,
            Self::Rational | Self::SRational | Self::Double => 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_types_roundtrip() {
        for code in 1..=12 {
            let ty = IfdValueType::from_u16(code).unwrap();
            assert_eq!(ty.as_u16(), code);
        }
        assert_eq!(IfdValueType::from_u16(0), None);
        assert_eq!(IfdValueType::from_u16(13), None);
    }

    #[test]
    fn tag_equality_is_by_code() {
        assert_eq!(ifd::ImageWidth, TiffTag { name: "other", code: 256 });
        assert_ne!(ifd::ImageWidth, ifd::ImageLength);
    }
}
