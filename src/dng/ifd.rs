use crate::dng::tags::{IfdValueType, TiffTag};
use derivative::Derivative;
use std::io;
use std::io::Write;
use std::sync::Arc;

/// An Image File Directory being assembled for writing.
#[derive(Debug, Clone, Default)]
pub struct Ifd {
    pub(crate) entries: Vec<IfdEntry>,
}

impl Ifd {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry, overwriting a previously inserted entry of the same
    /// tag.
    pub fn insert(&mut self, tag: TiffTag, value: impl Into<IfdValue>) {
        self.entries.retain(|e| e.tag != tag);
        self.entries.push(IfdEntry::new(tag, value));
    }

    pub fn contains(&self, tag: TiffTag) -> bool {
        self.entries.iter().any(|e| e.tag == tag)
    }

    pub fn entries(&self) -> &[IfdEntry] {
        &self.entries
    }
}

/// A singular entry in an IFD.
#[derive(Clone, Debug)]
pub struct IfdEntry {
    pub tag: TiffTag,
    pub value: IfdValue,
}

impl IfdEntry {
    pub fn new(tag: TiffTag, value: impl Into<IfdValue>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }
}

/// A singular value in an IFD (that does not know its tag).
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub enum IfdValue {
    Byte(u8),
    Ascii(String),
    Short(u16),
    Long(u32),
    Rational(u32, u32),
    SignedByte(i8),
    Undefined(u8),
    SignedShort(i16),
    SignedLong(i32),
    SignedRational(i32, i32),
    Float(f32),
    Double(f64),

    List(Vec<IfdValue>),

    /// Out-of-line data (the image strip). The contents are written
    /// somewhere in the file and the entry becomes a LONG pointing there;
    /// the corresponding length tag is the caller's responsibility.
    Offsets(#[derivative(Debug = "ignore")] Arc<dyn Offsets + Send + Sync>),
}

impl IfdValue {
    pub fn ifd_value_type(&self) -> IfdValueType {
        match self {
            IfdValue::Byte(_) => IfdValueType::Byte,
            IfdValue::Ascii(_) => IfdValueType::Ascii,
            IfdValue::Short(_) => IfdValueType::Short,
            IfdValue::Long(_) => IfdValueType::Long,
            IfdValue::Rational(_, _) => IfdValueType::Rational,
            IfdValue::SignedByte(_) => IfdValueType::SByte,
            IfdValue::Undefined(_) => IfdValueType::Undefined,
            IfdValue::SignedShort(_) => IfdValueType::SShort,
            IfdValue::SignedLong(_) => IfdValueType::SLong,
            IfdValue::SignedRational(_, _) => IfdValueType::SRational,
            IfdValue::Float(_) => IfdValueType::Float,
            IfdValue::Double(_) => IfdValueType::Double,
            IfdValue::List(list) => list
                .first()
                .map(|v| v.ifd_value_type())
                .unwrap_or(IfdValueType::Undefined),

            // becomes a pointer to the actual data
            IfdValue::Offsets(_) => IfdValueType::Long,
        }
    }

    pub fn count(&self) -> u32 {
        match self {
            IfdValue::List(list) => list.len() as u32,
            IfdValue::Ascii(str) => str.len() as u32 + 1,
            _ => 1,
        }
    }

}

macro_rules! implement_from {
    ($rust_type:ty, $variant:expr) => {
        impl From<$rust_type> for IfdValue {
            fn from(x: $rust_type) -> Self {
                $variant(x)
            }
        }
    };
}

implement_from!(u8, IfdValue::Byte);
implement_from!(String, IfdValue::Ascii);
implement_from!(u16, IfdValue::Short);
implement_from!(u32, IfdValue::Long);
implement_from!(i8, IfdValue::SignedByte);
implement_from!(i16, IfdValue::SignedShort);
implement_from!(i32, IfdValue::SignedLong);
implement_from!(f32, IfdValue::Float);
implement_from!(f64, IfdValue::Double);

impl From<&str> for IfdValue {
    fn from(x: &str) -> Self {
        IfdValue::Ascii(x.to_string())
    }
}

impl<T: Into<IfdValue> + Clone> From<&[T]> for IfdValue {
    fn from(x: &[T]) -> Self {
        IfdValue::List(x.iter().cloned().map(|x| x.into()).collect())
    }
}

impl<T: Into<IfdValue> + Clone, const N: usize> From<[T; N]> for IfdValue {
    fn from(x: [T; N]) -> Self {
        IfdValue::List(x.iter().cloned().map(|x| x.into()).collect())
    }
}

/// Out-of-line payloads referenced by an offset entry.
pub trait Offsets {
    fn size(&self) -> u32;
    fn write(&self, writer: &mut dyn Write) -> io::Result<()>;
}

impl<T: std::ops::Deref<Target = [u8]>> Offsets for T {
    fn size(&self) -> u32 {
        self.len() as u32
    }
    fn write(&self, writer: &mut dyn Write) -> io::Result<()> {
        writer.write_all(self)
    }
}
