//! On-disk structures of the `.mcraw` container.
//!
//! All integers in the container are little-endian regardless of host. The
//! structs here are serialized field by field rather than by memory copy, so
//! the layout stays fixed on every target.

use crate::byte_order_rw::{ByteOrderReader, ByteOrderWriter};
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive as _, ToPrimitive as _};
use std::io::{self, Read, Write};

/// Identifier at the very start of every container.
pub const CONTAINER_ID: [u8; 4] = *b"MCRW";

/// The only container version this reader accepts.
pub const CONTAINER_VERSION: u32 = 3;

/// Magic number validating the tail [`BufferIndex`].
pub const INDEX_MAGIC_NUMBER: u32 = 0x8A90_5612;

/// Per-frame `compressionType` value for the MotionCam bit-plane codec.
pub const MOTIONCAM_COMPRESSION_TYPE: u32 = 7;

/// Serialized size of [`Item`] in bytes.
pub const ITEM_SIZE: u64 = 8;

/// Serialized size of [`BufferIndex`] in bytes.
pub const BUFFER_INDEX_SIZE: u64 = 16;

/// Tag of every payload record in the container.
#[derive(Debug, Clone, Copy, Eq, PartialEq, FromPrimitive, ToPrimitive)]
pub enum ItemType {
    /// Compressed frame bytes.
    Buffer = 0,
    /// UTF-8 JSON, either container-level (first item) or per-frame.
    Metadata = 1,
    /// The tail-anchored frame index record, once per file.
    BufferIndex = 2,
    /// Offset table for audio items.
    AudioIndex = 3,
    /// Interleaved `i16` PCM samples.
    AudioData = 4,
    /// Timestamp for the preceding [`ItemType::AudioData`]; absent in older files.
    AudioDataMetadata = 5,
}

impl ItemType {
    pub fn code(&self) -> u32 {
        // the discriminants above all fit
        self.to_u32().unwrap()
    }
}

/// Fixed header at file start: identifier plus format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub ident: [u8; 4],
    pub version: u32,
}

impl Header {
    pub fn read_from<R: Read>(reader: &mut ByteOrderReader<R>) -> io::Result<Self> {
        let mut ident = [0u8; 4];
        reader.read_exact(&mut ident)?;
        let version = reader.read_u32()?;
        Ok(Self { ident, version })
    }

    pub fn write_to<W: Write>(&self, writer: &mut ByteOrderWriter<W>) -> io::Result<()> {
        writer.write_all(&self.ident)?;
        writer.write_u32(self.version)
    }
}

/// Tag-length record preceding each payload.
///
/// The type is kept as the raw on-disk code so that unknown tags can be
/// detected without failing the read itself; the trailing-item scan of the
/// reader stops on the first code it does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item {
    pub ty: u32,
    pub size: u32,
}

impl Item {
    pub fn new(ty: ItemType, size: u32) -> Self {
        Self {
            ty: ty.code(),
            size,
        }
    }

    pub fn read_from<R: Read>(reader: &mut ByteOrderReader<R>) -> io::Result<Self> {
        let ty = reader.read_u32()?;
        let size = reader.read_u32()?;
        Ok(Self { ty, size })
    }

    pub fn write_to<W: Write>(&self, writer: &mut ByteOrderWriter<W>) -> io::Result<()> {
        writer.write_u32(self.ty)?;
        writer.write_u32(self.size)
    }

    /// The decoded item type, or `None` for codes this reader does not know.
    pub fn item_type(&self) -> Option<ItemType> {
        ItemType::from_u32(self.ty)
    }
}

/// Locator for a frame or audio chunk: nanosecond timestamp plus absolute
/// file offset of its [`ItemType::Buffer`] / [`ItemType::AudioData`] item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferOffset {
    pub timestamp: i64,
    pub offset: i64,
}

impl BufferOffset {
    pub fn read_from<R: Read>(reader: &mut ByteOrderReader<R>) -> io::Result<Self> {
        let timestamp = reader.read_i64()?;
        let offset = reader.read_i64()?;
        Ok(Self { timestamp, offset })
    }

    pub fn write_to<W: Write>(&self, writer: &mut ByteOrderWriter<W>) -> io::Result<()> {
        writer.write_i64(self.timestamp)?;
        writer.write_i64(self.offset)
    }
}

/// Tail index record, found `BUFFER_INDEX_SIZE + ITEM_SIZE` bytes before EOF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferIndex {
    pub magic_number: u32,
    pub num_offsets: u32,
    pub index_data_offset: i64,
}

impl BufferIndex {
    pub fn read_from<R: Read>(reader: &mut ByteOrderReader<R>) -> io::Result<Self> {
        let magic_number = reader.read_u32()?;
        let num_offsets = reader.read_u32()?;
        let index_data_offset = reader.read_i64()?;
        Ok(Self {
            magic_number,
            num_offsets,
            index_data_offset,
        })
    }

    pub fn write_to<W: Write>(&self, writer: &mut ByteOrderWriter<W>) -> io::Result<()> {
        writer.write_u32(self.magic_number)?;
        writer.write_u32(self.num_offsets)?;
        writer.write_i64(self.index_data_offset)
    }
}

/// Audio index header; its [`BufferOffset`] table follows immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioIndex {
    pub num_offsets: u32,
}

impl AudioIndex {
    pub fn read_from<R: Read>(reader: &mut ByteOrderReader<R>) -> io::Result<Self> {
        let num_offsets = reader.read_u32()?;
        Ok(Self { num_offsets })
    }

    pub fn write_to<W: Write>(&self, writer: &mut ByteOrderWriter<W>) -> io::Result<()> {
        writer.write_u32(self.num_offsets)
    }
}

/// Body of an [`ItemType::AudioDataMetadata`] item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioMetadata {
    pub timestamp_ns: i64,
}

impl AudioMetadata {
    pub fn read_from<R: Read>(reader: &mut ByteOrderReader<R>) -> io::Result<Self> {
        let timestamp_ns = reader.read_i64()?;
        Ok(Self { timestamp_ns })
    }

    pub fn write_to<W: Write>(&self, writer: &mut ByteOrderWriter<W>) -> io::Result<()> {
        writer.write_i64(self.timestamp_ns)
    }
}
