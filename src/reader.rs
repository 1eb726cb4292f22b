//! Seek-based reader for the `.mcraw` container.
//!
//! Opening a container validates the fixed header, parses the container-level
//! JSON metadata, loads the tail-anchored frame index and scans the trailing
//! records for an audio index. Frames are then addressed by their nanosecond
//! timestamp.

use crate::byte_order_rw::ByteOrderReader;
use crate::format::{
    AudioIndex, AudioMetadata, BufferIndex, BufferOffset, Header, Item, ItemType,
    BUFFER_INDEX_SIZE, CONTAINER_ID, CONTAINER_VERSION, INDEX_MAGIC_NUMBER, ITEM_SIZE,
    MOTIONCAM_COMPRESSION_TYPE,
};
use crate::metadata::{ContainerMetadata, FrameMetadata};
use crate::raw;
use crate::{McrawError, Result};
use derivative::Derivative;
use once_cell::unsync::OnceCell;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, warn};

/// One chunk of interleaved PCM audio.
///
/// `timestamp_ns` is `-1` for chunks written by recorders that predate the
/// audio timestamp record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    pub timestamp_ns: i64,
    pub samples: Vec<i16>,
}

/// Reader over one container. Owns the handle for its lifetime; the index
/// and container metadata are read once at open time and kept immutable.
///
/// `load_frame` and `load_audio` share the handle's seek position, so one
/// reader serves one thread; open several readers for parallel decode.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct McrawReader<R: Read + Seek> {
    #[derivative(Debug = "ignore")]
    reader: ByteOrderReader<R>,
    metadata_json: serde_json::Value,
    metadata: OnceCell<ContainerMetadata>,
    frame_list: Vec<i64>,
    frame_offsets: BTreeMap<i64, BufferOffset>,
    audio_offsets: Vec<BufferOffset>,
}

impl McrawReader<File> {
    /// Opens a container file from a path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(File::open(path)?)
    }
}

impl<R: Read + Seek> McrawReader<R> {
    /// Reads the container structure from an open handle.
    pub fn new(reader: R) -> Result<Self> {
        // container integers are little-endian on every host
        let mut reader = ByteOrderReader::new(reader, true);

        let header = Header::read_from(&mut reader)?;
        if header.version != CONTAINER_VERSION {
            return Err(McrawError::format(format!(
                "invalid container version {}",
                header.version
            )));
        }
        if header.ident != CONTAINER_ID {
            return Err(McrawError::format("invalid header id"));
        }

        let item = Item::read_from(&mut reader)?;
        if item.item_type() != Some(ItemType::Metadata) {
            return Err(McrawError::format("invalid camera metadata"));
        }
        let mut json = vec![0u8; item.size as usize];
        reader.read_exact(&mut json)?;
        let metadata_json: serde_json::Value = serde_json::from_slice(&json)?;

        let mut result = Self {
            reader,
            metadata_json,
            metadata: OnceCell::new(),
            frame_list: Vec::new(),
            frame_offsets: BTreeMap::new(),
            audio_offsets: Vec::new(),
        };

        let offsets = result.read_index()?;
        result.reindex_offsets(offsets);
        result.read_extra()?;

        debug!(
            frames = result.frame_list.len(),
            audio_chunks = result.audio_offsets.len(),
            "opened container"
        );
        Ok(result)
    }

    /// Frame timestamps in ascending order.
    pub fn frames(&self) -> &[i64] {
        &self.frame_list
    }

    /// The container-level metadata as parsed JSON.
    pub fn metadata_json(&self) -> &serde_json::Value {
        &self.metadata_json
    }

    /// The container-level metadata as its typed mirror.
    ///
    /// Parsed on first use; a container missing one of the required
    /// calibration keys opens fine but fails here.
    pub fn metadata(&self) -> Result<&ContainerMetadata> {
        if let Some(parsed) = self.metadata.get() {
            return Ok(parsed);
        }
        let parsed: ContainerMetadata = serde_json::from_value(self.metadata_json.clone())?;
        Ok(self.metadata.get_or_init(|| parsed))
    }

    pub fn audio_sample_rate_hz(&self) -> Option<u32> {
        self.metadata_json
            .pointer("/extraData/audioSampleRate")?
            .as_u64()
            .map(|v| v as u32)
    }

    pub fn num_audio_channels(&self) -> Option<u32> {
        self.metadata_json
            .pointer("/extraData/audioChannels")?
            .as_u64()
            .map(|v| v as u32)
    }

    /// Loads and decompresses the frame with the given timestamp.
    pub fn load_frame(&mut self, timestamp: i64) -> Result<(Vec<u16>, FrameMetadata)> {
        let offset = self
            .frame_offsets
            .get(&timestamp)
            .ok_or_else(|| {
                McrawError::format(format!("frame not found (timestamp: {timestamp})"))
            })?
            .offset;

        self.reader.seek(SeekFrom::Start(offset as u64))?;

        let buffer_item = Item::read_from(&mut self.reader)?;
        if buffer_item.item_type() != Some(ItemType::Buffer) {
            return Err(McrawError::format("invalid buffer type"));
        }
        let mut compressed = vec![0u8; buffer_item.size as usize];
        self.reader.read_exact(&mut compressed)?;

        let metadata_item = Item::read_from(&mut self.reader)?;
        if metadata_item.item_type() != Some(ItemType::Metadata) {
            return Err(McrawError::format("invalid metadata"));
        }
        let mut json = vec![0u8; metadata_item.size as usize];
        self.reader.read_exact(&mut json)?;
        let frame_metadata: FrameMetadata = serde_json::from_slice(&json)?;

        if frame_metadata.compression_type != MOTIONCAM_COMPRESSION_TYPE {
            return Err(McrawError::format(format!(
                "invalid compression type {}",
                frame_metadata.compression_type
            )));
        }

        debug!(timestamp, size = compressed.len(), "loading frame");
        let pixels = raw::decode(
            &compressed,
            frame_metadata.width as usize,
            frame_metadata.height as usize,
        )
        .map_err(|e| McrawError::format(format!("failed to uncompress frame: {e}")))?;

        Ok((pixels, frame_metadata))
    }

    /// Loads every audio chunk listed in the audio index, in index order.
    pub fn load_audio(&mut self) -> Result<Vec<AudioChunk>> {
        let offsets = self.audio_offsets.clone();
        let mut chunks = Vec::with_capacity(offsets.len());

        for entry in offsets {
            self.reader.seek(SeekFrom::Start(entry.offset as u64))?;

            let audio_item = Item::read_from(&mut self.reader)?;
            if audio_item.item_type() != Some(ItemType::AudioData) {
                return Err(McrawError::format("invalid audio data"));
            }

            let mut bytes = vec![0u8; audio_item.size as usize];
            self.reader.read_exact(&mut bytes)?;
            let mut samples = Vec::with_capacity((bytes.len() + 1) / 2);
            let mut pairs = bytes.chunks_exact(2);
            for pair in &mut pairs {
                samples.push(i16::from_le_bytes([pair[0], pair[1]]));
            }
            if let [last] = pairs.remainder() {
                samples.push(i16::from_le_bytes([*last, 0]));
            }

            // The timestamp record was added later; chunks are addressed
            // through the index, so a failed speculative read needs no rewind.
            let mut timestamp_ns = -1;
            if let Ok(item) = Item::read_from(&mut self.reader) {
                if item.item_type() == Some(ItemType::AudioDataMetadata) {
                    timestamp_ns = AudioMetadata::read_from(&mut self.reader)?.timestamp_ns;
                } else {
                    warn!(offset = entry.offset, "audio chunk without timestamp");
                }
            }

            chunks.push(AudioChunk {
                timestamp_ns,
                samples,
            });
        }

        Ok(chunks)
    }

    /// Reads the tail-anchored index: an [`ItemType::BufferIndex`] item and
    /// its [`BufferIndex`] body sit at a fixed distance from EOF, pointing
    /// at the offset table.
    fn read_index(&mut self) -> Result<Vec<BufferOffset>> {
        let tail = (BUFFER_INDEX_SIZE + ITEM_SIZE) as i64;
        self.reader
            .seek(SeekFrom::End(-tail))
            .map_err(|_| McrawError::format("invalid end chunk"))?;

        let item = Item::read_from(&mut self.reader)?;
        if item.item_type() != Some(ItemType::BufferIndex) {
            return Err(McrawError::format("invalid end chunk"));
        }

        let index = BufferIndex::read_from(&mut self.reader)?;
        if index.magic_number != INDEX_MAGIC_NUMBER {
            return Err(McrawError::format("corrupted index"));
        }

        self.reader
            .seek(SeekFrom::Start(index.index_data_offset as u64))
            .map_err(|_| McrawError::format("invalid index"))?;

        let mut offsets = Vec::with_capacity(index.num_offsets as usize);
        for _ in 0..index.num_offsets {
            offsets.push(BufferOffset::read_from(&mut self.reader)?);
        }
        Ok(offsets)
    }

    /// Orders the index by timestamp and publishes the frame list and the
    /// timestamp-to-offset map. The sort is stable, and later entries of a
    /// duplicated timestamp replace earlier ones.
    fn reindex_offsets(&mut self, mut offsets: Vec<BufferOffset>) {
        offsets.sort_by_key(|o| o.timestamp);

        self.frame_list.clear();
        self.frame_offsets.clear();
        for entry in offsets {
            self.frame_list.push(entry.timestamp);
            self.frame_offsets.insert(entry.timestamp, entry);
        }
    }

    /// Scans the records after the highest-addressed frame for an audio
    /// index. Known record types are skipped by size; anything else ends the
    /// scan (the tail index data follows the last record).
    fn read_extra(&mut self) -> Result<()> {
        let Some(start) = self.frame_offsets.values().map(|o| o.offset).max() else {
            return Ok(());
        };
        if self.reader.seek(SeekFrom::Start(start as u64)).is_err() {
            return Ok(());
        }

        loop {
            let Ok(item) = Item::read_from(&mut self.reader) else {
                break;
            };
            match item.item_type() {
                Some(
                    ItemType::Buffer
                    | ItemType::Metadata
                    | ItemType::AudioData
                    | ItemType::AudioDataMetadata,
                ) => {
                    if self
                        .reader
                        .seek(SeekFrom::Current(i64::from(item.size)))
                        .is_err()
                    {
                        break;
                    }
                }
                Some(ItemType::AudioIndex) => {
                    let index = AudioIndex::read_from(&mut self.reader)?;
                    self.audio_offsets.clear();
                    for _ in 0..index.num_offsets {
                        self.audio_offsets
                            .push(BufferOffset::read_from(&mut self.reader)?);
                    }
                    debug!(chunks = self.audio_offsets.len(), "read audio index");
                }
                Some(ItemType::BufferIndex) | None => break,
            }
        }

        Ok(())
    }
}
