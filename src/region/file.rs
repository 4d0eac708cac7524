//! Region file reader.
//!
//! Two ways to load a region:
//! - `load_headers`: only the 8 KiB header, enough for existence and
//!   timestamp queries on many files.
//! - `load_all`: header plus the whole file content, required before
//!   chunks can be decoded.
//!
//! Loads build the new state first and commit it only on success.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use anyhow::Context;

use super::compression::{self, CompressionScheme};
use super::header::{ChunkLocation, HeaderTable};
use super::{CHUNK_PREFIX_SIZE, ChunkPos, RegionPos};
use crate::chunk::{ChunkRecord, ChunkStatus};

/// What to do with chunk payloads between slicing and NBT decoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PayloadMode {
    /// Undo the compression named by the scheme byte.
    #[default]
    Decompress,
    /// Hand the stored bytes to the decoder untouched.
    Raw,
}

pub struct RegionFile {
    filename: PathBuf,
    pos: RegionPos,
    header: HeaderTable,
    data: Option<Vec<u8>>,
    payload_mode: PayloadMode,
}

impl RegionFile {
    /// Create a reader for `filename`. Does not touch the disk.
    ///
    /// Fails if the name is not of the form `r.<x>.<z>.<ext>`.
    pub fn open(filename: impl AsRef<Path>) -> anyhow::Result<Self> {
        let filename = filename.as_ref().to_path_buf();
        let pos = RegionPos::from_filename(&filename)?;
        Ok(Self {
            filename,
            pos,
            header: HeaderTable::default(),
            data: None,
            payload_mode: PayloadMode::default(),
        })
    }

    pub fn with_payload_mode(mut self, mode: PayloadMode) -> Self {
        self.payload_mode = mode;
        self
    }

    /// Read only the header tables.
    ///
    /// Any previously loaded content is dropped so that offsets and content
    /// always come from the same read.
    pub fn load_headers(&mut self) -> anyhow::Result<()> {
        let file = File::open(&self.filename)
            .with_context(|| format!("Failed to open region file {:?}", self.filename))?;
        let header = HeaderTable::read(&mut BufReader::new(file), self.pos)
            .with_context(|| format!("Failed to read region header of {:?}", self.filename))?;

        log::debug!(
            "Region {}: loaded header, {} chunks present",
            self.pos,
            header.present().len()
        );
        self.header = header;
        self.data = None;
        Ok(())
    }

    /// Read the header tables and the complete file content.
    pub fn load_all(&mut self) -> anyhow::Result<()> {
        let mut file = File::open(&self.filename)
            .with_context(|| format!("Failed to open region file {:?}", self.filename))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .with_context(|| format!("Failed to read region file {:?}", self.filename))?;
        let header = HeaderTable::read(&mut Cursor::new(&data), self.pos)
            .with_context(|| format!("Failed to read region header of {:?}", self.filename))?;

        log::debug!(
            "Region {}: loaded {} bytes, {} chunks present",
            self.pos,
            data.len(),
            header.present().len()
        );
        self.header = header;
        self.data = Some(data);
        Ok(())
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    pub fn position(&self) -> RegionPos {
        self.pos
    }

    pub fn payload_mode(&self) -> PayloadMode {
        self.payload_mode
    }

    /// Whether the file content is in memory (`load_all` succeeded).
    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }

    pub fn present_chunks(&self) -> &BTreeSet<ChunkPos> {
        self.header.present()
    }

    pub fn chunk_count(&self) -> usize {
        self.header.present().len()
    }

    /// The chunk is looked up by its local coordinates, so any position
    /// with the same position modulo 32 hits the same slot.
    pub fn has_chunk(&self, pos: ChunkPos) -> bool {
        self.header.has_chunk(pos)
    }

    /// Last modification time of a chunk. 0 for chunks that do not exist.
    pub fn chunk_timestamp(&self, pos: ChunkPos) -> u32 {
        self.header.timestamp(pos)
    }

    pub fn chunk_location(&self, pos: ChunkPos) -> Option<ChunkLocation> {
        self.header.location(pos)
    }

    /// Decode a chunk into `record`.
    ///
    /// Requires `load_all`. Failures are reported through the status and
    /// only ever affect this one chunk.
    pub fn load_chunk<C: ChunkRecord>(&self, pos: ChunkPos, record: &mut C) -> ChunkStatus {
        if !self.has_chunk(pos) {
            return ChunkStatus::DoesNotExist;
        }

        let Some((scheme_id, stored)) = self.chunk_payload(self.header.offset(pos)) else {
            log::warn!("Region {}: chunk {} exceeds the file bounds", self.pos, pos);
            return ChunkStatus::Invalid;
        };

        let payload = match self.payload_mode {
            PayloadMode::Raw => std::borrow::Cow::Borrowed(stored),
            PayloadMode::Decompress => {
                let Some(scheme) = CompressionScheme::from_id(scheme_id) else {
                    log::warn!("Region {}: chunk {} has unknown compression {}", self.pos, pos, scheme_id);
                    return ChunkStatus::Invalid;
                };
                match compression::decompress(scheme, stored) {
                    Ok(payload) => payload,
                    Err(e) => {
                        log::warn!("Region {}: chunk {}: {:#}", self.pos, pos, e);
                        return ChunkStatus::Invalid;
                    }
                }
            }
        };

        match record.read_nbt(&payload) {
            Ok(true) => ChunkStatus::Ok,
            Ok(false) => {
                log::warn!("Region {}: chunk {} is not a valid chunk", self.pos, pos);
                ChunkStatus::Invalid
            }
            Err(e) => {
                log::warn!("Region {}: unable to read chunk at {}: {:#}", self.pos, pos, e);
                ChunkStatus::DecodeError { pos, message: format!("{:#}", e) }
            }
        }
    }

    /// Locate the blob at `offset`: [length:4][type:1][data:length-1].
    /// Returns the scheme id and the data, or None if the framing does not
    /// fit in the loaded content.
    fn chunk_payload(&self, offset: u64) -> Option<(u8, &[u8])> {
        let data = self.data.as_deref()?;
        let start = usize::try_from(offset).ok()?;
        let len_end = start.checked_add(4)?;
        let len_bytes = data.get(start..len_end)?;
        let declared = u32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;

        // The declared length covers the scheme byte.
        if declared == 0 {
            return None;
        }
        let end = len_end.checked_add(declared)?;
        let scheme = *data.get(len_end)?;
        let payload = data.get(start + CHUNK_PREFIX_SIZE..end)?;
        Some((scheme, payload))
    }
}
