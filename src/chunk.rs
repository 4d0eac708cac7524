//! Chunk decoding interface.
//!
//! The region reader only locates and slices chunk payloads. Turning the
//! bytes into something useful is the job of a [`ChunkRecord`], owned by
//! the caller and filled in by [`RegionFile::load_chunk`](crate::region::RegionFile::load_chunk).

use std::fmt;

use crate::region::ChunkPos;

/// A structure that can be populated from raw (decompressed) NBT bytes.
pub trait ChunkRecord {
    /// Populate `self` from `data`.
    ///
    /// Returns `Ok(false)` when the data parsed but is unusable as a chunk,
    /// and `Err` when the NBT itself is malformed.
    fn read_nbt(&mut self, data: &[u8]) -> anyhow::Result<bool>;
}

/// Outcome of loading a single chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkStatus {
    /// The record was populated.
    Ok,
    /// No chunk is stored in this slot.
    DoesNotExist,
    /// The stored blob is truncated, badly framed or not a chunk.
    Invalid,
    /// The NBT decoder rejected the payload.
    DecodeError { pos: ChunkPos, message: String },
}

impl ChunkStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, ChunkStatus::Ok)
    }
}

impl fmt::Display for ChunkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkStatus::Ok => f.write_str("ok"),
            ChunkStatus::DoesNotExist => f.write_str("does not exist"),
            ChunkStatus::Invalid => f.write_str("invalid"),
            ChunkStatus::DecodeError { pos, message } => {
                write!(f, "unable to read chunk at {}: {}", pos, message)
            }
        }
    }
}
