//! anvil-region-reader: reader for Minecraft Anvil region files (.mca).
//!
//! A [`RegionFile`](region::RegionFile) answers existence and timestamp
//! queries from the region header alone, and decodes single chunks on
//! demand once the whole file is loaded. A broken chunk never spoils the
//! rest of the file: each load reports a [`ChunkStatus`](chunk::ChunkStatus).

pub mod chunk;
pub mod nbt;
pub mod region;

#[cfg(test)]
mod test_util;

pub use chunk::{ChunkRecord, ChunkStatus};
pub use nbt::NbtChunk;
pub use region::{ChunkPos, PayloadMode, RegionFile, RegionPos};
