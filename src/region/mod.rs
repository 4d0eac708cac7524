//! Minecraft Anvil region file format (.mca).
//!
//! Region files contain 32x32 chunks in a specific binary format:
//! - Bytes 0-4095: Location table (1024 entries × 4 bytes)
//! - Bytes 4096-8191: Timestamp table (1024 entries × 4 bytes)
//! - Sector aligned chunk data: [length:4][compression:1][data:length-1]

pub mod compression;
mod file;
mod header;

use std::fmt;
use std::path::Path;

use anyhow::{Context, bail};

pub use compression::CompressionScheme;
pub use file::{PayloadMode, RegionFile};
pub use header::{ChunkLocation, HeaderTable};

/// Size of one sector in bytes (4 KB).
pub const SECTOR_SIZE: usize = 4096;

/// Total header size (location table + timestamp table).
pub const HEADER_SIZE: usize = SECTOR_SIZE * 2; // 8192 bytes

/// Number of chunks per region dimension.
pub const REGION_SIZE: i32 = 32;

/// Number of chunk slots in one region.
pub const CHUNKS_PER_REGION: usize = (REGION_SIZE * REGION_SIZE) as usize;

/// Bytes in front of a chunk payload: 4 byte length + 1 byte compression id.
pub const CHUNK_PREFIX_SIZE: usize = 5;

/// Convert chunk coordinates to local region coordinates (0-31).
#[inline]
pub fn chunk_to_local(chunk_coord: i32) -> i32 {
    chunk_coord.rem_euclid(REGION_SIZE)
}

/// Convert chunk coordinates to region coordinates.
#[inline]
pub fn chunk_to_region(chunk_coord: i32) -> i32 {
    chunk_coord.div_euclid(REGION_SIZE)
}

/// Calculate linear index for a chunk within a region (0-1023).
#[inline]
pub fn local_to_index(local_x: i32, local_z: i32) -> usize {
    (local_z * REGION_SIZE + local_x) as usize
}

/// Calculate local coordinates from linear index.
#[inline]
pub fn index_to_local(index: usize) -> (i32, i32) {
    let local_x = (index % REGION_SIZE as usize) as i32;
    let local_z = (index / REGION_SIZE as usize) as i32;
    (local_x, local_z)
}

/// Calculate file offset for a chunk given its sector number.
#[inline]
pub fn sector_to_offset(sector: u32) -> usize {
    sector as usize * SECTOR_SIZE
}

/// Absolute coordinates of a chunk in the world.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn local_x(&self) -> i32 {
        chunk_to_local(self.x)
    }

    pub fn local_z(&self) -> i32 {
        chunk_to_local(self.z)
    }

    /// Slot of this chunk in the header tables of its region.
    pub fn local_index(&self) -> usize {
        local_to_index(self.local_x(), self.local_z())
    }

    /// Region containing this chunk.
    pub fn region(&self) -> RegionPos {
        RegionPos::new(chunk_to_region(self.x), chunk_to_region(self.z))
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.x, self.z)
    }
}

/// Region file coordinates (parsed from filename like "r.0.-1.mca").
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct RegionPos {
    pub x: i32,
    pub z: i32,
}

impl RegionPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Parse region position from a file name or path (e.g., "world/region/r.0.-1.mca").
    ///
    /// Only the final path component is inspected. It must look like
    /// `r.<x>.<z>.<ext>`; anything else is rejected.
    pub fn from_filename(name: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = name.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("No usable file name in {:?}", path))?;

        let parts: Vec<&str> = file_name.split('.').collect();
        if parts.len() != 4 || parts[0] != "r" || parts[3].is_empty() {
            bail!("Not a region file name (expected r.<x>.<z>.<ext>): {}", file_name);
        }

        let x = parts[1]
            .parse()
            .with_context(|| format!("Bad region x coordinate in {}", file_name))?;
        let z = parts[2]
            .parse()
            .with_context(|| format!("Bad region z coordinate in {}", file_name))?;
        Ok(Self { x, z })
    }

    /// Canonical Anvil file name for this region.
    pub fn filename(&self) -> String {
        format!("r.{}.{}.mca", self.x, self.z)
    }

    /// Convert local chunk coordinates to world chunk coordinates.
    pub fn local_to_world(&self, local_x: i32, local_z: i32) -> ChunkPos {
        ChunkPos::new(
            self.x * REGION_SIZE + local_x,
            self.z * REGION_SIZE + local_z,
        )
    }

    pub fn contains(&self, chunk: ChunkPos) -> bool {
        chunk.region() == *self
    }
}

impl fmt::Display for RegionPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.x, self.z)
    }
}
