//! Synthetic region files for tests.

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use serde::Serialize;

use crate::region::{CompressionScheme, HEADER_SIZE, SECTOR_SIZE, local_to_index, sector_to_offset};

#[derive(Serialize)]
struct ModernChunk {
    #[serde(rename = "DataVersion")]
    data_version: i32,
    #[serde(rename = "xPos")]
    x_pos: i32,
    #[serde(rename = "zPos")]
    z_pos: i32,
    #[serde(rename = "Status")]
    status: String,
}

#[derive(Serialize)]
struct LegacyChunk {
    #[serde(rename = "Level")]
    level: LegacyLevel,
}

#[derive(Serialize)]
struct LegacyLevel {
    #[serde(rename = "xPos")]
    x_pos: i32,
    #[serde(rename = "zPos")]
    z_pos: i32,
    #[serde(rename = "LastUpdate")]
    last_update: i64,
}

pub fn modern_chunk_nbt(x: i32, z: i32) -> Vec<u8> {
    fastnbt::to_bytes(&ModernChunk {
        data_version: 3953,
        x_pos: x,
        z_pos: z,
        status: "minecraft:full".to_string(),
    })
    .unwrap()
}

pub fn legacy_chunk_nbt(x: i32, z: i32) -> Vec<u8> {
    fastnbt::to_bytes(&LegacyChunk {
        level: LegacyLevel { x_pos: x, z_pos: z, last_update: 0 },
    })
    .unwrap()
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Pack a payload as it is stored on disk: [length:4][type:1][data:N].
pub fn wrap_blob(scheme: u8, payload: &[u8]) -> Vec<u8> {
    let total_len = (payload.len() + 1) as u32;
    let mut blob = Vec::with_capacity(5 + payload.len());
    blob.extend_from_slice(&total_len.to_be_bytes());
    blob.push(scheme);
    blob.extend_from_slice(payload);
    blob
}

/// Builds region file bytes slot by slot.
pub struct RegionBuilder {
    bytes: Vec<u8>,
    next_sector: u32,
}

impl RegionBuilder {
    pub fn new() -> Self {
        Self {
            bytes: vec![0u8; HEADER_SIZE],
            next_sector: 2,
        }
    }

    /// Write a raw location entry without any chunk data behind it.
    pub fn location(&mut self, x: i32, z: i32, sector: u32, count: u8) -> &mut Self {
        let at = 4 * local_to_index(x, z);
        self.bytes[at] = ((sector >> 16) & 0xFF) as u8;
        self.bytes[at + 1] = ((sector >> 8) & 0xFF) as u8;
        self.bytes[at + 2] = (sector & 0xFF) as u8;
        self.bytes[at + 3] = count;
        self
    }

    pub fn timestamp(&mut self, x: i32, z: i32, timestamp: u32) -> &mut Self {
        let at = SECTOR_SIZE + 4 * local_to_index(x, z);
        self.bytes[at..at + 4].copy_from_slice(&timestamp.to_be_bytes());
        self
    }

    /// Append a blob in fresh sectors and point the slot at it.
    pub fn blob(&mut self, x: i32, z: i32, blob: &[u8]) -> &mut Self {
        let sector = self.next_sector;
        let count = blob.len().div_ceil(SECTOR_SIZE).max(1);
        let start = sector_to_offset(sector);
        self.bytes.resize(start + count * SECTOR_SIZE, 0);
        self.bytes[start..start + blob.len()].copy_from_slice(blob);
        self.next_sector += count as u32;
        self.location(x, z, sector, count as u8)
    }

    /// Store a zlib compressed modern chunk for the given world coordinates.
    pub fn chunk(&mut self, x: i32, z: i32, world_x: i32, world_z: i32) -> &mut Self {
        let blob = wrap_blob(CompressionScheme::ZLib.id(), &zlib(&modern_chunk_nbt(world_x, world_z)));
        self.blob(x, z, &blob)
    }

    pub fn build(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}
