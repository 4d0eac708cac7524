//! Region file header parsing.
//!
//! The header consists of two tables:
//! - Location table: where each chunk is stored
//! - Timestamp table: when each chunk was last saved

use std::collections::BTreeSet;
use std::io::{Read, Seek, SeekFrom};

use super::{
    CHUNKS_PER_REGION, ChunkPos, HEADER_SIZE, REGION_SIZE, RegionPos, SECTOR_SIZE,
    local_to_index,
};

/// Decoded location table entry of a present chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLocation {
    /// Absolute byte offset of the chunk blob in the file.
    pub offset: u64,
    /// Number of sectors reserved for the blob.
    pub sectors: u8,
}

impl ChunkLocation {
    /// Decode a location entry: [sector:3][count:1], big endian.
    /// Returns None for an absent entry (zero word or zero sector).
    pub fn decode(entry: [u8; 4]) -> Option<Self> {
        let sector = (entry[0] as u32) << 16 | (entry[1] as u32) << 8 | entry[2] as u32;
        if sector == 0 {
            return None;
        }
        Some(Self {
            offset: sector as u64 * SECTOR_SIZE as u64,
            sectors: entry[3],
        })
    }
}

/// Offset and timestamp tables of one region file.
///
/// Both tables are indexed by `local_z * 32 + local_x`. `present` always
/// holds exactly the chunks whose offset is non-zero.
#[derive(Debug, Clone)]
pub struct HeaderTable {
    offsets: [u64; CHUNKS_PER_REGION],
    sectors: [u8; CHUNKS_PER_REGION],
    timestamps: [u32; CHUNKS_PER_REGION],
    present: BTreeSet<ChunkPos>,
}

impl Default for HeaderTable {
    fn default() -> Self {
        Self {
            offsets: [0; CHUNKS_PER_REGION],
            sectors: [0; CHUNKS_PER_REGION],
            timestamps: [0; CHUNKS_PER_REGION],
            present: BTreeSet::new(),
        }
    }
}

impl HeaderTable {
    /// Parse the 8 KiB header at the start of `reader`.
    ///
    /// A file shorter than the header reads as zero past its end, so the
    /// missing slots are simply absent.
    pub fn read<R: Read + Seek>(reader: &mut R, region: RegionPos) -> std::io::Result<Self> {
        reader.seek(SeekFrom::Start(0))?;
        let mut buf = Vec::with_capacity(HEADER_SIZE);
        reader.take(HEADER_SIZE as u64).read_to_end(&mut buf)?;
        if buf.len() < HEADER_SIZE {
            log::debug!("Region {}: short header ({} of {} bytes)", region, buf.len(), HEADER_SIZE);
            buf.resize(HEADER_SIZE, 0);
        }

        let mut raw = [0u8; HEADER_SIZE];
        raw.copy_from_slice(&buf);
        Ok(Self::parse(&raw, region))
    }

    /// Build the tables from raw header bytes.
    pub fn parse(raw: &[u8; HEADER_SIZE], region: RegionPos) -> Self {
        let mut table = Self::default();

        for x in 0..REGION_SIZE {
            for z in 0..REGION_SIZE {
                // On disk: x + z*32. Stored under the lookup key z*32 + x.
                let disk_index = (x + z * REGION_SIZE) as usize;
                let Some(location) = ChunkLocation::decode(word_at(raw, 4 * disk_index)) else {
                    continue;
                };
                let timestamp = u32::from_be_bytes(word_at(raw, SECTOR_SIZE + 4 * disk_index));

                let slot = local_to_index(x, z);
                table.offsets[slot] = location.offset;
                table.sectors[slot] = location.sectors;
                table.timestamps[slot] = timestamp;
                table.present.insert(region.local_to_world(x, z));
            }
        }

        table
    }

    /// Byte offset of a chunk blob, 0 when absent.
    #[inline]
    pub fn offset(&self, pos: ChunkPos) -> u64 {
        self.offsets[pos.local_index()]
    }

    pub fn has_chunk(&self, pos: ChunkPos) -> bool {
        self.offset(pos) != 0
    }

    /// Last modification time of a chunk, 0 when absent.
    pub fn timestamp(&self, pos: ChunkPos) -> u32 {
        self.timestamps[pos.local_index()]
    }

    pub fn location(&self, pos: ChunkPos) -> Option<ChunkLocation> {
        let index = pos.local_index();
        (self.offsets[index] != 0).then(|| ChunkLocation {
            offset: self.offsets[index],
            sectors: self.sectors[index],
        })
    }

    pub fn present(&self) -> &BTreeSet<ChunkPos> {
        &self.present
    }
}

#[inline]
fn word_at(raw: &[u8], at: usize) -> [u8; 4] {
    [raw[at], raw[at + 1], raw[at + 2], raw[at + 3]]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::RegionBuilder;
    use std::io::Cursor;

    fn read(bytes: Vec<u8>, region: RegionPos) -> HeaderTable {
        HeaderTable::read(&mut Cursor::new(bytes), region).unwrap()
    }

    #[test]
    fn test_decode_location() {
        let loc = ChunkLocation::decode([0x00, 0x00, 0x02, 0x01]).unwrap();
        assert_eq!(loc.offset, 8192);
        assert_eq!(loc.sectors, 1);

        let loc = ChunkLocation::decode([0x01, 0x00, 0x00, 0xFF]).unwrap();
        assert_eq!(loc.offset, 0x10000 * 4096);
        assert_eq!(loc.sectors, 255);

        assert_eq!(ChunkLocation::decode([0, 0, 0, 0]), None);
        // A sector count without a sector still points at offset 0.
        assert_eq!(ChunkLocation::decode([0, 0, 0, 3]), None);
    }

    #[test]
    fn test_present_set_matches_written_slots() {
        let region = RegionPos::new(-1, 2);
        let slots = [(0, 0), (31, 0), (0, 31), (5, 17), (31, 31)];

        let mut builder = RegionBuilder::new();
        for (i, &(x, z)) in slots.iter().enumerate() {
            builder.location(x, z, 2 + i as u32, 1);
        }
        let table = read(builder.build(), region);

        let expected: BTreeSet<ChunkPos> =
            slots.iter().map(|&(x, z)| region.local_to_world(x, z)).collect();
        assert_eq!(table.present(), &expected);

        for x in 0..32 {
            for z in 0..32 {
                let pos = region.local_to_world(x, z);
                assert_eq!(table.has_chunk(pos), slots.contains(&(x, z)), "slot {},{}", x, z);
            }
        }
    }

    #[test]
    fn test_timestamps() {
        let region = RegionPos::new(0, 0);
        let mut builder = RegionBuilder::new();
        builder.location(3, 4, 2, 1).timestamp(3, 4, 0xDEAD_BEEF);
        builder.location(4, 3, 3, 1).timestamp(4, 3, 1_700_000_000);
        let table = read(builder.build(), region);

        assert_eq!(table.timestamp(ChunkPos::new(3, 4)), 0xDEAD_BEEF);
        assert_eq!(table.timestamp(ChunkPos::new(4, 3)), 1_700_000_000);
        assert_eq!(table.timestamp(ChunkPos::new(0, 0)), 0);
    }

    #[test]
    fn test_zero_offset_ignores_timestamp_garbage() {
        let region = RegionPos::new(0, 0);
        let mut builder = RegionBuilder::new();
        builder.timestamp(7, 9, 0x1234_5678);
        let table = read(builder.build(), region);

        let pos = ChunkPos::new(7, 9);
        assert!(!table.has_chunk(pos));
        assert_eq!(table.timestamp(pos), 0);
        assert!(table.present().is_empty());
    }

    #[test]
    fn test_slot_transposition() {
        // On-disk word for (x=1, z=0) is at byte 4, stored under index 1.
        let mut raw = vec![0u8; HEADER_SIZE];
        raw[4..8].copy_from_slice(&[0, 0, 2, 1]);
        raw[SECTOR_SIZE + 4..SECTOR_SIZE + 8].copy_from_slice(&42u32.to_be_bytes());
        let table = read(raw, RegionPos::new(0, 0));

        assert!(table.has_chunk(ChunkPos::new(1, 0)));
        assert!(!table.has_chunk(ChunkPos::new(0, 1)));
        assert_eq!(table.offset(ChunkPos::new(1, 0)), 8192);
        assert_eq!(table.timestamp(ChunkPos::new(1, 0)), 42);
        assert_eq!(
            table.location(ChunkPos::new(1, 0)),
            Some(ChunkLocation { offset: 8192, sectors: 1 })
        );
    }

    #[test]
    fn test_short_file_is_mostly_absent() {
        let mut raw = vec![0u8; 8];
        raw[0..4].copy_from_slice(&[0, 0, 2, 1]);
        let table = read(raw, RegionPos::new(0, 0));

        assert_eq!(table.present().len(), 1);
        assert!(table.has_chunk(ChunkPos::new(0, 0)));
        // Timestamp table missing entirely.
        assert_eq!(table.timestamp(ChunkPos::new(0, 0)), 0);
    }

    #[test]
    fn test_empty_stream() {
        let table = read(Vec::new(), RegionPos::new(0, 0));
        assert!(table.present().is_empty());
    }
}
