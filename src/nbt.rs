//! NBT (Named Binary Tag) chunk records.
//!
//! Modern chunks (1.18+) keep `xPos`/`zPos` in the root compound, older
//! ones wrap everything in a `Level` compound. Both are accepted.

use std::collections::HashMap;

use anyhow::Context;
use fastnbt::Value;

use crate::chunk::ChunkRecord;
use crate::region::ChunkPos;

/// Chunk record backed by a generic fastnbt tree.
#[derive(Debug, Default)]
pub struct NbtChunk {
    root: Option<Value>,
    pos: Option<ChunkPos>,
    data_version: Option<i32>,
}

impl NbtChunk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chunk coordinates stored inside the NBT.
    pub fn position(&self) -> Option<ChunkPos> {
        self.pos
    }

    /// `DataVersion` tag, missing in very old chunks.
    pub fn data_version(&self) -> Option<i32> {
        self.data_version
    }

    pub fn root(&self) -> Option<&Value> {
        self.root.as_ref()
    }
}

impl ChunkRecord for NbtChunk {
    fn read_nbt(&mut self, data: &[u8]) -> anyhow::Result<bool> {
        *self = Self::default();

        let root: Value = fastnbt::from_bytes(data).context("Malformed chunk NBT")?;

        // The root tag has to span the whole payload.
        let used = tag_len(data);
        if used != Some(data.len()) {
            log::debug!("Chunk NBT uses {:?} of {} bytes", used, data.len());
            return Ok(false);
        }

        let Value::Compound(compound) = &root else {
            return Ok(false);
        };

        let pos = match coords_of(compound) {
            Some(pos) => pos,
            None => match compound.get("Level") {
                Some(Value::Compound(level)) => match coords_of(level) {
                    Some(pos) => pos,
                    None => return Ok(false),
                },
                _ => return Ok(false),
            },
        };

        self.pos = Some(pos);
        self.data_version = compound
            .get("DataVersion")
            .and_then(Value::as_i64)
            .and_then(|v| i32::try_from(v).ok());
        self.root = Some(root);
        Ok(true)
    }
}

fn coords_of(compound: &HashMap<String, Value>) -> Option<ChunkPos> {
    let x = i32::try_from(compound.get("xPos")?.as_i64()?).ok()?;
    let z = i32::try_from(compound.get("zPos")?.as_i64()?).ok()?;
    Some(ChunkPos::new(x, z))
}

/// Nesting limit while measuring a tag.
const MAX_DEPTH: usize = 512;

/// Byte length of the named root tag at the start of `data`, walking the
/// tag structure without building values. None if the data ends early.
fn tag_len(data: &[u8]) -> Option<usize> {
    let mut cursor = TagCursor { data, pos: 0 };
    let id = cursor.u8()?;
    if id == 0 {
        return Some(1);
    }
    let name_len = cursor.u16()? as usize;
    cursor.skip(name_len)?;
    cursor.skip_payload(id, 0)?;
    Some(cursor.pos)
}

struct TagCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl TagCursor<'_> {
    fn skip(&mut self, n: usize) -> Option<()> {
        let end = self.pos.checked_add(n)?;
        if end > self.data.len() {
            return None;
        }
        self.pos = end;
        Some(())
    }

    fn u8(&mut self) -> Option<u8> {
        let b = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }

    fn u16(&mut self) -> Option<u16> {
        let b = self.data.get(self.pos..self.pos + 2)?;
        self.pos += 2;
        Some(u16::from_be_bytes([b[0], b[1]]))
    }

    /// Element count of an array or list; negative counts are empty.
    fn count(&mut self) -> Option<usize> {
        let b = self.data.get(self.pos..self.pos + 4)?;
        self.pos += 4;
        Some(i32::from_be_bytes([b[0], b[1], b[2], b[3]]).max(0) as usize)
    }

    fn skip_payload(&mut self, id: u8, depth: usize) -> Option<()> {
        if depth > MAX_DEPTH {
            return None;
        }
        match id {
            1 => self.skip(1),
            2 => self.skip(2),
            3 | 5 => self.skip(4),
            4 | 6 => self.skip(8),
            7 => {
                let n = self.count()?;
                self.skip(n)
            }
            8 => {
                let n = self.u16()? as usize;
                self.skip(n)
            }
            9 => {
                let element = self.u8()?;
                let n = self.count()?;
                for _ in 0..n {
                    self.skip_payload(element, depth + 1)?;
                }
                Some(())
            }
            10 => loop {
                let child = self.u8()?;
                if child == 0 {
                    return Some(());
                }
                let name_len = self.u16()? as usize;
                self.skip(name_len)?;
                self.skip_payload(child, depth + 1)?;
            },
            11 => {
                let n = self.count()?;
                self.skip(n.checked_mul(4)?)
            }
            12 => {
                let n = self.count()?;
                self.skip(n.checked_mul(8)?)
            }
            _ => None,
        }
    }
}
