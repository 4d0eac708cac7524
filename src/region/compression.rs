//! Chunk payload compression.
//!
//! The byte after a chunk's length field names the compression scheme of
//! the payload. Same IDs as used by vanilla Minecraft.

use std::borrow::Cow;
use std::fmt;
use std::io::Read;

use anyhow::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompressionScheme {
    GZip = 1,
    ZLib = 2,
    None = 3,
    Lz4 = 4,
}

impl CompressionScheme {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Self::GZip),
            2 => Some(Self::ZLib),
            3 => Some(Self::None),
            4 => Some(Self::Lz4),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for CompressionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GZip => "gzip",
            Self::ZLib => "zlib",
            Self::None => "none",
            Self::Lz4 => "lz4",
        };
        f.write_str(name)
    }
}

/// Undo the compression of a chunk payload.
/// Uncompressed payloads are borrowed as-is.
pub fn decompress(scheme: CompressionScheme, data: &[u8]) -> anyhow::Result<Cow<'_, [u8]>> {
    let mut decompressed = Vec::new();
    let result = match scheme {
        CompressionScheme::None => return Ok(Cow::Borrowed(data)),
        CompressionScheme::ZLib => {
            flate2::read::ZlibDecoder::new(data).read_to_end(&mut decompressed)
        }
        CompressionScheme::GZip => {
            flate2::read::GzDecoder::new(data).read_to_end(&mut decompressed)
        }
        CompressionScheme::Lz4 => {
            lz4_java_wrc::Lz4BlockInput::new(data).read_to_end(&mut decompressed)
        }
    };
    result.with_context(|| format!("Failed to decompress {} payload of {} bytes", scheme, data.len()))?;

    Ok(Cow::Owned(decompressed))
}
