//! PNG text chunk detection.
//!
//! A PNG is an 8-byte signature followed by chunks:
//! - 4 bytes: length (big-endian)
//! - 4 bytes: chunk type (ASCII)
//! - N bytes: data
//! - 4 bytes: CRC32
//!
//! Text chunks (`tEXt`, `zTXt`, `iTXt`) are reported by presence only.

use crate::reader::read_u32_be;
use tracing::debug;

/// PNG signature bytes.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Chunk types that hold free-form text.
pub const TEXT_CHUNKS: &[&[u8; 4]] = &[b"tEXt", b"zTXt", b"iTXt"];

/// Length + type + CRC framing around each chunk's data.
const CHUNK_OVERHEAD: usize = 12;
const MAX_CHUNKS: usize = 65_536;

/// One framed chunk.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    pub chunk_type: [u8; 4],
    pub data: &'a [u8],
}

/// Iterate over well-formed chunks. The walk ends at IEND, at a chunk whose
/// declared length does not fit in the buffer, or at the chunk limit.
pub fn chunks(data: &[u8]) -> impl Iterator<Item = Chunk<'_>> {
    let valid = data.starts_with(&PNG_SIGNATURE);
    let mut pos = PNG_SIGNATURE.len();
    let mut visited = 0usize;
    let mut done = !valid;
    std::iter::from_fn(move || {
        if done {
            return None;
        }
        if visited >= MAX_CHUNKS {
            debug!("PNG chunk limit reached at {}", pos);
            done = true;
            return None;
        }
        visited += 1;

        let Ok(length) = read_u32_be(data, pos) else {
            done = true;
            return None;
        };
        let length = length as usize;
        let end = pos
            .checked_add(CHUNK_OVERHEAD)
            .and_then(|n| n.checked_add(length))
            .filter(|&end| end <= data.len());
        let Some(end) = end else {
            debug!("PNG chunk at {} claims {} bytes past end of buffer", pos, length);
            done = true;
            return None;
        };

        let chunk = Chunk {
            chunk_type: [data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]],
            data: &data[pos + 8..pos + 8 + length],
        };
        if &chunk.chunk_type == b"IEND" {
            done = true;
        }
        pos = end;
        Some(chunk)
    })
}

/// True when any text chunk appears before the walk ends.
pub fn has_text_chunks(data: &[u8]) -> bool {
    chunks(data).any(|c| TEXT_CHUNKS.contains(&&c.chunk_type))
}
