//! WebP metadata chunk detection.
//!
//! WebP is a RIFF container:
//! - `RIFF`, 4-byte little-endian size, `WEBP`
//! - chunks: FourCC, 4-byte little-endian size, data padded to even length
//!
//! `EXIF` marks EXIF presence; `XMP ` and `ICCP` only mark generic metadata.
//! No EXIF decoding happens for WebP.

use crate::reader::read_u32_le;
use tracing::debug;

const RIFF: &[u8; 4] = b"RIFF";
const WEBP: &[u8; 4] = b"WEBP";
const RIFF_HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;
const MAX_CHUNKS: usize = 65_536;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WebpScan {
    pub has_exif: bool,
    pub has_xmp: bool,
    pub has_icc: bool,
}

impl WebpScan {
    /// Any chunk that counts as metadata.
    pub fn has_metadata(&self) -> bool {
        self.has_exif || self.has_xmp || self.has_icc
    }
}

/// True when the buffer opens with a RIFF/WEBP header.
pub fn is_webp(data: &[u8]) -> bool {
    data.len() >= RIFF_HEADER_LEN && &data[0..4] == RIFF && &data[8..12] == WEBP
}

/// Walk the RIFF chunks. A size that runs past the buffer ends the walk
/// without counting that chunk.
pub fn scan(data: &[u8]) -> WebpScan {
    let mut result = WebpScan::default();
    if !is_webp(data) {
        return result;
    }

    let mut pos = RIFF_HEADER_LEN;
    for _ in 0..MAX_CHUNKS {
        if pos + CHUNK_HEADER_LEN > data.len() {
            return result;
        }
        let fourcc = &data[pos..pos + 4];
        let Ok(size) = read_u32_le(data, pos + 4) else {
            return result;
        };
        let size = size as usize;
        let next = pos
            .checked_add(CHUNK_HEADER_LEN)
            .and_then(|n| n.checked_add(size));
        let Some(next) = next.filter(|&n| n <= data.len()) else {
            debug!("WebP chunk {:?} at {} overruns buffer", String::from_utf8_lossy(fourcc), pos);
            return result;
        };

        match fourcc {
            b"EXIF" => result.has_exif = true,
            b"XMP " => result.has_xmp = true,
            b"ICCP" => result.has_icc = true,
            _ => {}
        }

        // Odd sizes carry one padding byte.
        pos = next + (size & 1);
    }
    debug!("WebP chunk limit reached");
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn webp(chunks: &[(&[u8; 4], &[u8])]) -> Vec<u8> {
        let mut body = WEBP.to_vec();
        for (kind, data) in chunks {
            body.extend_from_slice(*kind);
            body.extend_from_slice(&(data.len() as u32).to_le_bytes());
            body.extend_from_slice(data);
            if data.len() % 2 == 1 {
                body.push(0);
            }
        }
        let mut out = RIFF.to_vec();
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(&body);
        out
    }

    #[test]
    fn test_detects_metadata_chunks() {
        let data = webp(&[
            (b"VP8X", &[0u8; 10][..]),
            (b"ICCP", &[1, 2, 3][..]),
            (b"VP8 ", &[0u8; 5][..]),
            (b"EXIF", &b"II*\0"[..]),
            (b"XMP ", &b"<x/>"[..]),
        ]);
        let scan = scan(&data);
        assert!(scan.has_exif);
        assert!(scan.has_xmp);
        assert!(scan.has_icc);
        assert!(scan.has_metadata());
    }

    #[test]
    fn test_icc_only() {
        let scan = scan(&webp(&[(b"VP8X", &[0u8; 10][..]), (b"ICCP", &[9u8; 7][..])]));
        assert!(!scan.has_exif);
        assert!(scan.has_metadata());
    }

    #[test]
    fn test_plain_image_has_no_metadata() {
        let scan = scan(&webp(&[(b"VP8L", &[0u8; 9][..])]));
        assert_eq!(scan, WebpScan::default());
    }

    #[test]
    fn test_overrunning_size_stops_walk() {
        let mut data = webp(&[(b"VP8 ", &[0u8; 4][..])]);
        data.extend_from_slice(b"ALPH");
        data.extend_from_slice(&0x7FFF_FFFFu32.to_le_bytes());
        data.extend_from_slice(b"EXIF");
        data.extend_from_slice(&4u32.to_le_bytes());
        data.extend_from_slice(b"II*\0");
        assert!(!scan(&data).has_exif);
    }

    #[test]
    fn test_not_webp() {
        assert!(!is_webp(b"RIFF\0\0\0\0WAVEfmt "));
        assert_eq!(scan(b"RIFF"), WebpScan::default());
    }
}
