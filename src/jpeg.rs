//! JPEG segment walking and metadata segment location.
//!
//! A JPEG is a sequence of `FF xx` markers; every marker between SOI and SOS
//! carries a big-endian length that includes itself. Metadata lives in the
//! application segments:
//! - APP1 (FF E1): EXIF (`Exif\0\0`) or XMP (Adobe namespace URI)
//! - APP13 (FF ED): Photoshop image resources holding IPTC
//!
//! The walk stops at SOS, EOI, or the first length that does not fit.

use crate::reader::read_u16_be;
use tracing::debug;

pub const MARKER_PREFIX: u8 = 0xFF;
pub const SOI: u8 = 0xD8;
pub const EOI: u8 = 0xD9;
pub const SOS: u8 = 0xDA;
pub const APP1: u8 = 0xE1;
pub const APP13: u8 = 0xED;
const TEM: u8 = 0x01;
const RST0: u8 = 0xD0;
const RST7: u8 = 0xD7;

/// Payload prefix of an EXIF APP1 segment.
pub const EXIF_HEADER: &[u8] = b"Exif\0\0";
/// Namespace URI that opens an XMP APP1 payload.
pub const XMP_NAMESPACE: &[u8] = b"http://ns.adobe.com/xap/1.0/";
/// Identifier inside an APP13 Photoshop resource segment.
pub const PHOTOSHOP_SIGNATURE: &[u8] = b"Photoshop 3.0";

/// Hard cap on segments visited per file.
const MAX_SEGMENTS: usize = 4096;

/// One marker segment, payload excludes marker and length bytes.
#[derive(Debug, Clone, Copy)]
pub struct Segment<'a> {
    pub marker: u8,
    /// Offset of the `FF` byte in the file.
    pub offset: usize,
    pub payload: &'a [u8],
}

/// Iterator over the header segments of a JPEG stream.
pub struct Segments<'a> {
    data: &'a [u8],
    pos: usize,
    visited: usize,
    done: bool,
}

impl<'a> Segments<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        let is_jpeg = data.len() >= 2 && data[0] == MARKER_PREFIX && data[1] == SOI;
        Self {
            data,
            pos: 2,
            visited: 0,
            done: !is_jpeg,
        }
    }

    fn stop(&mut self, reason: &str) -> Option<Segment<'a>> {
        if !self.done {
            debug!("JPEG segment walk stopped at {}: {}", self.pos, reason);
        }
        self.done = true;
        None
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Segment<'a>> {
        loop {
            if self.done {
                return None;
            }
            if self.visited >= MAX_SEGMENTS {
                return self.stop("segment limit reached");
            }
            if self.data.get(self.pos) != Some(&MARKER_PREFIX) {
                return self.stop("expected marker");
            }
            // Fill bytes: any number of FF may precede the marker code.
            let mut code_at = self.pos + 1;
            while self.data.get(code_at) == Some(&MARKER_PREFIX) {
                code_at += 1;
            }
            let Some(&marker) = self.data.get(code_at) else {
                return self.stop("truncated marker");
            };
            self.visited += 1;

            match marker {
                SOS => return self.stop("start of scan"),
                EOI => return self.stop("end of image"),
                TEM | RST0..=RST7 => {
                    self.pos = code_at + 1;
                    continue;
                }
                _ => {}
            }

            let Ok(length) = read_u16_be(self.data, code_at + 1) else {
                return self.stop("truncated length");
            };
            let length = length as usize;
            if length < 2 {
                return self.stop("invalid length");
            }
            let payload_start = code_at + 3;
            let payload_end = code_at + 1 + length;
            let Some(payload) = self.data.get(payload_start..payload_end) else {
                return self.stop("length runs past end of buffer");
            };
            let offset = self.pos;
            self.pos = payload_end;
            return Some(Segment { marker, offset, payload });
        }
    }
}

/// TIFF stream of the first APP1 segment carrying an EXIF header.
pub fn find_exif(data: &[u8]) -> Option<&[u8]> {
    Segments::new(data)
        .find(|s| s.marker == APP1 && s.payload.starts_with(EXIF_HEADER))
        .map(|s| &s.payload[EXIF_HEADER.len()..])
}

/// XMP packet bytes (after the namespace header and its NUL) of the first
/// APP1 segment that opens with the XMP namespace.
pub fn find_xmp(data: &[u8]) -> Option<&[u8]> {
    Segments::new(data)
        .find(|s| s.marker == APP1 && s.payload.starts_with(XMP_NAMESPACE))
        .map(|s| {
            let body = &s.payload[XMP_NAMESPACE.len()..];
            body.strip_prefix(b"\0").unwrap_or(body)
        })
}

/// True when an APP13 segment carries a Photoshop resource block (IPTC).
pub fn has_iptc(data: &[u8]) -> bool {
    Segments::new(data).any(|s| s.marker == APP13 && contains(s.payload, PHOTOSHOP_SIGNATURE))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}
