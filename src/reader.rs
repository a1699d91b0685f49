//! Bounds-checked primitive reads over a borrowed byte buffer.
//!
//! Every multi-byte read takes its byte order from the caller; there is no
//! global byte order. Overruns come back as [`ParseError::Truncated`] so a
//! malformed segment aborts only itself.

use crate::error::ParseError;

pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// Byte order declared by a TIFF header (`II` / `MM`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    /// Interpret the two-byte TIFF byte order marker.
    pub fn from_marker(marker: [u8; 2]) -> ParseResult<Self> {
        match &marker {
            b"II" => Ok(ByteOrder::Little),
            b"MM" => Ok(ByteOrder::Big),
            _ => Err(ParseError::BadByteOrder(u16::from_be_bytes(marker))),
        }
    }
}

/// Borrow `needed` bytes at `offset`, or report how far short the buffer is.
#[inline]
pub fn slice_at(data: &[u8], offset: usize, needed: usize) -> ParseResult<&[u8]> {
    let end = offset.checked_add(needed).ok_or(ParseError::OffsetOverflow)?;
    data.get(offset..end).ok_or(ParseError::Truncated {
        offset,
        needed,
        len: data.len(),
    })
}

/// Zero-copy reader over one TIFF stream with a fixed byte order.
#[derive(Debug, Clone, Copy)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    order: ByteOrder,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8], order: ByteOrder) -> Self {
        Self { data, order }
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn read_u16(&self, offset: usize) -> ParseResult<u16> {
        let b = slice_at(self.data, offset, 2)?;
        Ok(match self.order {
            ByteOrder::Little => u16::from_le_bytes([b[0], b[1]]),
            ByteOrder::Big => u16::from_be_bytes([b[0], b[1]]),
        })
    }

    #[inline]
    pub fn read_u32(&self, offset: usize) -> ParseResult<u32> {
        let b = slice_at(self.data, offset, 4)?;
        Ok(match self.order {
            ByteOrder::Little => u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            ByteOrder::Big => u32::from_be_bytes([b[0], b[1], b[2], b[3]]),
        })
    }

    /// Read up to `len` bytes of ASCII, stopping early at the first NUL.
    ///
    /// Non-ASCII bytes are mapped through Latin-1 so camera firmware quirks
    /// never fail the read.
    pub fn read_ascii(&self, offset: usize, len: usize) -> ParseResult<String> {
        let bytes = slice_at(self.data, offset, len)?;
        Ok(bytes
            .iter()
            .take_while(|&&b| b != 0)
            .map(|&b| b as char)
            .collect())
    }

    /// Read `count` TIFF RATIONALs (u32 numerator / u32 denominator).
    ///
    /// A zero denominator yields `0.0` instead of a division fault.
    pub fn read_rationals(&self, offset: usize, count: usize) -> ParseResult<Vec<f64>> {
        let needed = count.checked_mul(8).ok_or(ParseError::OffsetOverflow)?;
        slice_at(self.data, offset, needed)?;
        (0..count)
            .map(|i| {
                let at = offset + i * 8;
                let numerator = self.read_u32(at)?;
                let denominator = self.read_u32(at + 4)?;
                Ok(if denominator == 0 {
                    0.0
                } else {
                    f64::from(numerator) / f64::from(denominator)
                })
            })
            .collect()
    }
}

/// Big-endian u32, as used by PNG chunk lengths.
#[inline]
pub fn read_u32_be(data: &[u8], offset: usize) -> ParseResult<u32> {
    ByteReader::new(data, ByteOrder::Big).read_u32(offset)
}

/// Little-endian u32, as used by RIFF chunk sizes.
#[inline]
pub fn read_u32_le(data: &[u8], offset: usize) -> ParseResult<u32> {
    ByteReader::new(data, ByteOrder::Little).read_u32(offset)
}

/// Big-endian u16, as used by JPEG segment lengths.
#[inline]
pub fn read_u16_be(data: &[u8], offset: usize) -> ParseResult<u16> {
    ByteReader::new(data, ByteOrder::Big).read_u16(offset)
}
