//! EXIF/TIFF decoding for the fields the privacy report cares about.
//!
//! Layout of the TIFF stream carried in a JPEG APP1 segment:
//! - bytes 0-1: byte order (`II` little, `MM` big)
//! - bytes 2-3: magic 42
//! - bytes 4-7: offset of IFD0, relative to the TIFF start
//!
//! IFD0 may point at the Exif sub-IFD (0x8769) and the GPS IFD (0x8825).
//! Every offset is relative to the TIFF start, so the decoder works on the
//! TIFF slice alone.

use crate::error::ParseError;
use crate::gps::{self, GpsStatus, GpsTags, Location};
use crate::reader::{slice_at, ByteOrder, ByteReader, ParseResult};
use tracing::{debug, warn};

/// TIFF magic number.
pub const TIFF_MAGIC: u16 = 0x002A;
/// Size of TIFF header in bytes.
pub const TIFF_HEADER_LEN: usize = 8;
/// Size of one IFD entry in bytes.
pub const IFD_ENTRY_LEN: usize = 12;

pub const TAG_MAKE: u16 = 0x010F;
pub const TAG_MODEL: u16 = 0x0110;
pub const TAG_DATE_TIME: u16 = 0x0132;
pub const TAG_EXIF_IFD: u16 = 0x8769;
pub const TAG_GPS_IFD: u16 = 0x8825;
pub const TAG_DATE_TIME_ORIGINAL: u16 = 0x9003;

pub const TAG_GPS_LATITUDE_REF: u16 = 0x0001;
pub const TAG_GPS_LATITUDE: u16 = 0x0002;
pub const TAG_GPS_LONGITUDE_REF: u16 = 0x0003;
pub const TAG_GPS_LONGITUDE: u16 = 0x0004;

/// TIFF field types.
pub const TYPE_BYTE: u16 = 1;
pub const TYPE_ASCII: u16 = 2;
pub const TYPE_SHORT: u16 = 3;
pub const TYPE_LONG: u16 = 4;
pub const TYPE_RATIONAL: u16 = 5;
pub const TYPE_UNDEFINED: u16 = 7;
pub const TYPE_SLONG: u16 = 9;
pub const TYPE_SRATIONAL: u16 = 10;

/// Size in bytes of one value of a TIFF field type. Unknown types are
/// treated as bytes.
#[inline]
pub fn type_unit_size(field_type: u16) -> usize {
    match field_type {
        TYPE_SHORT => 2,
        TYPE_LONG | TYPE_SLONG => 4,
        TYPE_RATIONAL | TYPE_SRATIONAL => 8,
        TYPE_BYTE | TYPE_ASCII | TYPE_UNDEFINED => 1,
        _ => 1,
    }
}

/// Single IFD entry (tag, type, count, value/offset).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IfdEntry {
    pub tag: u16,
    pub field_type: u16,
    pub count: u32,
    pub value_offset: u32,
    /// Position of the entry itself, needed for inline values.
    pub entry_offset: usize,
}

impl IfdEntry {
    /// Where the value bytes live: inline in the entry when they fit in
    /// four bytes, otherwise at `value_offset`.
    pub fn value_location(&self) -> ParseResult<(usize, usize)> {
        let len = type_unit_size(self.field_type)
            .checked_mul(self.count as usize)
            .ok_or(ParseError::OffsetOverflow)?;
        if len <= 4 {
            Ok((self.entry_offset + 8, len))
        } else {
            Ok((self.value_offset as usize, len))
        }
    }
}

/// Check the TIFF header and return (byte order, IFD0 offset).
pub fn read_tiff_header(tiff: &[u8]) -> ParseResult<(ByteOrder, u32)> {
    let header = slice_at(tiff, 0, TIFF_HEADER_LEN)?;
    let order = ByteOrder::from_marker([header[0], header[1]])?;
    let reader = ByteReader::new(tiff, order);
    let magic = reader.read_u16(2)?;
    if magic != TIFF_MAGIC {
        debug!("TIFF magic is 0x{:04x}, continuing anyway", magic);
    }
    Ok((order, reader.read_u32(4)?))
}

/// Read the entries of the IFD at `offset`.
///
/// A truncated entry table keeps whatever entries were complete.
pub fn read_ifd(reader: &ByteReader<'_>, offset: usize) -> ParseResult<Vec<IfdEntry>> {
    let count = reader.read_u16(offset)? as usize;
    let mut entries = Vec::with_capacity(count.min(256));
    for i in 0..count {
        let at = offset + 2 + i * IFD_ENTRY_LEN;
        let entry = (|| {
            Ok::<_, ParseError>(IfdEntry {
                tag: reader.read_u16(at)?,
                field_type: reader.read_u16(at + 2)?,
                count: reader.read_u32(at + 4)?,
                value_offset: reader.read_u32(at + 8)?,
                entry_offset: at,
            })
        })();
        match entry {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                debug!("IFD at {} truncated after {} of {} entries: {}", offset, i, count, e);
                break;
            }
        }
    }
    Ok(entries)
}

fn read_string(reader: &ByteReader<'_>, entry: &IfdEntry) -> ParseResult<String> {
    let (offset, len) = entry.value_location()?;
    reader.read_ascii(offset, len)
}

fn read_ref_char(reader: &ByteReader<'_>, entry: &IfdEntry) -> ParseResult<Option<char>> {
    let (offset, _) = entry.value_location()?;
    let c = reader.read_ascii(offset, 1)?.chars().next();
    Ok(c.filter(|c| !c.is_whitespace()))
}

/// Fields recognized in IFD0 and the Exif sub-IFD.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IfdFields {
    pub make: Option<String>,
    pub model: Option<String>,
    pub date_time: Option<String>,
    pub date_time_original: Option<String>,
    pub exif_ifd: Option<u32>,
    pub gps_ifd: Option<u32>,
}

/// Pick the recognized tags out of an IFD. A field whose value cannot be
/// read is skipped; unrecognized tags are ignored.
pub fn decode_fields(reader: &ByteReader<'_>, entries: &[IfdEntry]) -> IfdFields {
    let mut fields = IfdFields::default();
    for entry in entries {
        let string = || match read_string(reader, entry) {
            Ok(s) if !s.is_empty() => Some(s),
            Ok(_) => None,
            Err(e) => {
                debug!("Skipping tag 0x{:04x}: {}", entry.tag, e);
                None
            }
        };
        match entry.tag {
            TAG_MAKE => fields.make = string(),
            TAG_MODEL => fields.model = string(),
            TAG_DATE_TIME => fields.date_time = string(),
            TAG_DATE_TIME_ORIGINAL => fields.date_time_original = string(),
            TAG_EXIF_IFD => fields.exif_ifd = Some(entry.value_offset),
            TAG_GPS_IFD => fields.gps_ifd = Some(entry.value_offset),
            _ => {}
        }
    }
    fields
}

/// Collect the raw latitude/longitude tags of a GPS IFD.
pub fn decode_gps_tags(reader: &ByteReader<'_>, entries: &[IfdEntry]) -> GpsTags {
    let mut tags = GpsTags::default();
    for entry in entries {
        let result = match entry.tag {
            TAG_GPS_LATITUDE_REF => read_ref_char(reader, entry).map(|c| tags.latitude_ref = c),
            TAG_GPS_LONGITUDE_REF => read_ref_char(reader, entry).map(|c| tags.longitude_ref = c),
            TAG_GPS_LATITUDE => entry
                .value_location()
                .and_then(|(offset, _)| reader.read_rationals(offset, entry.count as usize))
                .map(|v| tags.latitude = v),
            TAG_GPS_LONGITUDE => entry
                .value_location()
                .and_then(|(offset, _)| reader.read_rationals(offset, entry.count as usize))
                .map(|v| tags.longitude = v),
            _ => Ok(()),
        };
        if let Err(e) = result {
            debug!("Skipping GPS tag 0x{:04x}: {}", entry.tag, e);
        }
    }
    tags
}

/// What the EXIF block revealed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifSummary {
    pub make: Option<String>,
    pub model: Option<String>,
    /// DateTimeOriginal from the Exif sub-IFD, falling back to IFD0 DateTime.
    pub date_time_original: Option<String>,
    /// IFD0 pointed at a GPS IFD.
    pub gps_block: bool,
    pub location: Option<Location>,
}

impl ExifSummary {
    /// `"{Make} {Model}"`, only when both are present.
    pub fn camera_info(&self) -> Option<String> {
        let make = self.make.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let model = self.model.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some(format!("{} {}", make, model))
    }

    pub fn gps_status(&self) -> GpsStatus {
        match (self.location, self.gps_block) {
            (Some(_), _) => GpsStatus::Located,
            (None, true) => GpsStatus::TagsWithoutFix,
            (None, false) => GpsStatus::None,
        }
    }
}

/// Decode a TIFF stream.
///
/// An unreadable header or IFD0 yields an error; failures inside the Exif
/// or GPS sub-IFDs only drop that sub-IFD's fields.
pub fn decode(tiff: &[u8]) -> ParseResult<ExifSummary> {
    let (order, ifd0_offset) = read_tiff_header(tiff)?;
    let reader = ByteReader::new(tiff, order);
    let ifd0 = decode_fields(&reader, &read_ifd(&reader, ifd0_offset as usize)?);

    let mut summary = ExifSummary {
        make: ifd0.make,
        model: ifd0.model,
        date_time_original: ifd0.date_time,
        ..Default::default()
    };

    if let Some(offset) = ifd0.exif_ifd {
        match read_ifd(&reader, offset as usize) {
            Ok(entries) => {
                if let Some(original) = decode_fields(&reader, &entries).date_time_original {
                    summary.date_time_original = Some(original);
                }
            }
            Err(e) => warn!("Exif sub-IFD at {} unreadable: {}", offset, e),
        }
    }

    if let Some(offset) = ifd0.gps_ifd {
        summary.gps_block = true;
        match read_ifd(&reader, offset as usize) {
            Ok(entries) => {
                let tags = decode_gps_tags(&reader, &entries);
                summary.location = gps::validate(&tags);
                if summary.location.is_none() {
                    debug!("GPS IFD present without a valid fix: {:?}", tags);
                }
            }
            Err(e) => warn!("GPS IFD at {} unreadable: {}", offset, e),
        }
    }

    Ok(summary)
}
