//! Synthetic image fixtures for the integration tests.
//!
//! Only the container framing is real; JPEGs built here carry no scan data
//! unless they come from `encoded_jpeg`.

#![allow(dead_code)]

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage};

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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    fn u16(self, v: u16) -> [u8; 2] {
        match self {
            Endian::Little => v.to_le_bytes(),
            Endian::Big => v.to_be_bytes(),
        }
    }

    fn u32(self, v: u32) -> [u8; 4] {
        match self {
            Endian::Little => v.to_le_bytes(),
            Endian::Big => v.to_be_bytes(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum TagValue {
    Ascii(String),
    Rationals(Vec<(u32, u32)>),
    Long(u32),
}

impl TagValue {
    fn field_type(&self) -> u16 {
        match self {
            TagValue::Ascii(_) => 2,
            TagValue::Long(_) => 4,
            TagValue::Rationals(_) => 5,
        }
    }

    fn count(&self) -> u32 {
        match self {
            TagValue::Ascii(s) => s.len() as u32 + 1,
            TagValue::Long(_) => 1,
            TagValue::Rationals(v) => v.len() as u32,
        }
    }

    fn bytes(&self, endian: Endian) -> Vec<u8> {
        match self {
            TagValue::Ascii(s) => {
                let mut b = s.as_bytes().to_vec();
                b.push(0);
                b
            }
            TagValue::Long(v) => endian.u32(*v).to_vec(),
            TagValue::Rationals(v) => v
                .iter()
                .flat_map(|&(n, d)| endian.u32(n).into_iter().chain(endian.u32(d)))
                .collect(),
        }
    }
}

type Entries = Vec<(u16, TagValue)>;

/// Builds a TIFF stream with IFD0 and optional Exif and GPS sub-IFDs.
/// Sub-IFD pointers in IFD0 are filled in automatically.
#[derive(Debug, Clone)]
pub struct TiffBuilder {
    endian: Endian,
    ifd0: Entries,
    exif: Option<Entries>,
    gps: Option<Entries>,
}

impl TiffBuilder {
    pub fn new(endian: Endian) -> Self {
        Self {
            endian,
            ifd0: Vec::new(),
            exif: None,
            gps: None,
        }
    }

    pub fn ifd0(mut self, tag: u16, value: TagValue) -> Self {
        self.ifd0.push((tag, value));
        self
    }

    pub fn exif(mut self, tag: u16, value: TagValue) -> Self {
        self.exif.get_or_insert_with(Vec::new).push((tag, value));
        self
    }

    /// Add a GPS IFD even when it has no entries.
    pub fn empty_gps(mut self) -> Self {
        self.gps.get_or_insert_with(Vec::new);
        self
    }

    pub fn gps(mut self, tag: u16, value: TagValue) -> Self {
        self.gps.get_or_insert_with(Vec::new).push((tag, value));
        self
    }

    pub fn camera(self, make: &str, model: &str) -> Self {
        self.ifd0(TAG_MAKE, ascii(make)).ifd0(TAG_MODEL, ascii(model))
    }

    /// GPS block for a signed decimal position, encoded as whole degrees,
    /// whole minutes and centi-seconds.
    pub fn location(self, latitude: f64, longitude: f64) -> Self {
        let lat_ref = if latitude < 0.0 { "S" } else { "N" };
        let lon_ref = if longitude < 0.0 { "W" } else { "E" };
        self.gps(TAG_GPS_LATITUDE_REF, ascii(lat_ref))
            .gps(TAG_GPS_LATITUDE, TagValue::Rationals(dms(latitude.abs())))
            .gps(TAG_GPS_LONGITUDE_REF, ascii(lon_ref))
            .gps(TAG_GPS_LONGITUDE, TagValue::Rationals(dms(longitude.abs())))
    }

    pub fn build(&self) -> Vec<u8> {
        let mut ifd0 = self.ifd0.clone();
        if self.exif.is_some() {
            ifd0.push((TAG_EXIF_IFD, TagValue::Long(0)));
        }
        if self.gps.is_some() {
            ifd0.push((TAG_GPS_IFD, TagValue::Long(0)));
        }

        let ifd0_at = 8usize;
        let exif_at = ifd0_at + ifd_size(&ifd0, self.endian);
        let gps_at = exif_at + self.exif.as_ref().map_or(0, |e| ifd_size(e, self.endian));

        for (tag, value) in ifd0.iter_mut() {
            match *tag {
                TAG_EXIF_IFD => *value = TagValue::Long(exif_at as u32),
                TAG_GPS_IFD => *value = TagValue::Long(gps_at as u32),
                _ => {}
            }
        }

        let mut out = match self.endian {
            Endian::Little => b"II".to_vec(),
            Endian::Big => b"MM".to_vec(),
        };
        out.extend_from_slice(&self.endian.u16(42));
        out.extend_from_slice(&self.endian.u32(ifd0_at as u32));

        write_ifd(&mut out, &ifd0, self.endian);
        if let Some(exif) = &self.exif {
            assert_eq!(out.len(), exif_at);
            write_ifd(&mut out, exif, self.endian);
        }
        if let Some(gps) = &self.gps {
            assert_eq!(out.len(), gps_at);
            write_ifd(&mut out, gps, self.endian);
        }
        out
    }
}

pub fn ascii(s: &str) -> TagValue {
    TagValue::Ascii(s.to_string())
}

pub fn dms(value: f64) -> Vec<(u32, u32)> {
    let degrees = value.trunc();
    let minutes_full = (value - degrees) * 60.0;
    let minutes = minutes_full.trunc();
    let seconds = (minutes_full - minutes) * 60.0;
    vec![
        (degrees as u32, 1),
        (minutes as u32, 1),
        ((seconds * 100.0).round() as u32, 100),
    ]
}

fn padded(len: usize) -> usize {
    len + (len & 1)
}

fn ifd_size(entries: &Entries, endian: Endian) -> usize {
    let data: usize = entries
        .iter()
        .map(|(_, v)| v.bytes(endian).len())
        .filter(|&len| len > 4)
        .map(padded)
        .sum();
    2 + entries.len() * 12 + 4 + data
}

fn write_ifd(out: &mut Vec<u8>, entries: &Entries, endian: Endian) {
    let mut sorted = entries.clone();
    sorted.sort_by_key(|(tag, _)| *tag);

    let start = out.len();
    let mut data_at = start + 2 + sorted.len() * 12 + 4;
    let mut data = Vec::new();

    out.extend_from_slice(&endian.u16(sorted.len() as u16));
    for (tag, value) in &sorted {
        let bytes = value.bytes(endian);
        out.extend_from_slice(&endian.u16(*tag));
        out.extend_from_slice(&endian.u16(value.field_type()));
        out.extend_from_slice(&endian.u32(value.count()));
        if bytes.len() <= 4 {
            let mut inline = [0u8; 4];
            inline[..bytes.len()].copy_from_slice(&bytes);
            out.extend_from_slice(&inline);
        } else {
            out.extend_from_slice(&endian.u32(data_at as u32));
            data_at += padded(bytes.len());
            data.extend_from_slice(&bytes);
            if bytes.len() & 1 == 1 {
                data.push(0);
            }
        }
    }
    out.extend_from_slice(&endian.u32(0));
    out.extend_from_slice(&data);
}

/// One JPEG marker segment with its big-endian length.
pub fn jpeg_segment(marker: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0xFF, marker];
    out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

pub fn exif_segment(tiff: &[u8]) -> Vec<u8> {
    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(tiff);
    jpeg_segment(0xE1, &payload)
}

pub fn xmp_segment(xml: &str) -> Vec<u8> {
    let mut payload = b"http://ns.adobe.com/xap/1.0/\0".to_vec();
    payload.extend_from_slice(xml.as_bytes());
    jpeg_segment(0xE1, &payload)
}

pub fn iptc_segment() -> Vec<u8> {
    let mut payload = b"Photoshop 3.0\0".to_vec();
    payload.extend_from_slice(b"8BIM\x04\x04\0\0\0\0\0\x07\x1c\x02\x05\0\x02Hi");
    jpeg_segment(0xED, &payload)
}

/// SOI, the given segments, EOI.
pub fn jpeg_with(segments: &[Vec<u8>]) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8];
    for s in segments {
        out.extend_from_slice(s);
    }
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

pub fn jpeg_with_exif(tiff: &[u8]) -> Vec<u8> {
    jpeg_with(&[exif_segment(tiff)])
}

pub fn xmp_with_gps(latitude: &str, longitude: &str) -> String {
    format!(
        "<x:xmpmeta xmlns:x=\"adobe:ns:meta/\"><rdf:RDF><rdf:Description \
         xmlns:exif=\"http://ns.adobe.com/exif/1.0/\">\
         <exif:GPSLatitude>{}</exif:GPSLatitude>\
         <exif:GPSLongitude>{}</exif:GPSLongitude>\
         </rdf:Description></rdf:RDF></x:xmpmeta>",
        latitude, longitude
    )
}

/// A decodable JPEG, re-encoded by `image`.
pub fn encoded_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x * 7) as u8, (y * 5) as u8, 90]));
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, 90)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    out
}

/// Splice segments in right after SOI.
pub fn inject_after_soi(jpeg: &[u8], segments: &[Vec<u8>]) -> Vec<u8> {
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    let mut out = jpeg[..2].to_vec();
    for s in segments {
        out.extend_from_slice(s);
    }
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// PNG with IHDR, the given chunks and IEND. CRCs are zeroed.
pub fn png_with(chunks: &[(&[u8; 4], &[u8])]) -> Vec<u8> {
    let mut out = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    let mut push = |kind: &[u8; 4], data: &[u8]| {
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(kind);
        out.extend_from_slice(data);
        out.extend_from_slice(&[0, 0, 0, 0]);
    };
    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&1u32.to_be_bytes());
    ihdr.extend_from_slice(&1u32.to_be_bytes());
    ihdr.extend_from_slice(&[8, 2, 0, 0, 0]);
    push(b"IHDR", &ihdr);
    for &(kind, data) in chunks {
        push(kind, data);
    }
    push(b"IEND", &[]);
    out
}

/// RIFF/WEBP container holding the given chunks, padded to even sizes.
pub fn webp_with(chunks: &[(&[u8; 4], &[u8])]) -> Vec<u8> {
    let mut body = b"WEBP".to_vec();
    for &(fourcc, data) in chunks {
        body.extend_from_slice(fourcc);
        body.extend_from_slice(&(data.len() as u32).to_le_bytes());
        body.extend_from_slice(data);
        if data.len() & 1 == 1 {
            body.push(0);
        }
    }
    let mut out = b"RIFF".to_vec();
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(&body);
    out
}

/// CRC-32 (ISO-HDLC) as used by PNG chunks.
pub fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &b in bytes {
        crc ^= b as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

/// Insert a correctly framed chunk right after IHDR of an encoded PNG.
pub fn inject_png_chunk(png: &[u8], kind: &[u8; 4], data: &[u8]) -> Vec<u8> {
    // signature (8) + IHDR (4 + 4 + 13 + 4)
    let split = 33;
    let mut chunk = Vec::new();
    chunk.extend_from_slice(&(data.len() as u32).to_be_bytes());
    chunk.extend_from_slice(kind);
    chunk.extend_from_slice(data);
    chunk.extend_from_slice(&crc32(&chunk[4..]).to_be_bytes());

    let mut out = png[..split].to_vec();
    out.extend_from_slice(&chunk);
    out.extend_from_slice(&png[split..]);
    out
}

/// A decodable PNG, encoded by `image`.
pub fn encoded_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x * 3) as u8, 200, (y * 9) as u8]));
    let mut out = Vec::new();
    image::codecs::png::PngEncoder::new(&mut out)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    out
}
