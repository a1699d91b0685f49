//! Per-file metadata report.
//!
//! A report is built fresh for every buffer, both for the pre-processing
//! preview and again for the cleaned output. Parse failures inside a
//! segment never fail the report; they only drop that segment's fields.

use crate::exif;
use crate::format::ContainerKind;
use crate::gps::{GpsStatus, Location};
use crate::{jpeg, png, webp, xmp};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use tracing::{debug, info, warn};

/// EXIF `DateTime*` layout.
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Pixel dimensions from decoding the image itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Categories of metadata surfaced to the user, in detection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetadataCategory {
    #[serde(rename = "EXIF")]
    Exif,
    #[serde(rename = "GPS (found in EXIF)")]
    GpsInExif,
    #[serde(rename = "XMP")]
    Xmp,
    #[serde(rename = "GPS (found in XMP)")]
    GpsInXmp,
    #[serde(rename = "IPTC")]
    Iptc,
    #[serde(rename = "PNG text chunks")]
    PngText,
    #[serde(rename = "WebP metadata")]
    WebpMetadata,
}

impl MetadataCategory {
    pub fn label(self) -> &'static str {
        match self {
            MetadataCategory::Exif => "EXIF",
            MetadataCategory::GpsInExif => "GPS (found in EXIF)",
            MetadataCategory::Xmp => "XMP",
            MetadataCategory::GpsInXmp => "GPS (found in XMP)",
            MetadataCategory::Iptc => "IPTC",
            MetadataCategory::PngText => "PNG text chunks",
            MetadataCategory::WebpMetadata => "WebP metadata",
        }
    }
}

impl fmt::Display for MetadataCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything the scanner found in one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadataReport {
    pub file_name: String,
    pub file_size: u64,
    /// Declared MIME type
    pub file_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    pub has_exif: bool,
    pub has_gps: bool,
    /// Distinguishes recovered coordinates from GPS tags without a fix.
    pub gps_status: GpsStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time_original: Option<String>,
    pub metadata_found: Vec<MetadataCategory>,
}

impl FileMetadataReport {
    /// Empty report for a file, before any scanning.
    pub fn new(file_name: impl Into<String>, file_type: impl Into<String>, file_size: u64) -> Self {
        Self {
            file_name: file_name.into(),
            file_size,
            file_type: file_type.into(),
            dimensions: None,
            has_exif: false,
            has_gps: false,
            gps_status: GpsStatus::None,
            location: None,
            camera_info: None,
            date_time_original: None,
            metadata_found: Vec::new(),
        }
    }

    /// True when coordinates were decoded, not merely flagged.
    pub fn coordinates_recovered(&self) -> bool {
        self.location.is_some()
    }

    pub fn has_any_metadata(&self) -> bool {
        self.has_exif || self.has_gps || !self.metadata_found.is_empty()
    }

    /// `dateTimeOriginal` as a timestamp, when it follows the EXIF layout.
    pub fn captured_at(&self) -> Option<NaiveDateTime> {
        let raw = self.date_time_original.as_deref()?.trim();
        NaiveDateTime::parse_from_str(raw, EXIF_DATETIME_FORMAT).ok()
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.metadata_found.iter().map(|c| c.label()).collect()
    }

    fn push(&mut self, category: MetadataCategory) {
        if !self.metadata_found.contains(&category) {
            self.metadata_found.push(category);
        }
    }

    fn merge_gps(&mut self, status: GpsStatus) {
        // Located beats Unresolved beats TagsWithoutFix beats None.
        let rank = |s: GpsStatus| match s {
            GpsStatus::None => 0,
            GpsStatus::TagsWithoutFix => 1,
            GpsStatus::Unresolved => 2,
            GpsStatus::Located => 3,
        };
        if rank(status) > rank(self.gps_status) {
            self.gps_status = status;
        }
        self.has_gps = self.gps_status.has_gps();
    }

    fn apply_jpeg(&mut self, data: &[u8]) {
        if let Some(tiff) = jpeg::find_exif(data) {
            self.has_exif = true;
            self.push(MetadataCategory::Exif);
            match exif::decode(tiff) {
                Ok(summary) => {
                    self.camera_info = summary.camera_info();
                    self.date_time_original = summary.date_time_original.clone();
                    self.merge_gps(summary.gps_status());
                    if let Some(location) = summary.location {
                        self.location = Some(location);
                        self.push(MetadataCategory::GpsInExif);
                    }
                }
                Err(e) => warn!("EXIF in {} could not be decoded: {}", self.file_name, e),
            }
        }

        let xmp = xmp::scan_jpeg(data);
        if xmp.has_xmp {
            self.push(MetadataCategory::Xmp);
            if xmp.has_gps {
                self.merge_gps(GpsStatus::Unresolved);
                self.push(MetadataCategory::GpsInXmp);
            }
        }

        if jpeg::has_iptc(data) {
            self.push(MetadataCategory::Iptc);
        }
    }

    fn apply_png(&mut self, data: &[u8]) {
        if png::has_text_chunks(data) {
            self.push(MetadataCategory::PngText);
        }
    }

    fn apply_webp(&mut self, data: &[u8]) {
        let scan = webp::scan(data);
        if scan.has_exif {
            self.has_exif = true;
            self.push(MetadataCategory::Exif);
        }
        if scan.has_metadata() {
            self.push(MetadataCategory::WebpMetadata);
        }
    }
}

/// Decode just enough of the image to learn its size. Failure is not an
/// error, the field is simply left out.
pub fn probe_dimensions(data: &[u8]) -> Option<Dimensions> {
    let reader = image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?;
    match reader.into_dimensions() {
        Ok((width, height)) => Some(Dimensions { width, height }),
        Err(e) => {
            debug!("Dimension probe failed: {}", e);
            None
        }
    }
}

/// Build the report for one buffer, dispatching on the declared MIME type.
///
/// Unsupported types are not an error: the report comes back with every
/// flag cleared.
pub fn build_report(file_name: &str, mime_type: &str, data: &[u8]) -> FileMetadataReport {
    let mut report = FileMetadataReport::new(file_name, mime_type, data.len() as u64);
    report.dimensions = probe_dimensions(data);

    match ContainerKind::from_mime(mime_type) {
        ContainerKind::Jpeg => report.apply_jpeg(data),
        ContainerKind::Png => report.apply_png(data),
        ContainerKind::WebP => report.apply_webp(data),
        other => debug!("No metadata detection for {:?} ({})", other, mime_type),
    }

    info!(
        file = %report.file_name,
        has_exif = report.has_exif,
        has_gps = report.has_gps,
        gps = ?report.gps_status,
        found = ?report.labels(),
        "Metadata scan complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_type_is_empty() {
        let report = build_report("notes.txt", "text/plain", b"hello world");
        assert!(!report.has_any_metadata());
        assert_eq!(report.gps_status, GpsStatus::None);
        assert_eq!(report.file_size, 11);
        assert_eq!(report.dimensions, None);
    }

    #[test]
    fn test_gps_merge_never_downgrades() {
        let mut report = FileMetadataReport::new("a.jpg", "image/jpeg", 0);
        report.merge_gps(GpsStatus::Located);
        report.merge_gps(GpsStatus::Unresolved);
        assert_eq!(report.gps_status, GpsStatus::Located);
        assert!(report.has_gps);

        let mut tagged = FileMetadataReport::new("b.jpg", "image/jpeg", 0);
        tagged.merge_gps(GpsStatus::TagsWithoutFix);
        assert!(!tagged.has_gps);
    }

    #[test]
    fn test_captured_at() {
        let mut report = FileMetadataReport::new("a.jpg", "image/jpeg", 0);
        report.date_time_original = Some("2023:07:14 18:22:05".into());
        let ts = report.captured_at().unwrap();
        assert_eq!(ts.to_string(), "2023-07-14 18:22:05");
        report.date_time_original = Some("    :  :     :  :  ".into());
        assert!(report.captured_at().is_none());
    }

    #[test]
    fn test_serialized_field_names() {
        let mut report = FileMetadataReport::new("a.png", "image/png", 3);
        report.metadata_found.push(MetadataCategory::PngText);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["fileName"], "a.png");
        assert_eq!(json["hasGps"], false);
        assert_eq!(json["gpsStatus"], "none");
        assert_eq!(json["metadataFound"][0], "PNG text chunks");
        assert!(json.get("location").is_none());
    }
}
