//! XMP presence and heuristic GPS detection.
//!
//! XML is not regular, so this is presence detection only: a match tells the
//! report that GPS is present in XMP, it never produces coordinates.

use crate::gps::MIN_COORDINATE_MAGNITUDE;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Bytes of the packet scanned for GPS tags.
pub const XMP_SCAN_WINDOW: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Latitude,
    Longitude,
}

/// Element bodies like `<exif:GPSLatitude>48,51.492N</exif:GPSLatitude>`.
/// The captured group is the numeric part, an optional hemisphere letter
/// may follow.
static GPS_PATTERNS: LazyLock<Vec<(Axis, Regex)>> = LazyLock::new(|| {
    const VALUE: &str = r"([0-9]+(?:\.[0-9]+)?(?:[,/][0-9]+(?:\.[0-9]+)?)*)[NSEW]?<";
    [
        (Axis::Latitude, "GPSLatitude"),
        (Axis::Longitude, "GPSLongitude"),
        (Axis::Latitude, "exif:GPSLatitude"),
        (Axis::Longitude, "exif:GPSLongitude"),
    ]
    .into_iter()
    .filter_map(|(axis, tag)| {
        Regex::new(&format!(r"(?i){}[^>]*>{}", tag, VALUE))
            .ok()
            .map(|re| (axis, re))
    })
    .collect()
});

/// Result of scanning a JPEG's XMP packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XmpScan {
    pub has_xmp: bool,
    pub has_gps: bool,
}

/// Scan an XMP packet (bytes after the namespace header).
pub fn scan_packet(packet: &[u8]) -> XmpScan {
    let window = &packet[..packet.len().min(XMP_SCAN_WINDOW)];
    let text = String::from_utf8_lossy(window);
    XmpScan {
        has_xmp: true,
        has_gps: has_gps_coordinates(&text),
    }
}

/// Scan a JPEG for an XMP APP1 segment.
pub fn scan_jpeg(data: &[u8]) -> XmpScan {
    crate::jpeg::find_xmp(data).map(scan_packet).unwrap_or_default()
}

/// Both a latitude-like and a longitude-like tag must carry a plausible
/// non-zero value.
pub fn has_gps_coordinates(xml: &str) -> bool {
    let mut latitude = None;
    let mut longitude = None;
    for (axis, pattern) in GPS_PATTERNS.iter() {
        let Some(value) = pattern.captures(xml).and_then(|c| c.get(1)) else {
            continue;
        };
        let Some(number) = leading_value(value.as_str()) else {
            debug!("Ignoring placeholder XMP {:?} value {:?}", axis, value.as_str());
            continue;
        };
        match axis {
            Axis::Latitude => latitude = Some(number),
            Axis::Longitude => longitude = Some(number),
        }
        if latitude.is_some() && longitude.is_some() {
            return true;
        }
    }
    false
}

/// First component of a `deg,min` / `num/den` style value, if it is a
/// usable coordinate.
fn leading_value(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "0" {
        return None;
    }
    let head = raw.split([',', '/']).next()?;
    let value: f64 = head.parse().ok()?;
    (value != 0.0 && value.abs() > MIN_COORDINATE_MAGNITUDE).then_some(value)
}
