//! GPS coordinate conversion and validation.
//!
//! Cameras without a satellite fix routinely write a GPS IFD full of zeros,
//! so a coordinate pair is only accepted when it passes [`validate`].

use serde::{Deserialize, Serialize};

/// Coordinates at or below this magnitude (degrees) are treated as
/// placeholder values.
pub const MIN_COORDINATE_MAGNITUDE: f64 = 0.0001;

/// Signed decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// What the scan learned about GPS for one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GpsStatus {
    /// No GPS block or GPS-looking tags at all.
    #[default]
    None,
    /// A GPS block exists but carries no usable fix.
    TagsWithoutFix,
    /// GPS was flagged (XMP heuristic) without recoverable coordinates.
    Unresolved,
    /// Coordinates were decoded and validated.
    Located,
}

impl GpsStatus {
    /// Whether the file should be reported as carrying GPS.
    pub fn has_gps(self) -> bool {
        matches!(self, GpsStatus::Unresolved | GpsStatus::Located)
    }
}

/// Raw GPS IFD values prior to validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpsTags {
    pub latitude_ref: Option<char>,
    pub latitude: Vec<f64>,
    pub longitude_ref: Option<char>,
    pub longitude: Vec<f64>,
}

/// `degrees + minutes/60 + seconds/3600`; missing components count as zero.
pub fn dms_to_decimal(components: &[f64]) -> f64 {
    let part = |i: usize| components.get(i).copied().unwrap_or(0.0);
    part(0) + part(1) / 60.0 + part(2) / 3600.0
}

/// Accept a decoded pair only if it looks like a real fix.
///
/// Requires at least degrees and minutes on both axes, both hemisphere
/// references, non-zero magnitudes above [`MIN_COORDINATE_MAGNITUDE`], and
/// values within ±90 / ±180.
pub fn validate(tags: &GpsTags) -> Option<Location> {
    if tags.latitude.len() < 2 || tags.longitude.len() < 2 {
        return None;
    }
    let (lat_ref, lon_ref) = (tags.latitude_ref?, tags.longitude_ref?);

    let latitude = dms_to_decimal(&tags.latitude);
    let longitude = dms_to_decimal(&tags.longitude);

    let plausible = |value: f64, limit: f64| {
        value.is_finite() && value.abs() > MIN_COORDINATE_MAGNITUDE && value.abs() <= limit
    };
    if !plausible(latitude, 90.0) || !plausible(longitude, 180.0) {
        return None;
    }

    Some(Location {
        latitude: if lat_ref.eq_ignore_ascii_case(&'S') { -latitude } else { latitude },
        longitude: if lon_ref.eq_ignore_ascii_case(&'W') { -longitude } else { longitude },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(lat_ref: char, lat: &[f64], lon_ref: char, lon: &[f64]) -> GpsTags {
        GpsTags {
            latitude_ref: Some(lat_ref),
            latitude: lat.to_vec(),
            longitude_ref: Some(lon_ref),
            longitude: lon.to_vec(),
        }
    }

    #[test]
    fn test_dms_conversion() {
        assert_eq!(dms_to_decimal(&[48.0, 51.0, 29.52]), 48.0 + 51.0 / 60.0 + 29.52 / 3600.0);
        assert_eq!(dms_to_decimal(&[10.0, 30.0]), 10.5);
        assert_eq!(dms_to_decimal(&[]), 0.0);
    }

    #[test]
    fn test_hemisphere_sign() {
        let loc = validate(&tags('S', &[33.0, 52.0, 4.0], 'W', &[151.0, 12.0, 36.0])).unwrap();
        assert!(loc.latitude < 0.0);
        assert!(loc.longitude < 0.0);
        assert!((loc.latitude + 33.867_777).abs() < 1e-4);
        assert!((loc.longitude + 151.21).abs() < 1e-4);
    }

    #[test]
    fn test_zeroed_fix_rejected() {
        assert_eq!(validate(&tags('N', &[0.0, 0.0, 0.0], 'E', &[0.0, 0.0, 0.0])), None);
        // One axis near zero is enough to reject
        assert_eq!(validate(&tags('N', &[0.0, 0.0, 0.1], 'E', &[12.0, 0.0, 0.0])), None);
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert_eq!(validate(&tags('N', &[91.0, 0.0, 0.0], 'E', &[12.0, 0.0, 0.0])), None);
        assert_eq!(validate(&tags('N', &[45.0, 0.0, 0.0], 'E', &[181.0, 0.0, 0.0])), None);
    }

    #[test]
    fn test_incomplete_tags_rejected() {
        assert_eq!(validate(&tags('N', &[45.0], 'E', &[12.0, 1.0])), None);
        let mut t = tags('N', &[45.0, 1.0], 'E', &[12.0, 1.0]);
        assert!(validate(&t).is_some());
        t.longitude_ref = None;
        assert_eq!(validate(&t), None);
    }

    #[test]
    fn test_status_flags() {
        assert!(!GpsStatus::None.has_gps());
        assert!(!GpsStatus::TagsWithoutFix.has_gps());
        assert!(GpsStatus::Unresolved.has_gps());
        assert!(GpsStatus::Located.has_gps());
    }
}
