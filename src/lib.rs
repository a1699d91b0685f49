//! geoscrub - local photo metadata detection and stripping
//!
//! Scans JPEG, PNG and WebP buffers for EXIF, GPS, XMP, IPTC, PNG text and
//! WebP metadata, produces cleaned copies by re-encoding pixels, and
//! re-scans the output to confirm nothing survived. Everything runs on local
//! bytes; nothing touches the network.
//!
//! ```rust,no_run
//! # fn main() -> std::io::Result<()> {
//! let data = std::fs::read("IMG_0042.jpg")?;
//! let report = geoscrub::inspect("IMG_0042.jpg", "image/jpeg", &data);
//! if let Some(location) = report.location {
//!     println!("{:.5}, {:.5}", location.latitude, location.longitude);
//! }
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod error;
pub mod exif;
pub mod format;
pub mod gps;
pub mod jpeg;
pub mod metrics;
pub mod organ;
pub mod png;
pub mod reader;
pub mod reencode;
pub mod report;
pub mod validation;
pub mod verify;
pub mod webp;
pub mod xmp;

pub use batch::{inspect_all, strip_all, strip_file, FileId, InputFile, StripOutcome};
pub use error::{ParseError, Result, ScrubError};
pub use format::{is_format_supported, resolve_mime, ContainerKind, SUPPORTED_FORMATS};
pub use gps::{GpsStatus, Location};
pub use metrics::{Metrics, MetricsSnapshot};
pub use organ::{Organ, OrganCard, OrganError, Response, ScrubOrgan, Stimulus};
pub use reencode::{clean_file_name, PixelReencoder, ProcessingOptions, Reencoded, Reencoder};
pub use report::{build_report, Dimensions, FileMetadataReport, MetadataCategory};
pub use verify::{verify_stripped, Verification};

/// Scan one buffer. Never fails; unreadable metadata is simply absent from
/// the report.
pub fn inspect(file_name: &str, mime_type: &str, data: &[u8]) -> FileMetadataReport {
    build_report(file_name, mime_type, data)
}
