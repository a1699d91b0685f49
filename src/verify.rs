//! Post-strip verification.
//!
//! The cleaned bytes go through the same scan as the original. Residual
//! metadata is a diagnostic: it is logged and reported, but the cleaned file
//! is still delivered.

use crate::report::{build_report, FileMetadataReport};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Outcome of re-scanning a cleaned file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub report: FileMetadataReport,
    /// No GPS and no metadata categories remain.
    pub clean: bool,
}

impl Verification {
    /// Labels of whatever survived stripping.
    pub fn residual(&self) -> Vec<&'static str> {
        self.report.labels()
    }
}

/// Re-run the metadata scan on `output` and flag anything left behind.
pub fn verify_stripped(file_name: &str, mime_type: &str, output: &[u8]) -> Verification {
    let report = build_report(file_name, mime_type, output);
    let clean = !report.has_gps && report.metadata_found.is_empty();
    if clean {
        debug!("Verified {} is free of metadata", file_name);
    } else {
        warn!(
            file = %file_name,
            has_gps = report.has_gps,
            residual = ?report.labels(),
            "Stripping incomplete: processed file still contains metadata"
        );
    }
    Verification { report, clean }
}
