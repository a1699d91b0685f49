//! Metrics and observability for geoscrub

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use serde::{Deserialize, Serialize};

use crate::gps::GpsStatus;
use crate::report::FileMetadataReport;

/// Process-wide counters, shared behind an `Arc`.
#[derive(Default)]
pub struct Metrics {
    pub total_requests: AtomicU64,
    pub successful_requests: AtomicU64,
    pub failed_requests: AtomicU64,
    pub total_latency_ms: AtomicU64,

    // Per-file counters
    pub files_inspected: AtomicU64,
    pub gps_located: AtomicU64,
    pub gps_tags_without_fix: AtomicU64,
    pub files_stripped: AtomicU64,
    pub strip_failures: AtomicU64,
    pub verification_warnings: AtomicU64,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_request(&self, success: bool, latency_ms: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }

        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
    }

    /// Count one pre-processing scan.
    pub fn record_inspection(&self, report: &FileMetadataReport) {
        self.files_inspected.fetch_add(1, Ordering::Relaxed);
        match report.gps_status {
            GpsStatus::Located => {
                self.gps_located.fetch_add(1, Ordering::Relaxed);
            }
            GpsStatus::TagsWithoutFix => {
                self.gps_tags_without_fix.fetch_add(1, Ordering::Relaxed);
            }
            GpsStatus::None | GpsStatus::Unresolved => {}
        }
    }

    pub fn record_strip(&self, success: bool, verified_clean: bool) {
        if !success {
            self.strip_failures.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.files_stripped.fetch_add(1, Ordering::Relaxed);
        if !verified_clean {
            self.verification_warnings.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.total_requests.load(Ordering::Relaxed);
        let failed = self.failed_requests.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);

        MetricsSnapshot {
            total_requests: total,
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: failed,
            error_rate: if total > 0 { failed as f64 / total as f64 } else { 0.0 },
            avg_latency_ms: if total > 0 { total_latency / total } else { 0 },
            files: FileMetrics {
                inspected: self.files_inspected.load(Ordering::Relaxed),
                gps_located: self.gps_located.load(Ordering::Relaxed),
                gps_tags_without_fix: self.gps_tags_without_fix.load(Ordering::Relaxed),
                stripped: self.files_stripped.load(Ordering::Relaxed),
                strip_failures: self.strip_failures.load(Ordering::Relaxed),
                verification_warnings: self.verification_warnings.load(Ordering::Relaxed),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub error_rate: f64,
    pub avg_latency_ms: u64,
    pub files: FileMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetrics {
    pub inspected: u64,
    pub gps_located: u64,
    pub gps_tags_without_fix: u64,
    pub stripped: u64,
    pub strip_failures: u64,
    pub verification_warnings: u64,
}

/// Timer for tracking operation latency
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_counters() {
        let metrics = Metrics::new();
        metrics.record_request(true, 10);
        metrics.record_request(false, 30);
        let snap = metrics.snapshot();
        assert_eq!(snap.total_requests, 2);
        assert_eq!(snap.failed_requests, 1);
        assert_eq!(snap.avg_latency_ms, 20);
        assert!((snap.error_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_file_counters() {
        let metrics = Metrics::new();
        let mut report = FileMetadataReport::new("a.jpg", "image/jpeg", 0);
        report.gps_status = GpsStatus::TagsWithoutFix;
        metrics.record_inspection(&report);
        metrics.record_strip(true, false);
        metrics.record_strip(false, false);
        let files = metrics.snapshot().files;
        assert_eq!(files.inspected, 1);
        assert_eq!(files.gps_tags_without_fix, 1);
        assert_eq!(files.stripped, 1);
        assert_eq!(files.strip_failures, 1);
        assert_eq!(files.verification_warnings, 1);
    }
}
