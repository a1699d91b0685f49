//! Multi-file orchestration.
//!
//! Each file is independent: inspection fans out over rayon, stripping runs
//! one blocking task per file. Results are keyed by [`FileId`] and resolved
//! independently, so one failing file never affects its siblings.

use crate::error::{Result, ScrubError};
use crate::format::ContainerKind;
use crate::metrics::Metrics;
use crate::reencode::{clean_file_name, ProcessingOptions, Reencoded, Reencoder};
use crate::report::{build_report, FileMetadataReport};
use crate::verify::{verify_stripped, Verification};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Position of a file within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileId(pub usize);

/// One file's bytes plus what the caller declared about it.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn report(&self) -> FileMetadataReport {
        build_report(&self.name, &self.mime_type, &self.data)
    }
}

/// A cleaned file together with its before/after scans.
#[derive(Debug, Clone)]
pub struct StripOutcome {
    pub file_name: String,
    pub output_name: String,
    pub output: Reencoded,
    pub before: FileMetadataReport,
    pub verification: Verification,
}

/// Scan every file, in parallel, preserving input order.
pub fn inspect_all(files: &[InputFile], metrics: &Metrics) -> Vec<FileMetadataReport> {
    files
        .par_iter()
        .map(|file| {
            let report = file.report();
            metrics.record_inspection(&report);
            report
        })
        .collect()
}

/// Scan, re-encode and verify a single file.
pub fn strip_file(file: &InputFile, options: &ProcessingOptions, reencoder: &dyn Reencoder) -> Result<StripOutcome> {
    let before = file.report();
    let source = ContainerKind::from_mime(&file.mime_type);
    let output = reencoder.reencode(&file.data, source, options)?;

    let output_name = clean_file_name(&file.name, options.force_jpeg, output.kind);
    let output_mime = output.kind.mime_type().unwrap_or("application/octet-stream");
    let verification = verify_stripped(&output_name, output_mime, &output.bytes);

    info!(
        "Stripped {} -> {} ({} bytes, clean: {})",
        file.name,
        output_name,
        output.bytes.len(),
        verification.clean
    );

    Ok(StripOutcome {
        file_name: file.name.clone(),
        output_name,
        output,
        before,
        verification,
    })
}

/// Strip every file on the blocking pool, one task per file.
///
/// Invalid options fail the whole call up front; after that every file gets
/// its own `Result`.
pub async fn strip_all(
    files: Vec<InputFile>,
    options: ProcessingOptions,
    reencoder: Arc<dyn Reencoder>,
    metrics: Arc<Metrics>,
) -> Result<BTreeMap<FileId, Result<StripOutcome>>> {
    options.validate()?;

    let tasks: BTreeMap<FileId, JoinHandle<Result<StripOutcome>>> = files
        .into_iter()
        .enumerate()
        .map(|(index, file)| {
            let reencoder = Arc::clone(&reencoder);
            let handle = tokio::task::spawn_blocking(move || strip_file(&file, &options, reencoder.as_ref()));
            (FileId(index), handle)
        })
        .collect();

    let mut results = BTreeMap::new();
    for (id, handle) in tasks {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(ScrubError::TaskFailed(format!("file #{} task failed: {}", id.0, e))),
        };
        match &result {
            Ok(outcome) => metrics.record_strip(true, outcome.verification.clean),
            Err(e) => {
                error!("File #{} could not be stripped: {}", id.0, e);
                metrics.record_strip(false, false);
            }
        }
        results.insert(id, result);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reencode::PixelReencoder;

    struct FailingReencoder;

    impl Reencoder for FailingReencoder {
        fn reencode(&self, _: &[u8], _: ContainerKind, _: &ProcessingOptions) -> Result<Reencoded> {
            Err(ScrubError::Encode("boom".into()))
        }
    }

    #[test]
    fn test_inspect_all_preserves_order() {
        let files = vec![
            InputFile::new("a.txt", "text/plain", b"a".to_vec()),
            InputFile::new("b.txt", "text/plain", b"bb".to_vec()),
        ];
        let metrics = Metrics::new();
        let reports = inspect_all(&files, &metrics);
        assert_eq!(reports[0].file_name, "a.txt");
        assert_eq!(reports[1].file_size, 2);
        assert_eq!(metrics.snapshot().files.inspected, 2);
    }

    #[tokio::test]
    async fn test_invalid_options_rejected() {
        let options = ProcessingOptions { quality: 10, ..Default::default() };
        let result = strip_all(Vec::new(), options, Arc::new(PixelReencoder::new()), Metrics::new()).await;
        assert!(matches!(result, Err(ScrubError::InvalidOption(_))));
    }

    #[tokio::test]
    async fn test_failure_is_per_file() {
        let files = vec![
            InputFile::new("a.jpg", "image/jpeg", vec![0xFF, 0xD8]),
            InputFile::new("b.jpg", "image/jpeg", vec![0xFF, 0xD8]),
        ];
        let metrics = Metrics::new();
        let results = strip_all(files, ProcessingOptions::default(), Arc::new(FailingReencoder), Arc::clone(&metrics))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.values().all(|r| r.is_err()));
        assert_eq!(metrics.snapshot().files.strip_failures, 2);
    }
}
