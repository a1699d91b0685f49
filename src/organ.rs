//! Stimulus/response interface for geoscrub
//!
//! Exposes the scanner, the stripper and the verifier as named operations so
//! an orchestrator (or the bundled CLI) can discover and invoke them.
//!
//! ## Available Operations
//!
//! 1. `metadata.inspect` - Pre-processing metadata report per file
//! 2. `image.strip` - Re-encode files without metadata and verify the output
//! 3. `image.verify` - Re-scan an already cleaned file
//! 4. `scrub.capabilities` - Capability card query
//! 5. `metrics` - Counter snapshot
//!
//! ## Example
//!
//! ```rust,no_run
//! use geoscrub::organ::{Organ, ScrubOrgan, Stimulus};
//! use serde_json::json;
//! use std::collections::HashMap;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let organ = ScrubOrgan::new();
//!
//! let response = organ.stimulate(Stimulus {
//!     op: "metadata.inspect".to_string(),
//!     input: json!({"input_paths": ["IMG_0042.jpg"]}),
//!     context: HashMap::new(),
//! }).await?;
//! println!("{}", response.output["reports"][0]["hasGps"]);
//! # Ok(())
//! # }
//! ```

use crate::batch::{self, FileId, InputFile};
use crate::error::ScrubError;
use crate::format::resolve_mime;
use crate::metrics::{Metrics, Timer};
use crate::reencode::{PixelReencoder, ProcessingOptions, Reencoder, MAX_QUALITY, MIN_QUALITY};
use crate::validation::validate_input;
use crate::verify::verify_stripped;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

pub const OPERATIONS: &[&str] = &[
    "metadata.inspect",
    "image.strip",
    "image.verify",
    "scrub.capabilities",
    "metrics",
];

/// Stimulus - input to organ operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stimulus {
    pub op: String,
    pub input: Value,
    #[serde(default)]
    pub context: HashMap<String, String>,
}

/// Response - output from organ operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    pub output: Value,
    pub latency_ms: u64,
    pub cost: Option<f64>,
}

#[async_trait]
pub trait Organ: Send + Sync {
    async fn stimulate(&self, stimulus: Stimulus) -> Result<Response, OrganError>;
    fn describe(&self) -> OrganCard;
}

#[derive(Debug, Error)]
pub enum OrganError {
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Processing error: {0}")]
    ProcessingError(#[from] ScrubError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl OrganError {
    fn from_validation(err: ScrubError) -> Self {
        match err {
            ScrubError::InvalidInput(msg) | ScrubError::InvalidOption(msg) => OrganError::InvalidInput(msg),
            other => OrganError::ProcessingError(other),
        }
    }
}

/// Organ capability card
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganCard {
    pub name: String,
    pub version: String,
    pub description: String,
    pub division: String,
    pub subsystem: String,
    pub tags: Vec<String>,
    pub execution_modes: Vec<String>,
    pub functions: Vec<FunctionCard>,
}

/// Function capability card
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCard {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub examples: Vec<String>,
    pub idempotent: bool,
    pub side_effects: Vec<String>,
    pub input_schema: Option<Value>,
    pub output_schema: Value,
}

/// Photo privacy organ: metadata inspection, stripping and verification.
pub struct ScrubOrgan {
    metrics: Arc<Metrics>,
    reencoder: Arc<dyn Reencoder>,
}

impl ScrubOrgan {
    pub fn new() -> Self {
        Self::with_reencoder(Arc::new(PixelReencoder::new()))
    }

    pub fn with_reencoder(reencoder: Arc<dyn Reencoder>) -> Self {
        Self {
            metrics: Metrics::new(),
            reencoder,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    fn input_schema(&self, op: &str) -> Option<Value> {
        self.describe()
            .functions
            .into_iter()
            .find(|f| f.name == op)
            .and_then(|f| f.input_schema)
    }

    /// Read every path; unreadable files come back as `(path, error)`.
    async fn load_files(paths: &[String], mime_type: Option<&str>) -> (Vec<(PathBuf, InputFile)>, Vec<Value>) {
        let mut loaded = Vec::with_capacity(paths.len());
        let mut errors = Vec::new();
        for path in paths {
            let path = PathBuf::from(path);
            match tokio::fs::read(&path).await {
                Ok(data) => {
                    let mime = resolve_mime(mime_type, &data);
                    let name = display_name(&path);
                    loaded.push((path, InputFile::new(name, mime, data)));
                }
                Err(e) => {
                    warn!("Failed to read {}: {}", path.display(), e);
                    errors.push(json!({
                        "input_path": path.to_string_lossy(),
                        "error": e.to_string(),
                    }));
                }
            }
        }
        (loaded, errors)
    }

    /// Handle metadata.inspect operation
    async fn handle_inspect(&self, input: Value) -> Result<Value, OrganError> {
        let paths = string_array(&input, "input_paths")?;
        let mime_type = input["mime_type"].as_str();

        let (loaded, errors) = Self::load_files(&paths, mime_type).await;
        let files: Vec<InputFile> = loaded.into_iter().map(|(_, file)| file).collect();

        let metrics = Arc::clone(&self.metrics);
        let reports = tokio::task::spawn_blocking(move || batch::inspect_all(&files, &metrics))
            .await
            .map_err(|e| ScrubError::TaskFailed(e.to_string()))?;

        Ok(json!({
            "reports": reports,
            "errors": errors,
        }))
    }

    /// Handle image.strip operation
    async fn handle_strip(&self, input: Value) -> Result<Value, OrganError> {
        let paths = string_array(&input, "input_paths")?;
        let output_dir = input["output_dir"]
            .as_str()
            .map(PathBuf::from)
            .ok_or_else(|| OrganError::InvalidInput("Missing output_dir".to_string()))?;
        let options = parse_options(&input)?;

        tokio::fs::create_dir_all(&output_dir).await.map_err(ScrubError::from)?;

        let (loaded, mut results) = Self::load_files(&paths, None).await;
        let (sources, files): (Vec<PathBuf>, Vec<InputFile>) = loaded.into_iter().unzip();

        let outcomes = batch::strip_all(files, options, Arc::clone(&self.reencoder), Arc::clone(&self.metrics)).await?;

        let mut taken = HashSet::new();
        for (FileId(index), outcome) in outcomes {
            let source = sources.get(index).map(|p| p.to_string_lossy().into_owned()).unwrap_or_default();
            let entry = match outcome {
                Ok(outcome) => {
                    let output_path = output_dir.join(unique_output_name(&outcome.output_name, &mut taken));
                    match tokio::fs::write(&output_path, &outcome.output.bytes).await {
                        Ok(()) => json!({
                            "input_path": source,
                            "file_name": outcome.file_name,
                            "output_path": output_path.to_string_lossy(),
                            "size_bytes": outcome.output.bytes.len(),
                            "format": outcome.output.kind,
                            "before": outcome.before,
                            "verified_clean": outcome.verification.clean,
                            "residual": outcome.verification.residual(),
                        }),
                        Err(e) => json!({
                            "input_path": source,
                            "file_name": outcome.file_name,
                            "error": format!("Failed to write {}: {}", output_path.display(), e),
                        }),
                    }
                }
                Err(e) => json!({
                    "input_path": source,
                    "error": e.to_string(),
                }),
            };
            results.push(entry);
        }

        Ok(json!({
            "output_dir": output_dir.to_string_lossy(),
            "options": options,
            "results": results,
        }))
    }

    /// Handle image.verify operation
    async fn handle_verify(&self, input: Value) -> Result<Value, OrganError> {
        let input_path = input["input_path"]
            .as_str()
            .ok_or_else(|| OrganError::InvalidInput("Missing input_path".to_string()))?;
        let data = tokio::fs::read(input_path).await.map_err(ScrubError::from)?;
        let mime = resolve_mime(input["mime_type"].as_str(), &data);
        let name = display_name(Path::new(input_path));

        let verification = tokio::task::spawn_blocking(move || verify_stripped(&name, &mime, &data))
            .await
            .map_err(|e| ScrubError::TaskFailed(e.to_string()))?;

        Ok(json!({
            "clean": verification.clean,
            "residual": verification.residual(),
            "report": verification.report,
        }))
    }

    /// Handle scrub.capabilities operation
    fn handle_capabilities(&self) -> Result<Value, OrganError> {
        let card = self.describe();
        serde_json::to_value(&card).map_err(OrganError::SerializationError)
    }
}

impl Default for ScrubOrgan {
    fn default() -> Self {
        Self::new()
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// `name`, or `stem-{n}.ext` for the first `n` not yet used in this batch.
fn unique_output_name(name: &str, taken: &mut HashSet<String>) -> String {
    let mut candidate = name.to_string();
    let mut n = 1;
    while taken.contains(&candidate) {
        candidate = match name.rsplit_once('.') {
            Some((stem, ext)) => format!("{}-{}.{}", stem, n, ext),
            None => format!("{}-{}", name, n),
        };
        n += 1;
    }
    if n > 1 {
        debug!("Output name {} already used in batch, writing {}", name, candidate);
    }
    taken.insert(candidate.clone());
    candidate
}

fn string_array(input: &Value, key: &str) -> Result<Vec<String>, OrganError> {
    let values = input[key]
        .as_array()
        .ok_or_else(|| OrganError::InvalidInput(format!("Missing {}", key)))?;
    values
        .iter()
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| OrganError::InvalidInput(format!("{} must contain strings", key)))
        })
        .collect()
}

fn parse_options(input: &Value) -> Result<ProcessingOptions, OrganError> {
    let defaults = ProcessingOptions::default();
    let quality = match input["quality"].as_u64() {
        Some(q) => u8::try_from(q).map_err(|_| OrganError::InvalidInput(format!("quality out of range: {}", q)))?,
        None => defaults.quality,
    };
    let options = ProcessingOptions {
        keep_icc: input["keep_icc"].as_bool().unwrap_or(defaults.keep_icc),
        force_jpeg: input["force_jpeg"].as_bool().unwrap_or(defaults.force_jpeg),
        quality,
    };
    options.validate().map_err(OrganError::from_validation)?;
    Ok(options)
}

#[async_trait]
impl Organ for ScrubOrgan {
    async fn stimulate(&self, stimulus: Stimulus) -> Result<Response, OrganError> {
        let timer = Timer::new();
        let op = stimulus.op.as_str();

        if !OPERATIONS.contains(&op) {
            let latency = timer.elapsed_ms();
            self.metrics.record_request(false, latency);
            return Ok(Response {
                ok: false,
                output: json!({
                    "error": "UnsupportedOperation",
                    "op": op,
                    "available_operations": OPERATIONS,
                }),
                latency_ms: latency,
                cost: None,
            });
        }

        if let Some(schema) = self.input_schema(op) {
            if let Err(e) = validate_input(&stimulus.input, &schema) {
                self.metrics.record_request(false, timer.elapsed_ms());
                return Err(OrganError::from_validation(e));
            }
        }

        debug!("Dispatching {}", op);
        let result = match op {
            "metadata.inspect" => self.handle_inspect(stimulus.input).await,
            "image.strip" => self.handle_strip(stimulus.input).await,
            "image.verify" => self.handle_verify(stimulus.input).await,
            "scrub.capabilities" => self.handle_capabilities(),
            "metrics" => serde_json::to_value(self.metrics.snapshot()).map_err(OrganError::from),
            other => Err(OrganError::UnsupportedOperation(other.to_string())),
        };

        let latency = timer.elapsed_ms();
        self.metrics.record_request(result.is_ok(), latency);

        Ok(Response {
            ok: true,
            output: result?,
            latency_ms: latency,
            cost: None,
        })
    }

    fn describe(&self) -> OrganCard {
        OrganCard {
            name: "geoscrub".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Local photo privacy organ: detects EXIF/GPS/XMP/IPTC/PNG/WebP metadata and produces verified metadata-free copies".to_string(),
            division: "media".to_string(),
            subsystem: "privacy".to_string(),
            tags: vec![
                "image".to_string(),
                "metadata".to_string(),
                "exif".to_string(),
                "gps".to_string(),
                "privacy".to_string(),
                "strip".to_string(),
            ],
            execution_modes: vec!["embedded".to_string(), "cli".to_string()],
            functions: vec![
                FunctionCard {
                    name: "metadata.inspect".to_string(),
                    description: "Scan images for EXIF, GPS, XMP, IPTC, PNG text and WebP metadata before processing".to_string(),
                    tags: vec!["metadata".to_string(), "exif".to_string(), "gps".to_string()],
                    examples: vec![
                        "Check whether a photo leaks its GPS location".to_string(),
                        "List the metadata categories present in a batch of uploads".to_string(),
                    ],
                    idempotent: true,
                    side_effects: vec!["reads image files".to_string()],
                    input_schema: Some(json!({
                        "type": "object",
                        "properties": {
                            "input_paths": { "type": "array", "items": { "type": "string" }, "description": "Image files to scan" },
                            "mime_type": { "type": "string", "description": "Declared MIME type for every file (default: sniffed)" }
                        },
                        "required": ["input_paths"]
                    })),
                    output_schema: json!({
                        "type": "object",
                        "properties": {
                            "reports": { "type": "array" },
                            "errors": { "type": "array" }
                        }
                    }),
                },
                FunctionCard {
                    name: "image.strip".to_string(),
                    description: "Re-encode images from their pixels so no metadata survives, then verify each output".to_string(),
                    tags: vec!["image".to_string(), "privacy".to_string(), "strip".to_string()],
                    examples: vec![
                        "Remove GPS coordinates before sharing a photo".to_string(),
                        "Convert PNG and WebP screenshots to clean JPEGs".to_string(),
                    ],
                    idempotent: true,
                    side_effects: vec!["writes image files".to_string()],
                    input_schema: Some(json!({
                        "type": "object",
                        "properties": {
                            "input_paths": { "type": "array", "items": { "type": "string" }, "description": "Image files to clean" },
                            "output_dir": { "type": "string", "description": "Directory for the *_clean files" },
                            "quality": { "type": "integer", "minimum": MIN_QUALITY, "maximum": MAX_QUALITY, "description": "JPEG/WebP quality (default: 85)" },
                            "force_jpeg": { "type": "boolean", "description": "Write every output as JPEG (default: false)" },
                            "keep_icc": { "type": "boolean", "description": "Keep the ICC color profile (default: false)" }
                        },
                        "required": ["input_paths", "output_dir"]
                    })),
                    output_schema: json!({
                        "type": "object",
                        "properties": {
                            "output_dir": { "type": "string" },
                            "results": { "type": "array" }
                        }
                    }),
                },
                FunctionCard {
                    name: "image.verify".to_string(),
                    description: "Re-scan a processed image and report any metadata left behind".to_string(),
                    tags: vec!["metadata".to_string(), "verification".to_string()],
                    examples: vec!["Confirm a cleaned photo has no GPS tags".to_string()],
                    idempotent: true,
                    side_effects: vec!["reads image file".to_string()],
                    input_schema: Some(json!({
                        "type": "object",
                        "properties": {
                            "input_path": { "type": "string", "description": "Processed image" },
                            "mime_type": { "type": "string", "description": "Declared MIME type (default: sniffed)" }
                        },
                        "required": ["input_path"]
                    })),
                    output_schema: json!({
                        "type": "object",
                        "properties": {
                            "clean": { "type": "boolean" },
                            "residual": { "type": "array", "items": { "type": "string" } },
                            "report": { "type": "object" }
                        }
                    }),
                },
                FunctionCard {
                    name: "scrub.capabilities".to_string(),
                    description: "Return organ capability card with all available functions".to_string(),
                    tags: vec!["discovery".to_string()],
                    examples: vec!["Discover available metadata operations".to_string()],
                    idempotent: true,
                    side_effects: vec![],
                    input_schema: None,
                    output_schema: json!({
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "version": { "type": "string" },
                            "functions": { "type": "array" }
                        }
                    }),
                },
                FunctionCard {
                    name: "metrics".to_string(),
                    description: "Return request and per-file counters".to_string(),
                    tags: vec!["observability".to_string()],
                    examples: vec!["Count how many files still had metadata after stripping".to_string()],
                    idempotent: true,
                    side_effects: vec![],
                    input_schema: None,
                    output_schema: json!({ "type": "object" }),
                },
            ],
        }
    }
}
