// geoscrub - command-line front end for the scrub organ
// Reads and writes local files only.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use geoscrub::organ::{Organ, ScrubOrgan, Stimulus};
use geoscrub::reencode::{MAX_QUALITY, MIN_QUALITY};

#[derive(Parser)]
#[command(name = "geoscrub", version, about = "Find and strip location and camera metadata from photos")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Report the metadata each file carries
    Inspect(InspectArgs),
    /// Write metadata-free copies and verify them
    Strip(StripArgs),
}

#[derive(Args)]
struct InspectArgs {
    /// Image files to scan
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Emit the reports as JSON
    #[arg(long)]
    json: bool,

    /// Pretty-print JSON output
    #[arg(long, requires = "json")]
    pretty: bool,
}

#[derive(Args)]
struct StripArgs {
    /// Image files to clean
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Directory for the *_clean outputs
    #[arg(long = "out")]
    out: PathBuf,

    /// JPEG/WebP quality
    #[arg(long, default_value_t = 85, value_parser = clap::value_parser!(u8).range(MIN_QUALITY as i64..=MAX_QUALITY as i64))]
    quality: u8,

    /// Write every output as JPEG
    #[arg(long)]
    force_jpeg: bool,

    /// Keep the ICC color profile
    #[arg(long)]
    keep_icc: bool,

    /// Emit the results as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let organ = ScrubOrgan::new();

    let clean_run = match cli.command {
        Command::Inspect(args) => run_inspect(&organ, args).await?,
        Command::Strip(args) => run_strip(&organ, args).await?,
    };

    debug!("Metrics: {:?}", organ.metrics().snapshot());
    Ok(if clean_run { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn path_strings(files: &[PathBuf]) -> Vec<String> {
    files.iter().map(|p| p.to_string_lossy().into_owned()).collect()
}

async fn call(organ: &ScrubOrgan, op: &str, input: Value) -> Result<Value> {
    let response = organ
        .stimulate(Stimulus {
            op: op.to_string(),
            input,
            context: HashMap::new(),
        })
        .await
        .with_context(|| format!("{} failed", op))?;
    if !response.ok {
        bail!("{} rejected: {}", op, response.output);
    }
    debug!("{} finished in {}ms", op, response.latency_ms);
    Ok(response.output)
}

fn report_errors(errors: &Value) -> bool {
    let errors = errors.as_array().map(Vec::as_slice).unwrap_or_default();
    for entry in errors {
        error!(
            "{}: {}",
            entry["input_path"].as_str().unwrap_or("?"),
            entry["error"].as_str().unwrap_or("unknown error")
        );
    }
    errors.is_empty()
}

async fn run_inspect(organ: &ScrubOrgan, args: InspectArgs) -> Result<bool> {
    let output = call(organ, "metadata.inspect", json!({ "input_paths": path_strings(&args.files) })).await?;
    let clean_run = report_errors(&output["errors"]);

    if args.json {
        let text = if args.pretty {
            serde_json::to_string_pretty(&output["reports"])
        } else {
            serde_json::to_string(&output["reports"])
        }
        .context("Failed to serialize reports")?;
        println!("{}", text);
        return Ok(clean_run);
    }

    let reports = output["reports"].as_array().map(Vec::as_slice).unwrap_or_default();
    for report in reports {
        println!("{} ({}, {} bytes)", report["fileName"].as_str().unwrap_or("?"), report["fileType"].as_str().unwrap_or("?"), report["fileSize"]);
        if let Some(camera) = report["cameraInfo"].as_str() {
            println!("  camera:   {}", camera);
        }
        if let Some(taken) = report["dateTimeOriginal"].as_str() {
            println!("  taken:    {}", taken);
        }
        match (report["location"]["latitude"].as_f64(), report["location"]["longitude"].as_f64()) {
            (Some(lat), Some(lon)) => println!("  location: {:.6}, {:.6}", lat, lon),
            _ if report["hasGps"].as_bool() == Some(true) => println!("  location: present, coordinates not readable"),
            _ => {}
        }
        let found: Vec<&str> = report["metadataFound"]
            .as_array()
            .map(|a| a.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        if found.is_empty() {
            println!("  metadata: none");
        } else {
            println!("  metadata: {}", found.join(", "));
        }
    }
    Ok(clean_run)
}

async fn run_strip(organ: &ScrubOrgan, args: StripArgs) -> Result<bool> {
    let output = call(
        organ,
        "image.strip",
        json!({
            "input_paths": path_strings(&args.files),
            "output_dir": args.out.to_string_lossy(),
            "quality": args.quality,
            "force_jpeg": args.force_jpeg,
            "keep_icc": args.keep_icc,
        }),
    )
    .await?;

    let results = output["results"].as_array().map(Vec::as_slice).unwrap_or_default();
    let failed: Vec<Value> = results.iter().filter(|r| r.get("error").is_some()).cloned().collect();
    let clean_run = report_errors(&Value::Array(failed));

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output).context("Failed to serialize results")?);
        return Ok(clean_run);
    }

    for result in results.iter().filter(|r| r.get("error").is_none()) {
        let residual: Vec<&str> = result["residual"]
            .as_array()
            .map(|a| a.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        let status = if result["verified_clean"].as_bool() == Some(true) {
            "clean".to_string()
        } else {
            format!("WARNING still contains {}", residual.join(", "))
        };
        println!(
            "{} -> {} [{}]",
            result["input_path"].as_str().unwrap_or("?"),
            result["output_path"].as_str().unwrap_or("?"),
            status
        );
    }
    Ok(clean_run)
}
