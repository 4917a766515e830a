//! Flight entry point for the onboard substorm processor.
//!
//! Opens the IEU pipe, announces readiness, then services frames until the
//! stream closes. Run with `RUST_LOG=debug` for per-frame tracing.

use anyhow::{Context, Result};
use clap::Parser;
use onboard::{FrameFormat, FrameReader, Pipeline, PipelineConfig, ResultWriter};
use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use substorm::LogisticModel;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Onboard auroral substorm detection over the IEU pipe")]
struct Args {
    /// Pipe device carrying raw frames and results
    #[arg(long, default_value = "/dev/rtp0")]
    pipe: PathBuf,

    /// Raw frame layout on the pipe; overrides the config file when given
    #[arg(long, value_enum)]
    format: Option<FrameFormat>,

    /// Classifier model file (JSON)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Pipeline configuration file (JSON) overriding the flight defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG still takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => PipelineConfig::default(),
    };
    if let Some(format) = args.format {
        config.format = format;
    }
    Ok(config)
}

fn load_model(args: &Args) -> Result<LogisticModel> {
    match &args.model {
        Some(path) => LogisticModel::load(path)
            .with_context(|| format!("loading model {}", path.display())),
        None => {
            warn!("No model file given; using the zeroed model (never detects)");
            Ok(LogisticModel::zeroed())
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let config = load_config(&args)?;
    let model = load_model(&args)?;
    info!(pipe = %args.pipe.display(), format = ?config.format, "Starting");

    // The device is full duplex; separate handles for the two directions.
    let read_side = File::open(&args.pipe)
        .with_context(|| format!("opening {} for reading", args.pipe.display()))?;
    let write_side = OpenOptions::new()
        .write(true)
        .open(&args.pipe)
        .with_context(|| format!("opening {} for writing", args.pipe.display()))?;

    let mut reader = FrameReader::for_format(read_side, config.format, config.size);
    let mut writer = ResultWriter::new(write_side);

    let pipeline = Pipeline::new(config, model);
    let stats = pipeline
        .run(&mut reader, &mut writer)
        .context("pipeline failed")?;

    info!(
        frames = stats.frames,
        detections = stats.detections,
        "Shutting down"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(config: Option<PathBuf>, format: Option<FrameFormat>) -> Args {
        Args {
            pipe: PathBuf::from("/dev/rtp0"),
            format,
            model: None,
            config,
            verbose: false,
        }
    }

    #[test]
    fn test_defaults_without_config_or_flag() {
        let config = load_config(&args(None, None)).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_config_file_format_takes_effect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(&path, r#"{"format": "Ieu2"}"#).unwrap();

        let config = load_config(&args(Some(path), None)).unwrap();
        assert_eq!(config.format, FrameFormat::Ieu2);
    }

    #[test]
    fn test_format_flag_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(&path, r#"{"format": "Ieu2"}"#).unwrap();

        let config = load_config(&args(Some(path), Some(FrameFormat::Ieu))).unwrap();
        assert_eq!(config.format, FrameFormat::Ieu);
    }
}
