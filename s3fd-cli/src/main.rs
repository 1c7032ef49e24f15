use clap::Parser;
use s3fd::{
    DetectConfig, Detection, Detector, InputGeometry, ScaleOutput, TensorView, DEFAULT_INPUT_SIZE,
    NUM_SCALES,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "S3FD post-processing CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DetectConfigJson {
    confidence: f32,
    nms_threshold: f32,
    coarse_threshold: f32,
    variances: [f32; 2],
    parallel: bool,
}

impl Default for DetectConfigJson {
    fn default() -> Self {
        let cfg = DetectConfig::default();
        Self {
            confidence: cfg.confidence,
            nms_threshold: cfg.nms_threshold,
            coarse_threshold: cfg.coarse_threshold,
            variances: cfg.variances,
            parallel: cfg.parallel,
        }
    }
}

impl From<DetectConfigJson> for DetectConfig {
    fn from(value: DetectConfigJson) -> Self {
        Self {
            confidence: value.confidence,
            nms_threshold: value.nms_threshold,
            coarse_threshold: value.coarse_threshold,
            variances: value.variances,
            parallel: value.parallel,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    tensors_path: String,
    output_path: Option<String>,
    input_size: u32,
    source_size: Option<[u32; 2]>,
    detect: DetectConfigJson,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tensors_path: String::new(),
            output_path: None,
            input_size: DEFAULT_INPUT_SIZE,
            source_size: None,
            detect: DetectConfigJson::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TensorJson {
    shape: Vec<usize>,
    data: Vec<f32>,
}

/// Raw network outputs in `[cls1, reg1, ..., cls6, reg6]` order.
#[derive(Debug, Deserialize)]
struct TensorDump {
    outputs: Vec<TensorJson>,
}

#[derive(Debug, Serialize)]
struct DetectionRecord {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    score: f32,
}

impl From<Detection> for DetectionRecord {
    fn from(value: Detection) -> Self {
        Self {
            x1: value.x1,
            y1: value.y1,
            x2: value.x2,
            y2: value.y2,
            score: value.score,
        }
    }
}

#[derive(Debug, Serialize)]
struct ImageRecord {
    detections: Vec<DetectionRecord>,
}

#[derive(Debug, Serialize)]
struct Output {
    images: Vec<ImageRecord>,
}

fn scale_outputs(dump: &TensorDump) -> Result<Vec<ScaleOutput<'_>>, Box<dyn std::error::Error>> {
    if dump.outputs.len() != NUM_SCALES * 2 {
        return Err(format!(
            "expected {} tensors (cls/reg per scale), got {}",
            NUM_SCALES * 2,
            dump.outputs.len()
        )
        .into());
    }
    let mut outputs = Vec::with_capacity(NUM_SCALES);
    for pair in dump.outputs.chunks_exact(2) {
        let cls = TensorView::from_dims(&pair[0].data, &pair[0].shape)?;
        let reg = TensorView::from_dims(&pair[1].data, &pair[1].shape)?;
        outputs.push(ScaleOutput::new(cls, reg));
    }
    Ok(outputs)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("s3fd=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.tensors_path.is_empty() {
        return Err("tensors_path must be set in the config".into());
    }
    let geometry = config
        .source_size
        .map(|[width, height]| InputGeometry::new(width, height, config.input_size))
        .transpose()?;

    let dump_text = fs::read_to_string(&config.tensors_path)?;
    let dump: TensorDump = serde_json::from_str(&dump_text)?;
    let outputs = scale_outputs(&dump)?;

    let detector = Detector::new().with_config(config.detect.into());
    let batches = detector.detect_batch(&outputs)?;
    tracing::info!(images = batches.len(), "post-processing finished");

    let images = batches
        .into_iter()
        .map(|dets| ImageRecord {
            detections: dets
                .iter()
                .map(|det| match &geometry {
                    Some(geom) => geom.to_source(det),
                    None => *det,
                })
                .map(DetectionRecord::from)
                .collect(),
        })
        .collect();
    let json = serde_json::to_string_pretty(&Output { images })?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
