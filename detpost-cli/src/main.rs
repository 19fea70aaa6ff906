use clap::Parser;
use detpost::{
    CenterNetDecoder, Decode, DetectBox, EulerAngles, FaceDetDecoder, HeadPoseDecoder, NmsMode,
    PostConfig, PostContext, SsdConfig, SsdDecoder, TensorView, YoloConfig, YoloDecoder,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "DetPost CLI (JSON config driven)")]
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
    /// Enable tracing output for pipeline profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
enum DecoderConfig {
    Centernet {
        score_threshold: f32,
        #[serde(default)]
        sigmoid: bool,
    },
    Yolo {
        input_shape: usize,
        model_idx: usize,
        score_threshold: f32,
    },
    Ssd {
        score_threshold: f32,
    },
    Facedet {
        score_threshold: f32,
    },
    Headpose,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum NmsModeConfig {
    ClassAware,
    ClassAgnostic,
}

impl From<NmsModeConfig> for NmsMode {
    fn from(value: NmsModeConfig) -> Self {
        match value {
            NmsModeConfig::ClassAware => NmsMode::ClassAware,
            NmsModeConfig::ClassAgnostic => NmsMode::ClassAgnostic,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NmsConfig {
    score_threshold: f32,
    iou_threshold: f32,
    max_per_class: Option<u32>,
    mode: NmsModeConfig,
}

#[derive(Debug, Deserialize)]
struct Config {
    decoder: DecoderConfig,
    nms: NmsConfig,
    #[serde(default)]
    class_filter: Vec<i32>,
    /// Paths to tensor JSON files, in the decoder's expected order.
    outputs: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct TensorFile {
    shape: Vec<usize>,
    data: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct Report {
    boxes: Vec<BoxReport>,
    keypoints: Vec<KeypointReport>,
    euler: Option<EulerReport>,
}

#[derive(Debug, Serialize)]
struct BoxReport {
    xmin: f32,
    ymin: f32,
    xmax: f32,
    ymax: f32,
    score: f32,
    label: i32,
}

impl From<&DetectBox> for BoxReport {
    fn from(b: &DetectBox) -> Self {
        Self {
            xmin: b.xmin,
            ymin: b.ymin,
            xmax: b.xmax,
            ymax: b.ymax,
            score: b.score,
            label: b.label,
        }
    }
}

#[derive(Debug, Serialize)]
struct KeypointReport {
    x: f32,
    y: f32,
    score: f32,
}

#[derive(Debug, Serialize)]
struct EulerReport {
    yaw: f32,
    pitch: f32,
    roll: f32,
}

impl From<EulerAngles> for EulerReport {
    fn from(e: EulerAngles) -> Self {
        Self {
            yaw: e.yaw,
            pitch: e.pitch,
            roll: e.roll,
        }
    }
}

fn build_decoder(config: &DecoderConfig) -> Result<Box<dyn Decode>, String> {
    match config {
        DecoderConfig::Centernet {
            score_threshold,
            sigmoid,
        } => Ok(if *sigmoid {
            Box::new(CenterNetDecoder::with_sigmoid(*score_threshold))
        } else {
            Box::new(CenterNetDecoder::new(*score_threshold))
        }),
        DecoderConfig::Yolo {
            input_shape,
            model_idx,
            score_threshold,
        } => YoloDecoder::new(YoloConfig {
            input_shape: *input_shape,
            model_idx: *model_idx,
            score_threshold: *score_threshold,
        })
        .map(|d| Box::new(d) as Box<dyn Decode>)
        .map_err(|e| e.to_string()),
        DecoderConfig::Ssd { score_threshold } => {
            Ok(Box::new(SsdDecoder::from_config(SsdConfig {
                score_threshold: *score_threshold,
                ..SsdConfig::default()
            })))
        }
        DecoderConfig::Facedet { score_threshold } => {
            Ok(Box::new(FaceDetDecoder::new(*score_threshold)))
        }
        DecoderConfig::Headpose => Ok(Box::new(HeadPoseDecoder::new())),
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let raw = fs::read_to_string(&cli.config)
        .map_err(|e| format!("failed to read {}: {e}", cli.config.display()))?;
    let config: Config =
        serde_json::from_str(&raw).map_err(|e| format!("failed to parse config: {e}"))?;

    let mut tensors: Vec<TensorFile> = Vec::with_capacity(config.outputs.len());
    for path in &config.outputs {
        let raw = fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        tensors.push(
            serde_json::from_str(&raw)
                .map_err(|e| format!("failed to parse {}: {e}", path.display()))?,
        );
    }
    let views: Vec<TensorView<'_>> = tensors
        .iter()
        .map(|t| TensorView::from_f32(&t.shape, &t.data).map_err(|e| e.to_string()))
        .collect::<Result<_, _>>()?;

    let decoder = build_decoder(&config.decoder)?;
    let mut context = PostContext::new().with_config(PostConfig {
        score_threshold: config.nms.score_threshold,
        iou_threshold: config.nms.iou_threshold,
        max_per_class: config.nms.max_per_class,
        nms_mode: config.nms.mode.into(),
    });
    context
        .set_class_filter(&config.class_filter)
        .map_err(|e| e.to_string())?;

    let count = context
        .run(decoder.as_ref(), &views)
        .map_err(|e| e.to_string())?;
    tracing::info!(count, "post-processing complete");

    let results = context.results();
    let report = Report {
        boxes: results.boxes().iter().map(BoxReport::from).collect(),
        keypoints: results
            .keypoints()
            .iter()
            .map(|k| KeypointReport {
                x: k.x,
                y: k.y,
                score: k.score,
            })
            .collect(),
        euler: results.euler().map(EulerReport::from),
    };
    let rendered =
        serde_json::to_string_pretty(&report).map_err(|e| format!("failed to render: {e}"))?;
    println!("{rendered}");
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return;
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return;
    }

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
            .init();
    }

    if let Err(message) = run(&cli) {
        eprintln!("error: {message}");
        std::process::exit(1);
    }
}
