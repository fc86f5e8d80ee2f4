use clap::Parser;
use std::path::PathBuf;

/// YOLOv8n ONNX export used when no detector model is given
pub const DEFAULT_DETECTOR_MODEL_URL: &str =
    "https://github.com/jahongir7174/YOLOv8-onnx/raw/refs/heads/master/weights/v8_n.onnx";

/// Classes of the default model (COCO, in class-id order)
#[rustfmt::skip]
pub const COCO_LABELS: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch", "potted plant",
    "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote", "keyboard", "cell phone",
    "microwave", "oven", "toaster", "sink", "refrigerator", "book", "clock", "vase", "scissors",
    "teddy bear", "hair drier", "toothbrush",
];

fn default_labels() -> Vec<String> {
    COCO_LABELS.iter().map(|l| l.to_string()).collect()
}

#[derive(Parser, Debug, Clone)]
#[command(name = "anpr-server")]
#[command(about = "License plate recognition server")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "ANPR_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "ANPR_PORT", default_value = "8000")]
    pub port: u16,

    /// Maximum upload size in bytes (default: 20MB)
    #[arg(long, env = "ANPR_MAX_FILE_SIZE", default_value = "20971520")]
    pub max_file_size: usize,

    /// Path to the ONNX plate detector (downloaded from --detector-model-url if not set)
    #[arg(long, env = "ANPR_DETECTOR_MODEL")]
    pub detector_model: Option<PathBuf>,

    /// Where to fetch the detector model from when no path is given
    #[arg(long, env = "ANPR_DETECTOR_MODEL_URL", default_value = DEFAULT_DETECTOR_MODEL_URL)]
    pub detector_model_url: String,

    /// Class labels of the detector, in class-id order. Defaults to the
    /// COCO classes of the default model; set it (e.g. `license_plate`) when
    /// using a plate-trained model.
    #[arg(long, env = "ANPR_DETECTOR_LABELS", value_delimiter = ',')]
    pub detector_labels: Vec<String>,

    /// Square input size the detector was exported with
    #[arg(long, env = "ANPR_DETECTOR_INPUT_SIZE", default_value = "640")]
    pub detector_input_size: u32,

    /// Minimum detection confidence (0..1)
    #[arg(long, env = "ANPR_CONFIDENCE_THRESHOLD", default_value = "0.25")]
    pub confidence_threshold: f32,

    /// IoU above which overlapping detections are suppressed (0..1)
    #[arg(long, env = "ANPR_IOU_THRESHOLD", default_value = "0.45")]
    pub iou_threshold: f32,

    /// Upper bound on detections kept per image
    #[arg(long, env = "ANPR_MAX_DETECTIONS", default_value = "100")]
    pub max_detections: usize,

    /// Recognizer engine ("ocrs" or "leptess"); first compiled-in engine if not set
    #[arg(long, env = "ANPR_RECOGNIZER")]
    pub recognizer: Option<String>,

    /// Tesseract language (e.g., "eng")
    #[arg(long, env = "ANPR_LANGUAGE", default_value = "eng")]
    pub language: String,

    /// Path to tessdata directory (downloaded if not set)
    #[arg(long, env = "TESSDATA_PREFIX")]
    pub tessdata_path: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

/// Plate detector settings
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub model_path: Option<PathBuf>,
    pub model_url: String,
    pub labels: Vec<String>,
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            model_url: DEFAULT_DETECTOR_MODEL_URL.to_string(),
            labels: default_labels(),
            input_size: 640,
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 100,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
    pub detector: DetectorConfig,
    pub recognizer: Option<String>,
    pub language: String,
    pub tessdata_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_file_size: 20 * 1024 * 1024,
            detector: DetectorConfig::default(),
            recognizer: None,
            language: "eng".to_string(),
            tessdata_path: None,
        }
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            max_file_size: args.max_file_size,
            detector: DetectorConfig {
                model_path: args.detector_model,
                model_url: args.detector_model_url,
                labels: if args.detector_labels.is_empty() {
                    default_labels()
                } else {
                    args.detector_labels
                },
                input_size: args.detector_input_size,
                confidence_threshold: args.confidence_threshold.clamp(0.0, 1.0),
                iou_threshold: args.iou_threshold.clamp(0.0, 1.0),
                max_detections: args.max_detections,
            },
            recognizer: args.recognizer,
            language: args.language,
            tessdata_path: args.tessdata_path,
        }
    }
}
