use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An uploaded image as received by a transport.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(filename: Option<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename,
            bytes: bytes.into(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.filename.as_deref().unwrap_or("<unnamed>")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// `[x, y, width, height]` in pixels.
    #[serde(rename = "box")]
    pub bbox: [f32; 4],
    pub class_name: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResponse {
    pub detections: Vec<Detection>,
    /// Wall-clock inference time in seconds.
    pub processing_time: f64,
    pub class_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model_loaded: bool,
    pub model_path: String,
    pub model_exists: bool,
}
