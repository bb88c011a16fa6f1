mod onnx;
pub mod postprocess;

pub use onnx::OnnxDetector;

use crate::{Result, config::ModelConfig};
use image::DynamicImage;
use std::{borrow::Cow, collections::BTreeMap, path::Path, sync::Arc};
use tracing::{error, info, warn};

/// One raw prediction in the model's native corner form, in pixels of the
/// original image.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPrediction {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub class_id: usize,
    pub confidence: f32,
}

impl RawPrediction {
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    pub fn intersection_area(&self, other: &RawPrediction) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        if x2 > x1 && y2 > y1 {
            (x2 - x1) * (y2 - y1)
        } else {
            0.0
        }
    }

    pub fn iou(&self, other: &RawPrediction) -> f32 {
        let intersection = self.intersection_area(other);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

/// Class id to label mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassNames(BTreeMap<usize, String>);

impl ClassNames {
    pub fn from_list<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).enumerate().collect())
    }

    /// Parses the `names` metadata entry written by Ultralytics exporters,
    /// e.g. `{0: 'plastic', 1: 'metal'}`.
    pub fn parse_metadata(raw: &str) -> Option<Self> {
        let body = raw.trim().strip_prefix('{')?.strip_suffix('}')?;
        let mut names = BTreeMap::new();

        for entry in body.split(',').filter(|e| !e.trim().is_empty()) {
            let (id, name) = entry.split_once(':')?;
            let id: usize = id.trim().parse().ok()?;
            let name = name.trim().trim_matches(|c| c == '\'' || c == '"');
            names.insert(id, name.to_string());
        }

        if names.is_empty() { None } else { Some(Self(names)) }
    }

    /// Resolves the label set for a model: configured names first, then the
    /// names embedded in the checkpoint for any id the config does not cover.
    pub fn resolve(configured: &[String], embedded: Option<ClassNames>) -> Self {
        let mut names = embedded.unwrap_or_default();
        for (id, name) in configured.iter().enumerate() {
            names.0.insert(id, name.clone());
        }
        names
    }

    pub fn get(&self, class_id: usize) -> Option<&str> {
        self.0.get(&class_id).map(String::as_str)
    }

    /// Label for `class_id`, `class_<id>` when the id has no name.
    pub fn label(&self, class_id: usize) -> Cow<'_, str> {
        match self.get(class_id) {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(format!("class_{class_id}")),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A pretrained detector. Implementations must be safe to call from
/// several requests at once.
pub trait Detector: Send + Sync {
    fn predict(&self, image: &DynamicImage) -> Result<Vec<RawPrediction>>;

    fn class_names(&self) -> &ClassNames;
}

/// Loads the configured checkpoint. A missing or unloadable checkpoint
/// leaves the service without a model instead of failing startup.
pub fn load(config: &ModelConfig) -> Option<Arc<dyn Detector>> {
    if !Path::new(&config.path).exists() {
        warn!("Model file not found at {}", config.path);
        return None;
    }

    match OnnxDetector::load(config) {
        Ok(detector) => {
            info!(
                "Model loaded successfully from {} ({} classes)",
                config.path,
                detector.class_names().len()
            );
            Some(Arc::new(detector))
        }
        Err(e) => {
            error!("Error loading model from {}: {}", config.path, e);
            None
        }
    }
}
