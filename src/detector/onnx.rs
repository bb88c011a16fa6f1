use super::{
    ClassNames, Detector, RawPrediction,
    postprocess::{self, DecodeParams, Frame},
};
use crate::{Error, Result, config::ModelConfig};
use image::{DynamicImage, imageops::FilterType};
use ndarray::Array4;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;
use std::sync::Mutex;
use tracing::{debug, info};

/// YOLO checkpoint exported to ONNX, executed with ONNX Runtime.
pub struct OnnxDetector {
    session: Mutex<Session>,
    input_name: String,
    input_size: u32,
    params: DecodeParams,
    class_names: ClassNames,
}

impl std::fmt::Debug for OnnxDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxDetector")
            .field("input_name", &self.input_name)
            .field("input_size", &self.input_size)
            .field("params", &self.params)
            .field("classes", &self.class_names.len())
            .finish_non_exhaustive()
    }
}

impl OnnxDetector {
    pub fn load(config: &ModelConfig) -> Result<Self> {
        info!("Loading detection model from {}", config.path);

        let session = Session::builder()
            .map_err(|e| Error::model(format!("Failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| Error::model(format!("Failed to set optimization level: {e}")))?
            .with_intra_threads(config.intra_threads)
            .map_err(|e| Error::model(format!("Failed to set intra threads: {e}")))?
            .commit_from_file(&config.path)
            .map_err(|e| Error::model(format!("Failed to load {}: {e}", config.path)))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| Error::model("Model declares no inputs"))?;

        let class_names =
            ClassNames::resolve(&config.class_names, embedded_class_names(&session));

        debug!(
            "Detection model input: {}, {} class names",
            input_name,
            class_names.len()
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            input_size: config.input_size,
            params: DecodeParams {
                confidence_threshold: config.confidence_threshold,
                iou_threshold: config.iou_threshold,
                max_detections: config.max_detections,
            },
            class_names,
        })
    }
}

impl Detector for OnnxDetector {
    fn predict(&self, image: &DynamicImage) -> Result<Vec<RawPrediction>> {
        let frame = Frame::new(image.width(), image.height(), self.input_size);
        let input = Tensor::from_array(preprocess(image, self.input_size))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| Error::internal(format!("Session lock poisoned: {e}")))?;
        let outputs = session.run(ort::inputs![self.input_name.as_str() => input])?;
        let output = outputs[0].try_extract_array::<f32>()?;

        let predictions = postprocess::decode(output.view(), &self.params, &frame)?;
        Ok(predictions)
    }

    fn class_names(&self) -> &ClassNames {
        &self.class_names
    }
}

/// RGB, stretched to `size x size`, scaled to [0, 1], NCHW.
pub(crate) fn preprocess(image: &DynamicImage, size: u32) -> Array4<f32> {
    let rgb = image.to_rgb8();
    let resized = image::imageops::resize(&rgb, size, size, FilterType::Triangle);

    let side = size as usize;
    let mut input = Array4::<f32>::zeros((1, 3, side, side));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        input[[0, 0, y, x]] = pixel[0] as f32 / 255.0;
        input[[0, 1, y, x]] = pixel[1] as f32 / 255.0;
        input[[0, 2, y, x]] = pixel[2] as f32 / 255.0;
    }
    input
}

fn embedded_class_names(session: &Session) -> Option<ClassNames> {
    let metadata = session.metadata().ok()?;
    let raw = metadata.custom("names").ok().flatten()?;
    ClassNames::parse_metadata(&raw)
}
