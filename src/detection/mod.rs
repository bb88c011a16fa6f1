mod decode;
mod types;

pub use decode::decode_upload;
pub use types::*;

use crate::{
    Error, Result,
    config::ModelConfig,
    detector::{self, ClassNames, Detector, RawPrediction},
};
use std::{collections::BTreeMap, path::Path, sync::Arc, time::Instant};
use tracing::{debug, info};

/// Request-independent context shared by every transport: the loaded
/// detector (if any) and the path it was configured from. Read-only once
/// built.
pub struct DetectionService {
    detector: Option<Arc<dyn Detector>>,
    model_path: String,
}

impl DetectionService {
    pub fn new(detector: Option<Arc<dyn Detector>>, model_path: impl Into<String>) -> Self {
        Self {
            detector,
            model_path: model_path.into(),
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(detector::load(config), config.path.clone())
    }

    pub fn model_path(&self) -> &str {
        &self.model_path
    }

    pub fn is_model_loaded(&self) -> bool {
        self.detector.is_some()
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "ok".to_string(),
            model_loaded: self.is_model_loaded(),
            model_path: self.model_path.clone(),
            model_exists: Path::new(&self.model_path).exists(),
        }
    }

    /// Fails with [`Error::ModelUnavailable`] when no model was loaded.
    pub fn ensure_available(&self) -> Result<Arc<dyn Detector>> {
        self.detector
            .clone()
            .ok_or_else(|| Error::ModelUnavailable {
                model_path: self.model_path.clone(),
            })
    }

    /// Decodes the upload and runs one inference on the blocking pool.
    pub async fn detect(&self, upload: ImageUpload) -> Result<DetectionResponse> {
        let detector = self.ensure_available()?;

        info!(
            "Received image: {}, size: {} bytes",
            upload.display_name(),
            upload.bytes.len()
        );

        let response =
            tokio::task::spawn_blocking(move || run_detection(detector.as_ref(), &upload.bytes))
                .await
                .map_err(|e| Error::inference(format!("Detection task failed: {e}")))??;

        info!(
            "Processed image with {} detections in {:.2}s",
            response.detections.len(),
            response.processing_time
        );

        Ok(response)
    }
}

fn run_detection(detector: &dyn Detector, bytes: &[u8]) -> Result<DetectionResponse> {
    let image = decode_upload(bytes)?;
    debug!("Decoded image {}x{}", image.width(), image.height());

    let start = Instant::now();
    let predictions = detector.predict(&image)?;
    let processing_time = start.elapsed().as_secs_f64();

    Ok(format_response(
        predictions,
        detector.class_names(),
        processing_time,
    ))
}

/// Converts corner-form predictions into the response shape.
pub fn format_response(
    predictions: Vec<RawPrediction>,
    class_names: &ClassNames,
    processing_time: f64,
) -> DetectionResponse {
    let mut detections = Vec::with_capacity(predictions.len());
    let mut class_counts: BTreeMap<String, usize> = BTreeMap::new();

    for prediction in predictions {
        let class_name = class_names.label(prediction.class_id).into_owned();

        *class_counts.entry(class_name.clone()).or_default() += 1;

        let x = prediction.x1.min(prediction.x2);
        let y = prediction.y1.min(prediction.y2);
        let width = (prediction.x2 - prediction.x1).abs();
        let height = (prediction.y2 - prediction.y1).abs();

        detections.push(Detection {
            bbox: [x, y, width, height],
            class_name,
            confidence: prediction.confidence,
        });
    }

    DetectionResponse {
        detections,
        processing_time: processing_time.max(0.0),
        class_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names() -> ClassNames {
        ClassNames::from_list(["plastic", "metal", "paper"])
    }

    fn prediction(x1: f32, y1: f32, x2: f32, y2: f32, class_id: usize) -> RawPrediction {
        RawPrediction {
            x1,
            y1,
            x2,
            y2,
            class_id,
            confidence: 0.75,
        }
    }

    #[test]
    fn test_format_converts_corners_to_origin_and_extent() {
        let response =
            format_response(vec![prediction(10.0, 20.0, 50.0, 80.0, 1)], &names(), 0.5);

        assert_eq!(
            response.detections,
            vec![Detection {
                bbox: [10.0, 20.0, 40.0, 60.0],
                class_name: "metal".to_string(),
                confidence: 0.75,
            }]
        );
        assert_eq!(response.processing_time, 0.5);
    }

    #[test]
    fn test_format_counts_by_label() {
        let response = format_response(
            vec![
                prediction(0.0, 0.0, 1.0, 1.0, 0),
                prediction(2.0, 2.0, 3.0, 3.0, 2),
                prediction(4.0, 4.0, 5.0, 5.0, 0),
            ],
            &names(),
            0.1,
        );

        assert_eq!(response.class_counts.get("plastic"), Some(&2));
        assert_eq!(response.class_counts.get("paper"), Some(&1));
        assert_eq!(response.class_counts.get("metal"), None);
        for (label, count) in &response.class_counts {
            let matching = response
                .detections
                .iter()
                .filter(|d| &d.class_name == label)
                .count();
            assert_eq!(*count, matching);
        }
    }

    #[test]
    fn test_format_normalises_inverted_corners() {
        let response =
            format_response(vec![prediction(50.0, 80.0, 10.0, 20.0, 0)], &names(), 0.0);
        assert_eq!(response.detections[0].bbox, [10.0, 20.0, 40.0, 60.0]);
    }

    #[test]
    fn test_format_empty() {
        let response = format_response(Vec::new(), &names(), 0.02);
        assert!(response.detections.is_empty());
        assert!(response.class_counts.is_empty());
        assert!(response.processing_time >= 0.0);
    }

    #[test]
    fn test_format_labels_unnamed_class_by_id() {
        let response = format_response(
            vec![
                prediction(0.0, 0.0, 1.0, 1.0, 9),
                prediction(2.0, 2.0, 3.0, 3.0, 0),
            ],
            &ClassNames::default(),
            0.0,
        );
        assert_eq!(response.detections[0].class_name, "class_9");
        assert_eq!(response.class_counts.get("class_9"), Some(&1));
        assert_eq!(response.class_counts.get("class_0"), Some(&1));
    }

    #[test]
    fn test_response_json_shape() {
        let response =
            format_response(vec![prediction(1.0, 2.0, 4.0, 6.0, 2)], &names(), 0.25);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "detections": [{
                    "box": [1.0, 2.0, 3.0, 4.0],
                    "class_name": "paper",
                    "confidence": 0.75
                }],
                "processing_time": 0.25,
                "class_counts": { "paper": 1 }
            })
        );
    }

    #[test]
    fn test_service_without_model_reports_unavailable() {
        let service = DetectionService::new(None, "/nonexistent/best.onnx");

        let health = service.health();
        assert_eq!(health.status, "ok");
        assert!(!health.model_loaded);
        assert!(!health.model_exists);
        assert_eq!(health.model_path, "/nonexistent/best.onnx");

        let err = service.ensure_available().err().unwrap();
        assert!(matches!(err, Error::ModelUnavailable { .. }));
    }
}
