use image::DynamicImage;
use std::sync::atomic::{AtomicUsize, Ordering};
use waste_detector::{
    Error, Result,
    detector::{ClassNames, Detector, RawPrediction},
};

/// Mock detector returning canned predictions
#[derive(Debug)]
pub struct MockDetector {
    pub predictions: Vec<RawPrediction>,
    pub class_names: ClassNames,
    pub error: Option<String>,
    pub panic_message: Option<String>,
    calls: AtomicUsize,
}

impl MockDetector {
    pub fn new() -> Self {
        Self {
            predictions: Vec::new(),
            class_names: ClassNames::from_list(["plastic", "metal", "paper", "glass"]),
            error: None,
            panic_message: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_predictions(mut self, predictions: Vec<RawPrediction>) -> Self {
        self.predictions = predictions;
        self
    }

    pub fn with_error(mut self, error: &str) -> Self {
        self.error = Some(error.to_string());
        self
    }

    pub fn with_panic(mut self, message: &str) -> Self {
        self.panic_message = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for MockDetector {
    fn predict(&self, _image: &DynamicImage) -> Result<Vec<RawPrediction>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(ref message) = self.panic_message {
            panic!("{}", message);
        }

        if let Some(ref error) = self.error {
            return Err(Error::inference(error.clone()));
        }

        Ok(self.predictions.clone())
    }

    fn class_names(&self) -> &ClassNames {
        &self.class_names
    }
}

/// Build a raw prediction from corners
pub fn raw(x1: f32, y1: f32, x2: f32, y2: f32, class_id: usize, confidence: f32) -> RawPrediction {
    RawPrediction {
        x1,
        y1,
        x2,
        y2,
        class_id,
        confidence,
    }
}
