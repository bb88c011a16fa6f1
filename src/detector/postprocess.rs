//! Decoding of raw YOLO output tensors into corner-form predictions.
//!
//! Two export layouts are understood:
//! - `[1, 4 + nc, N]`: one column per candidate, `cx, cy, w, h` followed by
//!   per-class scores (YOLOv8 and later).
//! - `[1, N, 5 + nc]`: one row per candidate, `cx, cy, w, h, objectness`
//!   followed by per-class scores (YOLOv5).

use super::RawPrediction;
use crate::{Error, Result};
use ndarray::{ArrayView1, ArrayViewD, Axis, Ix3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodeParams {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

/// Maps model-input coordinates back onto the original image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub scale_x: f32,
    pub scale_y: f32,
    pub width: f32,
    pub height: f32,
}

impl Frame {
    pub fn new(image_width: u32, image_height: u32, input_size: u32) -> Self {
        Self {
            scale_x: image_width as f32 / input_size as f32,
            scale_y: image_height as f32 / input_size as f32,
            width: image_width as f32,
            height: image_height as f32,
        }
    }

    fn to_corners(&self, cx: f32, cy: f32, w: f32, h: f32) -> (f32, f32, f32, f32) {
        let w = w.abs();
        let h = h.abs();
        let x1 = ((cx - w / 2.0) * self.scale_x).clamp(0.0, self.width);
        let y1 = ((cy - h / 2.0) * self.scale_y).clamp(0.0, self.height);
        let x2 = ((cx + w / 2.0) * self.scale_x).clamp(0.0, self.width);
        let y2 = ((cy + h / 2.0) * self.scale_y).clamp(0.0, self.height);
        (x1, y1, x2, y2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    ChannelsFirst,
    RowsWithObjectness,
}

pub fn decode(
    output: ArrayViewD<'_, f32>,
    params: &DecodeParams,
    frame: &Frame,
) -> Result<Vec<RawPrediction>> {
    let shape = output.shape().to_vec();
    let output = output
        .into_dimensionality::<Ix3>()
        .map_err(|_| Error::inference(format!("Unexpected output shape: {:?}", shape)))?;

    if output.shape()[0] == 0 {
        return Ok(Vec::new());
    }
    let batch = output.index_axis(Axis(0), 0);
    let (rows, cols) = (batch.shape()[0], batch.shape()[1]);

    let layout = if rows < cols {
        Layout::ChannelsFirst
    } else {
        Layout::RowsWithObjectness
    };

    let mut candidates = Vec::new();
    match layout {
        Layout::ChannelsFirst => {
            if rows < 5 {
                return Err(Error::inference(format!(
                    "Unexpected output shape: {:?}",
                    shape
                )));
            }
            for column in batch.axis_iter(Axis(1)) {
                let Some((class_id, score)) = best_class(column.slice(ndarray::s![4..])) else {
                    continue;
                };
                if score < params.confidence_threshold {
                    continue;
                }
                let (x1, y1, x2, y2) = frame.to_corners(column[0], column[1], column[2], column[3]);
                candidates.push(RawPrediction {
                    x1,
                    y1,
                    x2,
                    y2,
                    class_id,
                    confidence: score,
                });
            }
        }
        Layout::RowsWithObjectness => {
            if cols < 6 {
                return Err(Error::inference(format!(
                    "Unexpected output shape: {:?}",
                    shape
                )));
            }
            for row in batch.axis_iter(Axis(0)) {
                let objectness = row[4];
                if objectness < params.confidence_threshold {
                    continue;
                }
                let Some((class_id, score)) = best_class(row.slice(ndarray::s![5..])) else {
                    continue;
                };
                let confidence = objectness * score;
                if confidence < params.confidence_threshold {
                    continue;
                }
                let (x1, y1, x2, y2) = frame.to_corners(row[0], row[1], row[2], row[3]);
                candidates.push(RawPrediction {
                    x1,
                    y1,
                    x2,
                    y2,
                    class_id,
                    confidence,
                });
            }
        }
    }

    Ok(non_maximum_suppression(
        candidates,
        params.iou_threshold,
        params.max_detections,
    ))
}

fn best_class(scores: ArrayView1<'_, f32>) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, s)| s.is_finite())
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
}

/// Class-aware NMS. Output is sorted by descending confidence.
pub fn non_maximum_suppression(
    mut candidates: Vec<RawPrediction>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<RawPrediction> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<RawPrediction> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == candidate.class_id && k.iou(&candidate) > iou_threshold);
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}
