//! Decoding of YOLO detection heads.
//!
//! Operates on the raw `[4 + C, N]` output (`cx, cy, w, h` followed by
//! per-class scores, row-major) so it needs no runtime session.

use objdet_models::BoundingBox;

use crate::error::{VisionError, VisionResult};

/// Candidate box before NMS.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub bbox: BoundingBox,
    pub class_id: usize,
    pub confidence: f32,
}

/// Geometry of one decode call.
#[derive(Debug, Clone, Copy)]
pub struct DecodeParams {
    /// Square model input side, in pixels
    pub input_size: u32,
    pub num_classes: usize,
    pub orig_width: u32,
    pub orig_height: u32,
    pub confidence_threshold: f32,
}

/// Decode raw output into pixel-space candidates of the original image.
///
/// Each box keeps only its best-scoring class; boxes below the threshold
/// are dropped. No NMS is applied here.
pub fn decode_output(outputs: &[f32], params: &DecodeParams) -> VisionResult<Vec<Candidate>> {
    let num_classes = params.num_classes;
    let num_features = 4 + num_classes;

    if outputs.is_empty() || outputs.len() % num_features != 0 {
        return Err(VisionError::inference_failed(format!(
            "Unexpected output size {} for {} classes",
            outputs.len(),
            num_classes
        )));
    }
    let num_boxes = outputs.len() / num_features;
    let at = |feature: usize, candidate: usize| outputs[feature * num_boxes + candidate];

    let input_size = params.input_size as f64;
    let scale_w = params.orig_width as f64 / input_size;
    let scale_h = params.orig_height as f64 / input_size;

    let mut candidates = Vec::new();
    for i in 0..num_boxes {
        let mut best_class = 0;
        let mut best_score = 0.0f32;
        for c in 0..num_classes {
            let score = at(4 + c, i);
            if score > best_score {
                best_score = score;
                best_class = c;
            }
        }

        if best_score < params.confidence_threshold {
            continue;
        }

        let bbox = BoundingBox::from_center(
            at(0, i) as f64 * scale_w,
            at(1, i) as f64 * scale_h,
            at(2, i) as f64 * scale_w,
            at(3, i) as f64 * scale_h,
        )
        .clamp_to(params.orig_width as f64, params.orig_height as f64);

        candidates.push(Candidate {
            bbox,
            class_id: best_class,
            confidence: best_score,
        });
    }

    Ok(candidates)
}

/// Per-class NMS; survivors come out in descending confidence.
pub fn non_maximum_suppression(mut detections: Vec<Candidate>, nms_threshold: f64) -> Vec<Candidate> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Candidate> = Vec::new();
    let mut suppressed = vec![false; detections.len()];

    for i in 0..detections.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(detections[i].clone());

        for j in (i + 1)..detections.len() {
            if suppressed[j] || detections[i].class_id != detections[j].class_id {
                continue;
            }
            if detections[i].bbox.iou(&detections[j].bbox) > nms_threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}
