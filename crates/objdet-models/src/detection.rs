//! Detection models.
//!
//! Boxes are expressed in the pixel space of the uploaded image, never
//! normalized. Constructors enforce the ordering and range invariants so a
//! `Detection` built through them is always well formed.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in original image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    /// Left edge
    pub x1: f64,
    /// Top edge
    pub y1: f64,
    /// Right edge
    pub x2: f64,
    /// Bottom edge
    pub y2: f64,
}

impl BoundingBox {
    /// Create a box from two corners, ordering each coordinate pair so that
    /// `x1 <= x2` and `y1 <= y2`.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    /// Create a box from a center point and size (YOLO output format).
    pub fn from_center(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        Self::new(
            cx - width / 2.0,
            cy - height / 2.0,
            cx + width / 2.0,
            cy + height / 2.0,
        )
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Check that the coordinate ordering invariant holds.
    pub fn is_ordered(&self) -> bool {
        self.x1 <= self.x2 && self.y1 <= self.y2
    }

    /// Clip the box to an image of the given size.
    pub fn clamp_to(&self, width: f64, height: f64) -> Self {
        Self::new(
            self.x1.clamp(0.0, width),
            self.y1.clamp(0.0, height),
            self.x2.clamp(0.0, width),
            self.y2.clamp(0.0, height),
        )
    }

    /// Intersection over union with another box.
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

/// One recognized object instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Detection {
    /// Bounding box in pixel space
    pub bbox: BoundingBox,
    /// Detection confidence [0, 1]
    pub confidence: f64,
    /// Class index in the model's class table
    pub class_id: u32,
    /// Class label resolved from `class_id`
    pub class_name: String,
}

impl Detection {
    /// Create a detection. Confidence is clamped into `[0, 1]`; NaN maps to 0.
    pub fn new(
        bbox: BoundingBox,
        confidence: f64,
        class_id: u32,
        class_name: impl Into<String>,
    ) -> Self {
        Self {
            bbox: BoundingBox::new(bbox.x1, bbox.y1, bbox.x2, bbox.y2),
            confidence: clamp_confidence(confidence),
            class_id,
            class_name: class_name.into(),
        }
    }

    /// Re-establish the invariants on a detection that may have been built
    /// field by field.
    pub fn normalized(self) -> Self {
        Self::new(self.bbox, self.confidence, self.class_id, self.class_name)
    }

    /// Check the bbox ordering and confidence range invariants.
    pub fn is_valid(&self) -> bool {
        self.bbox.is_ordered() && (0.0..=1.0).contains(&self.confidence)
    }
}

fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_orders_corners() {
        let bbox = BoundingBox::new(120.0, 80.0, 20.0, 10.0);
        assert_eq!(bbox.x1, 20.0);
        assert_eq!(bbox.y1, 10.0);
        assert_eq!(bbox.x2, 120.0);
        assert_eq!(bbox.y2, 80.0);
        assert!(bbox.is_ordered());
        assert_eq!(bbox.area(), 100.0 * 70.0);
    }

    #[test]
    fn test_bbox_from_center() {
        let bbox = BoundingBox::from_center(50.0, 40.0, 20.0, 10.0);
        assert_eq!(bbox, BoundingBox::new(40.0, 35.0, 60.0, 45.0));
    }

    #[test]
    fn test_bbox_clamp() {
        let bbox = BoundingBox::new(-5.0, -5.0, 700.0, 500.0).clamp_to(640.0, 480.0);
        assert_eq!(bbox, BoundingBox::new(0.0, 0.0, 640.0, 480.0));
    }

    #[test]
    fn test_iou() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 0.0, 15.0, 10.0);
        assert!((a.iou(&b) - 50.0 / 150.0).abs() < 1e-9);
        assert_eq!(a.iou(&BoundingBox::new(20.0, 20.0, 30.0, 30.0)), 0.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_detection_clamps_confidence() {
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!(Detection::new(bbox, 1.7, 0, "person").confidence, 1.0);
        assert_eq!(Detection::new(bbox, -0.2, 0, "person").confidence, 0.0);
        assert_eq!(Detection::new(bbox, f64::NAN, 0, "person").confidence, 0.0);
    }

    #[test]
    fn test_normalized_repairs_raw_fields() {
        let raw = Detection {
            bbox: BoundingBox {
                x1: 30.0,
                y1: 40.0,
                x2: 10.0,
                y2: 20.0,
            },
            confidence: 2.0,
            class_id: 2,
            class_name: "car".to_string(),
        };
        assert!(!raw.is_valid());

        let fixed = raw.normalized();
        assert!(fixed.is_valid());
        assert_eq!(fixed.bbox, BoundingBox::new(10.0, 20.0, 30.0, 40.0));
        assert_eq!(fixed.class_name, "car");
    }

    #[test]
    fn test_detection_wire_field_names() {
        let detection = Detection::new(BoundingBox::new(1.0, 2.0, 3.0, 4.0), 0.5, 16, "dog");
        let json = serde_json::to_value(&detection).unwrap();
        assert_eq!(json["bbox"]["x1"], 1.0);
        assert_eq!(json["bbox"]["y2"], 4.0);
        assert_eq!(json["confidence"], 0.5);
        assert_eq!(json["class_id"], 16);
        assert_eq!(json["class_name"], "dog");
    }
}
