//! Annotated image rendering.

use std::io::Cursor;

use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use objdet_models::Detection;

use crate::error::{VisionError, VisionResult};

/// JPEG quality of the annotated artifact.
pub const JPEG_QUALITY: u8 = 90;

/// Box outline width in pixels.
const BOX_THICKNESS: i32 = 2;

const PALETTE: [[u8; 3]; 10] = [
    [255, 56, 56],
    [255, 157, 151],
    [255, 112, 31],
    [255, 178, 29],
    [207, 210, 49],
    [72, 249, 10],
    [26, 147, 52],
    [0, 212, 187],
    [52, 69, 147],
    [203, 56, 255],
];

/// Outline colour for a class.
pub fn class_color(class_id: u32) -> Rgb<u8> {
    Rgb(PALETTE[class_id as usize % PALETTE.len()])
}

/// Decode `image_bytes`, draw one box per detection and encode the result as
/// JPEG.
pub fn annotate(image_bytes: &[u8], detections: &[Detection]) -> VisionResult<Vec<u8>> {
    let decoded = image::load_from_memory(image_bytes)
        .map_err(|e| VisionError::Annotation(format!("cannot decode image: {}", e)))?;
    let mut canvas = decoded.to_rgb8();

    for detection in detections {
        draw_box(&mut canvas, detection);
    }

    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(canvas)
        .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Jpeg(JPEG_QUALITY))
        .map_err(|e| VisionError::Annotation(format!("cannot encode JPEG: {}", e)))?;
    Ok(buf)
}

fn draw_box(canvas: &mut RgbImage, detection: &Detection) {
    let (w, h) = (canvas.width() as i32, canvas.height() as i32);
    if w == 0 || h == 0 {
        return;
    }

    let bbox = detection.bbox.clamp_to(w as f64, h as f64);
    let x_min = (bbox.x1.floor() as i32).clamp(0, w - 1);
    let y_min = (bbox.y1.floor() as i32).clamp(0, h - 1);
    let x_max = (bbox.x2.ceil() as i32).clamp(0, w - 1);
    let y_max = (bbox.y2.ceil() as i32).clamp(0, h - 1);

    let color = class_color(detection.class_id);
    for t in 0..BOX_THICKNESS {
        let width = x_max - x_min - 2 * t + 1;
        let height = y_max - y_min - 2 * t + 1;
        // Rect panics on zero size.
        if width <= 0 || height <= 0 {
            break;
        }
        let rect = Rect::at(x_min + t, y_min + t).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}
