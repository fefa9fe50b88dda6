#![allow(dead_code)]

use std::fs;
use std::path::Path;

use image::{Rgba, RgbaImage};

pub const PAPER: Rgba<u8> = Rgba([250, 250, 245, 255]);

/// Blank "scanned page" used as a render background.
pub fn page(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, PAPER)
}

pub fn write_page_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    page(width, height).save(path).expect("write png file");
}

pub fn write_text(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, contents).expect("write text file");
}

/// A mixed payload: polygon, corner array, size array, stringified and
/// fractional boxes, plus one line and one text anchor.
pub const MIXED_PAYLOAD: &str = r#"{
  "detections": [
    {"id": "poly", "class_name": "dimension", "confidence": 0.92,
     "bbox": [[100, 100], [180, 100], [180, 130], [100, 130]], "value": "25.4"},
    {"id": "corners", "class": "gdt", "confidence": 0.81, "bbox": [300, 200, 420, 260]},
    {"id": "sized", "class_name": "note", "confidence": 0.55, "bbox": [500, 50, 60, 40]},
    {"id": "stringly", "class_name": "datum", "bbox": "{\"x\": 40, \"y\": 400, \"width\": 30, \"height\": 30}"},
    {"id": "fraction", "class_name": "radius", "bbox": [0.5, 0.5, 0.2, 0.2], "normalized": true},
    {"id": "broken", "class_name": "note", "bbox": "not a box"}
  ],
  "lines": [
    {"id": "lead", "start": [10, 10], "end": [90, 90], "line_type": "leader", "line_style": "dashed"}
  ],
  "texts": [
    {"id": "ocr-1", "position": {"x": 600, "y": 500}, "text": "SECTION A-A"}
  ]
}"#;
