use std::path::PathBuf;
use thiserror::Error;

/// The main error type for detoverlay operations.
///
/// Only operations that touch the filesystem, decode images or parse whole
/// documents fail. Geometry normalization, label placement and SVG decoding
/// recover locally and never produce one of these.
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse detection payload from {path}: {source}")]
    PayloadParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse item JSON from {path}: {source}")]
    ItemJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write item JSON to {path}: {source}")]
    ItemJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to load image {path}: {message}")]
    ImageLoad { path: PathBuf, message: String },

    #[error("Failed to encode image: {0}")]
    ImageEncode(#[source] image::ImageError),

    #[error("Invalid config {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("Failed to load font: {0}")]
    FontLoad(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}
