//! JSON serialization for canonical item sets.
//!
//! This is the format `detoverlay decode` prints and the format a host
//! selection panel consumes. It is also handy for inspecting what the
//! normalizer made of an upstream payload.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use super::model::ItemSet;
use crate::error::OverlayError;

/// Loads the output of `detoverlay decode` back into memory.
pub fn read_items_json(path: &Path) -> Result<ItemSet, OverlayError> {
    let file = File::open(path).map_err(OverlayError::Io)?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| OverlayError::ItemJsonParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Pretty-printed, so decoded overlays diff cleanly.
pub fn write_items_json(path: &Path, items: &ItemSet) -> Result<(), OverlayError> {
    let file = File::create(path).map_err(OverlayError::Io)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, items).map_err(|source| OverlayError::ItemJsonWrite {
        path: path.to_path_buf(),
        source,
    })
}

pub fn from_json_str(json: &str) -> Result<ItemSet, serde_json::Error> {
    serde_json::from_str(json)
}

pub fn from_json_slice(bytes: &[u8]) -> Result<ItemSet, serde_json::Error> {
    serde_json::from_slice(bytes)
}

pub fn to_json_string(items: &ItemSet) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(items)
}
