//! Image input and bitmap export.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{ImageFormat, RgbaImage};

use crate::error::OverlayError;

const DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Decodes an image file into RGBA pixels.
///
/// Failure is reported before anything is drawn, so a pass never paints
/// overlays onto a missing background.
pub fn load_image(path: &Path) -> Result<RgbaImage, OverlayError> {
    let image = image::open(path).map_err(|err| OverlayError::ImageLoad {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    log::debug!(
        "loaded image {} ({}x{})",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(image.to_rgba8())
}

/// Decodes in-memory image bytes (format sniffed from the content).
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, OverlayError> {
    image::load_from_memory(bytes)
        .map(|image| image.to_rgba8())
        .map_err(|err| OverlayError::ImageLoad {
            path: PathBuf::from("<memory>"),
            message: err.to_string(),
        })
}

/// Encodes a bitmap as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, OverlayError> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(OverlayError::ImageEncode)?;
    Ok(bytes)
}

/// Encodes a bitmap as a `data:image/png;base64,` URL.
pub fn to_png_data_url(image: &RgbaImage) -> Result<String, OverlayError> {
    let bytes = encode_png(image)?;
    Ok(format!("{DATA_URL_PREFIX}{}", STANDARD.encode(bytes)))
}

pub fn write_png(path: &Path, image: &RgbaImage) -> Result<(), OverlayError> {
    let bytes = encode_png(image)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Ticket for one image load request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// Latest-request-wins gate for image loads.
///
/// Each load request takes a ticket from [`ImageLoadGate::begin`]. When a
/// decode finishes, only the most recent ticket is accepted; results for
/// superseded requests are dropped so a slow, stale decode never replaces
/// the image the user asked for last.
#[derive(Debug, Default)]
pub struct ImageLoadGate {
    latest: u64,
}

impl ImageLoadGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> LoadTicket {
        self.latest += 1;
        LoadTicket(self.latest)
    }

    pub fn accept(&self, ticket: LoadTicket) -> bool {
        ticket.0 == self.latest
    }

    /// Passes `result` through for the current ticket, `None` for stale ones.
    pub fn complete<T>(&self, ticket: LoadTicket, result: T) -> Option<T> {
        if self.accept(ticket) {
            Some(result)
        } else {
            log::debug!("discarding stale image load #{} (latest #{})", ticket.0, self.latest);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn png_round_trips_through_data_url() {
        let image = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255]));
        let url = to_png_data_url(&image).unwrap();
        assert!(url.starts_with(DATA_URL_PREFIX));

        let bytes = STANDARD.decode(&url[DATA_URL_PREFIX.len()..]).unwrap();
        let decoded = decode_image(&bytes).unwrap();
        assert_eq!(decoded, image);
    }

    #[test]
    fn missing_image_is_a_load_error() {
        let err = load_image(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, OverlayError::ImageLoad { .. }));
        assert!(matches!(decode_image(b"nope"), Err(OverlayError::ImageLoad { .. })));
    }

    #[test]
    fn only_latest_ticket_is_accepted() {
        let mut gate = ImageLoadGate::new();
        let first = gate.begin();
        let second = gate.begin();
        assert!(!gate.accept(first));
        assert!(gate.accept(second));
        assert_eq!(gate.complete(first, "stale"), None);
        assert_eq!(gate.complete(second, "fresh"), Some("fresh"));
    }
}
