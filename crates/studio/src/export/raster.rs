use base64::Engine;
use image::{Rgb, RgbImage};

use super::ExportError;

/// Largest width or height an embedded page image may have.
const MAX_CAPTURE_DIMENSION: u32 = 65_535;

/// Turns a client-side capture of the rendered document into pixels.
pub(crate) trait Rasterizer: Send + Sync {
    fn rasterize(&self, encoded: &[u8]) -> Result<RgbImage, ExportError>;
}

/// Decodes PNG or JPEG captures and flattens transparency onto white.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct CaptureRasterizer;

impl Rasterizer for CaptureRasterizer {
    fn rasterize(&self, encoded: &[u8]) -> Result<RgbImage, ExportError> {
        let decoded = image::load_from_memory(encoded)
            .map_err(|err| ExportError::CaptureDecode(err.to_string()))?;
        let (width, height) = (decoded.width(), decoded.height());
        if width == 0 || height == 0 {
            return Err(ExportError::EmptyCapture);
        }
        if width > MAX_CAPTURE_DIMENSION || height > MAX_CAPTURE_DIMENSION {
            return Err(ExportError::CaptureTooLarge { width, height });
        }
        let rgba = decoded.to_rgba8();
        let flattened = RgbImage::from_fn(width, height, |x, y| {
            let [r, g, b, a] = rgba.get_pixel(x, y).0;
            let alpha = u16::from(a);
            let blend = |channel: u8| -> u8 {
                let value = (u16::from(channel) * alpha + 255 * (255 - alpha) + 127) / 255;
                value.min(255) as u8
            };
            Rgb([blend(r), blend(g), blend(b)])
        });
        Ok(flattened)
    }
}

/// Decodes a base64 capture, accepting an optional `data:` URL prefix.
pub(crate) fn decode_capture(capture: &str) -> Result<Vec<u8>, ExportError> {
    let payload = match capture.split_once(";base64,") {
        Some((prefix, payload)) if prefix.trim_start().starts_with("data:") => payload,
        _ => capture,
    };
    let compact: String = payload.chars().filter(|ch| !ch.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(ExportError::EmptyCapture);
    }
    base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|err| ExportError::CaptureEncoding(err.to_string()))
}

#[cfg(test)]
pub(crate) fn encode_png(image: &image::RgbaImage) -> Vec<u8> {
    let mut bytes = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, image::ImageFormat::Png)
        .expect("png");
    bytes.into_inner()
}
