mod filename;
mod html;
mod layout;
mod pdf;
mod raster;

use thiserror::Error;

pub(crate) use filename::{content_disposition, export_filename};
pub(crate) use html::export_html;
pub(crate) use layout::{plan_pages, PageGeometry};
pub(crate) use pdf::compose_pdf;
pub(crate) use raster::{decode_capture, CaptureRasterizer, Rasterizer};
#[cfg(test)]
pub(crate) use raster::encode_png;

pub(crate) const REPORT_FILE_STEM: &str = "wiz-works-report";
pub(crate) const PROPOSAL_FILE_STEM: &str = "제안서";

#[derive(Debug, Error)]
pub(crate) enum ExportError {
    #[error("capture is not valid base64: {0}")]
    CaptureEncoding(String),
    #[error("capture could not be decoded: {0}")]
    CaptureDecode(String),
    #[error("capture has no pixels")]
    EmptyCapture,
    #[error("capture of {width}x{height} exceeds the page image limit")]
    CaptureTooLarge { width: u32, height: u32 },
    #[error("pdf assembly failed: {0}")]
    Assembly(String),
}
