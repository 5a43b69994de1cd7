use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, TextStr};

use super::layout::PT_PER_PX;
use super::{plan_pages, ExportError, PageGeometry};

const PAGE_IMAGE: Name<'static> = Name(b"Capture");
const PRODUCER: &str = "Wiz Works";

#[derive(Debug)]
pub(crate) struct PdfExport {
    pub(crate) bytes: Vec<u8>,
    pub(crate) page_count: usize,
}

fn encode_jpeg(capture: &RgbImage, quality: u8) -> Result<Vec<u8>, ExportError> {
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality)
        .encode_image(capture)
        .map_err(|err| ExportError::Assembly(err.to_string()))?;
    Ok(jpeg)
}

fn page_count_i32(count: usize) -> Result<i32, ExportError> {
    i32::try_from(count).map_err(|_| ExportError::Assembly(format!("too many pages: {count}")))
}

fn ref_at(index: usize) -> Result<Ref, ExportError> {
    i32::try_from(index)
        .map(Ref::new)
        .map_err(|_| ExportError::Assembly("object id overflow".to_string()))
}

/// Lays one tall capture over fixed-size pages.
///
/// Every page references the same image object; page `k` shifts it up by `k`
/// printable heights and clips to the printable area.
pub(crate) fn compose_pdf(
    capture: &RgbImage,
    geometry: PageGeometry,
    capture_scale: f32,
    jpeg_quality: u8,
    title: Option<&str>,
) -> Result<PdfExport, ExportError> {
    let plan = plan_pages(geometry, capture.width(), capture.height(), capture_scale)?;
    let jpeg = encode_jpeg(capture, jpeg_quality)?;

    let catalog_id = Ref::new(1);
    let page_tree_id = Ref::new(2);
    let image_id = Ref::new(3);
    let info_id = Ref::new(4);
    let mut page_ids = Vec::with_capacity(plan.page_count);
    let mut content_ids = Vec::with_capacity(plan.page_count);
    for page in 0..plan.page_count {
        page_ids.push(ref_at(5 + 2 * page)?);
        content_ids.push(ref_at(6 + 2 * page)?);
    }

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(page_tree_id);
    pdf.pages(page_tree_id)
        .kids(page_ids.iter().copied())
        .count(page_count_i32(plan.page_count)?);

    let mut info = pdf.document_info(info_id);
    info.producer(TextStr(PRODUCER));
    if let Some(title) = title.map(str::trim).filter(|title| !title.is_empty()) {
        info.title(TextStr(title));
    }
    info.finish();

    let width = i32::try_from(capture.width())
        .map_err(|_| ExportError::CaptureTooLarge {
            width: capture.width(),
            height: capture.height(),
        })?;
    let height = i32::try_from(capture.height())
        .map_err(|_| ExportError::CaptureTooLarge {
            width: capture.width(),
            height: capture.height(),
        })?;
    let mut image = pdf.image_xobject(image_id, &jpeg);
    image.filter(Filter::DctDecode);
    image.width(width);
    image.height(height);
    image.color_space().device_rgb();
    image.bits_per_component(8);
    image.finish();

    let page_width_pt = geometry.width_px * PT_PER_PX;
    let page_height_pt = geometry.height_px * PT_PER_PX;
    let margin_pt = geometry.margin_px * PT_PER_PX;
    let image_width_pt = plan.image_width * PT_PER_PX;
    let image_height_pt = plan.image_height * PT_PER_PX;

    for (page, (page_id, content_id)) in page_ids.iter().zip(&content_ids).enumerate() {
        let mut content = Content::new();
        content.save_state();
        content.rect(
            margin_pt,
            margin_pt,
            geometry.printable_width() * PT_PER_PX,
            geometry.printable_height() * PT_PER_PX,
        );
        content.clip_nonzero();
        content.end_path();
        let image_bottom_pt = page_height_pt - plan.image_top(page) * PT_PER_PX - image_height_pt;
        content.transform([image_width_pt, 0.0, 0.0, image_height_pt, margin_pt, image_bottom_pt]);
        content.x_object(PAGE_IMAGE);
        content.restore_state();
        pdf.stream(*content_id, &content.finish());

        let mut page_writer = pdf.page(*page_id);
        page_writer.media_box(Rect::new(0.0, 0.0, page_width_pt, page_height_pt));
        page_writer.parent(page_tree_id);
        page_writer.contents(*content_id);
        page_writer.resources().x_objects().pair(PAGE_IMAGE, image_id);
        page_writer.finish();
    }

    Ok(PdfExport {
        bytes: pdf.finish(),
        page_count: plan.page_count,
    })
}
