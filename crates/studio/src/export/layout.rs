use super::ExportError;

/// Overflow past a page boundary smaller than this (in page pixels) does not open a new page.
const SUBPIXEL_TOLERANCE_PX: f32 = 0.01;

/// Points per CSS pixel.
pub(crate) const PT_PER_PX: f32 = 0.75;

const A4_WIDTH_PX: f32 = 793.7;
const A4_HEIGHT_PX: f32 = 1122.5;
const DECK_WIDTH_PX: f32 = 1200.0;
const DECK_HEIGHT_PX: f32 = 675.0;

/// Page size and margin in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PageGeometry {
    pub(crate) width_px: f32,
    pub(crate) height_px: f32,
    pub(crate) margin_px: f32,
}

impl PageGeometry {
    pub(crate) fn a4_portrait(margin_px: f32) -> Self {
        Self {
            width_px: A4_WIDTH_PX,
            height_px: A4_HEIGHT_PX,
            margin_px,
        }
    }

    pub(crate) fn deck_landscape() -> Self {
        Self {
            width_px: DECK_WIDTH_PX,
            height_px: DECK_HEIGHT_PX,
            margin_px: 0.0,
        }
    }

    pub(crate) fn printable_width(&self) -> f32 {
        self.width_px - 2.0 * self.margin_px
    }

    pub(crate) fn printable_height(&self) -> f32 {
        self.height_px - 2.0 * self.margin_px
    }
}

/// Placement of one tall capture across consecutive pages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PagePlan {
    pub(crate) geometry: PageGeometry,
    /// Scaled image size in page pixels.
    pub(crate) image_width: f32,
    pub(crate) image_height: f32,
    pub(crate) page_count: usize,
}

impl PagePlan {
    /// Vertical band `[k·P, (k+1)·P)` of the scaled image shown on page `k`.
    pub(crate) fn band(&self, page: usize) -> (f32, f32) {
        let height = self.geometry.printable_height();
        (page as f32 * height, (page + 1) as f32 * height)
    }

    /// Distance from the page top to the image top on page `k`; negative past the first page.
    pub(crate) fn image_top(&self, page: usize) -> f32 {
        self.geometry.margin_px - self.band(page).0
    }
}

/// Fits the capture to the printable width and slices it into page-high bands.
///
/// `capture_scale` is the device-pixel ratio the capture was rasterized at, so
/// `capture_width / capture_scale` is its on-screen CSS width.
pub(crate) fn plan_pages(
    geometry: PageGeometry,
    capture_width: u32,
    capture_height: u32,
    capture_scale: f32,
) -> Result<PagePlan, ExportError> {
    if capture_width == 0 || capture_height == 0 {
        return Err(ExportError::EmptyCapture);
    }
    let printable_height = geometry.printable_height();
    if geometry.printable_width() <= 0.0 || printable_height <= 0.0 {
        return Err(ExportError::Assembly("page margin leaves no printable area".to_string()));
    }
    let css_width = capture_width as f32 / capture_scale;
    let css_height = capture_height as f32 / capture_scale;
    let ratio = geometry.printable_width() / css_width;
    let image_height = css_height * ratio;

    // Residues under SUBPIXEL_TOLERANCE_PX are float noise, not content.
    let pages = ((image_height - SUBPIXEL_TOLERANCE_PX) / printable_height).ceil();
    let page_count = (pages.max(1.0)) as usize;
    Ok(PagePlan {
        geometry,
        image_width: geometry.printable_width(),
        image_height,
        page_count,
    })
}
