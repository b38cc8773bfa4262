use std::fs;
use std::path::{Path, PathBuf};

use printpdf::{Image, ImageTransform, Mm, PdfDocument};

use crate::error::ExportError;

pub const PDF_EXPORT_FILE_NAME: &str = "english-explorer-analysis.pdf";

// US letter with half-inch margins on all sides.
const LETTER_WIDTH_IN: f32 = 8.5;
const LETTER_HEIGHT_IN: f32 = 11.0;
const MARGIN_IN: f32 = 0.5;
const MM_PER_IN: f32 = 25.4;

/// Raw RGBA capture of the rendered result region, plus the vertical
/// extent of each result card within it (pixel rows, top inclusive,
/// bottom exclusive, in capture coordinates). The GUI produces this from
/// a viewport screenshot; everything below is rendering-engine agnostic.
pub struct RegionCapture {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
    pub card_rows: Vec<(usize, usize)>,
}

/// One horizontal band of the capture destined for its own PDF page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSlice {
    pub top: usize,
    pub bottom: usize,
}

/// Cuts the capture into page-sized bands without splitting a card: a
/// card that would straddle a page boundary moves whole to the next
/// page. A card taller than a page is the one exception; it starts on a
/// fresh page and is hard-cut at full-page intervals. Slices are
/// contiguous and cover the full height in order.
pub fn paginate(height: usize, page_px: usize, card_rows: &[(usize, usize)]) -> Vec<PageSlice> {
    if height == 0 || page_px == 0 {
        return Vec::new();
    }
    let mut slices = Vec::new();
    let mut page_top = 0usize;

    for &(top, bottom) in card_rows {
        // Clamp to the region and to content already placed, so unsorted
        // or overlapping rects cannot walk the cursor backwards.
        let bottom = bottom.min(height);
        if bottom <= page_top {
            continue;
        }
        let top = top.min(height).max(page_top);
        if bottom <= top {
            continue;
        }
        if bottom - page_top > page_px {
            // Cut any full pages of preceding content first so no slice
            // exceeds the page height.
            while top - page_top >= page_px {
                slices.push(PageSlice {
                    top: page_top,
                    bottom: page_top + page_px,
                });
                page_top += page_px;
            }
            if top > page_top && bottom - page_top > page_px {
                slices.push(PageSlice { top: page_top, bottom: top });
                page_top = top;
            }
            while bottom - page_top > page_px {
                slices.push(PageSlice {
                    top: page_top,
                    bottom: page_top + page_px,
                });
                page_top += page_px;
            }
        }
    }

    while height - page_top > page_px {
        slices.push(PageSlice {
            top: page_top,
            bottom: page_top + page_px,
        });
        page_top += page_px;
    }
    if height > page_top {
        slices.push(PageSlice {
            top: page_top,
            bottom: height,
        });
    }
    slices
}

/// Renders the capture onto US-letter pages (0.5in margins, the capture
/// width mapped to the full 7.5in content width) and returns the PDF
/// bytes.
pub fn render_capture_to_pdf(capture: &RegionCapture) -> Result<Vec<u8>, ExportError> {
    if capture.width == 0 || capture.height == 0 {
        return Err(ExportError::Pdf("empty capture region".to_string()));
    }
    if capture.rgba.len() != capture.width * capture.height * 4 {
        return Err(ExportError::Pdf(
            "capture buffer does not match its stated dimensions".to_string(),
        ));
    }

    let content_w_in = LETTER_WIDTH_IN - 2.0 * MARGIN_IN;
    let content_h_in = LETTER_HEIGHT_IN - 2.0 * MARGIN_IN;
    let px_per_in = capture.width as f32 / content_w_in;
    let page_px = ((content_h_in * px_per_in).floor() as usize).max(1);

    let slices = paginate(capture.height, page_px, &capture.card_rows);
    if slices.is_empty() {
        return Err(ExportError::Pdf("nothing to paginate".to_string()));
    }

    let page_w = Mm(LETTER_WIDTH_IN * MM_PER_IN);
    let page_h = Mm(LETTER_HEIGHT_IN * MM_PER_IN);
    let (doc, first_page, first_layer) =
        PdfDocument::new("English Explorer Analysis", page_w, page_h, "result");

    for (i, slice) in slices.iter().enumerate() {
        let (page, layer) = if i == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(page_w, page_h, "result")
        };
        let rgb = slice_to_rgb(capture, slice).ok_or_else(|| {
            ExportError::Pdf("failed to assemble page image from capture".to_string())
        })?;
        let image = Image::from_dynamic_image(&printpdf::image_crate::DynamicImage::ImageRgb8(rgb));
        let slice_h_in = (slice.bottom - slice.top) as f32 / px_per_in;
        image.add_to_layer(
            doc.get_page(page).get_layer(layer),
            ImageTransform {
                translate_x: Some(Mm(MARGIN_IN * MM_PER_IN)),
                translate_y: Some(Mm((LETTER_HEIGHT_IN - MARGIN_IN - slice_h_in) * MM_PER_IN)),
                dpi: Some(px_per_in),
                ..Default::default()
            },
        );
    }

    doc.save_to_bytes()
        .map_err(|e| ExportError::Pdf(e.to_string()))
}

/// Writes the rendered PDF into the export directory under its fixed
/// name and returns the path it landed at.
pub fn write_pdf_report(export_dir: &Path, capture: &RegionCapture) -> Result<PathBuf, ExportError> {
    let bytes = render_capture_to_pdf(capture)?;
    let path = export_dir.join(PDF_EXPORT_FILE_NAME);
    fs::write(&path, bytes).map_err(|source| ExportError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn slice_to_rgb(
    capture: &RegionCapture,
    slice: &PageSlice,
) -> Option<printpdf::image_crate::RgbImage> {
    let w = capture.width;
    let h = slice.bottom - slice.top;
    let mut rgb = Vec::with_capacity(w * h * 3);
    for row in slice.top..slice.bottom {
        let start = row * w * 4;
        for col in 0..w {
            let o = start + col * 4;
            rgb.extend_from_slice(&capture.rgba[o..o + 3]);
        }
    }
    printpdf::image_crate::RgbImage::from_raw(w as u32, h as u32, rgb)
}
