//! Minimal PDF drawing surface for fixed-size labels.
//!
//! Wraps `printpdf` behind a top-down millimetre coordinate system (PDF
//! pages are bottom-up) and exposes only what the label layout needs: text
//! in three alignments, filled rectangles for barcode bars, hairlines,
//! a rounded-rectangle frame and raw-pixel image embedding for the QR
//! block. Text metrics use a flat per-character advance, which is accurate
//! enough for the upper-cased Helvetica strings printed on labels.

use image::GrayImage;
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, ColorBits, ColorSpace, Image, ImageTransform, ImageXObject,
    IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference, Point, Px,
    Rect, Rgb,
};

use crate::error::{LabelError, Result};

/// Points per millimetre.
const PT_PER_MM: f32 = 72.0 / 25.4;
/// Average glyph advance as a fraction of the font size. Flat metric for
/// upper-cased Helvetica text.
const CHAR_FACTOR: f32 = 0.55;
/// Stroke width for frames and rules, in points.
const STROKE_PT: f32 = 0.6;
/// Cubic-bezier circle constant for quarter-arc corners.
const KAPPA: f32 = 0.552_284_75;

/// A fixed-size PDF canvas addressed in millimetres from the top-left
/// corner. Each label gets its own page; pages share the document fonts.
pub struct LabelCanvas {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    font_bold: IndirectFontRef,
    width: f32,
    height: f32,
}

impl LabelCanvas {
    pub fn new(title: &str, width_mm: f32, height_mm: f32) -> Result<Self> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(width_mm), Mm(height_mm), "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| LabelError::Pdf(e.to_string()))?;
        let font_bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| LabelError::Pdf(e.to_string()))?;
        let layer = doc.get_page(page).get_layer(layer);
        let canvas = Self {
            doc,
            layer,
            font,
            font_bold,
            width: width_mm,
            height: height_mm,
        };
        canvas.apply_page_defaults();
        Ok(canvas)
    }

    /// Start a new page of the same size; subsequent drawing targets it.
    pub fn add_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(self.width), Mm(self.height), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.apply_page_defaults();
    }

    fn apply_page_defaults(&self) {
        self.layer
            .set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
        self.layer
            .set_outline_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
        self.layer.set_outline_thickness(STROKE_PT);
    }

    /// Flip a top-down y coordinate into PDF space.
    fn y(&self, y_top: f32) -> Mm {
        Mm(self.height - y_top)
    }

    /// Estimated width of a string, in millimetres.
    pub fn text_width(text: &str, size_pt: f32) -> f32 {
        text.chars().count() as f32 * size_pt / PT_PER_MM * CHAR_FACTOR
    }

    fn font_for(&self, bold: bool) -> &IndirectFontRef {
        if bold {
            &self.font_bold
        } else {
            &self.font
        }
    }

    /// Draw text with its baseline at `y_top`, left-aligned at `x`.
    pub fn text(&self, text: &str, size_pt: f32, x: f32, y_top: f32, bold: bool) {
        self.layer
            .use_text(text, size_pt, Mm(x), self.y(y_top), self.font_for(bold));
    }

    /// Draw text right-aligned against `right_x`.
    pub fn text_right(&self, text: &str, size_pt: f32, right_x: f32, y_top: f32, bold: bool) {
        let x = right_x - Self::text_width(text, size_pt);
        self.text(text, size_pt, x.max(0.0), y_top, bold);
    }

    /// Draw text centered on `center_x`.
    pub fn text_center(&self, text: &str, size_pt: f32, center_x: f32, y_top: f32, bold: bool) {
        let x = center_x - Self::text_width(text, size_pt) / 2.0;
        self.text(text, size_pt, x.max(0.0), y_top, bold);
    }

    /// Fill a rectangle whose top-left corner is at (`x`, `y_top`).
    pub fn fill_rect(&self, x: f32, y_top: f32, w: f32, h: f32) {
        let rect = Rect::new(
            Mm(x),
            Mm(self.height - y_top - h),
            Mm(x + w),
            self.y(y_top),
        )
        .with_mode(PaintMode::Fill);
        self.layer.add_rect(rect);
    }

    /// Stroke a horizontal rule at `y_top`.
    pub fn hline(&self, x1: f32, x2: f32, y_top: f32) {
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(x1), self.y(y_top)), false),
                (Point::new(Mm(x2), self.y(y_top)), false),
            ],
            is_closed: false,
        });
    }

    /// Stroke a rounded rectangle with top-left corner (`x`, `y_top`).
    pub fn stroke_rounded_rect(&self, x: f32, y_top: f32, w: f32, h: f32, radius: f32) {
        let points = rounded_ring(x, self.height - y_top - h, x + w, self.height - y_top, radius);
        self.layer.add_line(Line {
            points,
            is_closed: true,
        });
    }

    /// Embed a grayscale image as a square of `size_mm` at (`x`, `y_top`).
    pub fn image_gray(&self, img: &GrayImage, x: f32, y_top: f32, size_mm: f32) {
        let (width, height) = img.dimensions();
        // Expand to RGB; keeps the embed path uniform across viewers.
        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        for pixel in img.pixels() {
            rgb.extend_from_slice(&[pixel.0[0]; 3]);
        }
        let xobject = ImageXObject {
            width: Px(width as usize),
            height: Px(height as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: false,
            image_data: rgb,
            image_filter: None,
            clipping_bbox: None,
            smask: None,
        };
        // DPI chosen so the pixel grid lands exactly on the requested
        // physical size.
        let dpi = width as f32 / (size_mm / 25.4);
        Image::from(xobject).add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(x)),
                translate_y: Some(Mm(self.height - y_top - size_mm)),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
    }

    /// Consume the canvas and return the PDF bytes.
    pub fn finish(self) -> Result<Vec<u8>> {
        let Self { doc, .. } = self;
        doc.save_to_bytes()
            .map_err(|e| LabelError::Pdf(e.to_string()))
    }
}

/// Closed ring for a rounded rectangle in PDF (bottom-up) coordinates.
/// Corners are quarter arcs: two bezier control points flagged `true`
/// followed by the on-curve endpoint.
fn rounded_ring(x0: f32, y0: f32, x1: f32, y1: f32, radius: f32) -> Vec<(Point, bool)> {
    let r = radius.min((x1 - x0) / 2.0).min((y1 - y0) / 2.0).max(0.0);
    let k = KAPPA * r;
    let pt = |x: f32, y: f32| Point::new(Mm(x), Mm(y));
    vec![
        // Top edge, left to right.
        (pt(x0 + r, y1), false),
        (pt(x1 - r, y1), false),
        // Top-right corner.
        (pt(x1 - r + k, y1), true),
        (pt(x1, y1 - r + k), true),
        (pt(x1, y1 - r), false),
        // Right edge.
        (pt(x1, y0 + r), false),
        // Bottom-right corner.
        (pt(x1, y0 + r - k), true),
        (pt(x1 - r + k, y0), true),
        (pt(x1 - r, y0), false),
        // Bottom edge.
        (pt(x0 + r, y0), false),
        // Bottom-left corner.
        (pt(x0 + r - k, y0), true),
        (pt(x0, y0 + r - k), true),
        (pt(x0, y0 + r), false),
        // Left edge.
        (pt(x0, y1 - r), false),
        // Top-left corner, closing back onto the start point.
        (pt(x0, y1 - r + k), true),
        (pt(x0 + r - k, y1), true),
        (pt(x0 + r, y1), false),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canvas_produces_a_pdf() {
        let canvas = LabelCanvas::new("Test", 57.0, 32.0).unwrap();
        canvas.text("HELLO", 7.0, 2.0, 5.0, false);
        canvas.fill_rect(10.0, 10.0, 5.0, 3.0);
        canvas.hline(2.0, 55.0, 20.0);
        canvas.stroke_rounded_rect(1.0, 1.0, 55.0, 30.0, 1.5);
        let bytes = canvas.finish().unwrap();
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn multi_page_canvas_produces_a_pdf() {
        let mut canvas = LabelCanvas::new("Test", 57.0, 32.0).unwrap();
        canvas.text("PAGE 1", 7.0, 2.0, 5.0, false);
        canvas.add_page();
        canvas.text("PAGE 2", 7.0, 2.0, 5.0, true);
        let bytes = canvas.finish().unwrap();
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn text_width_scales_with_length_and_size() {
        let short = LabelCanvas::text_width("AB", 7.0);
        let long = LabelCanvas::text_width("ABCD", 7.0);
        assert!((long - short * 2.0).abs() < 1e-4);
        assert!(LabelCanvas::text_width("AB", 10.0) > LabelCanvas::text_width("AB", 7.0));
        assert_eq!(LabelCanvas::text_width("", 7.0), 0.0);
    }

    #[test]
    fn rounded_ring_closes_on_its_start_point() {
        let ring = rounded_ring(0.0, 0.0, 50.0, 30.0, 2.0);
        // Four edges + four arcs of three points each.
        assert_eq!(ring.len(), 17);
        let first = ring.first().unwrap();
        let last = ring.last().unwrap();
        assert_eq!(first.0.x, last.0.x);
        assert_eq!(first.0.y, last.0.y);
        // Arcs contribute exactly eight control points.
        assert_eq!(ring.iter().filter(|(_, ctrl)| *ctrl).count(), 8);
    }

    #[test]
    fn rounded_ring_clamps_oversized_radius() {
        // Radius larger than half the short side must not invert the ring.
        let ring = rounded_ring(0.0, 0.0, 10.0, 4.0, 50.0);
        let max_x = printpdf::Pt::from(Mm(10.0)).0;
        let max_y = printpdf::Pt::from(Mm(4.0)).0;
        for (point, _) in ring {
            assert!(point.x.0 >= -1e-3 && point.x.0 <= max_x + 1e-3);
            assert!(point.y.0 >= -1e-3 && point.y.0 <= max_y + 1e-3);
        }
    }
}
