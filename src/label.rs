//! Label layout engine.
//!
//! Turns a serialized-unit record into a fixed-size 57×32 mm printable
//! label: QR deep link, Code 39 barcode, serial + VAT regime, prices,
//! battery level and a word-wrapped notes block. Layout is deterministic
//! and single-pass; [`plan`] resolves every line, width and baseline as
//! pure data, and [`render`] paints the plan onto a PDF canvas. Overflow
//! is truncated, never paginated: a label is one physical sticker.

use serde::{Deserialize, Serialize};

use crate::code39;
use crate::error::{LabelError, Result};
use crate::pdf::LabelCanvas;
use crate::qr;
use crate::vat::VatRegime;

// ---------------------------------------------------------------------------
// Canvas geometry (millimetres, top-down). Fixed by the physical sticker —
// never configurable.
// ---------------------------------------------------------------------------

pub const WIDTH_MM: f32 = 57.0;
pub const HEIGHT_MM: f32 = 32.0;
/// Nominal content margin on every side.
pub const MARGIN_MM: f32 = 2.0;
/// The decorative frame is the content box scaled up by 3% (full-bleed look).
pub const FRAME_SCALE: f32 = 1.03;
const FRAME_RADIUS_MM: f32 = 1.6;

const QR_POS_MM: f32 = 2.3;
const QR_SIZE_MM: f32 = 12.0;

/// Left edge of the column right of the QR block.
pub const COL_X_MM: f32 = QR_POS_MM + QR_SIZE_MM + 1.5;
/// Right edge of the content area.
pub const RIGHT_EDGE_MM: f32 = WIDTH_MM - MARGIN_MM;

const BARCODE_TOP_MM: f32 = 2.6;
const BARCODE_HEIGHT_MM: f32 = 5.5;
/// Quiet zone reserved on each side before widening the bars.
const QUIET_NOMINAL_MM: f32 = 2.0;
/// Hard minimum quiet zone per side; widening is clamped to preserve it.
const QUIET_MIN_MM: f32 = 0.8;
/// Bars are widened to 150% of the nominal span for scanner reliability on
/// a small sticker, at the cost of strict symbol-width proportionality.
const BAR_WIDEN_FACTOR: f32 = 1.5;

const SERIAL_SIZE_PT: f32 = 6.0;
const SERIAL_BASELINE_MM: f32 = BARCODE_TOP_MM + BARCODE_HEIGHT_MM + 2.2;

const NAME_SIZE_PT: f32 = 7.0;
const NAME_FIRST_BASELINE_MM: f32 = 13.2;
const NAME_LINE_HEIGHT_MM: f32 = 2.6;
pub const NAME_MAX_LINES: usize = 3;

const PRICE_X_MM: f32 = MARGIN_MM + 0.5;
const RETAIL_SIZE_PT: f32 = 8.0;
const RETAIL_BASELINE_MM: f32 = 17.4;
const PRO_SIZE_PT: f32 = 7.0;
const PRO_BASELINE_MM: f32 = 20.6;

const BATTERY_SIZE_PT: f32 = 6.5;
const BATTERY_BASELINE_MM: f32 = 21.6;
/// Minimum clearance kept between the battery line and the notes rule.
const BATTERY_SAFETY_PAD_MM: f32 = 1.5;

/// The rule opening the notes region sits at a fixed offset from the
/// bottom margin.
pub const RULE_Y_MM: f32 = HEIGHT_MM - MARGIN_MM - 7.0;
const NOTE_X_MM: f32 = MARGIN_MM + 0.5;
const NOTE_TOP_MM: f32 = RULE_Y_MM + 1.0;
const NOTE_SIZE_PT: f32 = 5.0;
pub const NOTE_LINE_HEIGHT_MM: f32 = 2.0;
/// Baseline sits this far above the bottom of its line box.
const NOTE_BASELINE_LIFT_MM: f32 = 0.3;

/// Placeholder printed for absent or unparseable numeric fields.
pub const PRICE_PLACEHOLDER: &str = "\u{2014}";

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One serialized unit, resolved and normalized, ready to lay out.
/// Constructed fresh per print action and never persisted.
#[derive(Debug, Clone, Default)]
pub struct LabelInput {
    pub serial: String,
    pub name: String,
    pub vat: VatRegime,
    pub retail_price: Option<f64>,
    pub pro_price: Option<f64>,
    pub battery_level: Option<f64>,
    pub note: Option<String>,
}

/// Wire/file form of a label request: the VAT marker is still the raw
/// stored string and every field but the serial is optional. Accepts the
/// field spellings used by the various upstream exports.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LabelRequest {
    #[serde(default, alias = "imei")]
    pub serial: String,
    #[serde(default, alias = "nom")]
    pub name: Option<String>,
    #[serde(default, alias = "vatRegime", alias = "tva", alias = "regime_tva")]
    pub vat_regime: Option<String>,
    #[serde(default, alias = "retailPrice", alias = "prix_vente")]
    pub retail_price: Option<f64>,
    #[serde(default, alias = "proPrice", alias = "prix_pro")]
    pub pro_price: Option<f64>,
    #[serde(default, alias = "batteryLevel", alias = "batterie")]
    pub battery_level: Option<f64>,
    #[serde(default, alias = "remarque")]
    pub note: Option<String>,
}

impl LabelRequest {
    /// Normalize into a [`LabelInput`]; total, no validation here (the
    /// layout engine owns the serial precondition).
    pub fn into_input(self) -> LabelInput {
        LabelInput {
            serial: self.serial,
            name: self.name.unwrap_or_default(),
            vat: VatRegime::from_value(self.vat_regime.as_deref()),
            retail_price: self.retail_price,
            pro_price: self.pro_price,
            battery_level: self.battery_level,
            note: self.note,
        }
    }
}

/// Rendering options. Geometry is fixed; only the deep-link scheme of the
/// companion app varies per deployment.
#[derive(Debug, Clone)]
pub struct LabelConfig {
    pub scheme: String,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            scheme: "atelier".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// The fully resolved layout for one label: every string formatted, every
/// wrap and truncation applied, every derived coordinate computed. Pure
/// data so layout decisions can be asserted without parsing a PDF.
#[derive(Debug, Clone, Serialize)]
pub struct LabelPlan {
    pub deep_link: String,
    /// Sentinel-wrapped Code 39 payload, e.g. `*ABC-123*`.
    pub barcode_payload: String,
    pub barcode: Vec<code39::Element>,
    /// Physical span of the bars after quiet-zone clamping.
    pub bar_span_mm: f32,
    /// Left edge of the first bar.
    pub bar_origin_mm: f32,
    pub serial_line: String,
    pub retail_line: String,
    pub pro_line: String,
    pub name_lines: Vec<String>,
    pub dropped_name_lines: usize,
    pub battery_line: Option<String>,
    pub battery_baseline_mm: f32,
    pub max_note_lines: usize,
    pub note_lines: Vec<String>,
    pub dropped_note_lines: usize,
}

/// Format a nullable price as an integer-rounded, unit-less number.
/// Absent and non-finite values print the em-dash placeholder.
pub fn price_text(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{}", v.round() as i64),
        _ => PRICE_PLACEHOLDER.to_string(),
    }
}

/// Format the battery line, when a finite level is present.
fn battery_text(value: Option<f64>) -> Option<String> {
    value
        .filter(|v| v.is_finite())
        .map(|v| format!("BAT: {}%", v.round() as i64))
}

/// Greedy word wrap on an estimated character budget.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut line = String::new();
    for token in text.split_whitespace() {
        if line.is_empty() {
            line.push_str(token);
            continue;
        }
        let next_len = line.chars().count() + 1 + token.chars().count();
        if next_len > width.max(8) {
            out.push(line);
            line = token.to_string();
        } else {
            line.push(' ');
            line.push_str(token);
        }
    }
    if !line.is_empty() {
        out.push(line);
    }
    out
}

/// Character budget for a text region of `width_mm` at `size_pt`.
fn chars_per_line(width_mm: f32, size_pt: f32) -> usize {
    let char_mm = LabelCanvas::text_width("M", size_pt);
    ((width_mm / char_mm) as usize).max(8)
}

fn note_baseline_mm(index: usize) -> f32 {
    NOTE_TOP_MM + (index as f32 + 1.0) * NOTE_LINE_HEIGHT_MM - NOTE_BASELINE_LIFT_MM
}

/// Resolve the complete layout for one unit.
///
/// The serial is the only precondition; everything else degrades to
/// placeholders or empty regions.
pub fn plan(input: &LabelInput, config: &LabelConfig) -> Result<LabelPlan> {
    let serial = input.serial.trim();
    if serial.is_empty() {
        return Err(LabelError::MissingSerial);
    }

    let deep_link = qr::deep_link(&config.scheme, serial);
    let sanitized = code39::sanitize(serial);
    let barcode = code39::encode(serial);

    // Widen the bars for scanner reliability, clamped so the hard minimum
    // quiet zone survives on both sides.
    let region_mm = RIGHT_EDGE_MM - COL_X_MM;
    let nominal_mm = region_mm - 2.0 * QUIET_NOMINAL_MM;
    let max_span_mm = region_mm - 2.0 * QUIET_MIN_MM;
    let bar_span_mm = (nominal_mm * BAR_WIDEN_FACTOR).min(max_span_mm);
    let bar_origin_mm = COL_X_MM + (region_mm - bar_span_mm) / 2.0;

    let name_lines = wrap(
        &input.name.to_uppercase(),
        chars_per_line(region_mm, NAME_SIZE_PT),
    );
    let dropped_name_lines = name_lines.len().saturating_sub(NAME_MAX_LINES);
    let name_lines: Vec<String> = name_lines.into_iter().take(NAME_MAX_LINES).collect();

    let battery_line = battery_text(input.battery_level);
    let battery_baseline_mm = BATTERY_BASELINE_MM.min(RULE_Y_MM - BATTERY_SAFETY_PAD_MM);

    let note = input
        .note
        .as_deref()
        .unwrap_or_default()
        .replace(&['\r', '\n'][..], " ")
        .to_uppercase();
    let available_mm = HEIGHT_MM - MARGIN_MM - NOTE_TOP_MM;
    let max_note_lines = (available_mm / NOTE_LINE_HEIGHT_MM).floor() as usize;
    let note_lines = wrap(
        &note,
        chars_per_line(RIGHT_EDGE_MM - NOTE_X_MM, NOTE_SIZE_PT),
    );
    let dropped_note_lines = note_lines.len().saturating_sub(max_note_lines);
    let note_lines: Vec<String> = note_lines.into_iter().take(max_note_lines).collect();

    Ok(LabelPlan {
        deep_link,
        barcode_payload: format!("*{sanitized}*"),
        barcode,
        bar_span_mm,
        bar_origin_mm,
        serial_line: format!("{} {}", serial, input.vat.label()),
        retail_line: price_text(input.retail_price),
        pro_line: price_text(input.pro_price),
        name_lines,
        dropped_name_lines,
        battery_line,
        battery_baseline_mm,
        max_note_lines,
        note_lines,
        dropped_note_lines,
    })
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn draw(canvas: &LabelCanvas, plan: &LabelPlan) -> Result<()> {
    // Decorative frame, centered after the 3% enlargement.
    let frame_w = (WIDTH_MM - 2.0 * MARGIN_MM) * FRAME_SCALE;
    let frame_h = (HEIGHT_MM - 2.0 * MARGIN_MM) * FRAME_SCALE;
    canvas.stroke_rounded_rect(
        (WIDTH_MM - frame_w) / 2.0,
        (HEIGHT_MM - frame_h) / 2.0,
        frame_w,
        frame_h,
        FRAME_RADIUS_MM,
    );

    let qr_image = qr::encode_image(&plan.deep_link)?;
    canvas.image_gray(&qr_image, QR_POS_MM, QR_POS_MM, QR_SIZE_MM);

    // Bars only are painted; spaces advance the cursor.
    let unit_mm = plan.bar_span_mm / code39::total_units(&plan.barcode) as f32;
    let mut cursor = plan.bar_origin_mm;
    for element in &plan.barcode {
        let w = element.width as f32 * unit_mm;
        if element.bar {
            canvas.fill_rect(cursor, BARCODE_TOP_MM, w, BARCODE_HEIGHT_MM);
        }
        cursor += w;
    }

    canvas.text_right(
        &plan.serial_line,
        SERIAL_SIZE_PT,
        RIGHT_EDGE_MM,
        SERIAL_BASELINE_MM,
        false,
    );

    canvas.text(
        &plan.retail_line,
        RETAIL_SIZE_PT,
        PRICE_X_MM,
        RETAIL_BASELINE_MM,
        true,
    );
    canvas.text(&plan.pro_line, PRO_SIZE_PT, PRICE_X_MM, PRO_BASELINE_MM, false);

    for (idx, line) in plan.name_lines.iter().enumerate() {
        canvas.text(
            line,
            NAME_SIZE_PT,
            COL_X_MM,
            NAME_FIRST_BASELINE_MM + idx as f32 * NAME_LINE_HEIGHT_MM,
            true,
        );
    }

    if let Some(line) = &plan.battery_line {
        canvas.text_center(
            line,
            BATTERY_SIZE_PT,
            (COL_X_MM + RIGHT_EDGE_MM) / 2.0,
            plan.battery_baseline_mm,
            false,
        );
    }

    canvas.hline(NOTE_X_MM, RIGHT_EDGE_MM - 0.5, RULE_Y_MM);
    for (idx, line) in plan.note_lines.iter().enumerate() {
        canvas.text(line, NOTE_SIZE_PT, NOTE_X_MM, note_baseline_mm(idx), false);
    }

    Ok(())
}

/// Render one unit as a single-page PDF.
pub fn render(input: &LabelInput, config: &LabelConfig) -> Result<Vec<u8>> {
    let plan = plan(input, config)?;
    let canvas = LabelCanvas::new("Etiquettes", WIDTH_MM, HEIGHT_MM)?;
    draw(&canvas, &plan)?;
    canvas.finish()
}

/// Render several units as a multi-page PDF, one label page per unit.
/// Used when printing every serialized unit of a multi-serial parent
/// product in one pass.
pub fn render_batch(inputs: &[LabelInput], config: &LabelConfig) -> Result<Vec<u8>> {
    let first = inputs.first().ok_or(LabelError::EmptyBatch)?;

    // Resolve every plan before drawing anything, so a bad unit aborts the
    // whole batch without emitting a partial document.
    let mut plans = vec![plan(first, config)?];
    for input in &inputs[1..] {
        plans.push(plan(input, config)?);
    }

    let mut canvas = LabelCanvas::new("Etiquettes", WIDTH_MM, HEIGHT_MM)?;
    for (idx, label_plan) in plans.iter().enumerate() {
        if idx > 0 {
            canvas.add_page();
        }
        draw(&canvas, label_plan)?;
    }
    canvas.finish()
}
