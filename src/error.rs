//! Error types for label generation.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LabelError>;

/// Errors raised while generating or presenting a label.
///
/// The only validated precondition is a non-empty serial number; every other
/// degraded input (missing prices, unknown VAT marker, absent battery level)
/// is rendered with a placeholder instead of failing.
#[derive(Debug, Error)]
pub enum LabelError {
    #[error("a serial number or IMEI is required to generate a label")]
    MissingSerial,

    #[error("batch file contains no labels")]
    EmptyBatch,

    #[error("QR encoding failed: {0}")]
    Qr(String),

    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
