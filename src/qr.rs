//! Deep-link payload and QR image generation.
//!
//! The QR block on a label encodes `{scheme}://product/{serial}` so the
//! companion scanner app can jump straight to the unit's record. The path
//! shape is a stable external contract; only the scheme is configurable.

use image::{GrayImage, Luma};
use qrcode::{EcLevel, QrCode};

use crate::error::{LabelError, Result};

/// Pixels per QR module in the rendered image. The physical size is fixed
/// by the layout; this only controls raster sharpness.
const MODULE_PX: u32 = 8;

/// Build the deep-link payload for a serial number. The serial is taken
/// verbatim, not barcode-sanitized.
pub fn deep_link(scheme: &str, serial: &str) -> String {
    format!("{scheme}://product/{serial}")
}

/// Encode a payload as a QR image at medium error correction.
pub fn encode_image(data: &str) -> Result<GrayImage> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::M)
        .map_err(|e| LabelError::Qr(e.to_string()))?;
    Ok(code
        .render::<Luma<u8>>()
        .module_dimensions(MODULE_PX, MODULE_PX)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_link_shape_is_stable() {
        assert_eq!(deep_link("atelier", "ABC-123"), "atelier://product/ABC-123");
        assert_eq!(deep_link("shop", "999000111"), "shop://product/999000111");
    }

    #[test]
    fn qr_image_is_square_and_deterministic() {
        let a = encode_image("atelier://product/ABC-123").unwrap();
        let b = encode_image("atelier://product/ABC-123").unwrap();
        assert_eq!(a.width(), a.height());
        assert!(a.width() > 0);
        assert_eq!(a.dimensions(), b.dimensions());
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn qr_image_contains_dark_modules() {
        let img = encode_image("atelier://product/X").unwrap();
        assert!(img.pixels().any(|p| p.0[0] == 0));
        assert!(img.pixels().any(|p| p.0[0] == 255));
    }
}
