//! VAT-regime normalization.
//!
//! Serialized units arrive with a free-form VAT marker: second-hand stock
//! sold under the margin scheme, everything else under the normal regime.
//! Upstream systems have persisted the marker in several spellings over the
//! years, so normalization is total and fail-safe: anything unrecognized is
//! treated as the normal regime rather than mislabelled as margin stock.

use serde::{Deserialize, Serialize};

/// Taxation regime of a serialized unit, as printed on its label.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VatRegime {
    /// VAT on the margin (used-goods resale). Printed as `TVM`.
    Margin,
    /// Standard VAT on the full sale price. Printed as `TTC`.
    Normal,
}

impl VatRegime {
    /// Normalize a raw stored marker. Unknown, empty and absent values all
    /// map to [`VatRegime::Normal`].
    pub fn from_value(value: Option<&str>) -> Self {
        match value.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
            Some("margin" | "tvm" | "marge" | "margin_scheme" | "margin-based" | "mrgn") => {
                Self::Margin
            }
            Some("normal" | "ttc" | "standard" | "std") => Self::Normal,
            _ => Self::Normal,
        }
    }

    /// The two-letter regime label printed next to the serial number.
    pub fn label(self) -> &'static str {
        match self {
            Self::Margin => "TVM",
            Self::Normal => "TTC",
        }
    }
}

impl Default for VatRegime {
    fn default() -> Self {
        Self::Normal
    }
}

impl std::fmt::Display for VatRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
