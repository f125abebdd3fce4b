//! Best-effort serialized-unit lookup.
//!
//! Resolves a unit by serial number or IMEI against the back-office HTTP
//! API, primarily to refresh the stored VAT-regime marker at print time.
//! The lookup is strictly best-effort: one attempt, a short timeout, and
//! every failure degrades to `None` with a warning so label generation is
//! never blocked by the network.

use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Timeout for the single lookup request.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Fields of a serialized unit the back office can fill in. Caller-supplied
/// values always win; these only fill gaps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitFacts {
    pub vat_regime: Option<String>,
    pub name: Option<String>,
    pub retail_price: Option<f64>,
    pub pro_price: Option<f64>,
    pub battery_level: Option<f64>,
    pub note: Option<String>,
}

pub struct CatalogClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

/// Normalise the catalog base URL: ensure a scheme (https, or http for
/// localhost) and strip trailing slashes.
pub fn normalize_base_url(url: &str) -> String {
    let mut url = url.trim().to_string();

    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    while url.ends_with('/') {
        url.pop();
    }

    url
}

/// Convert a `reqwest::Error` into a short operator-facing message.
fn friendly_error(url: &str, err: &reqwest::Error) -> String {
    if err.is_connect() {
        return format!("cannot reach catalog at {url}");
    }
    if err.is_timeout() {
        return format!("catalog request to {url} timed out");
    }
    if err.is_builder() {
        return format!("invalid catalog URL: {url}");
    }
    format!("network error communicating with {url}: {err}")
}

fn status_error(status: StatusCode) -> String {
    match status.as_u16() {
        401 | 403 => "catalog rejected the API key".to_string(),
        404 => "serialized unit not found".to_string(),
        s if s >= 500 => format!("catalog server error (HTTP {s})"),
        s => format!("unexpected catalog response (HTTP {s})"),
    }
}

// ---------------------------------------------------------------------------
// Lenient payload probing
// ---------------------------------------------------------------------------

/// Some deployments answer with the record, others with a one-element
/// result set.
fn first_record(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.first().filter(|v| v.is_object()),
        Value::Object(_) => Some(value),
        _ => None,
    }
}

fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text_from_keys(record: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| record.get(key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn number_from_keys(record: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| record.get(key))
        .find_map(parse_number)
}

/// Probe a response payload for unit fields, tolerating the several field
/// spellings the back office has used over time.
pub fn facts_from_value(payload: &Value) -> Option<UnitFacts> {
    let record = first_record(payload)?;
    Some(UnitFacts {
        vat_regime: text_from_keys(record, &["vat_regime", "vatRegime", "tva", "regime_tva"]),
        name: text_from_keys(record, &["name", "nom", "product_name", "designation"]),
        retail_price: number_from_keys(record, &["retail_price", "retailPrice", "prix_vente"]),
        pro_price: number_from_keys(record, &["pro_price", "proPrice", "prix_pro"]),
        battery_level: number_from_keys(record, &["battery_level", "batteryLevel", "batterie"]),
        note: text_from_keys(record, &["note", "remarque", "commentaire"]),
    })
}

impl CatalogClient {
    /// Build a client, or `None` when the HTTP stack cannot be set up
    /// (logged; the caller then skips the lookup entirely).
    pub fn new(base_url: &str, api_key: Option<String>) -> Option<Self> {
        let client = match Client::builder().timeout(LOOKUP_TIMEOUT).build() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "failed to create catalog HTTP client");
                return None;
            }
        };
        Some(Self {
            base_url: normalize_base_url(base_url),
            api_key,
            client,
        })
    }

    /// Fetch the unit record for a serial/IMEI. One attempt, no retry;
    /// any failure logs a warning and returns `None`.
    pub async fn unit_by_serial(&self, serial: &str) -> Option<UnitFacts> {
        let url = format!("{}/api/serialized-units/{}", self.base_url, serial.trim());

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header("X-Atelier-Api-Key", key);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(serial, error = %friendly_error(&self.base_url, &e), "catalog lookup failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(serial, error = %status_error(status), "catalog lookup rejected");
            return None;
        }

        let payload: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!(serial, error = %e, "catalog returned an unreadable payload");
                return None;
            }
        };

        let facts = facts_from_value(&payload);
        if facts.is_none() {
            warn!(serial, "catalog payload did not contain a unit record");
        } else {
            debug!(serial, "catalog lookup resolved");
        }
        facts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn base_url_gains_scheme_and_loses_trailing_slashes() {
        assert_eq!(normalize_base_url("shop.example.com/"), "https://shop.example.com");
        assert_eq!(normalize_base_url("localhost:3000//"), "http://localhost:3000");
        assert_eq!(
            normalize_base_url("  https://api.example.com  "),
            "https://api.example.com"
        );
    }

    #[test]
    fn facts_probe_reads_canonical_fields() {
        let payload = json!({
            "serial": "ABC-123",
            "vat_regime": "margin",
            "name": "iPhone 12",
            "retail_price": 450,
            "pro_price": "399.5",
            "battery_level": 87,
            "note": "grade A"
        });
        let facts = facts_from_value(&payload).unwrap();
        assert_eq!(facts.vat_regime.as_deref(), Some("margin"));
        assert_eq!(facts.name.as_deref(), Some("iPhone 12"));
        assert_eq!(facts.retail_price, Some(450.0));
        assert_eq!(facts.pro_price, Some(399.5));
        assert_eq!(facts.battery_level, Some(87.0));
        assert_eq!(facts.note.as_deref(), Some("grade A"));
    }

    #[test]
    fn facts_probe_accepts_legacy_french_fields() {
        let payload = json!({
            "tva": "marge",
            "nom": "Galaxy S21",
            "prix_vente": "520",
            "prix_pro": 480,
            "batterie": "91",
            "remarque": "reconditionné"
        });
        let facts = facts_from_value(&payload).unwrap();
        assert_eq!(facts.vat_regime.as_deref(), Some("marge"));
        assert_eq!(facts.name.as_deref(), Some("Galaxy S21"));
        assert_eq!(facts.retail_price, Some(520.0));
        assert_eq!(facts.pro_price, Some(480.0));
        assert_eq!(facts.battery_level, Some(91.0));
        assert_eq!(facts.note.as_deref(), Some("reconditionné"));
    }

    #[test]
    fn facts_probe_unwraps_result_sets() {
        let payload = json!([{ "vat_regime": "ttc" }]);
        let facts = facts_from_value(&payload).unwrap();
        assert_eq!(facts.vat_regime.as_deref(), Some("ttc"));

        assert!(facts_from_value(&json!([])).is_none());
        assert!(facts_from_value(&json!("nope")).is_none());
        assert!(facts_from_value(&json!(null)).is_none());
    }

    #[test]
    fn blank_strings_are_treated_as_absent() {
        let payload = json!({ "vat_regime": "  ", "name": "" });
        let facts = facts_from_value(&payload).unwrap();
        assert!(facts.vat_regime.is_none());
        assert!(facts.name.is_none());
    }
}
