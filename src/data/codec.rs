//! Comma-decimal text <-> numbers.
//!
//! Every export in the pipeline writes numbers the way a comma-locale
//! spreadsheet expects them (`12,50`), and every derived value leaves the
//! aggregator through [`encode_float`]. Address-like tokens (`10.0.0.1`)
//! are never touched.

use std::sync::LazyLock;

use regex::Regex;

use super::model::CellValue;

static INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[0-9]+$").expect("valid integer pattern"));
static COMMA_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[0-9]+,[0-9]+$").expect("valid decimal pattern"));
static ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]+\.[0-9]+\.[0-9]+\.[0-9]+$").expect("valid address pattern")
});

/// Whether `s` is shaped like a dotted IPv4 address.
pub fn is_address_like(s: &str) -> bool {
    ADDRESS.is_match(s.trim())
}

/// Decode one cell of comma-decimal text.
///
/// `"42"` → `Integer`, `"12,5"` → `Float`; anything else, including
/// dotted addresses and integers too large for `i64`, comes back untouched
/// as `Text`.
pub fn decode(s: &str) -> CellValue {
    let t = s.trim();
    if is_address_like(t) {
        return CellValue::Text(s.to_string());
    }
    if INTEGER.is_match(t) {
        if let Ok(i) = t.parse::<i64>() {
            return CellValue::Integer(i);
        }
    } else if COMMA_DECIMAL.is_match(t) {
        if let Ok(v) = t.replace(',', ".").parse::<f64>() {
            return CellValue::Float(v);
        }
    }
    CellValue::Text(s.to_string())
}

/// Two decimals, comma separator.
pub fn encode_float(v: f64) -> String {
    format!("{v:.2}").replace('.', ",")
}

pub fn encode(value: &CellValue) -> String {
    match value {
        CellValue::Integer(i) => i.to_string(),
        CellValue::Float(v) => encode_float(*v),
        CellValue::Text(s) => s.clone(),
    }
}

/// Encode free text for an export cell: numeric text gets its decimal point
/// swapped for a comma, everything else (addresses, "no data", "-") is
/// returned as is.
pub fn encode_text(s: &str) -> String {
    if is_address_like(s) {
        return s.to_string();
    }
    match s.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => s.replace('.', ","),
        _ => s.to_string(),
    }
}

/// Parse a number written with either decimal separator.
///
/// Used wherever a cell is consumed as a quantity rather than re-emitted;
/// returns `None` for blanks, sentinels and non-finite values.
pub fn parse_number(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() || is_address_like(t) {
        return None;
    }
    t.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn bytes_to_mb(bytes: f64) -> f64 {
    round2(bytes / (1024.0 * 1024.0))
}

pub fn bytes_to_gb(bytes: f64) -> f64 {
    round2(bytes / (1024.0 * 1024.0 * 1024.0))
}
