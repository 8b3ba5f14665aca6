//! Text parsing helpers shared by the site adapters.

use crate::error::{AdapterError, Result};
use regex_lite::Regex;
use std::sync::LazyLock;

static PERCENTAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([\d.]+)%$").expect("static pattern"));

static LEADING_INT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\d]*([\d\s]+)").expect("static pattern"));

/// Translates an integer with thousands separators (e.g. "3,619") into an
/// integer (e.g. 3619).
pub fn parse_counter(text: &str) -> Result<u64> {
    text.trim()
        .replace(',', "")
        .parse()
        .map_err(|_| AdapterError::Malformed {
            expected: "counter",
            text: text.to_string(),
        })
}

/// Translates a human-readable magnitude (e.g. "1.2K", "3M", "617") into an
/// integer. Trailing words after the number are ignored ("1.2K Reads").
pub fn parse_compact(text: &str) -> Result<u64> {
    let malformed = || AdapterError::Malformed {
        expected: "human-readable integer",
        text: text.to_string(),
    };
    let token = text.split_whitespace().next().ok_or_else(malformed)?;
    let scaled = |digits: &str, scale: f64| -> Result<u64> {
        let magnitude: f64 = digits.parse().map_err(|_| malformed())?;
        Ok((magnitude * scale).round() as u64)
    };
    if let Some(digits) = token.strip_suffix('K') {
        scaled(digits, 1e3)
    } else if let Some(digits) = token.strip_suffix('M') {
        scaled(digits, 1e6)
    } else {
        token.parse().map_err(|_| malformed())
    }
}

/// Returns the first integer in a string, tolerating grouping whitespace
/// ("1 234 567 views" → 1234567).
pub fn parse_leading_int(text: &str) -> Result<u64> {
    let malformed = || AdapterError::Malformed {
        expected: "integer",
        text: text.to_string(),
    };
    let captured = LEADING_INT
        .captures(text)
        .and_then(|captures| captures.get(1))
        .ok_or_else(malformed)?;
    let digits: String = captured
        .as_str()
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    digits.parse().map_err(|_| malformed())
}

/// Translates a percentage (e.g. "42.9%") into a ratio in the range [0; 1].
pub fn parse_percentage(text: &str) -> Result<f64> {
    let malformed = || AdapterError::Malformed {
        expected: "percentage",
        text: text.to_string(),
    };
    let captured = PERCENTAGE
        .captures(text.trim())
        .and_then(|captures| captures.get(1))
        .ok_or_else(malformed)?;
    let ratio: f64 = captured.as_str().parse::<f64>().map_err(|_| malformed())? / 100.0;
    if !(0.0..=1.0).contains(&ratio) {
        return Err(AdapterError::RatioOutOfRange(ratio));
    }
    Ok(ratio)
}

/// Computes a fraction, defaulting to 0.0 when the denominator is zero.
#[must_use]
pub fn fraction(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
