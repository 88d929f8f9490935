//! Fixed-point amount formatting and relative time descriptions.

use chrono::{DateTime, TimeZone, Utc};
use ethers_core::types::U256;

pub const GWEI_DECIMALS: u32 = 9;
pub const WEI_DECIMALS: u32 = 18;

const MAX_DECIMALS: u32 = 77;

/// Correction applied to raw amounts whose display value is implausibly
/// large for the native currency, typically 18-decimal values read with 6.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rescale {
    pub threshold: f64,
    pub exponent: u32,
}

impl Rescale {
    pub const DISABLED: Rescale = Rescale {
        threshold: f64::INFINITY,
        exponent: 0,
    };
}

/// Formats a fixed-point integer with `decimals` places, trimming trailing
/// zeros: `1_500_000` with 6 decimals is `"1.5"`, `1_000_000` is `"1"`.
pub fn format_units(value: U256, decimals: u32) -> String {
    let decimals = decimals.min(MAX_DECIMALS);
    if decimals == 0 {
        return value.to_string();
    }
    let (int_part, frac_part) = value.div_mod(U256::exp10(decimals as usize));
    let frac = format!("{:0>width$}", frac_part.to_string(), width = decimals as usize);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, frac)
    }
}

/// Parses a decimal or `0x`-prefixed hexadecimal unsigned integer.
pub fn parse_u256(raw: &str) -> Option<U256> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        if hex.is_empty() {
            return Some(U256::zero());
        }
        return U256::from_str_radix(hex, 16).ok();
    }
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    U256::from_dec_str(raw).ok()
}

/// Converts a raw native amount into display units, applying `rescale` when
/// the result crosses its threshold.
pub fn native_display(value: U256, decimals: u32, rescale: Rescale) -> String {
    let formatted = format_units(value, decimals);
    let plausible = formatted
        .parse::<f64>()
        .map(|v| v <= rescale.threshold)
        .unwrap_or(true);
    if plausible || rescale.exponent == 0 {
        formatted
    } else {
        format_units(value, decimals + rescale.exponent)
    }
}

/// Normalizes an already formatted decimal string such as `"12.500"` to
/// `"12.5"`. Non-positive or unparsable input yields `"0"`.
pub fn normalize_decimal(raw: &str) -> String {
    match raw.trim().parse::<f64>() {
        Ok(v) if v > 0.0 && v.is_finite() => format_f64(v),
        _ => "0".to_string(),
    }
}

pub fn format_f64(v: f64) -> String {
    format!("{}", v)
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn format_relative(timestamp: i64) -> String {
    format_relative_to(timestamp, Utc::now())
}

/// Describes how far `timestamp` (unix seconds) lies from `now`, e.g.
/// `"5 minutes ago"` or `"in about 2 hours"`.
pub fn format_relative_to(timestamp: i64, now: DateTime<Utc>) -> String {
    let then = match Utc.timestamp_opt(timestamp, 0).single() {
        Some(t) => t,
        None => return "unknown".to_string(),
    };
    let delta = now.signed_duration_since(then).num_seconds();
    let phrase = distance_phrase(delta.unsigned_abs());
    if delta >= 0 {
        format!("{} ago", phrase)
    } else {
        format!("in {}", phrase)
    }
}

fn distance_phrase(secs: u64) -> String {
    let minutes = (secs as f64 / 60.0).round() as u64;
    const MIN_PER_DAY: u64 = 1_440;
    const MIN_PER_MONTH: u64 = 43_200;
    match minutes {
        0 => "less than a minute".to_string(),
        1 => "1 minute".to_string(),
        2..=44 => format!("{} minutes", minutes),
        45..=89 => "about 1 hour".to_string(),
        90..=1_439 => format!("about {} hours", (minutes as f64 / 60.0).round() as u64),
        1_440..=2_519 => "1 day".to_string(),
        2_520..=43_199 => format!("{} days", (minutes as f64 / MIN_PER_DAY as f64).round() as u64),
        43_200..=86_399 => {
            let months = (minutes as f64 / MIN_PER_MONTH as f64).round() as u64;
            format!("about {} month{}", months, if months == 1 { "" } else { "s" })
        }
        m if m < 525_600 => format!("{} months", (m as f64 / MIN_PER_MONTH as f64).round() as u64),
        m => {
            let years = m / 525_600;
            format!("about {} year{}", years, if years == 1 { "" } else { "s" })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARC: Rescale = Rescale {
        threshold: 1_000.0,
        exponent: 12,
    };

    #[test]
    fn format_units_trims_fraction() {
        assert_eq!(format_units(U256::from(1_000_000u64), 6), "1");
        assert_eq!(format_units(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_units(U256::from(1u64), 6), "0.000001");
        assert_eq!(format_units(U256::zero(), 6), "0");
        assert_eq!(format_units(U256::from(42u64), 0), "42");
    }

    #[test]
    fn gas_price_to_gwei() {
        assert_eq!(format_units(U256::from(20_000_000_000u64), GWEI_DECIMALS), "20");
        assert_eq!(format_units(U256::from(1_500_000_000u64), GWEI_DECIMALS), "1.5");
    }

    #[test]
    fn parse_u256_accepts_decimal_and_hex() {
        assert_eq!(parse_u256("1000000"), Some(U256::from(1_000_000u64)));
        assert_eq!(parse_u256("0x10"), Some(U256::from(16u64)));
        assert_eq!(parse_u256("0x"), Some(U256::zero()));
        assert_eq!(parse_u256("1.5"), None);
        assert_eq!(parse_u256(""), None);
    }

    #[test]
    fn native_display_converts_six_decimals() {
        assert_eq!(native_display(U256::from(1_000_000u64), 6, ARC), "1");
    }

    #[test]
    fn native_display_keeps_plausible_values() {
        assert_eq!(native_display(U256::from(500_000_000u64), 6, ARC), "500");
        assert_eq!(native_display(U256::from(1_000_000_000u64), 6, ARC), "1000");
    }

    #[test]
    fn native_display_rescales_eighteen_decimal_amounts() {
        let raw = parse_u256("1500000000000000000").unwrap();
        assert_eq!(native_display(raw, 6, ARC), "1.5");
        assert_eq!(native_display(raw, 6, Rescale::DISABLED), "1500000000000");
    }

    #[test]
    fn normalize_decimal_handles_preformatted() {
        assert_eq!(normalize_decimal("12.500"), "12.5");
        assert_eq!(normalize_decimal("-1.0"), "0");
        assert_eq!(normalize_decimal("abc"), "0");
    }

    #[test]
    fn relative_time_phrases() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let ts = now.timestamp();
        assert_eq!(format_relative_to(ts - 10, now), "less than a minute ago");
        assert_eq!(format_relative_to(ts - 60, now), "1 minute ago");
        assert_eq!(format_relative_to(ts - 300, now), "5 minutes ago");
        assert_eq!(format_relative_to(ts - 3_600, now), "about 1 hour ago");
        assert_eq!(format_relative_to(ts - 3 * 3_600, now), "about 3 hours ago");
        assert_eq!(format_relative_to(ts - 86_400, now), "1 day ago");
        assert_eq!(format_relative_to(ts - 5 * 86_400, now), "5 days ago");
        assert_eq!(format_relative_to(ts + 120, now), "in 2 minutes");
    }
}
