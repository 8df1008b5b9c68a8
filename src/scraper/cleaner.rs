use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::LazyLock;
use tracing::warn;

static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d,]*(?:\.\d+)?").expect("Invalid price regex"));

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})\s*([A-Za-z]+)\s*(\d{4})").expect("Invalid date regex")
});

static GRAMS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*grams").expect("Invalid grams regex"));

const RUPEE: char = '₹';

// ── Parsers ───────────────────────────────────────────────────────────────────

/// First numeric run in `s`, thousands separators removed.
/// "₹2,10,722.11-6531.67 (-3.01%)" → "210722.11" | "no price" → None
pub fn extract_price(s: &str) -> Option<String> {
    let s = s.replace(RUPEE, "");
    match PRICE_RE.find(&s) {
        Some(m) => Some(m.as_str().replace(',', "")),
        None => {
            if !s.trim().is_empty() {
                warn!("No numeric price found in '{}'", s.trim());
            }
            None
        }
    }
}

/// Date in "<day> <month name> <year>" form anywhere in `s`.
/// "Rate on 15 December 2025" → 2025-12-15
pub fn extract_date_from_label(s: &str) -> Option<NaiveDate> {
    let caps = DATE_RE.captures(s)?;
    let joined = format!("{} {} {}", &caps[1], &caps[2], &caps[3]);
    NaiveDate::parse_from_str(&joined, "%d %B %Y").ok()
}

/// Leading gram count in a header such as "24k gold rate (8 grams)".
pub fn extract_grams(s: &str) -> Option<u32> {
    GRAMS_RE.captures(s)?.get(1)?.as_str().parse().ok()
}

/// Numeric value of a price string, tolerant of surrounding noise.
pub fn to_decimal(s: &str) -> Option<Decimal> {
    extract_price(s)?.parse().ok()
}

pub fn round_price(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

// ── Display ───────────────────────────────────────────────────────────────────

/// Rupee amount with Indian digit grouping.
/// 210722.11 → "₹2,10,722.11" | 65317 → "₹65,317.00"
pub fn fmt_rupees(value: Decimal) -> String {
    let fixed = format!("{:.2}", round_price(value).abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::new();
    let head = digits.len().saturating_sub(3);
    for (i, ch) in digits[..head].iter().enumerate() {
        if i > 0 && (head - i) % 2 == 0 {
            grouped.push(',');
        }
        grouped.push(*ch);
    }
    if head > 0 {
        grouped.push(',');
    }
    grouped.extend(&digits[head..]);

    let sign = if value.is_sign_negative() && !value.is_zero() { "-" } else { "" };
    format!("{}{}{}.{}", sign, RUPEE, grouped, frac_part)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
