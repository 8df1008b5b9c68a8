use chrono::{DateTime, Local};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Source / Metal ────────────────────────────────────────────────────────────

/// Upstream website a quote was scraped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    #[value(name = "angelone")]
    AngelOne,
    #[value(name = "goodreturns")]
    GoodReturns,
    #[value(name = "bankbazaar")]
    BankBazaar,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Source::AngelOne => "AngelOne",
            Source::GoodReturns => "GoodReturns",
            Source::BankBazaar => "BankBazaar",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Metal {
    Gold,
    Silver,
}

impl Metal {
    /// Purity / quantity label attached to every quote for this metal.
    pub fn unit_label(self) -> &'static str {
        match self {
            Metal::Gold => "24K",
            Metal::Silver => "1 Kg",
        }
    }

    /// Grams in the externally published unit (10g gold, 1kg silver).
    pub fn published_grams(self) -> u32 {
        match self {
            Metal::Gold => 10,
            Metal::Silver => 1000,
        }
    }
}

impl fmt::Display for Metal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metal::Gold => f.write_str("Gold"),
            Metal::Silver => f.write_str("Silver"),
        }
    }
}

// ── Quote ─────────────────────────────────────────────────────────────────────

/// What an extractor pulled out of a page, before it is stamped into a Quote.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub price: Option<String>,
    pub city: Option<String>,
}

impl Extraction {
    pub fn price(price: Option<String>) -> Self {
        Self { price, city: None }
    }
}

/// One source's attempt at a metal price, success or failure.
///
/// Gold quotes are per gram, silver quotes are per kilogram.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Quote {
    pub source: Source,
    pub metal: Metal,
    pub unit_label: String,
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub captured_at: DateTime<Local>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Quote {
    pub fn success(source: Source, metal: Metal, extraction: Extraction) -> Self {
        Self {
            source,
            metal,
            unit_label: metal.unit_label().to_string(),
            price: extraction.price,
            city: extraction.city,
            captured_at: Local::now(),
            error: None,
        }
    }

    /// Failure representation: sentinel price "0" plus the reason.
    pub fn failure(source: Source, metal: Metal, error: impl Into<String>) -> Self {
        Self {
            source,
            metal,
            unit_label: metal.unit_label().to_string(),
            price: Some("0".to_string()),
            city: None,
            captured_at: Local::now(),
            error: Some(error.into()),
        }
    }

    /// True when the price is present, non-blank, not "0" and not numerically zero.
    pub fn is_valid(&self) -> bool {
        let Some(price) = self.price.as_deref().map(str::trim) else {
            return false;
        };
        if price.is_empty() || price == "0" {
            return false;
        }
        match price.parse::<Decimal>() {
            Ok(value) => value > Decimal::ZERO,
            Err(_) => true,
        }
    }
}

// ── Reconciled output ─────────────────────────────────────────────────────────

/// Authoritative price for one metal in its published unit.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReconciledRate {
    pub metal: Metal,
    pub unit_gm: u32,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    #[serde(skip)]
    pub timestamp: DateTime<Local>,
}

impl ReconciledRate {
    pub fn new(metal: Metal, price: Option<Decimal>) -> Self {
        Self {
            metal,
            unit_gm: metal.published_grams(),
            price,
            timestamp: Local::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RatesPayload {
    pub timestamp: DateTime<Local>,
    pub rates: Vec<ReconciledRate>,
}

impl RatesPayload {
    pub fn new(rates: Vec<ReconciledRate>) -> Self {
        Self {
            timestamp: Local::now(),
            rates,
        }
    }

    /// Both metals reported as absent.
    pub fn unavailable() -> Self {
        Self::new(vec![
            ReconciledRate::new(Metal::Gold, None),
            ReconciledRate::new(Metal::Silver, None),
        ])
    }

    pub fn rate(&self, metal: Metal) -> Option<&ReconciledRate> {
        self.rates.iter().find(|r| r.metal == metal)
    }
}

// ── Response envelope ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data,
        }
    }
}
