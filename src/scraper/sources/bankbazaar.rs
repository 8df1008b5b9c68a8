//! bankbazaar.com rate pages.
//!
//! Primary: a parameters table with dated per-unit rows, most recent date wins.
//! Fallback: a city table quoting another quantity, rescaled.

use crate::models::{Extraction, Metal, Source};
use crate::scraper::dom::{
    DatedTable, HeaderMatch, Scale, ScaledTable, ValueColumn, latest_dated_price, scaled_price,
};
use crate::scraper::error::SourceError;
use crate::scraper::http_client::HttpClient;
use crate::scraper::QuoteSource;
use async_trait::async_trait;
use scraper::Html;
use tracing::{debug, info};

const GOLD_PRIMARY: DatedTable = DatedTable {
    header_terms: &["gold price", "24"],
    value_column: ValueColumn::MatchedHeader,
    label_contains: None,
    value_contains: Some("gram"),
};

/// City table quoting 24K for N grams (8 unless the header says otherwise).
const GOLD_FALLBACK: ScaledTable = ScaledTable {
    header: HeaderMatch::Joined("24k gold rate"),
    cell: 2,
    scale: Scale::PerGramFromHeader { default_grams: 8 },
};

const SILVER_PRIMARY: DatedTable = DatedTable {
    header_terms: &["silver price", "kg"],
    value_column: ValueColumn::Index(1),
    label_contains: Some("rate of silver on"),
    value_contains: None,
};

/// City table quoting per 10 grams; x100 gives per kg.
const SILVER_FALLBACK: ScaledTable = ScaledTable {
    header: HeaderMatch::AnyCell("price per 10 grams"),
    cell: 1,
    scale: Scale::Multiply(100),
};

pub struct BankBazaar {
    metal: Metal,
    url: String,
}

impl BankBazaar {
    pub fn new(metal: Metal, url: impl Into<String>) -> Self {
        Self {
            metal,
            url: url.into(),
        }
    }
}

#[async_trait]
impl QuoteSource for BankBazaar {
    fn source(&self) -> Source {
        Source::BankBazaar
    }

    fn metal(&self) -> Metal {
        self.metal
    }

    async fn extract(&self, client: &HttpClient) -> Result<Extraction, SourceError> {
        let html = client.get_html(&self.url).await?;
        parse(self.metal, &html)
    }
}

pub fn parse(metal: Metal, html: &str) -> Result<Extraction, SourceError> {
    let doc = Html::parse_document(html);
    let (primary, fallback, missing) = match metal {
        Metal::Gold => (&GOLD_PRIMARY, &GOLD_FALLBACK, "24K gold not found"),
        Metal::Silver => (&SILVER_PRIMARY, &SILVER_FALLBACK, "Silver 1kg not found"),
    };

    if let Some(price) = latest_dated_price(&doc, primary)? {
        info!("BankBazaar fetched {} price: {}", metal, price);
        return Ok(Extraction::price(Some(price)));
    }

    debug!("BankBazaar {}: no parameters table, trying city table", metal);
    if let Some(price) = scaled_price(&doc, fallback)? {
        info!("BankBazaar fetched {} price from city table: {}", metal, price);
        return Ok(Extraction::price(Some(price)));
    }

    Err(SourceError::not_found(missing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn price_of(metal: Metal, html: &str) -> Decimal {
        parse(metal, html).unwrap().price.unwrap().parse().unwrap()
    }

    #[test]
    fn test_gold_primary_takes_most_recent_date() {
        let html = r#"
            <table>
              <tr><th>Parameter</th><th>Gold Price (24 Carat)</th></tr>
              <tr><td>Rate on 14 December 2025</td><td>₹6,500 per gram</td></tr>
              <tr><td>Rate on 16 December 2025</td><td>₹6,531.70 per gram</td></tr>
              <tr><td>Rate on 15 December 2025</td><td>₹6,520 per gram</td></tr>
              <tr><td>Rate on 17 December 2025</td><td>₹65,999 per 10 g</td></tr>
            </table>"#;
        assert_eq!(price_of(Metal::Gold, html), dec!(6531.70));
    }

    #[test]
    fn test_gold_primary_keeps_first_undated_row() {
        let html = r#"
            <table>
              <tr><th>Parameter</th><th>Gold Price 24K</th></tr>
              <tr><td>Today</td><td>₹6,400 / gram</td></tr>
              <tr><td>Yesterday</td><td>₹6,390 / gram</td></tr>
            </table>
            <table>
              <tr><th>City</th><th>22K</th><th>24K Gold Rate (8 grams)</th></tr>
              <tr><td>Delhi</td><td>₹47,000</td><td>₹80,000</td></tr>
            </table>"#;
        assert_eq!(price_of(Metal::Gold, html), dec!(6400));
    }

    #[test]
    fn test_gold_dated_row_beats_earlier_undated_row() {
        let html = r#"
            <table>
              <tr><th>Parameter</th><th>Gold Price 24K</th></tr>
              <tr><td>Today</td><td>₹6,400 / gram</td></tr>
              <tr><td>Rate on 2 January 2026</td><td>₹6,450 / gram</td></tr>
            </table>"#;
        assert_eq!(price_of(Metal::Gold, html), dec!(6450));
    }

    #[test]
    fn test_gold_fallback_divides_by_header_grams() {
        let html = r#"
            <table>
              <tr><td>City</td><td>22K Gold Rate (10 grams)</td><td>24K Gold Rate (10 grams)</td></tr>
              <tr><td>Mumbai</td><td>₹59,870</td><td>₹65,317</td></tr>
            </table>"#;
        assert_eq!(price_of(Metal::Gold, html), dec!(6531.70));
    }

    #[test]
    fn test_gold_fallback_defaults_to_eight_grams() {
        let html = r#"
            <table>
              <tr><th>City</th><th>22K</th><th>24K Gold Rate</th></tr>
              <tr><td>Chennai</td><td>₹48,000</td><td>₹52,253.60</td></tr>
            </table>"#;
        assert_eq!(price_of(Metal::Gold, html), dec!(6531.70));
    }

    #[test]
    fn test_silver_primary_and_fallback() {
        let primary = r#"
            <table>
              <tr><th>Date</th><th>Silver Price (1 Kg)</th></tr>
              <tr><td>Rate of silver on 15 December 2025</td><td>₹95,000.25</td></tr>
              <tr><td>Rate of silver on 14 December 2025</td><td>₹94,000</td></tr>
              <tr><td>Weekly change</td><td>₹1,000.25</td></tr>
            </table>"#;
        assert_eq!(price_of(Metal::Silver, primary), dec!(95000.25));

        let fallback = r#"
            <table>
              <tr><th>City</th><th>Price per 10 grams</th></tr>
              <tr><td>Pune</td><td>₹950.0025</td></tr>
            </table>"#;
        assert_eq!(price_of(Metal::Silver, fallback), dec!(95000.25));
    }

    #[test]
    fn test_missing_tables() {
        let err = parse(Metal::Gold, "<html><body>Rates</body></html>").unwrap_err();
        assert_eq!(err.to_string(), "24K gold not found");
        let err = parse(Metal::Silver, "<table><tr><th>x</th></tr></table>").unwrap_err();
        assert_eq!(err.to_string(), "Silver 1kg not found");
    }
}
