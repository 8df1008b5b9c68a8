//! angelone.in rate pages.
//!
//! Gold: MUI table, row labelled "1 gm", price in a `<div>` inside the second cell.
//! Silver: free-form cards; the price follows a "Silver / 1 Kg" label.

use crate::models::{Extraction, Metal, Source};
use crate::scraper::cleaner::extract_price;
use crate::scraper::dom::{LabelScan, cell_text, scan_after_label, selector, value_text};
use crate::scraper::error::SourceError;
use crate::scraper::http_client::HttpClient;
use crate::scraper::QuoteSource;
use async_trait::async_trait;
use scraper::Html;
use tracing::info;

const GOLD_ROW_LABEL: &str = "1 gm";

const SILVER_SCAN: LabelScan = LabelScan {
    label: "silver / 1 kg",
    container: "div",
    candidate: "div",
    window: 10,
    needle: "₹",
};

pub struct AngelOne {
    metal: Metal,
    url: String,
}

impl AngelOne {
    pub fn new(metal: Metal, url: impl Into<String>) -> Self {
        Self {
            metal,
            url: url.into(),
        }
    }
}

#[async_trait]
impl QuoteSource for AngelOne {
    fn source(&self) -> Source {
        Source::AngelOne
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
    match metal {
        Metal::Gold => parse_gold(html),
        Metal::Silver => parse_silver(html),
    }
}

fn parse_gold(html: &str) -> Result<Extraction, SourceError> {
    let doc = Html::parse_document(html);
    let row_sel = selector("tr.MuiTableRow-root")?;
    let cell_sel = selector("td.MuiTableCell-root")?;
    let div_sel = selector("div")?;

    for row in doc.select(&row_sel) {
        let cells: Vec<_> = row.select(&cell_sel).collect();
        if cells.len() < 4 {
            continue;
        }

        let quantity = cell_text(cells[0]).to_lowercase();
        let price_text = cells[1]
            .select(&div_sel)
            .next()
            .map(value_text)
            .unwrap_or_default();

        if quantity.contains(GOLD_ROW_LABEL) && !price_text.is_empty() {
            let price = extract_price(&price_text);
            info!("AngelOne fetched Gold 24K price: {:?}", price);
            return Ok(Extraction::price(price));
        }
    }

    Err(SourceError::not_found("No data found"))
}

fn parse_silver(html: &str) -> Result<Extraction, SourceError> {
    let doc = Html::parse_document(html);

    let Some(text) = scan_after_label(&doc, &SILVER_SCAN) else {
        return Err(SourceError::not_found("No data found"));
    };

    let price = extract_price(&text);
    info!("AngelOne fetched Silver 1Kg price: {:?}", price);
    Ok(Extraction::price(price))
}
