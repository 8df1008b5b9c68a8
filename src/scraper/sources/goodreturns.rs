//! goodreturns.in city rate pages, tried city by city until one yields a price.

use crate::models::{Extraction, Metal, Source};
use crate::scraper::cleaner::extract_price;
use crate::scraper::dom::{cell_text, data_cells, selector, value_text};
use crate::scraper::error::SourceError;
use crate::scraper::http_client::HttpClient;
use crate::scraper::QuoteSource;
use async_trait::async_trait;
use scraper::Html;
use tracing::{error, info, warn};
use url::Url;

pub struct GoodReturns {
    metal: Metal,
    base_url: Url,
    cities: Vec<String>,
}

impl GoodReturns {
    /// `base_url` is the directory holding `<city>.html` pages.
    pub fn new(metal: Metal, base_url: &str, cities: Vec<String>) -> Result<Self, SourceError> {
        let base = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        Ok(Self {
            metal,
            base_url: Url::parse(&base)?,
            cities,
        })
    }

    fn city_url(&self, city: &str) -> Result<Url, SourceError> {
        Ok(self.base_url.join(&format!("{}.html", city))?)
    }
}

#[async_trait]
impl QuoteSource for GoodReturns {
    fn source(&self) -> Source {
        Source::GoodReturns
    }

    fn metal(&self) -> Metal {
        self.metal
    }

    async fn extract(&self, client: &HttpClient) -> Result<Extraction, SourceError> {
        for city in &self.cities {
            info!("[GoodReturns {}] Trying city: {}", self.metal, city);

            let url = match self.city_url(city) {
                Ok(url) => url,
                Err(e) => {
                    warn!("[GoodReturns {}] Bad URL for {}: {}", self.metal, city, e);
                    continue;
                }
            };

            let html = match client.get_html(url.as_str()).await {
                Ok(html) => html,
                Err(e) => {
                    warn!("[GoodReturns {}] Failed for {}: {}", self.metal, city, e);
                    continue;
                }
            };

            match parse(self.metal, &html) {
                Ok(extraction) => {
                    info!(
                        "[GoodReturns {}] fetched from {}: {:?}",
                        self.metal, city, extraction.price
                    );
                    return Ok(Extraction {
                        city: Some(capitalize(city)),
                        ..extraction
                    });
                }
                Err(e) => warn!("[GoodReturns {}] {} for {}", self.metal, e, city),
            }
        }

        error!("[GoodReturns {}] All city attempts failed", self.metal);
        Err(SourceError::not_found("All city sources failed"))
    }
}

/// Parse one city page: the first table's row for 24K gold or 1 kg silver.
pub fn parse(metal: Metal, html: &str) -> Result<Extraction, SourceError> {
    let doc = Html::parse_document(html);
    let table_sel = selector("table")?;
    let tr_sel = selector("tr")?;

    let Some(table) = doc.select(&table_sel).next() else {
        return Err(SourceError::not_found("No table found"));
    };

    for row in table.select(&tr_sel) {
        let cells = data_cells(row)?;
        if cells.len() < 2 {
            continue;
        }

        let label = cell_text(cells[0]);
        if row_matches(metal, &label) {
            return Ok(Extraction::price(extract_price(&value_text(cells[1]))));
        }
    }

    Err(SourceError::not_found(format!("{} not found", metal.unit_label())))
}

fn row_matches(metal: Metal, label: &str) -> bool {
    match metal {
        Metal::Gold => label.to_uppercase().contains("24"),
        Metal::Silver => {
            let label = label.to_lowercase();
            label.contains("1 kg") || label.contains("1kg")
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
