pub mod cleaner;
pub mod dom;
pub mod error;
pub mod http_client;
pub mod sources;

use crate::config::SourcesConfig;
use crate::models::{Extraction, Metal, Quote, Source};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use self::error::SourceError;
use self::http_client::HttpClient;
use self::sources::{AngelOne, BankBazaar, GoodReturns};

// ── Source trait ──────────────────────────────────────────────────────────────

/// One provider page for one metal.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    fn source(&self) -> Source;
    fn metal(&self) -> Metal;
    async fn extract(&self, client: &HttpClient) -> Result<Extraction, SourceError>;
}

/// Run a source and fold any failure into a failure quote.
pub async fn fetch_quote(source: &dyn QuoteSource, client: &HttpClient) -> Quote {
    match source.extract(client).await {
        Ok(extraction) => Quote::success(source.source(), source.metal(), extraction),
        Err(e) => {
            if e.is_transport() {
                warn!("{} {} unreachable: {}", source.source(), source.metal(), e);
            } else {
                warn!("{} {} page not understood: {}", source.source(), source.metal(), e);
            }
            Quote::failure(source.source(), source.metal(), e.to_string())
        }
    }
}

/// Run one provider's extractor over an already-fetched page.
///
/// GoodReturns pages are parsed as a single city page.
pub fn parse_quote(source: Source, metal: Metal, html: &str) -> Quote {
    let parsed = match source {
        Source::AngelOne => sources::angelone::parse(metal, html),
        Source::GoodReturns => sources::goodreturns::parse(metal, html),
        Source::BankBazaar => sources::bankbazaar::parse(metal, html),
    };
    match parsed {
        Ok(extraction) => Quote::success(source, metal, extraction),
        Err(e) => Quote::failure(source, metal, e.to_string()),
    }
}

/// Build the extractor for `source` × `metal` from configured URLs.
pub fn build_source(
    source: Source,
    metal: Metal,
    urls: &SourcesConfig,
) -> Result<Arc<dyn QuoteSource>> {
    let built: Arc<dyn QuoteSource> = match (source, metal) {
        (Source::AngelOne, Metal::Gold) => Arc::new(AngelOne::new(metal, &urls.angelone_gold_url)),
        (Source::AngelOne, Metal::Silver) => {
            Arc::new(AngelOne::new(metal, &urls.angelone_silver_url))
        }
        (Source::GoodReturns, Metal::Gold) => Arc::new(GoodReturns::new(
            metal,
            &urls.goodreturns_gold_url,
            urls.goodreturns_cities.clone(),
        )?),
        (Source::GoodReturns, Metal::Silver) => Arc::new(GoodReturns::new(
            metal,
            &urls.goodreturns_silver_url,
            urls.goodreturns_cities.clone(),
        )?),
        (Source::BankBazaar, Metal::Gold) => {
            Arc::new(BankBazaar::new(metal, &urls.bankbazaar_gold_url))
        }
        (Source::BankBazaar, Metal::Silver) => {
            Arc::new(BankBazaar::new(metal, &urls.bankbazaar_silver_url))
        }
    };
    Ok(built)
}
