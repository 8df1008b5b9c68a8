//! Pipeline orchestrator: sources → quotes → reconciled rates.
//!
//! Every configured (source, metal) extractor runs as its own task, at most
//! `pipeline.concurrency` at a time. A failing or panicking source only costs
//! its own quote; reconciliation starts once every task has finished.
//! Cancelling the run ([`Pipeline::cancel`]) fails any source still waiting for
//! a slot, and with it the whole run.

use crate::config::AppConfig;
use crate::models::{ApiResponse, Metal, Quote, RatesPayload, Source};
use crate::reconciler::reconcile_all;
use crate::scraper::http_client::HttpClient;
use crate::scraper::{QuoteSource, build_source, fetch_quote};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

pub struct Pipeline {
    config: AppConfig,
    client: Arc<HttpClient>,
    sources: Vec<Arc<dyn QuoteSource>>,
    permits: Arc<Semaphore>,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Result<Self> {
        let client = Arc::new(
            HttpClient::new(&config.scraper).context("Failed to build HTTP client")?,
        );

        let mut sources = Vec::new();
        for (metal, priority) in [
            (Metal::Gold, &config.pipeline.gold_priority),
            (Metal::Silver, &config.pipeline.silver_priority),
        ] {
            let mut seen: Vec<Source> = Vec::new();
            for source in priority {
                if seen.contains(source) {
                    continue;
                }
                seen.push(*source);
                sources.push(
                    build_source(*source, metal, &config.sources)
                        .with_context(|| format!("Failed to configure {} {}", source, metal))?,
                );
            }
        }

        let permits = Arc::new(Semaphore::new(config.pipeline.concurrency));

        Ok(Self {
            config,
            client,
            sources,
            permits,
        })
    }

    /// Restrict the run to one metal's sources.
    pub fn only(mut self, metal: Metal) -> Self {
        self.sources.retain(|s| s.metal() == metal);
        self
    }

    /// Stop handing out source slots. Sources already running finish; any still
    /// waiting fail the run. Irreversible for this pipeline.
    pub fn cancel(&self) {
        if !self.permits.is_closed() {
            warn!("Cancelling pending sources");
            self.permits.close();
        }
    }

    /// Run every source and return one quote per (metal, source), in configuration order.
    pub async fn collect_quotes(&self) -> Result<Vec<Quote>> {
        let started = Instant::now();
        let mut handles = Vec::new();

        for source in &self.sources {
            let (name, metal) = (source.source(), source.metal());
            let source = Arc::clone(source);
            let client = Arc::clone(&self.client);
            let sem = Arc::clone(&self.permits);

            let handle = tokio::spawn(async move {
                let _permit = sem.acquire_owned().await?;
                Ok::<Quote, anyhow::Error>(fetch_quote(source.as_ref(), &client).await)
            });

            handles.push((name, metal, handle));
        }

        let mut quotes = Vec::with_capacity(handles.len());
        let mut failure = None;

        for (source, metal, handle) in handles {
            match handle.await {
                Ok(Ok(quote)) => quotes.push(quote),
                Ok(Err(e)) => {
                    error!("{} {}: {:#}", source, metal, e);
                    failure.get_or_insert(e);
                }
                Err(e) => {
                    error!("Task panic for {} {}: {}", source, metal, e);
                    quotes.push(Quote::failure(source, metal, format!("extractor panicked: {}", e)));
                }
            }
        }

        if let Some(e) = failure {
            return Err(e.context("Source orchestration failed"));
        }

        let failed = quotes.iter().filter(|q| q.error.is_some()).count();
        info!(
            "Collected {} quotes from {} sources ({} failed) in {:.2?}",
            quotes.len(),
            self.sources.len(),
            failed,
            started.elapsed()
        );
        Ok(quotes)
    }

    pub async fn run(&self) -> Result<RatesPayload> {
        let quotes = self.collect_quotes().await?;
        let rates = reconcile_all(
            &quotes,
            &self.config.pipeline.gold_priority,
            &self.config.pipeline.silver_priority,
        );
        let payload = RatesPayload::new(rates);
        info!("Computed rates payload: {}", serde_json::to_string(&payload)?);
        Ok(payload)
    }
}

/// Wrap a pipeline run in the response envelope with an HTTP-equivalent status.
///
/// 200 whenever the pipeline completed, even with null prices; 500 with an
/// all-null payload when it did not.
pub async fn respond(pipeline: &Pipeline) -> (u16, ApiResponse<RatesPayload>) {
    match pipeline.run().await {
        Ok(payload) => (200, ApiResponse::ok(payload, "Metal rates fetched")),
        Err(e) => {
            error!("Error computing metal rates: {:#}", e);
            (
                500,
                ApiResponse::error(format!("{:#}", e), Some(RatesPayload::unavailable())),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourcesConfig;
    use rust_decimal_macros::dec;
    use tokio_test::assert_err;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> AppConfig {
        let base = server.uri();
        let mut config = AppConfig::default();
        config.scraper.timeout_secs = 5;
        config.sources = SourcesConfig {
            angelone_gold_url: format!("{}/angelone/gold", base),
            angelone_silver_url: format!("{}/angelone/silver", base),
            goodreturns_gold_url: format!("{}/goodreturns/gold/", base),
            goodreturns_silver_url: format!("{}/goodreturns/silver/", base),
            goodreturns_cities: vec!["mumbai".to_string(), "delhi".to_string()],
            bankbazaar_gold_url: format!("{}/bankbazaar/gold", base),
            bankbazaar_silver_url: format!("{}/bankbazaar/silver", base),
        };
        config
    }

    async fn serve(server: &MockServer, at: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_all_sources_failing_yields_null_prices() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let pipeline = Pipeline::new(config_for(&server)).unwrap();
        let quotes = pipeline.collect_quotes().await.unwrap();
        assert_eq!(quotes.len(), 6);
        assert!(quotes.iter().all(|q| q.error.is_some()));

        let (status, response) = respond(&pipeline).await;
        assert_eq!(status, 200);
        assert!(response.success);

        let json = serde_json::to_value(response.data.unwrap()).unwrap();
        assert_eq!(
            json["rates"],
            serde_json::json!([
                {"metal": "gold", "unit_gm": 10, "price": null},
                {"metal": "silver", "unit_gm": 1000, "price": null}
            ])
        );
    }

    #[tokio::test]
    async fn test_priority_falls_through_to_working_sources() {
        let server = MockServer::start().await;
        // BankBazaar gold page lost its tables; GoodReturns gold is down.
        serve(&server, "/bankbazaar/gold", "<html><body>redesign</body></html>").await;
        serve(
            &server,
            "/angelone/gold",
            r#"<table><tr class="MuiTableRow-root">
                <td class="MuiTableCell-root">1 gm</td>
                <td class="MuiTableCell-root"><div>₹6,531.70</div></td>
                <td class="MuiTableCell-root">a</td><td class="MuiTableCell-root">b</td>
               </tr></table>"#,
        )
        .await;
        serve(
            &server,
            "/bankbazaar/silver",
            r#"<table><tr><th>Date</th><th>Silver Price / Kg</th></tr>
               <tr><td>Rate of silver on 15 December 2025</td><td>₹95,000.25</td></tr></table>"#,
        )
        .await;
        serve(
            &server,
            "/goodreturns/silver/mumbai.html",
            "<table><tr><td>1 kg</td><td>₹94,000</td></tr></table>",
        )
        .await;

        let pipeline = Pipeline::new(config_for(&server)).unwrap();
        let payload = pipeline.run().await.unwrap();

        assert_eq!(payload.rate(Metal::Gold).unwrap().price, Some(dec!(65317.00)));
        assert_eq!(payload.rate(Metal::Silver).unwrap().price, Some(dec!(95000.25)));
    }

    struct Exploding;

    #[async_trait::async_trait]
    impl QuoteSource for Exploding {
        fn source(&self) -> Source {
            Source::GoodReturns
        }
        fn metal(&self) -> Metal {
            Metal::Gold
        }
        async fn extract(
            &self,
            _client: &HttpClient,
        ) -> Result<crate::models::Extraction, crate::scraper::error::SourceError> {
            panic!("layout assumption violated");
        }
    }

    #[tokio::test]
    async fn test_panicking_source_becomes_failure_quote() {
        let server = MockServer::start().await;
        serve(&server, "/angelone/silver", "<div>Silver / 1 kg</div><div>₹91,500</div>").await;

        let mut pipeline = Pipeline::new(config_for(&server)).unwrap();
        pipeline.sources = vec![
            Arc::new(Exploding),
            build_source(Source::AngelOne, Metal::Silver, &pipeline.config.sources).unwrap(),
        ];

        let quotes = pipeline.collect_quotes().await.unwrap();
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].source, Source::GoodReturns);
        assert!(quotes[0].error.as_deref().unwrap().contains("panicked"));
        assert_eq!(quotes[1].price.as_deref(), Some("91500"));
    }

    #[tokio::test]
    async fn test_cancelled_run_responds_500_with_null_prices() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>unused</p>"))
            .expect(0)
            .mount(&server)
            .await;

        let pipeline = Pipeline::new(config_for(&server)).unwrap();
        pipeline.cancel();

        assert_err!(pipeline.collect_quotes().await);

        let (status, response) = respond(&pipeline).await;
        assert_eq!(status, 500);
        assert!(!response.success);
        assert!(response.message.contains("Source orchestration failed"));

        let json = serde_json::to_value(response.data.unwrap()).unwrap();
        assert_eq!(
            json["rates"],
            serde_json::json!([
                {"metal": "gold", "unit_gm": 10, "price": null},
                {"metal": "silver", "unit_gm": 1000, "price": null}
            ])
        );
    }

    #[tokio::test]
    async fn test_sources_follow_priority_lists() {
        let server = MockServer::start().await;
        let mut config = config_for(&server);
        config.pipeline.gold_priority = vec![Source::AngelOne, Source::AngelOne];
        config.pipeline.silver_priority = vec![Source::BankBazaar];

        let pipeline = Pipeline::new(config).unwrap();
        let picked: Vec<_> = pipeline.sources.iter().map(|s| (s.source(), s.metal())).collect();
        assert_eq!(
            picked,
            vec![(Source::AngelOne, Metal::Gold), (Source::BankBazaar, Metal::Silver)]
        );

        let silver_only = pipeline.only(Metal::Silver);
        assert_eq!(silver_only.sources.len(), 1);
    }
}
