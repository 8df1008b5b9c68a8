//! Picks one authoritative price per metal from the per-source quotes.
//!
//! The first quote in priority order with a usable price wins; gold is scaled
//! from per gram to per 10 grams, silver is already per kilogram. Prices are
//! rounded half away from zero to 2 decimals.

use crate::models::{Metal, Quote, ReconciledRate, Source};
use crate::scraper::cleaner::{round_price, to_decimal};
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// Quotes for `metal` ordered by `priority`. Sources not listed are dropped.
pub fn order_by_priority<'a>(metal: Metal, quotes: &'a [Quote], priority: &[Source]) -> Vec<&'a Quote> {
    priority
        .iter()
        .filter_map(|source| {
            quotes
                .iter()
                .find(|q| q.metal == metal && q.source == *source)
        })
        .collect()
}

/// First valid quote, in the given order.
pub fn best_quote<'a, I>(ordered: I) -> Option<&'a Quote>
where
    I: IntoIterator<Item = &'a Quote>,
{
    ordered.into_iter().find(|q| q.is_valid())
}

/// Reconcile already-ordered quotes into the published unit.
pub fn reconcile<'a, I>(metal: Metal, ordered: I) -> ReconciledRate
where
    I: IntoIterator<Item = &'a Quote>,
{
    let Some(winner) = best_quote(ordered) else {
        warn!("No valid {} price from any source", metal);
        return ReconciledRate::new(metal, None);
    };

    debug!("{} price taken from {}", metal, winner.source);
    let price = winner
        .price
        .as_deref()
        .and_then(to_decimal)
        .and_then(|value| to_published_unit(metal, value));

    if price.is_none() {
        warn!("{} price {:?} from {} is not numeric", metal, winner.price, winner.source);
    }

    ReconciledRate::new(metal, price)
}

/// Reconcile every metal from one pipeline run.
pub fn reconcile_all(quotes: &[Quote], gold_priority: &[Source], silver_priority: &[Source]) -> Vec<ReconciledRate> {
    vec![
        reconcile(Metal::Gold, order_by_priority(Metal::Gold, quotes, gold_priority)),
        reconcile(Metal::Silver, order_by_priority(Metal::Silver, quotes, silver_priority)),
    ]
}

fn to_published_unit(metal: Metal, value: Decimal) -> Option<Decimal> {
    let scaled = match metal {
        Metal::Gold => value.checked_mul(Decimal::from(metal.published_grams()))?,
        Metal::Silver => value,
    };
    Some(round_price(scaled))
}
