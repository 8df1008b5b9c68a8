//! Layout-agnostic HTML helpers shared by the extractors.
//!
//! Provider pages drift, so the extractors describe *what* to look for
//! ([`LabelScan`], [`DatedTable`], [`ScaledTable`]) and the traversal lives here.

use crate::scraper::cleaner::{extract_date_from_label, extract_grams, extract_price, round_price};
use crate::scraper::error::SourceError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};

pub fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css).map_err(|e| SourceError::Selector(format!("{}: {:?}", css, e)))
}

/// Visible text of an element: trimmed text nodes joined by single spaces.
pub fn cell_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of a value cell: trimmed text nodes concatenated with no separator, so
/// a number split across inline tags (`₹6,531<small>.70</small>`) stays whole.
pub fn value_text(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).collect()
}

/// Lowercased header texts plus the data rows of a table.
///
/// Uses `<th>` cells when the table has any; otherwise the first row is the header row.
pub fn table_headers_and_rows<'a>(
    table: ElementRef<'a>,
) -> Result<(Vec<String>, Vec<ElementRef<'a>>), SourceError> {
    let th_sel = selector("th")?;
    let tr_sel = selector("tr")?;
    let cell_sel = selector("th, td")?;

    let rows: Vec<ElementRef<'a>> = table.select(&tr_sel).collect();
    let headers: Vec<String> = table
        .select(&th_sel)
        .map(|th| cell_text(th).to_lowercase())
        .collect();

    if !headers.is_empty() {
        return Ok((headers, rows.into_iter().skip(1).collect()));
    }

    match rows.split_first() {
        Some((first, rest)) => {
            let headers = first
                .select(&cell_sel)
                .map(|c| cell_text(c).to_lowercase())
                .collect();
            Ok((headers, rest.to_vec()))
        }
        None => Ok((Vec::new(), Vec::new())),
    }
}

pub fn data_cells<'a>(row: ElementRef<'a>) -> Result<Vec<ElementRef<'a>>, SourceError> {
    let td_sel = selector("td")?;
    Ok(row.select(&td_sel).collect())
}

// ── Label, then scan forward ──────────────────────────────────────────────────

/// Find the first text node containing `label`, climb to its nearest `container`
/// ancestor, then look at the next `window` `candidate` elements in document
/// order for one whose text contains `needle`.
#[derive(Debug, Clone, Copy)]
pub struct LabelScan {
    /// Lowercase; matched case-insensitively.
    pub label: &'static str,
    pub container: &'static str,
    pub candidate: &'static str,
    pub window: usize,
    pub needle: &'static str,
}

pub fn scan_after_label(doc: &Html, scan: &LabelScan) -> Option<String> {
    let nodes: Vec<_> = doc.tree.root().descendants().collect();

    let label = nodes.iter().find(|n| {
        n.value()
            .as_text()
            .is_some_and(|t| t.to_lowercase().contains(scan.label))
    })?;

    let container = label.ancestors().find(|a| {
        a.value()
            .as_element()
            .is_some_and(|e| e.name() == scan.container)
    })?;

    let start = nodes.iter().position(|n| n.id() == container.id())?;

    nodes[start + 1..]
        .iter()
        .filter_map(|n| ElementRef::wrap(*n))
        .filter(|el| el.value().name() == scan.candidate)
        .take(scan.window)
        .map(value_text)
        .find(|text| text.contains(scan.needle))
}

// ── Dated tables ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub enum ValueColumn {
    /// The column whose header matched.
    MatchedHeader,
    Index(usize),
}

/// A table of labelled rows, some carrying a date; the most recent dated row wins.
#[derive(Debug, Clone, Copy)]
pub struct DatedTable {
    /// Every term must appear in one header cell.
    pub header_terms: &'static [&'static str],
    pub value_column: ValueColumn,
    pub label_contains: Option<&'static str>,
    pub value_contains: Option<&'static str>,
}

pub fn latest_dated_price(doc: &Html, layout: &DatedTable) -> Result<Option<String>, SourceError> {
    let table_sel = selector("table")?;

    for table in doc.select(&table_sel) {
        let (headers, rows) = table_headers_and_rows(table)?;
        let Some(header_idx) = headers
            .iter()
            .position(|h| layout.header_terms.iter().all(|t| h.contains(t)))
        else {
            continue;
        };
        let value_idx = match layout.value_column {
            ValueColumn::MatchedHeader => header_idx,
            ValueColumn::Index(i) => i,
        };

        let mut best_price: Option<String> = None;
        let mut best_date: Option<NaiveDate> = None;

        for row in rows {
            let cells = data_cells(row)?;
            if cells.len() <= value_idx {
                continue;
            }

            let label = cell_text(cells[0]);
            let value = value_text(cells[value_idx]);

            if let Some(needle) = layout.label_contains {
                if !label.to_lowercase().contains(needle) {
                    continue;
                }
            }
            if let Some(needle) = layout.value_contains {
                if !value.to_lowercase().contains(needle) {
                    continue;
                }
            }

            let Some(price) = extract_price(&value) else {
                continue;
            };

            match extract_date_from_label(&label) {
                Some(date) if best_date.is_none_or(|best| date > best) => {
                    best_date = Some(date);
                    best_price = Some(price);
                }
                _ if best_price.is_none() => best_price = Some(price),
                _ => {}
            }
        }

        if best_price.is_some() {
            return Ok(best_price);
        }
    }

    Ok(None)
}

// ── Scaled fallback tables ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub enum HeaderMatch {
    /// Some single header cell contains the text.
    AnyCell(&'static str),
    /// The space-joined header row contains the text.
    Joined(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub enum Scale {
    /// Divide by the gram count named in the header ("... 8 grams"), or the default.
    PerGramFromHeader { default_grams: u32 },
    Multiply(u32),
}

/// A table quoting a price for some other quantity, rescaled to the wanted unit.
/// The first row with a number in `cell` wins.
#[derive(Debug, Clone, Copy)]
pub struct ScaledTable {
    pub header: HeaderMatch,
    pub cell: usize,
    pub scale: Scale,
}

pub fn scaled_price(doc: &Html, layout: &ScaledTable) -> Result<Option<String>, SourceError> {
    let table_sel = selector("table")?;

    for table in doc.select(&table_sel) {
        let (headers, rows) = table_headers_and_rows(table)?;
        if headers.is_empty() {
            continue;
        }

        let joined = headers.join(" ");
        let matched = match layout.header {
            HeaderMatch::AnyCell(text) => headers.iter().any(|h| h.contains(text)),
            HeaderMatch::Joined(text) => joined.contains(text),
        };
        if !matched {
            continue;
        }

        for row in rows {
            let cells = data_cells(row)?;
            if cells.len() <= layout.cell {
                continue;
            }
            if let Some(raw) = extract_price(&value_text(cells[layout.cell])) {
                return Ok(Some(rescale(raw, layout.scale, &joined)));
            }
        }
    }

    Ok(None)
}

/// Apply `scale` to `raw`, rounded to 2 decimals. Keeps `raw` if the arithmetic fails.
fn rescale(raw: String, scale: Scale, header_text: &str) -> String {
    let Ok(value) = raw.parse::<Decimal>() else {
        return raw;
    };

    let scaled = match scale {
        Scale::PerGramFromHeader { default_grams } => {
            let grams = extract_grams(header_text).unwrap_or(default_grams);
            value.checked_div(Decimal::from(grams))
        }
        Scale::Multiply(factor) => value.checked_mul(Decimal::from(factor)),
    };

    match scaled {
        Some(v) => round_price(v).normalize().to_string(),
        None => raw,
    }
}
