//! CEPEA agronomic indicator page scraper.
//!
//! The most fragile source in the system: upstream markup changes
//! silently and header text drifts across product pages. Table discovery
//! runs a ranked list of matcher strategies, and per-row parse failures
//! are skipped and logged, never fatal.

use crate::core::{PriceSource, ProductDescriptor, SourceError, SourceLocator, SourceRow};
use crate::providers::util::{normalize_rows, parse_br_date, parse_br_number};
use async_trait::async_trait;
use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::debug;

/// CEPEA rejects requests carrying default client identifiers.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Table id CEPEA has used for its indicator widget for years.
const INDICATOR_TABLE_ID: &str = "imagenet-indicador1";

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

pub struct CepeaSource {
    base_url: String,
}

impl CepeaSource {
    pub fn new(base_url: &str) -> Self {
        CepeaSource {
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl PriceSource for CepeaSource {
    async fn fetch(
        &self,
        product: &ProductDescriptor,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<SourceRow>, SourceError> {
        let SourceLocator::IndicatorPage { slug } = &product.source else {
            return Err(SourceError::ParseFailure(format!(
                "product {} is not backed by an indicator page",
                product.code
            )));
        };

        let url = format!("{}/indicador/{}.aspx", self.base_url, slug);
        debug!("Requesting indicator page from {}", url);

        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(HTTP_TIMEOUT)
            .build()?;
        let response = client.get(&url).send().await?.error_for_status()?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(SourceError::EmptyResponse);
        }

        let rows = extract_rows(&body)?;
        Ok(normalize_rows(rows, start, end))
    }
}

/// Column positions recognized within a candidate table.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Columns {
    date: usize,
    price: usize,
    usd: Option<usize>,
}

/// Ranked table-discovery strategies, tried in order. The first strategy
/// yielding a table with at least one parseable row wins, so a new
/// strategy can be appended without touching the service.
#[derive(Debug, Clone, Copy)]
enum TableMatcher {
    /// Table carrying the long-standing CEPEA widget id.
    KnownId,
    /// Any table whose header row names a date column and a price column.
    HeaderText,
    /// Any table whose first body row starts with a date and a number.
    Structural,
}

const MATCHERS: [TableMatcher; 3] = [
    TableMatcher::KnownId,
    TableMatcher::HeaderText,
    TableMatcher::Structural,
];

struct Selectors {
    table: Selector,
    tr: Selector,
    th: Selector,
    td: Selector,
    cell: Selector,
}

impl Selectors {
    fn new() -> Result<Self, SourceError> {
        let parse = |css: &str| {
            Selector::parse(css)
                .map_err(|e| SourceError::ParseFailure(format!("bad selector {css}: {e}")))
        };
        Ok(Selectors {
            table: parse("table")?,
            tr: parse("tr")?,
            th: parse("th")?,
            td: parse("td")?,
            cell: parse("th, td")?,
        })
    }
}

fn extract_rows(body: &str) -> Result<Vec<SourceRow>, SourceError> {
    let document = Html::parse_document(body);
    let sel = Selectors::new()?;

    for matcher in MATCHERS {
        for table in document.select(&sel.table) {
            let Some(columns) = matcher.match_table(&table, &sel) else {
                continue;
            };
            let rows = parse_table_rows(&table, columns, &sel);
            if !rows.is_empty() {
                debug!(
                    "Matched indicator table via {:?} with {} rows",
                    matcher,
                    rows.len()
                );
                return Ok(rows);
            }
        }
    }

    // No table at all, or every candidate produced zero parseable rows
    Err(SourceError::NoDataFound)
}

impl TableMatcher {
    fn match_table(self, table: &ElementRef<'_>, sel: &Selectors) -> Option<Columns> {
        match self {
            TableMatcher::KnownId => {
                if table.value().id() != Some(INDICATOR_TABLE_ID) {
                    return None;
                }
                // Header text still decides the column layout; the CEPEA
                // widget puts the date first when headers are unreadable.
                columns_from_headers(table, sel).or(Some(Columns {
                    date: 0,
                    price: 1,
                    usd: None,
                }))
            }
            TableMatcher::HeaderText => columns_from_headers(table, sel),
            TableMatcher::Structural => columns_from_shape(table, sel),
        }
    }
}

/// Case-insensitive substring matching over header text. Header wording
/// varies across product pages and over time, so matching stays heuristic.
fn columns_from_headers(table: &ElementRef<'_>, sel: &Selectors) -> Option<Columns> {
    let header_row = table.select(&sel.tr).next()?;
    let headers: Vec<String> = header_row
        .select(&sel.cell)
        .map(|c| cell_text(&c).to_lowercase())
        .collect();

    let date = headers.iter().position(|h| h.contains("data"))?;
    let price = headers.iter().enumerate().position(|(i, h)| {
        i != date
            && ["valor", "preço", "preco", "vista", "r$"]
                .iter()
                .any(|needle| h.contains(needle))
    })?;
    let usd = headers
        .iter()
        .position(|h| h.contains("us$") || h.contains("dólar") || h.contains("dolar"));

    Some(Columns { date, price, usd })
}

/// Structural fallback: accept a table whose first body row opens with a
/// parseable date followed by a parseable number. No USD column is
/// assumed here since a percentage-variation column would be
/// indistinguishable from one.
fn columns_from_shape(table: &ElementRef<'_>, sel: &Selectors) -> Option<Columns> {
    let first_data_row = table
        .select(&sel.tr)
        .find(|tr| tr.select(&sel.th).next().is_none())?;
    let cells: Vec<String> = first_data_row
        .select(&sel.td)
        .map(|c| cell_text(&c))
        .collect();

    if cells.len() >= 2
        && parse_br_date(&cells[0]).is_some()
        && parse_br_number(&cells[1]).is_some()
    {
        return Some(Columns {
            date: 0,
            price: 1,
            usd: None,
        });
    }
    None
}

fn parse_table_rows(table: &ElementRef<'_>, columns: Columns, sel: &Selectors) -> Vec<SourceRow> {
    let mut rows = Vec::new();

    for tr in table.select(&sel.tr) {
        // Header rows carry th cells; skip them silently
        if tr.select(&sel.th).next().is_some() {
            continue;
        }
        let cells: Vec<String> = tr.select(&sel.td).map(|c| cell_text(&c)).collect();
        if cells.len() <= columns.date.max(columns.price) {
            continue;
        }

        let Some(date) = parse_br_date(&cells[columns.date]) else {
            debug!("Skipping row with unparseable date: {:?}", cells);
            continue;
        };
        let Some(price) = parse_br_number(&cells[columns.price]) else {
            debug!("Skipping row with unparseable price: {:?}", cells);
            continue;
        };
        let price_secondary = columns
            .usd
            .and_then(|i| cells.get(i))
            .and_then(|c| parse_br_number(c));

        rows.push(SourceRow {
            date,
            price,
            price_secondary,
        });
    }

    rows
}

fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}
