// ===============================
// src/source.rs
// ===============================
//
// Raw Record Source (bulk deal hari ini):
// - NseArchive : HTTP GET CSV harian dari arsip bursa
// - CsvFile    : CSV dengan format yang sama dari disk
// - Mock       : generator acak untuk demo
// - Static     : fixture (test)
//
// Tidak ada retry/backoff: kegagalan dikembalikan ke caller sebagai SourceError.
// Validasi kolom dilakukan di sini; batch yang tidak lengkap menjadi batch kosong.
//
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{DealBatch, RawDeal, Side};
use crate::metrics::RAW_DEALS;

pub const DEFAULT_NSE_BULK_URL: &str = "https://archives.nseindia.com/content/equities/bulk.csv";

// Arsip menolak request tanpa UA browser
const BROWSER_UA: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

const COL_DATE: &str = "Date";
const COL_SYMBOL: &str = "Symbol";
const COL_CLIENT: &str = "Client Name";
const COL_SIDE: &str = "Buy/Sell";
const COL_QTY: &str = "Quantity Traded";
const COL_PRICE: &str = "Trade Price / Wght. Avg. Price";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("source returned HTTP {0}")]
    Status(u16),
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone)]
pub enum DealSource {
    NseArchive { url: String, timeout: Duration },
    CsvFile { path: PathBuf },
    Mock { rows: usize },
    Static(Vec<RawDeal>),
}

impl DealSource {
    pub fn mode_label(&self) -> &'static str {
        match self {
            DealSource::NseArchive { .. } => "nse",
            DealSource::CsvFile { .. } => "file",
            DealSource::Mock { .. } => "mock",
            DealSource::Static(_) => "static",
        }
    }

    pub async fn fetch_today_bulk_deals(&self) -> Result<DealBatch, SourceError> {
        let batch = match self {
            DealSource::NseArchive { url, timeout } => {
                info!(%url, "fetching bulk deals");
                let body = fetch_text(url, *timeout).await?;
                parse_bulk_csv(&body)?
            }
            DealSource::CsvFile { path } => {
                info!(path = %path.display(), "reading bulk deals");
                let body = tokio::fs::read_to_string(path).await?;
                parse_bulk_csv(&body)?
            }
            DealSource::Mock { rows } => mock_batch(*rows),
            DealSource::Static(deals) => DealBatch { trade_date: None, deals: deals.clone() },
        };
        RAW_DEALS.inc_by(batch.deals.len() as u64);
        info!(rows = batch.deals.len(), trade_date = ?batch.trade_date, "bulk deals received");
        Ok(batch)
    }
}

async fn fetch_text(url: &str, timeout: Duration) -> Result<String, SourceError> {
    let http = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(BROWSER_UA)
        .build()?;
    let resp = http.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(SourceError::Status(status.as_u16()));
    }
    Ok(resp.text().await?)
}

// Semua kolom sebagai teks; angka diparse manual (bisa ada pemisah ribuan)
#[derive(Debug, Deserialize)]
struct BulkCsvRow {
    #[serde(rename = "Date", default)]
    date: Option<String>,
    #[serde(rename = "Symbol", default)]
    symbol: Option<String>,
    #[serde(rename = "Client Name", default)]
    client_name: Option<String>,
    #[serde(rename = "Buy/Sell", default)]
    side: Option<String>,
    #[serde(rename = "Quantity Traded", default)]
    quantity: Option<String>,
    #[serde(rename = "Trade Price / Wght. Avg. Price", default)]
    price: Option<String>,
}

fn parse_number(s: &str) -> Option<f64> {
    let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
    let v = cleaned.parse::<f64>().ok()?;
    (v.is_finite() && v >= 0.0).then_some(v)
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

enum RowCheck {
    Deal(RawDeal),
    /// Buy/Sell tidak dikenal: baris dilewati, tidak ikut net.
    UnknownSide(Option<String>),
    Incomplete,
}

impl BulkCsvRow {
    fn check(self) -> RowCheck {
        let fields = (
            non_empty(self.symbol),
            non_empty(self.client_name),
            self.quantity.as_deref().and_then(parse_number),
            self.price.as_deref().and_then(parse_number),
        );
        let (Some(symbol), Some(client_name), Some(quantity), Some(price)) = fields else {
            return RowCheck::Incomplete;
        };
        match self.side.as_deref().and_then(Side::parse) {
            Some(side) => RowCheck::Deal(RawDeal { symbol, client_name, side, quantity, price }),
            None => RowCheck::UnknownSide(self.side),
        }
    }
}

/// Parse CSV bulk deal. Kolom wajib hilang atau ada baris tanpa qty/price
/// yang valid -> batch kosong (bukan error). Baris dengan Buy/Sell tak dikenal
/// dilewati. Error hanya untuk CSV yang rusak.
pub fn parse_bulk_csv(body: &str) -> Result<DealBatch, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers = reader.headers()?.clone();
    let missing: Vec<&str> = [COL_SYMBOL, COL_CLIENT, COL_SIDE, COL_QTY, COL_PRICE]
        .into_iter()
        .filter(|c| !headers.iter().any(|h| h == *c))
        .collect();
    if !missing.is_empty() {
        warn!(?missing, "bulk deal batch lacks required columns, using empty batch");
        return Ok(DealBatch::empty());
    }
    let has_date = headers.iter().any(|h| h == COL_DATE);

    let mut trade_date: Option<NaiveDate> = None;
    let mut deals = Vec::new();
    for (line, row) in reader.deserialize::<BulkCsvRow>().enumerate() {
        let row = row?;
        if has_date && trade_date.is_none() {
            trade_date = row.date.as_deref().and_then(parse_trade_date);
        }
        match row.check() {
            RowCheck::Deal(d) => deals.push(d),
            RowCheck::UnknownSide(side) => {
                warn!(line = line + 2, ?side, "unrecognised Buy/Sell, row skipped");
            }
            RowCheck::Incomplete => {
                warn!(line = line + 2, "incomplete bulk deal row, using empty batch");
                return Ok(DealBatch::empty());
            }
        }
    }

    Ok(DealBatch { trade_date, deals })
}

// Format arsip: 17-OCT-2026
fn parse_trade_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%d-%b-%Y").ok()
}

const MOCK_SYMBOLS: &[&str] = &["RELIANCE", "HDFCBANK", "INFY", "TATAMOTORS", "ZOMATO", "IRFC"];
const MOCK_CLIENTS: &[&str] = &[
    "GRAVITON RESEARCH CAPITAL LLP",
    "HRTI PRIVATE LIMITED",
    "QE SECURITIES LLP",
    "NK SECURITIES RESEARCH PRIVATE LIMITED",
    "SOCIETE GENERALE",
];

/// Batch acak: qty 1e5..5e6, price 50..3000 (sebagian besar > 10 Cr)
fn mock_batch(rows: usize) -> DealBatch {
    let mut rng = rand::thread_rng();
    let deals = (0..rows)
        .map(|_| {
            let symbol = MOCK_SYMBOLS.choose(&mut rng).copied().unwrap_or("MOCK");
            let client = MOCK_CLIENTS.choose(&mut rng).copied().unwrap_or("MOCK CLIENT");
            let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
            let quantity = rng.gen_range(100_000..=5_000_000) as f64;
            let price = (rng.gen_range(50.0..3_000.0_f64) * 100.0).round() / 100.0;
            RawDeal::new(symbol, client, side, quantity, price)
        })
        .collect();
    DealBatch { trade_date: Some(chrono::Local::now().date_naive()), deals }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "Date,Symbol,Security Name,Client Name,Buy/Sell,Quantity Traded,Trade Price / Wght. Avg. Price,Remarks";

    #[test]
    fn parses_archive_rows() {
        let body = format!(
            "{HEADER}\n\
             17-OCT-2026,ABC,ABC LTD,X CAPITAL,BUY,\"2,000,000\",100.00,-\n\
             17-OCT-2026,ABC,ABC LTD,Y FUND,sell,150000,812.5,-\n"
        );
        let batch = parse_bulk_csv(&body).unwrap();
        assert_eq!(batch.trade_date, NaiveDate::from_ymd_opt(2026, 10, 17));
        assert_eq!(batch.deals.len(), 2);
        assert_eq!(batch.deals[0], RawDeal::new("ABC", "X CAPITAL", Side::Buy, 2_000_000.0, 100.0));
        assert_eq!(batch.deals[1].side, Side::Sell);
    }

    #[test]
    fn header_cells_are_trimmed() {
        let body = "Symbol , Client Name ,Buy/Sell, Quantity Traded ,Trade Price / Wght. Avg. Price\n\
                    ABC,X,BUY,10,5\n";
        let batch = parse_bulk_csv(body).unwrap();
        assert_eq!(batch.deals.len(), 1);
        assert_eq!(batch.trade_date, None);
    }

    #[test]
    fn missing_price_column_gives_empty_batch() {
        let body = "Symbol,Client Name,Buy/Sell,Quantity Traded\nABC,X,BUY,10\n";
        assert!(parse_bulk_csv(body).unwrap().is_empty());
    }

    #[test]
    fn row_without_quantity_gives_empty_batch() {
        let body = format!(
            "{HEADER}\n\
             17-OCT-2026,ABC,ABC LTD,X,BUY,2000000,100,-\n\
             17-OCT-2026,DEF,DEF LTD,Y,BUY,,100,-\n"
        );
        assert!(parse_bulk_csv(&body).unwrap().is_empty());
    }

    #[test]
    fn unknown_side_row_is_skipped() {
        let body = format!(
            "{HEADER}\n\
             17-OCT-2026,ABC,ABC LTD,X,HOLD,2000000,100,-\n\
             17-OCT-2026,DEF,DEF LTD,Y,BUY,2000000,100,-\n\
             17-OCT-2026,GHI,GHI LTD,Z,,2000000,100,-\n"
        );
        let batch = parse_bulk_csv(&body).unwrap();
        assert_eq!(batch.deals, vec![RawDeal::new("DEF", "Y", Side::Buy, 2_000_000.0, 100.0)]);
    }

    #[test]
    fn missing_price_still_empties_batch_even_with_unknown_side() {
        let body = format!(
            "{HEADER}\n\
             17-OCT-2026,DEF,DEF LTD,Y,BUY,2000000,100,-\n\
             17-OCT-2026,ABC,ABC LTD,X,HOLD,2000000,,-\n"
        );
        assert!(parse_bulk_csv(&body).unwrap().is_empty());
    }

    #[test]
    fn header_only_is_empty() {
        assert!(parse_bulk_csv(HEADER).unwrap().is_empty());
        assert!(parse_bulk_csv("").unwrap().is_empty());
    }

    #[test]
    fn numbers_reject_negative_and_garbage() {
        assert_eq!(parse_number("1,23,456"), Some(123_456.0));
        assert_eq!(parse_number("-5"), None);
        assert_eq!(parse_number("n/a"), None);
    }

    #[test]
    fn mock_batch_has_requested_rows() {
        let batch = mock_batch(25);
        assert_eq!(batch.deals.len(), 25);
        assert!(batch.deals.iter().all(|d| d.quantity > 0.0 && d.price > 0.0));
    }

    #[tokio::test]
    async fn csv_file_source_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bulk.csv");
        std::fs::write(&path, format!("{HEADER}\n17-OCT-2026,ABC,ABC LTD,X,BUY,2000000,100,-\n")).unwrap();

        let batch = DealSource::CsvFile { path }.fetch_today_bulk_deals().await.unwrap();
        assert_eq!(batch.deals.len(), 1);
    }

    #[tokio::test]
    async fn missing_file_is_a_source_error() {
        let src = DealSource::CsvFile { path: PathBuf::from("/nonexistent/bulk.csv") };
        assert!(matches!(src.fetch_today_bulk_deals().await, Err(SourceError::Io(_))));
    }
}
