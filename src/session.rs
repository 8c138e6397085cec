// ===============================
// src/session.rs (fetch -> aggregate cycle)
// ===============================
use std::time::Instant;

use chrono::NaiveDate;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::domain::{Column, NetPosition, SelectionSummary};
use crate::engine::{aggregate_counted, AggregationParams};
use crate::grid::Grid;
use crate::metrics::{AGGREGATE_US, FETCHES, NET_POSITIONS, RETAINED_DEALS, SELECTIONS};
use crate::selection::{summarize_by_client_name, summarize_by_symbol};
use crate::source::{DealSource, SourceError};

/// Hasil satu siklus refresh.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// Ada posisi net yang lolos threshold.
    Ready { positions: usize },
    /// Sumber OK tapi tidak menghasilkan apa-apa (batch kosong / semua di bawah threshold).
    Empty,
    /// Sumber gagal; tabel diganti kosong. UI wajib menampilkan notifikasi blocking.
    SourceUnavailable(SourceError),
}

#[derive(Debug, Default)]
pub struct Session {
    params: AggregationParams,
    grid: Grid,
    trade_date: Option<NaiveDate>,
    sort: Option<Column>,
}

impl Session {
    pub fn new(params: AggregationParams) -> Self {
        Self { params, ..Default::default() }
    }

    pub fn positions(&self) -> &[NetPosition] { self.grid.positions() }
    pub fn grid(&self) -> &Grid { &self.grid }
    pub fn trade_date(&self) -> Option<NaiveDate> { self.trade_date }

    /// Satu siklus fetch + aggregate. Hasil sebelumnya selalu diganti, tidak digabung.
    pub async fn refresh(&mut self, source: &DealSource) -> RefreshOutcome {
        let batch = match source.fetch_today_bulk_deals().await {
            Ok(b) => b,
            Err(e) => {
                error!(error = %e, source = source.mode_label(), "error fetching bulk deals");
                FETCHES.with_label_values(&["failed"]).inc();
                self.grid = Grid::new(Vec::new());
                self.trade_date = None;
                NET_POSITIONS.set(0);
                return RefreshOutcome::SourceUnavailable(e);
            }
        };

        if batch.is_empty() {
            warn!("no data to process");
        }
        let started = Instant::now();
        let agg = aggregate_counted(&batch.deals, &self.params);
        AGGREGATE_US.observe(started.elapsed().as_micros() as f64);
        RETAINED_DEALS.inc_by(agg.retained as u64);
        NET_POSITIONS.set(agg.positions.len() as i64);

        self.trade_date = batch.trade_date;
        self.grid = Grid::new(agg.positions);
        if let Some(col) = self.sort {
            self.grid.sort_by(col);
        }

        let n = self.grid.len();
        if n == 0 {
            FETCHES.with_label_values(&["empty"]).inc();
            RefreshOutcome::Empty
        } else {
            FETCHES.with_label_values(&["ok"]).inc();
            info!(positions = n, trade_date = ?self.trade_date, "net positions ready");
            RefreshOutcome::Ready { positions: n }
        }
    }

    /// Klik header kolom; dipertahankan untuk refresh berikutnya.
    pub fn sort_by(&mut self, column: Column) {
        self.sort = Some(column);
        self.grid.sort_by(column);
    }

    pub fn select(&self, view_row: usize, column: usize) -> Option<SelectionSummary> {
        self.grid.select(view_row, column).map(counted)
    }

    pub fn summarize_symbol(&self, symbol: &str) -> SelectionSummary {
        counted(summarize_by_symbol(self.positions(), symbol))
    }

    pub fn summarize_client(&self, client_name: &str) -> SelectionSummary {
        counted(summarize_by_client_name(self.positions(), client_name))
    }
}

fn counted(summary: SelectionSummary) -> SelectionSummary {
    SELECTIONS.with_label_values(&[summary.key.label()]).inc();
    summary
}

/// Refresh terjadwal. Satu siklus selesai dulu sebelum tick berikutnya diproses.
pub async fn run_watch<F>(source: DealSource, mut session: Session, every: Duration, mut on_cycle: F)
where
    F: FnMut(&Session, &RefreshOutcome),
{
    let mut tick = interval(every);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(every_secs = every.as_secs(), source = source.mode_label(), "watch: started");

    loop {
        tick.tick().await;
        let outcome = session.refresh(&source).await;
        on_cycle(&session, &outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RawDeal, Side};
    use std::path::PathBuf;

    fn big(symbol: &str, client: &str, side: Side) -> RawDeal {
        RawDeal::new(symbol, client, side, 2_000_000.0, 100.0)
    }

    #[tokio::test]
    async fn refresh_replaces_previous_table() {
        let mut s = Session::new(AggregationParams::default());
        let first = DealSource::Static(vec![big("ABC", "X", Side::Buy), big("DEF", "Y", Side::Sell)]);
        assert!(matches!(s.refresh(&first).await, RefreshOutcome::Ready { positions: 2 }));

        let second = DealSource::Static(vec![big("GHI", "Z", Side::Buy)]);
        assert!(matches!(s.refresh(&second).await, RefreshOutcome::Ready { positions: 1 }));
        assert_eq!(s.positions().len(), 1);
        assert_eq!(s.positions()[0].symbol, "GHI");
    }

    #[tokio::test]
    async fn source_failure_clears_table() {
        let mut s = Session::new(AggregationParams::default());
        s.refresh(&DealSource::Static(vec![big("ABC", "X", Side::Buy)])).await;

        let broken = DealSource::CsvFile { path: PathBuf::from("/nonexistent/bulk.csv") };
        let outcome = s.refresh(&broken).await;
        assert!(matches!(outcome, RefreshOutcome::SourceUnavailable(SourceError::Io(_))));
        assert!(s.positions().is_empty());
    }

    #[tokio::test]
    async fn sub_threshold_batch_is_empty_outcome() {
        let mut s = Session::new(AggregationParams::default());
        let small = DealSource::Static(vec![RawDeal::new("ABC", "X", Side::Buy, 10.0, 10.0)]);
        assert!(matches!(s.refresh(&small).await, RefreshOutcome::Empty));
        assert!(s.select(0, 0).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn watch_cycles_replace_the_table_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bulk.csv");
        let header = "Symbol,Client Name,Buy/Sell,Quantity Traded,Trade Price / Wght. Avg. Price";
        std::fs::write(&path, format!("{header}\nABC,X,BUY,2000000,100\n")).unwrap();

        let source = DealSource::CsvFile { path: path.clone() };
        let mut seen: Vec<(usize, Vec<String>)> = Vec::new();
        let mut cycle = 0_usize;

        let run = run_watch(
            source,
            Session::new(AggregationParams::default()),
            Duration::from_secs(60),
            |s, outcome| {
                cycle += 1;
                assert!(matches!(outcome, RefreshOutcome::Ready { .. }));
                let syms = s.positions().iter().map(|p| p.symbol.clone()).collect();
                seen.push((cycle, syms));
                // batch berikutnya berbeda total
                if cycle == 1 {
                    std::fs::write(&path, format!("{header}\nDEF,Y,SELL,3000000,100\nGHI,Z,BUY,2000000,100\n"))
                        .unwrap();
                }
            },
        );
        let res = tokio::time::timeout(Duration::from_secs(60 * 5 + 30), run).await;
        assert!(res.is_err(), "watch loop never returns on its own");

        assert!(seen.len() >= 3, "expected several cycles, got {}", seen.len());
        let order: Vec<usize> = seen.iter().map(|(n, _)| *n).collect();
        assert!(order.windows(2).all(|w| w[1] == w[0] + 1));
        assert_eq!(seen[0].1, vec!["ABC".to_string()]);
        for (_, syms) in &seen[1..] {
            assert_eq!(syms, &vec!["DEF".to_string(), "GHI".to_string()]);
        }
    }

    #[tokio::test]
    async fn sort_survives_refresh() {
        let mut s = Session::new(AggregationParams::default());
        let src = DealSource::Static(vec![big("ABC", "Z", Side::Buy), big("DEF", "A", Side::Buy)]);
        s.refresh(&src).await;
        s.sort_by(Column::ClientName);
        s.refresh(&src).await;
        assert_eq!(s.grid().row(0).unwrap().client_name, "A");
        assert_eq!(s.select(0, 1).unwrap().value, "A");
    }
}
