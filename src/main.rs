// ===============================
// src/main.rs
// ===============================
/*
 # tabel hari ini dari arsip bursa
 cargo run --release -- show --sort net

 # drill-down: klik sel (baris view, kolom 0=symbol 1=client)
 cargo run --release -- --file ./bulk.csv select --row 3 --col 1

 # refresh terjadwal + metrics
 METRICS_PORT=9898 REFRESH_SECS=60 cargo run --release -- watch
 curl -s localhost:9898/metrics | grep '^fetches_total'
*/
/*
=============================================================================
Project : bulkdeals_rust — daily bulk deal netting & drill-down in Rust
Module  : main.rs
Version : 0.5.0
License : MIT (see LICENSE)

Summary : Fetches today's exchange bulk deals (archive CSV / file / mock),
          nets them per (symbol, client) above a Crore threshold, shows a
          sortable table with per-symbol / per-client drill-down, exposes
          Prometheus metrics, and logs through tracing.
=============================================================================
*/
use std::fs::OpenOptions;
use std::sync::Mutex;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use bulkdeals_rust::config::{self, Args, Cli, Command};
use bulkdeals_rust::domain::{Column, SelectionSummary};
use bulkdeals_rust::grid::render_bars;
use bulkdeals_rust::metrics;
use bulkdeals_rust::session::{run_watch, RefreshOutcome, Session};

// Logger eksplisit dari config: file (tanpa ANSI) kalau LOG_FILE diset, selain itu stderr
fn init_logging(args: &Args) {
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    if let Some(path) = &args.log_file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .init();
                return;
            }
            Err(e) => eprintln!("log file {} unavailable ({e}), logging to stderr", path.display()),
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_sort(sort: Option<&str>) -> Option<Column> {
    let col = sort.and_then(Column::parse);
    if sort.is_some() && col.is_none() {
        eprintln!("unknown sort column {:?}, keeping source order", sort.unwrap_or_default());
    }
    col
}

// Notifikasi "blocking" versi terminal
fn report(outcome: &RefreshOutcome) {
    match outcome {
        RefreshOutcome::Ready { .. } => {}
        RefreshOutcome::Empty => println!("No net positions above the threshold today."),
        RefreshOutcome::SourceUnavailable(e) => eprintln!("ERROR: Error fetching bulk deals: {e}"),
    }
}

fn print_summary(summary: Option<SelectionSummary>) {
    match summary {
        Some(s) if !s.is_empty() => print!("{}", render_bars(&s)),
        _ => println!("No selection"),
    }
}

#[tokio::main]
async fn main() {
    // ---- Config ----
    let cli = Cli::parse();
    let mut args = config::load();
    args.apply_cli(&cli);

    // ---- Logging ----
    init_logging(&args);

    // ---- Metrics ----
    metrics::init();
    let source = args.source();
    metrics::CONFIG_SOURCE_MODE.with_label_values(&[source.mode_label()]).set(1);

    info!(
        source = source.mode_label(),
        threshold_cr = args.params.threshold_cr,
        threshold_mode = ?args.params.threshold_mode,
        metrics_port = ?args.metrics_port,
        "startup config"
    );

    let mut session = Session::new(args.params);
    let command = cli.command.clone().unwrap_or(Command::Show { sort: None, json: false });

    match command {
        Command::Watch => {
            if let Some(port) = args.metrics_port {
                metrics::serve_metrics(port);
            }
            run_watch(source, session, args.refresh_every, |s, outcome| {
                report(outcome);
                if let Some(d) = s.trade_date() {
                    println!("Bulk deals for {d}");
                }
                print!("{}", s.grid().render_table());
            })
            .await;
        }
        Command::Show { sort, json } => {
            let outcome = session.refresh(&source).await;
            report(&outcome);
            if let Some(col) = parse_sort(sort.as_deref()) {
                session.sort_by(col);
            }
            if json {
                let view: Vec<_> = (0..session.grid().len()).filter_map(|i| session.grid().row(i)).collect();
                match serde_json::to_string_pretty(&view) {
                    Ok(s) => println!("{s}"),
                    Err(e) => error!(?e, "serialize positions failed"),
                }
            } else {
                print!("{}", session.grid().render_table());
            }
        }
        Command::Select { row, col, sort } => {
            let outcome = session.refresh(&source).await;
            report(&outcome);
            if let Some(c) = parse_sort(sort.as_deref()) {
                session.sort_by(c);
            }
            print!("{}", session.grid().render_table());
            // baris di CLI dihitung dari 1 seperti header vertikal tabel
            print_summary(row.checked_sub(1).and_then(|r| session.select(r, col)));
        }
        Command::Symbol { symbol } => {
            let outcome = session.refresh(&source).await;
            report(&outcome);
            print_summary(Some(session.summarize_symbol(&symbol)));
        }
        Command::Client { name } => {
            let outcome = session.refresh(&source).await;
            report(&outcome);
            print_summary(Some(session.summarize_client(&name)));
        }
    }
}
