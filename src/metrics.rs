// ===============================
// src/metrics.rs
// ===============================
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use tracing::{error, info};

// Single custom registry (we register everything here)
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

// -------- Fetch / source --------
pub static FETCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("fetches_total", "bulk deal fetch cycles (label: outcome = ok|empty|failed)"),
        &["outcome"],
    )
    .unwrap()
});

pub static RAW_DEALS: Lazy<IntCounter> =
    Lazy::new(|| IntCounter::new("raw_deals_total", "raw bulk deal rows received").unwrap());

// -------- Aggregation --------
pub static RETAINED_DEALS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("retained_deals_total", "rows above the amount threshold").unwrap()
});

pub static NET_POSITIONS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("net_positions", "rows in the latest aggregated table").unwrap()
});

pub static AGGREGATE_US: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("aggregate_duration_us", "aggregation latency (microseconds)")
            .buckets(vec![10.0, 50.0, 100.0, 500.0, 1_000.0, 5_000.0, 20_000.0]),
    )
    .unwrap()
});

// -------- Selection --------
pub static SELECTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("selections_total", "drill-down selections (label: column)"),
        &["column"],
    )
    .unwrap()
});

// ---- Config visibility ----
pub static CONFIG_SOURCE_MODE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("config_source_mode", "raw record source (label: mode)"),
        &["mode"],
    )
    .unwrap()
});

pub fn init() {
    // Register all metrics to the custom registry
    for m in [
        REGISTRY.register(Box::new(FETCHES.clone())),
        REGISTRY.register(Box::new(RAW_DEALS.clone())),
        REGISTRY.register(Box::new(RETAINED_DEALS.clone())),
        REGISTRY.register(Box::new(NET_POSITIONS.clone())),
        REGISTRY.register(Box::new(AGGREGATE_US.clone())),
        REGISTRY.register(Box::new(SELECTIONS.clone())),
        REGISTRY.register(Box::new(CONFIG_SOURCE_MODE.clone())),
    ] {
        // AlreadyReg diabaikan (init bisa terpanggil lebih dari sekali di test)
        let _ = m;
    }
}

// Encode all metrics in Prometheus text format
pub fn encode_metrics() -> Vec<u8> {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buf = Vec::new();
    if encoder.encode(&families, &mut buf).is_err() || buf.is_empty() {
        buf.extend_from_slice(b"# no metrics\n");
    }
    buf
}

// Serve one HTTP request (GET / or /metrics) — tiny HTTP 1.1 responder
fn handle_client(mut stream: TcpStream) {
    // Read a bit to consume headers (no full parse)
    let mut _req_buf = [0u8; 1024];
    let _ = stream.read(&mut _req_buf);

    let body = encode_metrics();
    let header = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain; version=0.0.4; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );

    let _ = stream.write_all(header.as_bytes());
    let _ = stream.write_all(&body);
    let _ = stream.flush();
}

// Metrics server di OS thread tersendiri (runtime Tokio tetap bersih)
pub fn serve_metrics(port: u16) {
    let addr = format!("0.0.0.0:{port}");
    match TcpListener::bind(&addr) {
        Ok(listener) => {
            info!(%addr, "metrics listening (/ and /metrics)");
            serve_on(listener);
        }
        Err(e) => error!(?e, %addr, "metrics bind failed"),
    }
}

pub fn serve_on(listener: TcpListener) {
    thread::spawn(move || {
        for conn in listener.incoming() {
            match conn {
                Ok(stream) => handle_client(stream),
                Err(e) => error!(?e, "metrics accept error"),
            }
        }
    });
}
