// ===============================
// src/engine.rs (Aggregation Engine)
// ===============================
//
// RawDeal[] -> NetPosition[]:
// 1) amount = qty * price / 1e7 (Crore)
// 2) buang baris dengan amount <= threshold (per trade, sebelum grouping)
// 3) group (symbol, client_name), net = sum(BUY) - sum(SELL)
// 4) urutkan naik berdasarkan (symbol, net)
//
// Fungsi murni: tidak menyentuh metrics/global state; pencatatan metrics ada di session.
//
use ahash::AHashMap as HashMap;
use tracing::debug;

use crate::domain::{NetPosition, RawDeal};

pub const DEFAULT_THRESHOLD_CR: f64 = 10.0;

/// Tahap di mana threshold diterapkan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThresholdMode {
    /// Setiap trade harus > threshold sebelum dinet-kan.
    #[default]
    PerTrade,
    /// Net dulu, lalu simpan pasangan dengan |net| > threshold.
    Net,
}

impl ThresholdMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per_trade" | "pertrade" | "trade" => Some(ThresholdMode::PerTrade),
            "net" => Some(ThresholdMode::Net),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregationParams {
    pub threshold_cr: f64,
    pub threshold_mode: ThresholdMode,
}

impl Default for AggregationParams {
    fn default() -> Self {
        Self { threshold_cr: DEFAULT_THRESHOLD_CR, threshold_mode: ThresholdMode::PerTrade }
    }
}

/// Tabel hasil + jumlah baris yang lolos filter per-trade.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    pub positions: Vec<NetPosition>,
    pub retained: usize,
}

pub fn aggregate(raw: &[RawDeal]) -> Vec<NetPosition> {
    aggregate_with(raw, &AggregationParams::default())
}

pub fn aggregate_with(raw: &[RawDeal], params: &AggregationParams) -> Vec<NetPosition> {
    aggregate_counted(raw, params).positions
}

pub fn aggregate_counted(raw: &[RawDeal], params: &AggregationParams) -> Aggregation {

    // Key dipinjam dari input; urutan kemunculan pertama disimpan terpisah
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();
    let mut groups: Vec<((&str, &str), f64)> = Vec::new();
    let mut retained = 0_usize;

    for deal in raw {
        let amount = deal.amount_cr();
        // NaN gagal di perbandingan ini, jadi ikut terbuang
        if params.threshold_mode == ThresholdMode::PerTrade && !(amount > params.threshold_cr) {
            continue;
        }
        retained += 1;

        let key = (deal.symbol.as_str(), deal.client_name.as_str());
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push((key, 0.0));
            groups.len() - 1
        });
        groups[slot].1 += deal.side.sign() * amount;
    }

    let mut out: Vec<NetPosition> = groups
        .into_iter()
        .filter(|(_, net)| match params.threshold_mode {
            ThresholdMode::PerTrade => true,
            ThresholdMode::Net => net.abs() > params.threshold_cr,
        })
        .map(|((symbol, client_name), net)| NetPosition {
            symbol: symbol.to_string(),
            client_name: client_name.to_string(),
            net_amount_cr: net,
        })
        .collect();

    // client_name sebagai tie-breaker supaya hasil deterministik
    out.sort_by(|a, b| {
        a.symbol
            .cmp(&b.symbol)
            .then_with(|| a.net_amount_cr.total_cmp(&b.net_amount_cr))
            .then_with(|| a.client_name.cmp(&b.client_name))
    });

    debug!(raw = raw.len(), retained, positions = out.len(), mode = ?params.threshold_mode, "aggregated");

    Aggregation { positions: out, retained }
}
