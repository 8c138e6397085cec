// ===============================
// src/domain.rs
// ===============================
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 1 Crore = 10,000,000 unit mata uang
pub const CRORE: f64 = 10_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side { Buy, Sell }

impl Side {
    pub fn sign(&self) -> f64 { match self { Side::Buy => 1.0, Side::Sell => -1.0 } }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" | "B" => Some(Side::Buy),
            "SELL" | "S" => Some(Side::Sell),
            _ => None,
        }
    }
}

/// Satu laporan bulk deal dari bursa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDeal {
    pub symbol: String,
    pub client_name: String,
    pub side: Side,
    pub quantity: f64,
    pub price: f64,
}

impl RawDeal {
    pub fn new(symbol: &str, client_name: &str, side: Side, quantity: f64, price: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            client_name: client_name.to_string(),
            side,
            quantity,
            price,
        }
    }

    /// Nilai transaksi dalam Crore (quantity * price / 1e7)
    pub fn amount_cr(&self) -> f64 { self.quantity * self.price / CRORE }
}

/// Hasil satu kali fetch. `trade_date` diisi jika sumber menyertakan kolom tanggal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DealBatch {
    pub trade_date: Option<NaiveDate>,
    pub deals: Vec<RawDeal>,
}

impl DealBatch {
    pub fn empty() -> Self { Self::default() }
    pub fn is_empty(&self) -> bool { self.deals.is_empty() }
}

/// Posisi net per (symbol, client_name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetPosition {
    pub symbol: String,
    pub client_name: String,
    pub net_amount_cr: f64,
}

/// Kolom grid. Index mengikuti urutan tampilan: 0 = symbol, 1 = client name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Column { Symbol, ClientName, NetAmountCr }

impl Column {
    pub const ALL: [Column; 3] = [Column::Symbol, Column::ClientName, Column::NetAmountCr];

    pub fn from_index(i: usize) -> Option<Self> { Self::ALL.get(i).copied() }

    pub fn index(&self) -> usize {
        match self { Column::Symbol => 0, Column::ClientName => 1, Column::NetAmountCr => 2 }
    }

    pub fn header(&self) -> &'static str {
        match self {
            Column::Symbol => "Symbol",
            Column::ClientName => "Client Name",
            Column::NetAmountCr => "Net Amt (Cr)",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Column::Symbol => "symbol",
            Column::ClientName => "client_name",
            Column::NetAmountCr => "net_amount_cr",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "symbol" | "sym" | "0" => Some(Column::Symbol),
            "client" | "client_name" | "clientname" | "1" => Some(Column::ClientName),
            "net" | "net_amount_cr" | "amount" | "2" => Some(Column::NetAmountCr),
            _ => None,
        }
    }
}

/// Ringkasan subset hasil seleksi (drill-down).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionSummary {
    pub key: Column,
    pub value: String,
    pub subset: Vec<NetPosition>,
    pub total_net_amount_cr: f64,
    pub max_abs_net_amount_cr: f64,
}

impl SelectionSummary {
    pub fn is_empty(&self) -> bool { self.subset.is_empty() }

    pub fn headline(&self) -> String {
        format!("Total Net Amount : {}", self.total_net_amount_cr)
    }

    /// Sumbu simetris di sekitar nol untuk chart batang.
    pub fn axis_range(&self) -> (f64, f64) {
        (-self.max_abs_net_amount_cr, self.max_abs_net_amount_cr)
    }

    pub fn title(&self) -> String {
        format!("{} = {}", self.key.header(), self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_parses_exchange_flags() {
        assert_eq!(Side::parse("BUY"), Some(Side::Buy));
        assert_eq!(Side::parse(" sell "), Some(Side::Sell));
        assert_eq!(Side::parse("HOLD"), None);
        assert_eq!(Side::Sell.sign(), -1.0);
    }

    #[test]
    fn amount_is_scaled_to_crore() {
        let d = RawDeal::new("ABC", "X", Side::Buy, 2_000_000.0, 100.0);
        assert_eq!(d.amount_cr(), 20.0);
    }

    #[test]
    fn column_index_round_trips() {
        for c in Column::ALL {
            assert_eq!(Column::from_index(c.index()), Some(c));
        }
        assert_eq!(Column::from_index(3), None);
    }
}
