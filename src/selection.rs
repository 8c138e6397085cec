// ===============================
// src/selection.rs (drill-down summary)
// ===============================
use tracing::debug;

use crate::domain::{Column, NetPosition, SelectionSummary};

fn summarize<F>(positions: &[NetPosition], key: Column, value: &str, pick: F) -> SelectionSummary
where
    F: Fn(&NetPosition) -> &str,
{
    let subset: Vec<NetPosition> =
        positions.iter().filter(|p| pick(*p) == value).cloned().collect();
    let total_net_amount_cr: f64 = subset.iter().map(|p| p.net_amount_cr).sum();
    let max_abs_net_amount_cr = subset.iter().map(|p| p.net_amount_cr.abs()).fold(0.0, f64::max);

    debug!(key = key.label(), %value, rows = subset.len(), "selection summarized");

    SelectionSummary {
        key,
        value: value.to_string(),
        subset,
        total_net_amount_cr,
        max_abs_net_amount_cr,
    }
}

pub fn summarize_by_symbol(positions: &[NetPosition], symbol: &str) -> SelectionSummary {
    summarize(positions, Column::Symbol, symbol, |p| p.symbol.as_str())
}

pub fn summarize_by_client_name(positions: &[NetPosition], client_name: &str) -> SelectionSummary {
    summarize(positions, Column::ClientName, client_name, |p| p.client_name.as_str())
}

/// Klik sel -> ringkasan. Kolom selain symbol/client atau baris di luar range -> None.
pub fn on_cell_selected(
    positions: &[NetPosition],
    row: usize,
    column: usize,
) -> Option<SelectionSummary> {
    let pos = positions.get(row)?;
    match Column::from_index(column)? {
        Column::Symbol => Some(summarize_by_symbol(positions, &pos.symbol)),
        Column::ClientName => Some(summarize_by_client_name(positions, &pos.client_name)),
        Column::NetAmountCr => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(symbol: &str, client: &str, net: f64) -> NetPosition {
        NetPosition { symbol: symbol.into(), client_name: client.into(), net_amount_cr: net }
    }

    fn table() -> Vec<NetPosition> {
        vec![
            pos("ABC", "X", -7.0),
            pos("ABC", "Y", 3.0),
            pos("DEF", "X", 12.0),
        ]
    }

    #[test]
    fn symbol_summary_totals_and_max_abs() {
        let s = summarize_by_symbol(&table(), "ABC");
        assert_eq!(s.subset, vec![pos("ABC", "X", -7.0), pos("ABC", "Y", 3.0)]);
        assert_eq!(s.total_net_amount_cr, -4.0);
        assert_eq!(s.max_abs_net_amount_cr, 7.0);
        assert_eq!(s.axis_range(), (-7.0, 7.0));
        assert_eq!(s.headline(), "Total Net Amount : -4");
    }

    #[test]
    fn client_summary_keeps_table_order() {
        let s = summarize_by_client_name(&table(), "X");
        let syms: Vec<&str> = s.subset.iter().map(|p| p.symbol.as_str()).collect();
        assert_eq!(syms, vec!["ABC", "DEF"]);
        assert_eq!(s.total_net_amount_cr, 5.0);
        assert_eq!(s.title(), "Client Name = X");
    }

    #[test]
    fn unmatched_key_is_empty_not_error() {
        let s = summarize_by_symbol(&table(), "ZZZ");
        assert!(s.is_empty());
        assert_eq!(s.total_net_amount_cr, 0.0);
        assert_eq!(s.max_abs_net_amount_cr, 0.0);
    }

    #[test]
    fn cell_selection_routes_by_column() {
        let t = table();
        let by_sym = on_cell_selected(&t, 2, 0).unwrap();
        assert_eq!(by_sym.key, Column::Symbol);
        assert_eq!(by_sym.value, "DEF");

        let by_client = on_cell_selected(&t, 1, 1).unwrap();
        assert_eq!(by_client.key, Column::ClientName);
        assert_eq!(by_client.subset.len(), 1);

        assert!(on_cell_selected(&t, 0, 2).is_none());
        assert!(on_cell_selected(&t, 9, 0).is_none());
    }
}
