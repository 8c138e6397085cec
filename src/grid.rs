// ===============================
// src/grid.rs (Presentation Adapter, text)
// ===============================
//
// Grid = tabel posisi + urutan tampilan (view). Sort kolom hanya mengubah view;
// seleksi selalu dipetakan balik ke baris sumber sebelum diringkas.
//
use std::cmp::Ordering;
use std::fmt::Write as _;

use crate::domain::{Column, NetPosition, SelectionSummary};
use crate::selection;

const BAR_WIDTH: usize = 30;

#[derive(Debug, Clone, Default)]
pub struct Grid {
    positions: Vec<NetPosition>,
    view: Vec<usize>,
}

fn cmp_by(column: Column, a: &NetPosition, b: &NetPosition) -> Ordering {
    match column {
        Column::Symbol => a.symbol.cmp(&b.symbol),
        Column::ClientName => a.client_name.cmp(&b.client_name),
        Column::NetAmountCr => a.net_amount_cr.total_cmp(&b.net_amount_cr),
    }
}

impl Grid {
    pub fn new(positions: Vec<NetPosition>) -> Self {
        let view = (0..positions.len()).collect();
        Self { positions, view }
    }

    pub fn positions(&self) -> &[NetPosition] { &self.positions }
    pub fn len(&self) -> usize { self.view.len() }
    pub fn is_empty(&self) -> bool { self.view.is_empty() }

    /// Sort naik (stable) berdasarkan kolom; data sumber tidak disentuh.
    pub fn sort_by(&mut self, column: Column) {
        let rows = &self.positions;
        self.view.sort_by(|&a, &b| cmp_by(column, &rows[a], &rows[b]));
    }

    pub fn source_row(&self, view_row: usize) -> Option<usize> { self.view.get(view_row).copied() }

    pub fn row(&self, view_row: usize) -> Option<&NetPosition> {
        self.source_row(view_row).map(|i| &self.positions[i])
    }

    pub fn select(&self, view_row: usize, column: usize) -> Option<SelectionSummary> {
        let src = self.source_row(view_row)?;
        selection::on_cell_selected(&self.positions, src, column)
    }

    pub fn render_table(&self) -> String {
        let sym_w = self.view.iter().map(|&i| self.positions[i].symbol.len()).max().unwrap_or(0)
            .max(Column::Symbol.header().len());
        let cli_w = self.view.iter().map(|&i| self.positions[i].client_name.len()).max().unwrap_or(0)
            .max(Column::ClientName.header().len());

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:>4}  {:<sym_w$}  {:<cli_w$}  {:>14}",
            "#",
            Column::Symbol.header(),
            Column::ClientName.header(),
            Column::NetAmountCr.header(),
        );
        for (n, &i) in self.view.iter().enumerate() {
            let p = &self.positions[i];
            let _ = writeln!(
                out,
                "{:>4}  {:<sym_w$}  {:<cli_w$}  {:>14.4}",
                n + 1,
                p.symbol,
                p.client_name,
                p.net_amount_cr,
            );
        }
        if self.view.is_empty() {
            out.push_str("(no net positions)\n");
        }
        out
    }
}

/// Chart batang horizontal bertanda: '+' untuk net > 0, '-' untuk sisanya.
/// Skala simetris terhadap max |net| subset; label = kolom lawan dari key.
pub fn render_bars(summary: &SelectionSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", summary.title());
    if summary.is_empty() {
        out.push_str("No selection\n");
        return out;
    }

    let label_of = |p: &NetPosition| -> String {
        match summary.key {
            Column::ClientName => p.symbol.clone(),
            _ => p.client_name.clone(),
        }
    };
    let label_w = summary.subset.iter().map(|p| label_of(p).len()).max().unwrap_or(0);
    let (lo, hi) = summary.axis_range();

    for p in &summary.subset {
        let len = if hi > 0.0 {
            ((p.net_amount_cr.abs() / hi) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        let (left, right) = if p.net_amount_cr > 0.0 {
            (" ".repeat(BAR_WIDTH), format!("{:<BAR_WIDTH$}", "+".repeat(len)))
        } else {
            (format!("{:>BAR_WIDTH$}", "-".repeat(len)), " ".repeat(BAR_WIDTH))
        };
        let _ = writeln!(
            out,
            "{:<label_w$} {left}|{right} {:.4}",
            label_of(p),
            p.net_amount_cr,
        );
    }
    let _ = writeln!(out, "{:<label_w$} axis [{lo:.2}, {hi:.2}]", "");
    let _ = writeln!(out, "{}", summary.headline());
    out
}
