// ===============================
// src/lib.rs
// ===============================
pub mod config;
pub mod domain;
pub mod engine;
pub mod grid;
pub mod metrics;
pub mod selection;
pub mod session;
pub mod source;

pub use domain::{Column, DealBatch, NetPosition, RawDeal, SelectionSummary, Side};
pub use engine::{aggregate, aggregate_with, AggregationParams, ThresholdMode};
pub use selection::{on_cell_selected, summarize_by_client_name, summarize_by_symbol};
pub use source::{DealSource, SourceError};
