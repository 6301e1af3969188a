//! Presentation adapters over a finished run.

pub mod chart;
pub mod table;

pub use chart::ChartSeries;
pub use table::format_history_table;
