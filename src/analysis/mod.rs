//! Analysis engine.
//!
//! Aggregation for charts, statistical insight reports, linear-trend
//! forecasts, and the orchestrator that combines the reports.

pub mod aggregator;
pub mod forecast;
pub mod insights;
pub mod orchestrator;
pub mod stats;

pub use aggregator::chart;
pub use forecast::forecast;
pub use orchestrator::analyze;
