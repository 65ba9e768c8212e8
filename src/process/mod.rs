// src/process/mod.rs

pub mod date_parser;
pub mod flatten;
pub mod rows;
pub mod table;
pub mod utils;

pub use flatten::{flatten_aws, flatten_azure, flatten_dashboards, flatten_resources, flatten_usage};
pub use rows::{CostRow, DashboardRow, ResourceRow, UsageRow};
pub use table::Table;
