// src/fetch/mod.rs

//! Provider clients. Each returns the provider's nested result untouched;
//! flattening into rows happens in `process`.

pub mod aws;
pub mod azure;
pub mod grafana;

pub use aws::CostExplorer;
pub use azure::{AzureClient, CostType};
