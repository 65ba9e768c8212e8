// src/lib.rs

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod http;
pub mod jobs;
pub mod pipeline;
pub mod process;
pub mod query;
pub mod retry;
pub mod sink;

pub use error::{Error, Result};
pub use jobs::Job;
