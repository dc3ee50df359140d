//! ESGScore - client for ESG report scoring.
//!
//! Uploads reports to the scoring API, evaluates them in every category
//! concurrently with retries, merges the results as they arrive, and wraps
//! the document history and account administration endpoints.

pub mod access;
pub mod analysis;
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod report;
