//! Access to the ESG scoring API.

pub mod client;
pub mod retry;

pub use client::EsgApiClient;
pub use retry::RetryPolicy;
