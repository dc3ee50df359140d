//! Identity provider integration: account lookup and administration.

pub mod admin;
pub mod client;

pub use admin::{handle_webhook, Admin, RoleRemoval, WebhookEvent, WebhookOutcome};
pub use client::{IdentityClient, UserListQuery};
