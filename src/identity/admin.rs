//! Account administration and sign-up event handling.

use super::client::{IdentityClient, UserListQuery};
use crate::error::AdminError;
use crate::models::{PublicMetadata, Role, User, UserSummary};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

/// Accounts shown by a search without a query.
pub const RECENT_USERS_LIMIT: u32 = 10;

/// Accounts returned by the full listing.
pub const USER_LIST_LIMIT: u32 = 100;

/// Outcome of removing a role.
#[derive(Debug, Clone)]
pub struct RoleRemoval {
    pub user: User,
    /// The acting account removed its own role.
    pub self_demotion: bool,
}

/// Administrative operations performed on behalf of one account.
///
/// Every operation first checks that the acting account holds the
/// `admin` role.
#[derive(Debug, Clone)]
pub struct Admin {
    identity: IdentityClient,
    actor: Option<String>,
}

impl Admin {
    pub fn new(identity: IdentityClient, actor: Option<String>) -> Self {
        Self { identity, actor }
    }

    /// Fetch the acting account and confirm it is an admin.
    pub async fn require_admin(&self) -> Result<User, AdminError> {
        let actor = self.actor.as_deref().ok_or(AdminError::Unauthorized)?;
        let user = self.identity.get_user(actor).await?;
        if !user.public_metadata.is_admin() {
            warn!("User {} attempted an admin operation", actor);
            return Err(AdminError::Forbidden(actor.to_string()));
        }
        Ok(user)
    }

    /// Search accounts, or list the most recent ones when `query` is empty.
    pub async fn search_users(&self, query: Option<&str>) -> Result<Vec<User>, AdminError> {
        self.require_admin().await?;

        let list_query = match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => UserListQuery {
                query: Some(q.to_string()),
                ..UserListQuery::default()
            },
            None => UserListQuery {
                query: None,
                limit: Some(RECENT_USERS_LIMIT),
                order_by: Some("-created_at".to_string()),
            },
        };

        Ok(self.identity.list_users(&list_query).await?)
    }

    /// Condensed listing of up to [`USER_LIST_LIMIT`] accounts.
    pub async fn list_users(&self) -> Result<Vec<UserSummary>, AdminError> {
        self.require_admin().await?;

        let users = self
            .identity
            .list_users(&UserListQuery {
                limit: Some(USER_LIST_LIMIT),
                ..UserListQuery::default()
            })
            .await?;

        Ok(users.iter().map(UserSummary::from).collect())
    }

    pub async fn set_role(&self, user_id: &str, role: Role) -> Result<User, AdminError> {
        self.require_admin().await?;
        let user_id = non_empty(user_id)?;

        info!("Setting role {} for user {}", role.as_str(), user_id);
        let user = self
            .identity
            .update_metadata(user_id, json!({ "role": role.as_str() }))
            .await?;
        Ok(user)
    }

    pub async fn remove_role(&self, user_id: &str) -> Result<RoleRemoval, AdminError> {
        let actor = self.require_admin().await?;
        let user_id = non_empty(user_id)?;

        info!("Removing role for user {}", user_id);
        let user = self
            .identity
            .update_metadata(user_id, json!({ "role": Value::Null }))
            .await?;

        let self_demotion = actor.id == user_id;
        if self_demotion {
            warn!("User {} removed their own admin role", user_id);
        }
        Ok(RoleRemoval {
            user,
            self_demotion,
        })
    }

    /// Mark an account as approved, keeping its other metadata.
    pub async fn approve_user(&self, user_id: &str) -> Result<User, AdminError> {
        self.require_admin().await?;
        let user_id = non_empty(user_id)?;

        let target = self.identity.get_user(user_id).await?;
        let metadata = PublicMetadata {
            is_approved: Some(true),
            ..target.public_metadata
        };

        info!("Approving user {}", user_id);
        Ok(self.identity.update_user(user_id, &metadata).await?)
    }
}

fn non_empty(user_id: &str) -> Result<&str, AdminError> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        Err(AdminError::MissingUserId)
    } else {
        Ok(user_id)
    }
}

/// Event delivered by the identity provider's webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// A new account was marked as awaiting approval.
    MarkedPending(String),
    /// The event type needs no action.
    Ignored(String),
}

/// Apply a webhook event.
///
/// `user.created` resets the new account's metadata to unapproved; every
/// other event type is acknowledged without action.
pub async fn handle_webhook(
    identity: &IdentityClient,
    event: &WebhookEvent,
) -> Result<WebhookOutcome, AdminError> {
    if event.event_type != "user.created" {
        return Ok(WebhookOutcome::Ignored(event.event_type.clone()));
    }

    let user_id = event
        .data
        .get("id")
        .and_then(Value::as_str)
        .ok_or(AdminError::MissingUserId)
        .and_then(non_empty)?;

    let metadata = PublicMetadata {
        is_approved: Some(false),
        ..PublicMetadata::default()
    };
    identity.update_user(user_id, &metadata).await?;

    info!("User {} created with approval status: pending", user_id);
    Ok(WebhookOutcome::MarkedPending(user_id.to_string()))
}
