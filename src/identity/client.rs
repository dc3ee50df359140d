//! HTTP client for the identity provider's management API.

use crate::api::client::{decode, join_segments};
use crate::error::RequestError;
use crate::models::{PublicMetadata, User};
use reqwest::{RequestBuilder, Url};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Parameters of a user listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserListQuery {
    /// Free-text search over names and email addresses.
    pub query: Option<String>,
    pub limit: Option<u32>,
    /// Sort key, `-` prefix for descending, e.g. `-created_at`.
    pub order_by: Option<String>,
}

impl UserListQuery {
    fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(query) = &self.query {
            pairs.push(("query", query.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(order_by) = &self.order_by {
            pairs.push(("order_by", order_by.clone()));
        }
        pairs
    }
}

/// Client authenticated with the provider's secret key.
#[derive(Debug, Clone)]
pub struct IdentityClient {
    base_url: Url,
    secret_key: String,
    http: reqwest::Client,
}

impl IdentityClient {
    pub fn new(
        base_url: &str,
        secret_key: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, RequestError> {
        let base_url = Url::parse(base_url).map_err(|_| RequestError::InvalidUrl {
            url: base_url.to_string(),
        })?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| RequestError::from_reqwest(base_url.as_str(), e))?;

        Ok(Self {
            base_url,
            secret_key: secret_key.into(),
            http,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.secret_key)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User, RequestError> {
        let url = join_segments(&self.base_url, &["users", user_id])?;
        debug!("Fetching user {}", user_id);
        let response = self
            .authorized(self.http.get(url))
            .send()
            .await
            .map_err(|e| RequestError::from_reqwest("users/{id}", e))?;

        decode("users/{id}", response).await
    }

    pub async fn list_users(&self, query: &UserListQuery) -> Result<Vec<User>, RequestError> {
        let url = join_segments(&self.base_url, &["users"])?;
        let response = self
            .authorized(self.http.get(url))
            .query(&query.to_query_pairs())
            .send()
            .await
            .map_err(|e| RequestError::from_reqwest("users", e))?;

        decode("users", response).await
    }

    /// Merge `public_metadata` into the stored metadata.
    ///
    /// Keys set to `null` are removed by the provider.
    pub async fn update_metadata(
        &self,
        user_id: &str,
        public_metadata: Value,
    ) -> Result<User, RequestError> {
        let url = join_segments(&self.base_url, &["users", user_id, "metadata"])?;
        let response = self
            .authorized(self.http.patch(url))
            .json(&json!({ "public_metadata": public_metadata }))
            .send()
            .await
            .map_err(|e| RequestError::from_reqwest("users/{id}/metadata", e))?;

        decode("users/{id}/metadata", response).await
    }

    /// Replace the stored public metadata.
    pub async fn update_user(
        &self,
        user_id: &str,
        public_metadata: &PublicMetadata,
    ) -> Result<User, RequestError> {
        let url = join_segments(&self.base_url, &["users", user_id])?;
        let response = self
            .authorized(self.http.patch(url))
            .json(&json!({ "public_metadata": public_metadata }))
            .send()
            .await
            .map_err(|e| RequestError::from_reqwest("users/{id}", e))?;

        decode("users/{id}", response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_pairs() {
        let query = UserListQuery {
            query: Some("ada".to_string()),
            limit: Some(10),
            order_by: Some("-created_at".to_string()),
        };
        assert_eq!(
            query.to_query_pairs(),
            vec![
                ("query", "ada".to_string()),
                ("limit", "10".to_string()),
                ("order_by", "-created_at".to_string()),
            ]
        );
        assert!(UserListQuery::default().to_query_pairs().is_empty());
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(IdentityClient::new("::", "sk_test", None).is_err());
    }
}
