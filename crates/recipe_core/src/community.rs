//! Drafting and publishing a recipe to the community feed.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use reqwest::Client;
use shared::{
    domain::Recipe,
    error::PublishError,
    protocol::{CommunityPost, PublishRequest},
};
use tracing::{info, warn};
use url::Url;

/// What the user typed into the "share" form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub description: String,
    /// Hosted URLs or `data:` URLs from [`image_data_url`].
    pub images: Vec<String>,
    pub tags: Vec<String>,
}

impl PostDraft {
    pub fn into_request(
        self,
        owner_id: &str,
        recipe: &Recipe,
        created_at: DateTime<Utc>,
    ) -> Result<PublishRequest, PublishError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(PublishError::MissingTitle);
        }
        let owner_id = owner_id.trim();
        if owner_id.is_empty() {
            return Err(PublishError::MissingOwner);
        }

        Ok(PublishRequest {
            owner_id: owner_id.to_string(),
            post: CommunityPost {
                title: title.to_string(),
                description: self.description.trim().to_string(),
                images: self.images,
                recipe: recipe.clone(),
                tags: self.tags,
                created_at,
            },
        })
    }
}

/// `"a, b ,,c"` -> `["a", "b", "c"]`.
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn image_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

#[async_trait]
pub trait CommunityPublisher: Send + Sync {
    async fn publish(&self, request: &PublishRequest) -> Result<(), PublishError>;
}

#[derive(Clone)]
pub struct CommunityClient {
    http: Client,
    endpoint: Url,
}

impl CommunityClient {
    pub fn new(endpoint: Url) -> Self {
        Self {
            http: Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl CommunityPublisher for CommunityClient {
    async fn publish(&self, request: &PublishRequest) -> Result<(), PublishError> {
        let res = self
            .http
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|err| PublishError::Unreachable(err.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            warn!(%status, "community service rejected post");
            return Err(PublishError::Rejected {
                status: status.as_u16(),
            });
        }
        info!(title = %request.post.title, "published recipe to community");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/community_tests.rs"]
mod tests;
