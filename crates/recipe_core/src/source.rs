//! Recipe source port and its HTTP client.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use shared::{
    error::FetchError,
    protocol::{RawRecipe, RecipeRequest},
};
use tracing::{info, warn};
use url::Url;

pub const DEFAULT_FETCH_ERROR: &str = "Failed to fetch recipe";

#[async_trait]
pub trait RecipeSource: Send + Sync {
    /// Returns the raw step mapping for `prompt`. One request, no retry.
    async fn fetch(&self, prompt: &str) -> Result<RawRecipe, FetchError>;
}

/// Used when no recipe service is configured.
pub struct MissingRecipeSource;

#[async_trait]
impl RecipeSource for MissingRecipeSource {
    async fn fetch(&self, _prompt: &str) -> Result<RawRecipe, FetchError> {
        Err(FetchError::Unreachable(
            "no recipe service configured".to_string(),
        ))
    }
}

#[derive(Clone)]
pub struct RecipeSourceClient {
    http: Client,
    endpoint: Url,
}

impl RecipeSourceClient {
    pub fn new(endpoint: Url) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(http: Client, endpoint: Url) -> Self {
        Self { http, endpoint }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl RecipeSource for RecipeSourceClient {
    async fn fetch(&self, prompt: &str) -> Result<RawRecipe, FetchError> {
        info!(endpoint = %self.endpoint, "requesting recipe");
        let res = self
            .http
            .post(self.endpoint.clone())
            .json(&RecipeRequest {
                user_prompt: prompt.to_string(),
            })
            .send()
            .await
            .map_err(|err| FetchError::Unreachable(err.to_string()))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|err| FetchError::Unreachable(err.to_string()))?;
        let parsed = serde_json::from_str::<Value>(&body);

        if let Some(message) = parsed.as_ref().ok().and_then(service_error) {
            warn!(%status, %message, "recipe service reported an error");
            return Err(FetchError::Service(message));
        }
        if !status.is_success() {
            warn!(%status, "recipe service request failed");
            return Err(FetchError::Service(DEFAULT_FETCH_ERROR.to_string()));
        }

        match parsed.map_err(|err| FetchError::InvalidBody(err.to_string()))? {
            Value::Object(steps) => Ok(steps),
            other => Err(FetchError::InvalidBody(format!(
                "expected a mapping of steps, got {}",
                json_kind(&other)
            ))),
        }
    }
}

/// The service's `error` field; a non-string value gets the generic message.
fn service_error(body: &Value) -> Option<String> {
    let error = body.as_object()?.get("error")?;
    Some(match error {
        Value::String(message) if !message.trim().is_empty() => message.clone(),
        _ => DEFAULT_FETCH_ERROR.to_string(),
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[path = "tests/source_tests.rs"]
mod tests;
