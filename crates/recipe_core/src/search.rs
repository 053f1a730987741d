//! Prompt -> recipe, and recipe -> saved slot.

use chrono::{DateTime, Utc};
use shared::{
    domain::{Recipe, SavedRecipeRecord},
    error::{FetchError, NormalizationError, PersistenceError},
};
use storage::RecipeSlot;
use thiserror::Error;
use tracing::{info, warn};

use crate::{normalizer::normalize, source::RecipeSource};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("please describe the recipe you want")]
    EmptyPrompt,
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Normalize(#[from] NormalizationError),
}

pub async fn search_recipe(
    source: &dyn RecipeSource,
    prompt: &str,
) -> Result<Recipe, SearchError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(SearchError::EmptyPrompt);
    }

    let raw = source.fetch(prompt).await?;
    let recipe = normalize(&raw).inspect_err(|err| {
        warn!(error = %err, "recipe service returned an unusable recipe");
    })?;
    info!(steps = recipe.len(), "recipe ready");
    Ok(recipe)
}

/// Replaces the saved slot with `recipe` under `name`.
pub async fn save_recipe(
    slot: &dyn RecipeSlot,
    recipe: &Recipe,
    name: &str,
    now: DateTime<Utc>,
) -> Result<SavedRecipeRecord, PersistenceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PersistenceError::MissingName);
    }

    let record = SavedRecipeRecord {
        recipe: recipe.clone(),
        saved_at: now,
        name: name.to_string(),
    };
    slot.save(&record).await?;
    Ok(record)
}

#[cfg(test)]
#[path = "tests/search_tests.rs"]
mod tests;
