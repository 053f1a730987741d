use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::{Measurement, Recipe, SavedRecipeRecord, TimeRange};

pub const UNNAMED_RECIPE: &str = "Unnamed Recipe";

/// Step mapping as returned by the recipe source; key order is the order the
/// service sent, key names carry no meaning.
pub type RawRecipe = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeRequest {
    pub user_prompt: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawStep {
    pub procedure: String,
    #[serde(default)]
    pub measurements: Vec<Measurement>,
    #[serde(default)]
    pub time: RawTime,
}

/// Every encoding of a step duration seen from the recipe source.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawTime {
    /// `[min, max]`, either entry may be null.
    RangeArray([Option<f64>; 2]),
    Scalar(f64),
    /// Text such as `"(5, 10)"` or `"15"`.
    Text(String),
    Unparseable(Value),
}

impl Default for RawTime {
    fn default() -> Self {
        RawTime::Unparseable(Value::Null)
    }
}

/// `"(5, 10)"`, anywhere in the text.
static RANGE_TEXT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+),\s*(\d+)\)").expect("Invalid time range regex"));

/// A bare whole number such as `"15"`.
static SCALAR_TEXT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\s*$").expect("Invalid scalar time regex"));

impl RawTime {
    /// Never fails: anything unreadable becomes "no timer".
    pub fn to_time_range(&self) -> TimeRange {
        match self {
            RawTime::RangeArray([min, max]) => {
                TimeRange::new(whole_minutes(*min), whole_minutes(*max))
            }
            RawTime::Scalar(value) => whole_minutes(Some(*value))
                .map(TimeRange::exact)
                .unwrap_or_default(),
            RawTime::Text(text) => parse_time_text(text),
            RawTime::Unparseable(_) => TimeRange::unspecified(),
        }
    }
}

fn parse_time_text(text: &str) -> TimeRange {
    if let Some(caps) = RANGE_TEXT_REGEX.captures(text) {
        let min = caps[1].parse::<u32>().ok();
        let max = caps[2].parse::<u32>().ok();
        if let (Some(min), Some(max)) = (min, max) {
            return TimeRange::new(Some(min), Some(max));
        }
        return TimeRange::unspecified();
    }

    SCALAR_TEXT_REGEX
        .captures(text)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .map(TimeRange::exact)
        .unwrap_or_default()
}

fn whole_minutes(value: Option<f64>) -> Option<u32> {
    let value = value?;
    if !value.is_finite() {
        return None;
    }
    // Float-to-int `as` saturates, so huge values pin to u32::MAX.
    Some(value.max(0.0).round() as u32)
}

/// Stored steps may carry any time encoding the recipe source produced, not
/// only the `[min, max]` pair this crate writes.
pub(crate) fn deserialize_time<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<TimeRange, D::Error> {
    RawTime::deserialize(deserializer).map(|raw| raw.to_time_range())
}

/// Shape stored in the single persistence slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSlot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_recipe: Option<Recipe>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_name: Option<String>,
}

impl PersistedSlot {
    pub fn from_record(record: &SavedRecipeRecord) -> Self {
        Self {
            last_recipe: Some(record.recipe.clone()),
            saved_at: Some(record.saved_at),
            recipe_name: Some(record.name.clone()),
        }
    }

    /// `None` when the slot holds no recipe. Missing metadata falls back to
    /// `loaded_at` and [`UNNAMED_RECIPE`].
    pub fn into_record(self, loaded_at: DateTime<Utc>) -> Option<SavedRecipeRecord> {
        let recipe = self.last_recipe?;
        let name = self
            .recipe_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| UNNAMED_RECIPE.to_string());
        Some(SavedRecipeRecord {
            recipe,
            saved_at: self.saved_at.unwrap_or(loaded_at),
            name,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityPost {
    pub title: String,
    pub description: String,
    pub images: Vec<String>,
    pub recipe: Recipe,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub owner_id: String,
    pub post: CommunityPost,
}
