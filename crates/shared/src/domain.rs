use std::{collections::HashMap, fmt};

use chrono::{DateTime, Utc};
use serde::{
    de::{self, MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};
use url::Url;

use crate::error::NormalizationError;

const STEP_KEY_PREFIX: &str = "step";

/// Duration window of a step in whole minutes. Either bound may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(
    from = "(Option<u32>, Option<u32>)",
    into = "(Option<u32>, Option<u32>)"
)]
pub struct TimeRange {
    pub min: Option<u32>,
    pub max: Option<u32>,
}

impl TimeRange {
    pub fn new(min: Option<u32>, max: Option<u32>) -> Self {
        Self { min, max }
    }

    pub fn exact(minutes: u32) -> Self {
        Self::new(Some(minutes), Some(minutes))
    }

    pub fn unspecified() -> Self {
        Self::default()
    }

    /// Key used when ordering steps: the lower bound, or 0 when absent.
    pub fn sort_key(&self) -> u32 {
        self.min.unwrap_or(0)
    }

    pub fn has_timer(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    pub fn initial_seconds(&self) -> u64 {
        u64::from(self.min.unwrap_or(0)) * 60
    }

    /// Badge text such as `"5 min"` or `"2-4 min"`. Both bounds are required.
    pub fn badge(&self) -> Option<String> {
        match (self.min, self.max) {
            (Some(min), Some(max)) if min == max => Some(format!("{min} min")),
            (Some(min), Some(max)) => Some(format!("{min}-{max} min")),
            _ => None,
        }
    }
}

impl From<(Option<u32>, Option<u32>)> for TimeRange {
    fn from((min, max): (Option<u32>, Option<u32>)) -> Self {
        Self { min, max }
    }
}

impl From<TimeRange> for (Option<u32>, Option<u32>) {
    fn from(value: TimeRange) -> Self {
        (value.min, value.max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct Measurement {
    pub ingredient: String,
    pub quantity: String,
}

impl Measurement {
    pub fn new(ingredient: impl Into<String>, quantity: impl Into<String>) -> Self {
        Self {
            ingredient: ingredient.into(),
            quantity: quantity.into(),
        }
    }
}

impl From<(String, String)> for Measurement {
    fn from((ingredient, quantity): (String, String)) -> Self {
        Self {
            ingredient,
            quantity,
        }
    }
}

impl From<Measurement> for (String, String) {
    fn from(value: Measurement) -> Self {
        (value.ingredient, value.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub procedure: String,
    #[serde(default)]
    pub measurements: Vec<Measurement>,
    #[serde(default, deserialize_with = "crate::protocol::deserialize_time")]
    pub time: TimeRange,
}

/// Canonical, ordered recipe. Always holds at least one step; the order is
/// fixed once built.
///
/// Serializes as `{"step1": .., "step2": ..}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    steps: Vec<Step>,
}

impl Recipe {
    pub fn from_steps(steps: Vec<Step>) -> Result<Self, NormalizationError> {
        if steps.is_empty() {
            return Err(NormalizationError::Empty);
        }
        Ok(Self { steps })
    }

    pub fn step_key(index: usize) -> String {
        format!("{STEP_KEY_PREFIX}{}", index + 1)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }

    pub fn keyed_steps(&self) -> impl Iterator<Item = (String, &Step)> {
        self.steps
            .iter()
            .enumerate()
            .map(|(index, step)| (Self::step_key(index), step))
    }

    /// Every ingredient once, in order of first appearance, carrying the
    /// quantity of its last occurrence.
    pub fn ingredients(&self) -> Vec<Measurement> {
        let mut order: Vec<Measurement> = Vec::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();

        for measurement in self.steps.iter().flat_map(|step| &step.measurements) {
            match positions.get(measurement.ingredient.as_str()) {
                Some(&position) => order[position].quantity = measurement.quantity.clone(),
                None => {
                    positions.insert(measurement.ingredient.as_str(), order.len());
                    order.push(measurement.clone());
                }
            }
        }

        order
    }

    /// Sets the quantity of every measurement named `ingredient` and returns
    /// how many were touched.
    pub fn update_ingredient(&mut self, ingredient: &str, quantity: &str) -> usize {
        let mut updated = 0;
        for measurement in self
            .steps
            .iter_mut()
            .flat_map(|step| step.measurements.iter_mut())
            .filter(|measurement| measurement.ingredient == ingredient)
        {
            measurement.quantity = quantity.to_string();
            updated += 1;
        }
        updated
    }
}

fn parse_step_key(key: &str) -> Option<usize> {
    key.strip_prefix(STEP_KEY_PREFIX)?
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
}

impl Serialize for Recipe {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.steps.len()))?;
        for (key, step) in self.keyed_steps() {
            map.serialize_entry(&key, step)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Recipe {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecipeVisitor;

        impl<'de> Visitor<'de> for RecipeVisitor {
            type Value = Recipe;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of `stepN` keys to steps")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Recipe, A::Error> {
                let mut numbered: Vec<(usize, Step)> = Vec::new();
                while let Some((key, step)) = access.next_entry::<String, Step>()? {
                    let Some(number) = parse_step_key(&key) else {
                        return Err(de::Error::custom(format!("unexpected step key '{key}'")));
                    };
                    if numbered.iter().any(|(existing, _)| *existing == number) {
                        return Err(de::Error::custom(format!("duplicate step key '{key}'")));
                    }
                    numbered.push((number, step));
                }
                numbered.sort_by_key(|(number, _)| *number);

                Recipe::from_steps(numbered.into_iter().map(|(_, step)| step).collect())
                    .map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_map(RecipeVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedRecipeRecord {
    pub recipe: Recipe,
    pub saved_at: DateTime<Utc>,
    pub name: String,
}

/// Profile handed back by the OAuth callback redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl UserProfile {
    /// Reads `name`, `email` and `image` from the redirect's query string.
    /// `None` unless both name and email are present and non-empty.
    pub fn from_redirect(url: &Url) -> Option<Self> {
        let (mut name, mut email, mut image) = (None, None, None);
        for (key, value) in url.query_pairs() {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "name" => name = Some(value.to_string()),
                "email" => email = Some(value.to_string()),
                "image" => image = Some(value.to_string()),
                _ => {}
            }
        }
        Some(Self {
            name: name?,
            email: email?,
            image,
        })
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
