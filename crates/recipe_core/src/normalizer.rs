//! Turns the recipe source's loosely typed step mapping into a [`Recipe`].
//!
//! Step order comes from duration, not from the source's key names: steps are
//! stably sorted by the lower bound of their time range (steps without a
//! usable time count as 0 and therefore come first) and re-keyed `step1..N`.
//! Time encodings are resolved here once; nothing downstream re-parses them.

use serde::Deserialize;
use serde_json::Value;
use shared::{
    domain::{Recipe, Step, TimeRange},
    error::NormalizationError,
    protocol::{RawRecipe, RawStep, RawTime},
};
use tracing::debug;

pub fn normalize(raw: &RawRecipe) -> Result<Recipe, NormalizationError> {
    if raw.is_empty() {
        return Err(NormalizationError::Empty);
    }

    let steps = raw
        .iter()
        .map(|(key, value)| {
            RawStep::deserialize(value)
                .map(|step| (key.clone(), step))
                .map_err(|err| NormalizationError::InvalidStep {
                    key: key.clone(),
                    reason: err.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    normalize_steps(steps)
}

/// Like [`normalize`] for a body that has not been checked to be a mapping.
pub fn normalize_value(value: &Value) -> Result<Recipe, NormalizationError> {
    match value {
        Value::Object(map) => normalize(map),
        _ => Err(NormalizationError::NotAMapping),
    }
}

/// Orders already-decoded steps. Keys are only used to name a bad step.
pub fn normalize_steps(
    raw_steps: impl IntoIterator<Item = (String, RawStep)>,
) -> Result<Recipe, NormalizationError> {
    let mut steps = Vec::new();
    for (key, raw) in raw_steps {
        if raw.procedure.trim().is_empty() {
            return Err(NormalizationError::InvalidStep {
                key,
                reason: "procedure is empty".to_string(),
            });
        }
        steps.push(Step {
            time: parse_time_range(&raw.time),
            procedure: raw.procedure,
            measurements: raw.measurements,
        });
    }

    // `sort_by_key` is stable: equal keys keep the source order.
    steps.sort_by_key(|step| step.time.sort_key());

    let recipe = Recipe::from_steps(steps)?;
    debug!(steps = recipe.len(), "normalized recipe");
    Ok(recipe)
}

/// Resolves any time encoding to a range. Never fails: anything unreadable
/// becomes a step without a timer.
pub fn parse_time_range(raw: &RawTime) -> TimeRange {
    raw.to_time_range()
}

#[cfg(test)]
#[path = "tests/normalizer_tests.rs"]
mod tests;
