//! Step timeline controller: the current step, its countdown, and the
//! narration that accompanies entering a step and finishing its timer.
//!
//! Every operation is total. A call that does not apply in the current state
//! (starting a running timer, adjusting while running, advancing past the last
//! step, ...) leaves the state untouched.

use std::sync::Arc;

use shared::domain::{Measurement, Recipe, Step};
use tracing::{debug, info};

use crate::{
    narration::{Narrator, RECIPE_COMPLETE_PHRASE, STEP_COMPLETE_PHRASE},
    present::{format_clock, sentence_case, title_case},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Running,
    Completed,
}

/// Live view state. Created fresh for every loaded recipe and never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineState {
    pub current_step_index: usize,
    pub remaining_seconds: u64,
    pub running: bool,
    pub completed: bool,
}

impl TimelineState {
    fn entering(index: usize, step: &Step) -> Self {
        Self {
            current_step_index: index,
            remaining_seconds: step.time.initial_seconds(),
            running: false,
            completed: false,
        }
    }

    pub fn phase(&self) -> TimerPhase {
        if self.running {
            TimerPhase::Running
        } else if self.completed {
            TimerPhase::Completed
        } else {
            TimerPhase::Idle
        }
    }

    /// Whole minutes shown next to the countdown, rounded up.
    pub fn display_minutes(&self) -> u64 {
        self.remaining_seconds.div_ceil(60)
    }

    pub fn clock(&self) -> String {
        format_clock(self.remaining_seconds)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Done,
    Active,
    Upcoming,
}

/// One row of the rendered timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepView {
    pub key: String,
    pub title: String,
    pub procedure: String,
    pub time_badge: Option<String>,
    pub has_timer: bool,
    pub measurements: Vec<Measurement>,
    pub status: StepStatus,
}

pub struct TimelineController {
    recipe: Recipe,
    state: TimelineState,
    narrator: Arc<dyn Narrator>,
}

impl TimelineController {
    /// Loads `recipe` at its first step, which is narrated right away.
    pub fn new(recipe: Recipe, narrator: Arc<dyn Narrator>) -> Self {
        let state = TimelineState::entering(0, &recipe.steps()[0]);
        let mut controller = Self {
            recipe,
            state,
            narrator,
        };
        controller.enter_step(0);
        controller
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    pub fn state(&self) -> TimelineState {
        self.state
    }

    pub fn current_step(&self) -> &Step {
        &self.recipe.steps()[self.state.current_step_index]
    }

    pub fn is_last_step(&self) -> bool {
        self.state.current_step_index == self.recipe.last_index()
    }

    pub fn progress_label(&self) -> String {
        format!(
            "Step {} of {}",
            self.state.current_step_index + 1,
            self.recipe.len()
        )
    }

    pub fn load_recipe(&mut self, recipe: Recipe) {
        self.recipe = recipe;
        self.enter_step(0);
    }

    /// Starts the countdown. An elapsed timer restarts from the step's
    /// minimum. A timer whose duration is zero finishes on the spot; returns
    /// `true` in that case. Steps without a timer have nothing to start.
    pub fn start(&mut self) -> bool {
        if self.state.running || !self.current_step().time.has_timer() {
            return false;
        }
        if self.state.remaining_seconds == 0 {
            self.state.remaining_seconds = self.current_step().time.initial_seconds();
        }
        if self.state.remaining_seconds == 0 {
            self.finish_timer();
            return true;
        }
        self.state.completed = false;
        self.state.running = true;
        debug!(
            step_index = self.state.current_step_index,
            remaining_seconds = self.state.remaining_seconds,
            "timer started"
        );
        false
    }

    pub fn pause(&mut self) {
        if !self.state.running {
            return;
        }
        self.state.running = false;
        debug!(
            step_index = self.state.current_step_index,
            remaining_seconds = self.state.remaining_seconds,
            "timer paused"
        );
    }

    /// One elapsed second. Returns `true` when this tick finished the timer.
    pub fn tick(&mut self) -> bool {
        if !self.state.running {
            return false;
        }
        self.state.remaining_seconds = self.state.remaining_seconds.saturating_sub(1);
        if self.state.remaining_seconds > 0 {
            return false;
        }

        self.finish_timer();
        true
    }

    /// Moves the displayed minutes by `delta_minutes`, bounded by zero and the
    /// step's maximum (or the current minutes when the step has none).
    pub fn adjust_duration(&mut self, delta_minutes: i64) {
        if self.state.running {
            return;
        }
        let current = self.state.display_minutes();
        let requested = i64::try_from(current)
            .unwrap_or(i64::MAX)
            .saturating_add(delta_minutes);
        self.apply_minutes(requested, current);
    }

    /// Absolute form of [`adjust_duration`](Self::adjust_duration), as set by
    /// a slider.
    pub fn set_duration_minutes(&mut self, minutes: i64) {
        if self.state.running {
            return;
        }
        let current = self.state.display_minutes();
        self.apply_minutes(minutes, current);
    }

    pub fn reset(&mut self) {
        self.state.remaining_seconds = self.current_step().time.initial_seconds();
        self.state.running = false;
        self.state.completed = false;
    }

    /// Moves to the next step whether or not its timer finished. Returns
    /// `false` on the last step.
    pub fn advance_step(&mut self) -> bool {
        if self.is_last_step() {
            return false;
        }
        self.enter_step(self.state.current_step_index + 1);
        true
    }

    pub fn step_views(&self) -> Vec<StepView> {
        let current = self.state.current_step_index;
        self.recipe
            .keyed_steps()
            .enumerate()
            .map(|(index, (key, step))| StepView {
                title: title_case(&key),
                key,
                procedure: sentence_case(&step.procedure),
                time_badge: step.time.badge(),
                has_timer: step.time.has_timer(),
                measurements: step
                    .measurements
                    .iter()
                    .map(|m| Measurement::new(title_case(&m.ingredient), m.quantity.clone()))
                    .collect(),
                status: match index.cmp(&current) {
                    std::cmp::Ordering::Less => StepStatus::Done,
                    std::cmp::Ordering::Equal => StepStatus::Active,
                    std::cmp::Ordering::Greater => StepStatus::Upcoming,
                },
            })
            .collect()
    }

    fn apply_minutes(&mut self, requested: i64, current: u64) {
        let ceiling = self
            .current_step()
            .time
            .max
            .map(u64::from)
            .unwrap_or(current);
        let minutes = u64::try_from(requested.max(0))
            .unwrap_or(0)
            .min(ceiling);
        self.state.remaining_seconds = minutes * 60;
        self.state.completed = false;
    }

    fn finish_timer(&mut self) {
        self.state.running = false;
        self.state.completed = true;
        info!(
            step_index = self.state.current_step_index,
            last_step = self.is_last_step(),
            "step timer completed"
        );
        let phrase = if self.is_last_step() {
            RECIPE_COMPLETE_PHRASE
        } else {
            STEP_COMPLETE_PHRASE
        };
        self.narrator.speak(phrase);
    }

    fn enter_step(&mut self, index: usize) {
        let step = &self.recipe.steps()[index];
        self.state = TimelineState::entering(index, step);
        info!(
            step_index = index,
            steps = self.recipe.len(),
            remaining_seconds = self.state.remaining_seconds,
            "entered step"
        );
        self.narrator.speak(&step.procedure);
    }
}

#[cfg(test)]
#[path = "tests/timeline_tests.rs"]
mod tests;
