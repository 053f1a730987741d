//! Owns one [`TimelineController`] for one open recipe view and the tick task
//! that drives its countdown.
//!
//! The tick task only exists while the controller is running. Every task is
//! stamped with a generation; leaving the running state bumps the generation
//! and aborts the task, and a task that wakes with a stale generation (or after
//! the session is gone) exits without touching the controller. A tick is never
//! applied after `pause()` or after the session is dropped.
//!
//! Methods that may start the countdown spawn onto the current Tokio runtime.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use shared::domain::Recipe;
use tokio::{
    sync::broadcast,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::debug;

use crate::{
    narration::Narrator,
    timeline::{StepView, TimelineController, TimelineState},
};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);
const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineEvent {
    Updated(TimelineState),
    TimerCompleted { step_index: usize, last_step: bool },
}

struct SessionInner {
    controller: TimelineController,
    generation: u64,
    driver: Option<JoinHandle<()>>,
}

pub struct TimelineSession {
    inner: Arc<Mutex<SessionInner>>,
    events: broadcast::Sender<TimelineEvent>,
    tick_period: Duration,
}

impl TimelineSession {
    pub fn new(recipe: Recipe, narrator: Arc<dyn Narrator>) -> Self {
        Self::with_tick_period(recipe, narrator, TICK_PERIOD)
    }

    pub fn with_tick_period(
        recipe: Recipe,
        narrator: Arc<dyn Narrator>,
        tick_period: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                controller: TimelineController::new(recipe, narrator),
                generation: 0,
                driver: None,
            })),
            events,
            tick_period,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimelineEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> TimelineState {
        lock(&self.inner).controller.state()
    }

    pub fn step_views(&self) -> Vec<StepView> {
        lock(&self.inner).controller.step_views()
    }

    /// Read access for rendering; do not call back into the session from `f`.
    pub fn with_controller<R>(&self, f: impl FnOnce(&TimelineController) -> R) -> R {
        f(&lock(&self.inner).controller)
    }

    pub fn is_ticking(&self) -> bool {
        lock(&self.inner).driver.is_some()
    }

    pub fn load_recipe(&self, recipe: Recipe) {
        self.apply(|controller| controller.load_recipe(recipe));
    }

    pub fn start(&self) {
        let finished = self.apply(|controller| {
            controller
                .start()
                .then(|| (controller.state().current_step_index, controller.is_last_step()))
        });
        if let Some((step_index, last_step)) = finished {
            let _ = self.events.send(TimelineEvent::TimerCompleted {
                step_index,
                last_step,
            });
        }
    }

    pub fn pause(&self) {
        self.apply(TimelineController::pause);
    }

    pub fn adjust_duration(&self, delta_minutes: i64) {
        self.apply(|controller| controller.adjust_duration(delta_minutes));
    }

    pub fn set_duration_minutes(&self, minutes: i64) {
        self.apply(|controller| controller.set_duration_minutes(minutes));
    }

    pub fn reset(&self) {
        self.apply(TimelineController::reset);
    }

    pub fn advance_step(&self) -> bool {
        self.apply(TimelineController::advance_step)
    }

    fn apply<R>(&self, op: impl FnOnce(&mut TimelineController) -> R) -> R {
        let mut guard = lock(&self.inner);
        let result = op(&mut guard.controller);
        self.sync_driver(&mut guard);
        let _ = self
            .events
            .send(TimelineEvent::Updated(guard.controller.state()));
        result
    }

    fn sync_driver(&self, inner: &mut SessionInner) {
        let running = inner.controller.state().running;
        match (running, inner.driver.is_some()) {
            (true, false) => self.spawn_driver(inner),
            (false, true) => stop_driver(inner),
            _ => {}
        }
    }

    fn spawn_driver(&self, inner: &mut SessionInner) {
        inner.generation += 1;
        let generation = inner.generation;
        let session = Arc::downgrade(&self.inner);
        let events = self.events.clone();
        let period = self.tick_period;

        debug!(generation, "starting tick task");
        inner.driver = Some(tokio::spawn(run_ticks(session, events, period, generation)));
    }
}

impl Drop for TimelineSession {
    fn drop(&mut self) {
        stop_driver(&mut lock(&self.inner));
    }
}

async fn run_ticks(
    session: Weak<Mutex<SessionInner>>,
    events: broadcast::Sender<TimelineEvent>,
    period: Duration,
    generation: u64,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let Some(session) = session.upgrade() else {
            return;
        };
        let mut guard = lock(&session);
        if guard.generation != generation {
            return;
        }

        let finished = guard.controller.tick();
        let state = guard.controller.state();
        let _ = events.send(TimelineEvent::Updated(state));
        if finished {
            let _ = events.send(TimelineEvent::TimerCompleted {
                step_index: state.current_step_index,
                last_step: guard.controller.is_last_step(),
            });
        }
        if !state.running {
            guard.driver = None;
            return;
        }
    }
}

fn stop_driver(inner: &mut SessionInner) {
    inner.generation += 1;
    if let Some(driver) = inner.driver.take() {
        debug!(generation = inner.generation, "stopping tick task");
        driver.abort();
    }
}

fn lock(inner: &Mutex<SessionInner>) -> MutexGuard<'_, SessionInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
