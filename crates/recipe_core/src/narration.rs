//! Speech output port. Narration is fire-and-forget: `speak` must return
//! immediately and a newer utterance may cut off or overlap an older one.

use std::{
    process::{Command, Stdio},
    sync::Mutex,
};

use tracing::{info, warn};

pub const STEP_COMPLETE_PHRASE: &str = "This concludes this step, let's move to the next step.";
pub const RECIPE_COMPLETE_PHRASE: &str =
    "Congratulations! You've completed all steps in this recipe.";

pub trait Narrator: Send + Sync {
    fn speak(&self, utterance: &str);
}

pub struct SilentNarrator;

impl Narrator for SilentNarrator {
    fn speak(&self, _utterance: &str) {}
}

/// Writes utterances to the log instead of a speaker.
pub struct LogNarrator;

impl Narrator for LogNarrator {
    fn speak(&self, utterance: &str) {
        info!(utterance, "narration");
    }
}

/// Hands each utterance to an external text-to-speech program (`say`,
/// `espeak`, ...) as its last argument without blocking the caller.
pub struct CommandNarrator {
    program: String,
    args: Vec<String>,
}

impl CommandNarrator {
    /// Splits `command_line` on whitespace; `None` when it is blank.
    pub fn from_command_line(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Narrator for CommandNarrator {
    fn speak(&self, utterance: &str) {
        let spawned = Command::new(&self.program)
            .args(&self.args)
            .arg(utterance)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            // Reap in the background so finished speakers do not linger.
            Ok(mut child) => {
                std::thread::spawn(move || {
                    let _ = child.wait();
                });
            }
            Err(error) => {
                warn!(program = %self.program, %error, "narration command failed to start");
            }
        }
    }
}

/// Keeps every utterance in order. Used by tests and by front ends that render
/// narration as captions.
#[derive(Default)]
pub struct RecordingNarrator {
    spoken: Mutex<Vec<String>>,
}

impl RecordingNarrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn last(&self) -> Option<String> {
        self.spoken().last().cloned()
    }

    pub fn clear(&self) {
        self.spoken
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl Narrator for RecordingNarrator {
    fn speak(&self, utterance: &str) {
        self.spoken
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(utterance.to_string());
    }
}
