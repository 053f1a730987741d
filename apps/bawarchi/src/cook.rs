//! Interactive cook-along loop over stdin.

use std::{io::Write, sync::Arc};

use anyhow::Result;
use recipe_core::{Narrator, TimelineEvent, TimelineSession};
use shared::domain::Recipe;
use tokio::{
    io::{stdin, AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};
use tracing::debug;

use crate::render::{print_active_step, print_timeline};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookCommand {
    Start,
    Pause,
    Reset,
    Next,
    Adjust(i64),
    Set(i64),
    Steps,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Option<CookCommand> {
    let line = line.trim();
    let mut words = line.split_whitespace();
    let command = match words.next()? {
        "s" | "start" => CookCommand::Start,
        "p" | "pause" => CookCommand::Pause,
        "r" | "reset" => CookCommand::Reset,
        "n" | "next" => CookCommand::Next,
        "l" | "steps" => CookCommand::Steps,
        "h" | "help" | "?" => CookCommand::Help,
        "q" | "quit" => CookCommand::Quit,
        "set" => CookCommand::Set(words.next()?.parse().ok()?),
        "+" => CookCommand::Adjust(1),
        "-" => CookCommand::Adjust(-1),
        other => CookCommand::Adjust(parse_delta(other)?),
    };
    if words.next().is_some() {
        return None;
    }
    Some(command)
}

/// `+3` / `-2`; the sign is required.
fn parse_delta(word: &str) -> Option<i64> {
    if !word.starts_with(['+', '-']) {
        return None;
    }
    word.parse().ok()
}

fn print_help() {
    println!("commands: s(tart)  p(ause)  r(eset)  n(ext)  +N / -N  set N  l (steps)  q(uit)");
}

pub async fn run(recipe: Recipe, narrator: Arc<dyn Narrator>) -> Result<()> {
    let session = TimelineSession::new(recipe, narrator);
    let mut events = session.subscribe();
    let mut lines = BufReader::new(stdin()).lines();

    print_help();
    show_step(&session);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Some(CookCommand::Quit) => break,
                    Some(command) => apply(&session, command),
                    None => println!("unknown command '{}', type h for help", line.trim()),
                }
            }
            event = events.recv() => match event {
                Ok(TimelineEvent::Updated(state)) if state.running => {
                    print!("\r    {} ", state.clock());
                    std::io::stdout().flush()?;
                }
                Ok(TimelineEvent::Updated(_)) => {}
                Ok(TimelineEvent::TimerCompleted { last_step, .. }) => {
                    println!();
                    if last_step {
                        println!("Timer done. That was the last step.");
                    } else {
                        println!("Timer done. Type n for the next step.");
                    }
                }
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "cook view lagged behind timer events"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    Ok(())
}

fn apply(session: &TimelineSession, command: CookCommand) {
    match command {
        CookCommand::Start => session.start(),
        CookCommand::Pause => session.pause(),
        CookCommand::Reset => session.reset(),
        CookCommand::Next => {
            if !session.advance_step() {
                println!("Already on the last step.");
                return;
            }
        }
        CookCommand::Adjust(delta) => session.adjust_duration(delta),
        CookCommand::Set(minutes) => session.set_duration_minutes(minutes),
        CookCommand::Steps => {
            print_timeline(&session.step_views());
            return;
        }
        CookCommand::Help => {
            print_help();
            return;
        }
        CookCommand::Quit => return,
    }
    show_step(session);
}

fn show_step(session: &TimelineSession) {
    let progress = session.with_controller(|controller| controller.progress_label());
    print_active_step(&session.step_views(), &session.state(), &progress);
}

#[cfg(test)]
#[path = "tests/cook_tests.rs"]
mod tests;
