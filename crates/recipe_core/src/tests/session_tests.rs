use super::*;
use crate::narration::{RecordingNarrator, RECIPE_COMPLETE_PHRASE, STEP_COMPLETE_PHRASE};
use shared::domain::{Step, TimeRange};
use tokio::{sync::broadcast::error::TryRecvError, time::sleep};

fn recipe(times: &[TimeRange]) -> Recipe {
    let steps = times
        .iter()
        .enumerate()
        .map(|(index, time)| Step {
            procedure: format!("step number {index}"),
            measurements: Vec::new(),
            time: *time,
        })
        .collect();
    Recipe::from_steps(steps).expect("recipe")
}

fn session(times: &[TimeRange]) -> (TimelineSession, Arc<RecordingNarrator>) {
    let narrator = Arc::new(RecordingNarrator::new());
    let session = TimelineSession::new(recipe(times), narrator.clone());
    (session, narrator)
}

fn drain(rx: &mut broadcast::Receiver<TimelineEvent>) -> Vec<TimelineEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Empty | TryRecvError::Closed) => return events,
            Err(TryRecvError::Lagged(_)) => continue,
        }
    }
}

#[tokio::test(start_paused = true)]
async fn counts_down_once_per_period() {
    let (session, _) = session(&[TimeRange::exact(3)]);
    session.start();
    assert!(session.is_ticking());

    sleep(Duration::from_millis(3_500)).await;
    assert_eq!(session.state().remaining_seconds, 177);
    assert!(session.state().running);
}

#[tokio::test(start_paused = true)]
async fn pause_stops_the_tick_task() {
    let (session, _) = session(&[TimeRange::exact(3)]);
    session.start();
    sleep(Duration::from_millis(2_500)).await;
    session.pause();
    assert!(!session.is_ticking());

    sleep(Duration::from_secs(10)).await;
    assert_eq!(session.state().remaining_seconds, 178);
}

#[tokio::test(start_paused = true)]
async fn restarting_does_not_leave_a_second_ticker_behind() {
    let (session, _) = session(&[TimeRange::exact(3)]);
    session.start();
    sleep(Duration::from_millis(500)).await;
    session.pause();
    session.start();

    sleep(Duration::from_millis(1_200)).await;
    assert_eq!(session.state().remaining_seconds, 179);
}

#[tokio::test(start_paused = true)]
async fn completion_is_announced_once_and_the_task_exits() {
    let (session, narrator) = session(&[TimeRange::exact(1), TimeRange::exact(2)]);
    let mut rx = session.subscribe();
    session.start();

    sleep(Duration::from_secs(65)).await;
    let state = session.state();
    assert!(state.completed);
    assert!(!state.running);
    assert!(!session.is_ticking());

    let completions: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter(|event| matches!(event, TimelineEvent::TimerCompleted { .. }))
        .collect();
    assert_eq!(
        completions,
        vec![TimelineEvent::TimerCompleted {
            step_index: 0,
            last_step: false,
        }]
    );
    assert_eq!(narrator.last().as_deref(), Some(STEP_COMPLETE_PHRASE));
}

#[tokio::test(start_paused = true)]
async fn finishing_the_last_step_reports_it() {
    let (session, narrator) = session(&[TimeRange::unspecified(), TimeRange::exact(1)]);
    let mut rx = session.subscribe();
    assert!(session.advance_step());
    session.start();

    sleep(Duration::from_secs(61)).await;
    assert!(drain(&mut rx).contains(&TimelineEvent::TimerCompleted {
        step_index: 1,
        last_step: true,
    }));
    assert_eq!(narrator.last().as_deref(), Some(RECIPE_COMPLETE_PHRASE));
}

#[tokio::test(start_paused = true)]
async fn zero_minute_timer_completes_without_ticking() {
    let (session, narrator) = session(&[TimeRange::new(Some(0), Some(5)), TimeRange::exact(2)]);
    let mut rx = session.subscribe();
    session.start();

    assert!(!session.is_ticking());
    let state = session.state();
    assert!(state.completed);
    assert!(!state.running);
    assert!(drain(&mut rx).contains(&TimelineEvent::TimerCompleted {
        step_index: 0,
        last_step: false,
    }));
    assert_eq!(narrator.last().as_deref(), Some(STEP_COMPLETE_PHRASE));

    sleep(Duration::from_secs(3)).await;
    assert_eq!(session.state().remaining_seconds, 0);
}

#[tokio::test(start_paused = true)]
async fn advancing_while_running_stops_the_countdown() {
    let (session, _) = session(&[TimeRange::exact(3), TimeRange::exact(2)]);
    session.start();
    sleep(Duration::from_millis(1_500)).await;

    session.advance_step();
    assert!(!session.is_ticking());
    sleep(Duration::from_secs(5)).await;

    let state = session.state();
    assert_eq!(state.current_step_index, 1);
    assert_eq!(state.remaining_seconds, 120);
    assert!(!state.running);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_session_halts_ticking() {
    let (session, narrator) = session(&[TimeRange::exact(1)]);
    let mut rx = session.subscribe();
    session.start();
    sleep(Duration::from_secs(30)).await;

    drop(session);
    sleep(Duration::from_secs(60)).await;

    assert_eq!(narrator.spoken(), vec!["step number 0".to_string()]);
    let completions = drain(&mut rx)
        .into_iter()
        .filter(|event| matches!(event, TimelineEvent::TimerCompleted { .. }))
        .count();
    assert_eq!(completions, 0);
}

#[tokio::test(start_paused = true)]
async fn operations_publish_the_new_state() {
    let (session, _) = session(&[TimeRange::new(Some(2), Some(6))]);
    let mut rx = session.subscribe();

    session.adjust_duration(3);
    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    match &events[0] {
        TimelineEvent::Updated(state) => assert_eq!(state.remaining_seconds, 300),
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn loading_a_recipe_mid_countdown_stops_it() {
    let (session, _) = session(&[TimeRange::exact(3)]);
    session.start();
    sleep(Duration::from_millis(1_500)).await;

    session.load_recipe(recipe(&[TimeRange::exact(4)]));
    sleep(Duration::from_secs(5)).await;

    let state = session.state();
    assert_eq!(state.remaining_seconds, 240);
    assert!(!state.running);
    assert_eq!(session.step_views().len(), 1);
}
