use crate::application::commands::{
    dismiss_end_of_day_impl, poll_end_of_day_impl, respond_end_of_day_impl,
    run_stale_cleanup_impl, AppState,
};
use crate::domain::models::{Task, WorkTiming};
use crate::domain::schedule::{date_key, next_work_day, should_show_end_of_day_notification};
use crate::infrastructure::error::AppError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NotifierPhase {
    #[default]
    Idle,
    Prompting,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EndOfDayChoice {
    MarkAllDone,
    KeepTasks,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EndOfDayPrompt {
    pub date: String,
    pub pending_count: usize,
    pub clears_at: Option<NaiveDateTime>,
}

impl EndOfDayPrompt {
    pub fn message(&self) -> String {
        let plural = if self.pending_count == 1 { "" } else { "s" };
        format!(
            "Your work day is ending! You have {} unfinished task{} remaining.",
            self.pending_count, plural
        )
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EndOfDayOutcome {
    pub choice: EndOfDayChoice,
    pub guard_date: String,
    pub completed: usize,
    pub cleanup_scheduled: bool,
}

pub fn evaluate_end_of_day(
    timing: &WorkTiming,
    tasks: &[Task],
    last_notification_date: &str,
    now: NaiveDateTime,
) -> Option<EndOfDayPrompt> {
    if !should_show_end_of_day_notification(timing, last_notification_date, now) {
        return None;
    }
    let pending_count = tasks.iter().filter(|task| !task.is_completed()).count();
    if pending_count == 0 {
        return None;
    }
    Some(EndOfDayPrompt {
        date: date_key(now),
        pending_count,
        clears_at: next_work_day(timing, now),
    })
}

pub struct EndOfDayNotifier {
    state: Arc<AppState>,
    runtime: Handle,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
    cleanup: Mutex<Option<JoinHandle<()>>>,
}

impl EndOfDayNotifier {
    pub fn start(state: Arc<AppState>, prompts: mpsc::Sender<EndOfDayPrompt>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let poll_interval = state.config().notifier.poll_interval();
        let runtime = Handle::current();
        let handle = runtime.spawn(poll_loop(
            Arc::clone(&state),
            poll_interval,
            prompts,
            shutdown_rx,
        ));
        Self {
            state,
            runtime,
            shutdown_tx,
            handle,
            cleanup: Mutex::new(None),
        }
    }

    pub fn respond(&self, choice: EndOfDayChoice) -> Result<EndOfDayOutcome, AppError> {
        let outcome = respond_end_of_day_impl(&self.state, choice)?;
        if outcome.cleanup_scheduled {
            self.schedule_cleanup()?;
        }
        Ok(outcome)
    }

    pub fn dismiss(&self) -> Result<bool, AppError> {
        dismiss_end_of_day_impl(&self.state)
    }

    fn schedule_cleanup(&self) -> Result<(), AppError> {
        let delay = self.state.config().notifier.cleanup_delay();
        let state = Arc::clone(&self.state);
        let task = self.runtime.spawn(async move {
            sleep(delay).await;
            if let Err(err) = run_stale_cleanup_impl(&state) {
                error!(error = %err, "stale task cleanup failed");
            }
        });

        let mut cleanup = self
            .cleanup
            .lock()
            .map_err(|error| AppError::LockPoisoned(format!("cleanup handle: {error}")))?;
        if let Some(previous) = cleanup.replace(task) {
            previous.abort();
        }
        debug!(delay_ms = delay.as_millis(), "scheduled stale task cleanup");
        Ok(())
    }

    pub fn trigger_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown(self) {
        self.trigger_shutdown();
        if let Ok(mut cleanup) = self.cleanup.lock() {
            if let Some(pending) = cleanup.take() {
                pending.abort();
            }
        }
        if let Err(err) = self.handle.await {
            error!(error = %err, "end-of-day notifier task panicked");
        }
        info!("end-of-day notifier stopped");
    }
}

async fn poll_loop(
    state: Arc<AppState>,
    poll_interval: Duration,
    prompts: mpsc::Sender<EndOfDayPrompt>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!(
        poll_interval_ms = poll_interval.as_millis(),
        "starting end-of-day notifier"
    );
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            _ = ticker.tick() => {
                let prompt = match poll_end_of_day_impl(&state) {
                    Ok(Some(prompt)) => prompt,
                    Ok(None) => continue,
                    Err(err) => {
                        error!(error = %err, "end-of-day poll failed");
                        continue;
                    }
                };
                if prompts.send(prompt).await.is_err() {
                    warn!("prompt receiver dropped, stopping end-of-day notifier");
                    if let Err(err) = dismiss_end_of_day_impl(&state) {
                        error!(error = %err, "failed to reset end-of-day prompt");
                    }
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::tests::{at, state_at, TestClock};
    use crate::application::commands::{add_task_impl, list_tasks_impl};
    use crate::domain::models::COMPLETED_STATUS;
    use tokio::sync::mpsc::error::TryRecvError;

    fn task(status: &str, completed_at: Option<NaiveDateTime>) -> Task {
        Task {
            id: format!("tsk-{status}"),
            title: "t".to_string(),
            description: None,
            status: status.to_string(),
            created_at: at(16, 9, 0),
            completed_at,
        }
    }

    fn seeded(clock: &TestClock) -> Arc<AppState> {
        let state = Arc::new(state_at(clock));
        for (title, status) in [("a", "pending"), ("b", "pending"), ("c", "in-progress")] {
            add_task_impl(&state, title.to_string(), None, status.to_string()).expect("add task");
        }
        state
    }

    #[test]
    fn evaluate_requires_unfinished_tasks() {
        let timing = WorkTiming::default();
        let done = vec![task(COMPLETED_STATUS, Some(at(16, 12, 0)))];
        assert_eq!(evaluate_end_of_day(&timing, &done, "", at(16, 18, 5)), None);
        assert_eq!(evaluate_end_of_day(&timing, &[], "", at(16, 18, 5)), None);

        let open = vec![task("pending", None), task(COMPLETED_STATUS, Some(at(16, 12, 0)))];
        let prompt = evaluate_end_of_day(&timing, &open, "", at(16, 18, 5)).expect("prompt");
        assert_eq!(prompt.pending_count, 1);
        assert_eq!(prompt.date, "2026-10-16");
        assert_eq!(prompt.message(), "Your work day is ending! You have 1 unfinished task remaining.");
    }

    #[test]
    fn evaluate_respects_guard_and_work_days() {
        let timing = WorkTiming::default();
        let open = vec![task("pending", None)];
        assert_eq!(evaluate_end_of_day(&timing, &open, "2026-10-16", at(16, 18, 5)), None);
        assert_eq!(evaluate_end_of_day(&timing, &open, "", at(17, 18, 5)), None);
        assert_eq!(evaluate_end_of_day(&timing, &open, "", at(16, 17, 0)), None);
    }

    #[tokio::test(start_paused = true)]
    async fn notifier_prompts_once_and_cleans_up_on_next_work_day() {
        let clock = TestClock::new(at(16, 18, 5));
        let state = seeded(&clock);
        let (tx, mut rx) = mpsc::channel(4);
        let notifier = EndOfDayNotifier::start(Arc::clone(&state), tx);

        let prompt = rx.recv().await.expect("prompt");
        assert_eq!(prompt.pending_count, 3);
        assert_eq!(prompt.clears_at, Some(at(19, 9, 0)));

        sleep(Duration::from_secs(125)).await;
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty), "no re-prompt while prompting");

        let outcome = notifier.respond(EndOfDayChoice::MarkAllDone).expect("respond");
        assert_eq!(outcome.completed, 3);
        let tasks = list_tasks_impl(&state).expect("list");
        assert!(tasks.iter().all(|task| task.completed_at == Some(at(16, 18, 5))));

        clock.set(at(19, 9, 0));
        sleep(Duration::from_millis(1_100)).await;
        assert!(list_tasks_impl(&state).expect("list").is_empty());

        sleep(Duration::from_secs(125)).await;
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
        notifier.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_pending_cleanup() {
        let clock = TestClock::new(at(16, 18, 5));
        let state = seeded(&clock);
        let (tx, mut rx) = mpsc::channel(4);
        let notifier = EndOfDayNotifier::start(Arc::clone(&state), tx);

        rx.recv().await.expect("prompt");
        notifier.respond(EndOfDayChoice::MarkAllDone).expect("respond");
        clock.set(at(19, 9, 0));
        notifier.shutdown().await;

        sleep(Duration::from_secs(5)).await;
        assert_eq!(list_tasks_impl(&state).expect("list").len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn dismissed_prompt_is_repeated_on_the_next_tick() {
        let clock = TestClock::new(at(16, 18, 5));
        let state = seeded(&clock);
        let (tx, mut rx) = mpsc::channel(4);
        let notifier = EndOfDayNotifier::start(Arc::clone(&state), tx);

        rx.recv().await.expect("first prompt");
        assert!(notifier.dismiss().expect("dismiss"));
        let again = rx.recv().await.expect("second prompt");
        assert_eq!(again.pending_count, 3);

        let outcome = notifier.respond(EndOfDayChoice::KeepTasks).expect("respond");
        assert_eq!(outcome.guard_date, "2026-10-16");
        assert!(!outcome.cleanup_scheduled);
        notifier.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_receiver_stops_the_loop() {
        let clock = TestClock::new(at(16, 18, 5));
        let state = seeded(&clock);
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let notifier = EndOfDayNotifier::start(Arc::clone(&state), tx);

        sleep(Duration::from_secs(1)).await;
        assert!(notifier.handle.is_finished());
        assert!(!notifier.dismiss().expect("already idle"));
        notifier.shutdown().await;
    }
}
