use crate::application::bootstrap::{bootstrap_workspace, BootstrapResult};
use crate::application::end_of_day::{
    evaluate_end_of_day, EndOfDayChoice, EndOfDayOutcome, EndOfDayPrompt, NotifierPhase,
};
use crate::domain::board::Board;
use crate::domain::models::{
    default_columns, validate_columns, Column, ColumnColor, ColumnIcon, Settings, Task,
    TaskPatch, WorkTiming,
};
use crate::domain::schedule::{date_key, is_within_work_hours, work_hours_label};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::error::AppError;
use crate::infrastructure::state_store::{
    StateStore, COLUMNS_KEY, LAST_NOTIFICATION_DATE_KEY, TASKS_KEY, USER_NAME_KEY,
    WORK_TIMING_KEY,
};
use crate::infrastructure::storage::{InMemoryKeyValueStore, SqliteKeyValueStore};
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info, warn};

pub type NowProvider = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

pub struct AppState {
    store: StateStore,
    config: AppConfig,
    runtime: Mutex<RuntimeState>,
    now_provider: NowProvider,
}

#[derive(Debug)]
struct RuntimeState {
    user_name: String,
    board: Board,
    work_timing: WorkTiming,
    last_notification_date: String,
    phase: NotifierPhase,
}

impl RuntimeState {
    fn load(store: &StateStore) -> Self {
        let user_name = store.load(USER_NAME_KEY, String::new()).value;
        let tasks = store.load(TASKS_KEY, Vec::<Task>::new()).value;
        for task in &tasks {
            if let Err(message) = task.validate() {
                warn!(task_id = %task.id, error = %message, "stored task is inconsistent");
            }
        }

        let mut columns = store.load(COLUMNS_KEY, default_columns()).value;
        if let Err(message) = validate_columns(&columns) {
            warn!(error = %message, "stored columns are invalid, using defaults");
            columns = default_columns();
        }

        let mut work_timing = store.load(WORK_TIMING_KEY, WorkTiming::default()).value;
        if let Err(message) = work_timing.validate() {
            warn!(error = %message, "stored work timing is invalid, using defaults");
            work_timing = WorkTiming::default();
        }

        let last_notification_date = store.load(LAST_NOTIFICATION_DATE_KEY, String::new()).value;

        Self {
            user_name,
            board: Board::new(tasks, columns),
            work_timing,
            last_notification_date,
            phase: NotifierPhase::Idle,
        }
    }
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, AppError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        Ok(Self::from_bootstrap(&bootstrap))
    }

    pub fn from_bootstrap(bootstrap: &BootstrapResult) -> Self {
        let backend = Arc::new(SqliteKeyValueStore::new(&bootstrap.database_path));
        Self::from_store(StateStore::new(backend), bootstrap.config.clone())
    }

    pub fn in_memory(config: AppConfig) -> Self {
        Self::from_store(
            StateStore::new(Arc::new(InMemoryKeyValueStore::default())),
            config,
        )
    }

    pub fn from_store(store: StateStore, config: AppConfig) -> Self {
        let runtime = RuntimeState::load(&store);
        Self {
            store,
            config,
            runtime: Mutex::new(runtime),
            now_provider: Arc::new(|| Local::now().naive_local()),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn now(&self) -> NaiveDateTime {
        (self.now_provider)()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn command_error(&self, command: &str, error: &AppError) -> String {
        error!(command, error = %error, "command failed");
        error.to_string()
    }
}

fn lock_runtime(state: &AppState) -> Result<MutexGuard<'_, RuntimeState>, AppError> {
    state
        .runtime
        .lock()
        .map_err(|error| AppError::LockPoisoned(format!("runtime state: {error}")))
}

fn persist_tasks(state: &AppState, runtime: &RuntimeState) {
    state.store.save(TASKS_KEY, &runtime.board.tasks);
}

fn persist_columns(state: &AppState, runtime: &RuntimeState) {
    state.store.save(COLUMNS_KEY, &runtime.board.columns);
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ColumnOverview {
    #[serde(flatten)]
    pub column: Column,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BoardOverview {
    pub user_name: String,
    pub needs_onboarding: bool,
    pub is_working_hours: bool,
    pub work_hours_label: String,
    pub unfinished_count: usize,
    pub columns: Vec<ColumnOverview>,
}

pub fn board_overview_impl(state: &AppState) -> Result<BoardOverview, AppError> {
    let now = state.now();
    let runtime = lock_runtime(state)?;
    let columns = runtime
        .board
        .columns
        .iter()
        .map(|column| ColumnOverview {
            column: column.clone(),
            tasks: runtime.board.tasks_for_column(&column.id),
        })
        .collect();

    Ok(BoardOverview {
        user_name: runtime.user_name.clone(),
        needs_onboarding: runtime.user_name.trim().is_empty(),
        is_working_hours: is_within_work_hours(&runtime.work_timing, now),
        work_hours_label: work_hours_label(&runtime.work_timing),
        unfinished_count: runtime.board.unfinished_count(),
        columns,
    })
}

pub fn list_tasks_impl(state: &AppState) -> Result<Vec<Task>, AppError> {
    let runtime = lock_runtime(state)?;
    Ok(runtime.board.tasks.clone())
}

pub fn add_task_impl(
    state: &AppState,
    title: String,
    description: Option<String>,
    status: String,
) -> Result<Task, AppError> {
    let now = state.now();
    let mut runtime = lock_runtime(state)?;
    let task = runtime
        .board
        .add_task(&title, description.as_deref(), status.trim(), now)
        .map_err(AppError::Validation)?;
    persist_tasks(state, &runtime);

    info!(command = "add_task", task_id = %task.id, status = %task.status, "created task");
    Ok(task)
}

pub fn move_task_impl(
    state: &AppState,
    task_id: String,
    status: String,
) -> Result<Option<Task>, AppError> {
    let now = state.now();
    let mut runtime = lock_runtime(state)?;
    let Some(task) = runtime.board.move_task(task_id.trim(), status.trim(), now) else {
        return Ok(None);
    };
    persist_tasks(state, &runtime);

    info!(command = "move_task", task_id = %task.id, status = %task.status, "moved task");
    Ok(Some(task))
}

pub fn edit_task_impl(
    state: &AppState,
    task_id: String,
    patch: TaskPatch,
) -> Result<Option<Task>, AppError> {
    let mut runtime = lock_runtime(state)?;
    let edited = runtime
        .board
        .edit_task(task_id.trim(), &patch)
        .map_err(AppError::Validation)?;
    if edited.is_some() {
        persist_tasks(state, &runtime);
        info!(command = "edit_task", task_id = %task_id, "edited task");
    }
    Ok(edited)
}

pub fn delete_task_impl(state: &AppState, task_id: String) -> Result<bool, AppError> {
    let mut runtime = lock_runtime(state)?;
    if !runtime.board.delete_task(task_id.trim()) {
        return Ok(false);
    }
    persist_tasks(state, &runtime);

    info!(command = "delete_task", task_id = %task_id, "deleted task");
    Ok(true)
}

pub fn add_column_impl(
    state: &AppState,
    title: String,
    color: Option<ColumnColor>,
    icon: Option<ColumnIcon>,
) -> Result<Column, AppError> {
    let mut runtime = lock_runtime(state)?;
    let column = runtime
        .board
        .add_column(&title, color, icon)
        .map_err(AppError::Validation)?;
    persist_columns(state, &runtime);

    info!(command = "add_column", column_id = %column.id, "created column");
    Ok(column)
}

pub fn update_column_title_impl(
    state: &AppState,
    column_id: String,
    title: String,
) -> Result<bool, AppError> {
    let mut runtime = lock_runtime(state)?;
    let updated = runtime
        .board
        .update_column_title(column_id.trim(), &title)
        .map_err(AppError::Validation)?;
    if updated {
        persist_columns(state, &runtime);
    }
    Ok(updated)
}

pub fn update_column_color_impl(
    state: &AppState,
    column_id: String,
    color: ColumnColor,
) -> Result<bool, AppError> {
    let mut runtime = lock_runtime(state)?;
    let updated = runtime.board.update_column_color(column_id.trim(), color);
    if updated {
        persist_columns(state, &runtime);
    }
    Ok(updated)
}

pub fn update_column_icon_impl(
    state: &AppState,
    column_id: String,
    icon: ColumnIcon,
) -> Result<bool, AppError> {
    let mut runtime = lock_runtime(state)?;
    let updated = runtime.board.update_column_icon(column_id.trim(), icon);
    if updated {
        persist_columns(state, &runtime);
    }
    Ok(updated)
}

pub fn delete_column_impl(state: &AppState, column_id: String) -> Result<bool, AppError> {
    let now = state.now();
    let mut runtime = lock_runtime(state)?;
    if !runtime.board.delete_column(column_id.trim(), now) {
        return Ok(false);
    }
    persist_columns(state, &runtime);
    persist_tasks(state, &runtime);

    info!(command = "delete_column", column_id = %column_id, "deleted column");
    Ok(true)
}

pub fn reorder_column_impl(state: &AppState, from: usize, to: usize) -> Result<bool, AppError> {
    let mut runtime = lock_runtime(state)?;
    let moved = runtime.board.reorder_column(from, to);
    if moved {
        persist_columns(state, &runtime);
    }
    Ok(moved)
}

pub fn get_settings_impl(state: &AppState) -> Result<Settings, AppError> {
    let runtime = lock_runtime(state)?;
    Ok(Settings {
        name: runtime.user_name.clone(),
        work_timing: runtime.work_timing.clone(),
    })
}

pub fn update_settings_impl(state: &AppState, settings: Settings) -> Result<Settings, AppError> {
    let settings = Settings {
        name: settings.name.trim().to_string(),
        work_timing: settings.work_timing.normalized(),
    };
    settings.validate().map_err(AppError::Validation)?;

    let mut runtime = lock_runtime(state)?;
    runtime.user_name = settings.name.clone();
    runtime.work_timing = settings.work_timing.clone();
    state.store.save(USER_NAME_KEY, &runtime.user_name);
    state.store.save(WORK_TIMING_KEY, &runtime.work_timing);

    info!(
        command = "update_settings",
        start = %settings.work_timing.start_time,
        end = %settings.work_timing.end_time,
        "updated settings"
    );
    Ok(settings)
}

pub fn poll_end_of_day_impl(state: &AppState) -> Result<Option<EndOfDayPrompt>, AppError> {
    let now = state.now();
    let mut runtime = lock_runtime(state)?;
    if runtime.phase == NotifierPhase::Prompting {
        return Ok(None);
    }

    let prompt = evaluate_end_of_day(
        &runtime.work_timing,
        &runtime.board.tasks,
        &runtime.last_notification_date,
        now,
    );
    if let Some(prompt) = &prompt {
        runtime.phase = NotifierPhase::Prompting;
        info!(
            date = %prompt.date,
            pending = prompt.pending_count,
            "end of work day reached, prompting"
        );
    }
    Ok(prompt)
}

/// Closes the prompt. The guard is written and persisted before the lock is
/// released so no later poll can observe the old date.
pub fn respond_end_of_day_impl(
    state: &AppState,
    choice: EndOfDayChoice,
) -> Result<EndOfDayOutcome, AppError> {
    let now = state.now();
    let mut runtime = lock_runtime(state)?;
    if runtime.phase != NotifierPhase::Prompting {
        return Err(AppError::Validation(
            "no end-of-day prompt is pending".to_string(),
        ));
    }

    runtime.last_notification_date = date_key(now);
    runtime.phase = NotifierPhase::Idle;
    state
        .store
        .save(LAST_NOTIFICATION_DATE_KEY, &runtime.last_notification_date);

    let completed = match choice {
        EndOfDayChoice::MarkAllDone => {
            let completed = runtime.board.complete_unfinished(now);
            persist_tasks(state, &runtime);
            completed
        }
        EndOfDayChoice::KeepTasks => 0,
    };

    info!(?choice, completed, "end-of-day prompt answered");
    Ok(EndOfDayOutcome {
        choice,
        guard_date: runtime.last_notification_date.clone(),
        completed,
        cleanup_scheduled: choice == EndOfDayChoice::MarkAllDone,
    })
}

// Leaves the guard alone, so the next poll prompts again.
pub fn dismiss_end_of_day_impl(state: &AppState) -> Result<bool, AppError> {
    let mut runtime = lock_runtime(state)?;
    if runtime.phase != NotifierPhase::Prompting {
        return Ok(false);
    }
    runtime.phase = NotifierPhase::Idle;
    info!("end-of-day prompt dismissed");
    Ok(true)
}

pub fn run_stale_cleanup_impl(state: &AppState) -> Result<usize, AppError> {
    let today = date_key(state.now());
    let mut runtime = lock_runtime(state)?;
    let removed = runtime.board.purge_stale_completions(&today);
    if removed > 0 {
        persist_tasks(state, &runtime);
    }

    info!(%today, removed, "purged stale completed tasks");
    Ok(removed)
}
