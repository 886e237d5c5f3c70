use crate::domain::models::{
    is_terminal_status, validate_non_empty, Column, ColumnColor, ColumnIcon, Task, TaskPatch,
    COMPLETED_STATUS, MIN_COLUMNS,
};
use crate::domain::schedule::date_key;
use chrono::{NaiveDateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub fn next_id(prefix: &str) -> String {
    let sequence = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{sequence}", Utc::now().timestamp_micros())
}

fn trimmed_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    pub tasks: Vec<Task>,
    pub columns: Vec<Column>,
}

impl Board {
    pub fn new(tasks: Vec<Task>, columns: Vec<Column>) -> Self {
        Self { tasks, columns }
    }

    pub fn has_column(&self, column_id: &str) -> bool {
        self.columns.iter().any(|column| column.id == column_id)
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    pub fn tasks_for_column(&self, column_id: &str) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|task| task.status == column_id)
            .cloned()
            .collect()
    }

    pub fn unfinished_count(&self) -> usize {
        self.tasks.iter().filter(|task| !task.is_completed()).count()
    }

    pub fn add_task(
        &mut self,
        title: &str,
        description: Option<&str>,
        status: &str,
        now: NaiveDateTime,
    ) -> Result<Task, String> {
        let title = title.trim();
        validate_non_empty(title, "task.title")?;
        if !self.has_column(status) {
            return Err(format!("task.status references unknown column: {status}"));
        }

        let completed_at = is_terminal_status(status).then_some(now);
        let task = Task {
            id: next_id("tsk"),
            title: title.to_string(),
            description: trimmed_description(description),
            status: status.to_string(),
            created_at: now,
            completed_at,
        };
        self.tasks.push(task.clone());
        Ok(task)
    }

    pub fn move_task(&mut self, task_id: &str, status: &str, now: NaiveDateTime) -> Option<Task> {
        if !self.has_column(status) {
            return None;
        }
        let task = self.tasks.iter_mut().find(|task| task.id == task_id)?;
        set_status(task, status, now);
        Some(task.clone())
    }

    pub fn edit_task(&mut self, task_id: &str, patch: &TaskPatch) -> Result<Option<Task>, String> {
        let title = match patch.title.as_deref().map(str::trim) {
            Some(title) => {
                validate_non_empty(title, "task.title")?;
                Some(title.to_string())
            }
            None => None,
        };

        let Some(task) = self.tasks.iter_mut().find(|task| task.id == task_id) else {
            return Ok(None);
        };
        if let Some(title) = title {
            task.title = title;
        }
        if let Some(description) = patch.description.as_deref() {
            task.description = trimmed_description(Some(description));
        }
        Ok(Some(task.clone()))
    }

    pub fn delete_task(&mut self, task_id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != task_id);
        self.tasks.len() != before
    }

    pub fn add_column(
        &mut self,
        title: &str,
        color: Option<ColumnColor>,
        icon: Option<ColumnIcon>,
    ) -> Result<Column, String> {
        let title = title.trim();
        validate_non_empty(title, "column.title")?;
        let column = Column {
            id: next_id("col"),
            title: title.to_string(),
            color: color.unwrap_or(ColumnColor::Yellow),
            icon: icon.unwrap_or(ColumnIcon::Circle),
        };
        self.columns.push(column.clone());
        Ok(column)
    }

    pub fn update_column_title(&mut self, column_id: &str, title: &str) -> Result<bool, String> {
        let title = title.trim();
        validate_non_empty(title, "column.title")?;
        Ok(self.with_column(column_id, |column| column.title = title.to_string()))
    }

    pub fn update_column_color(&mut self, column_id: &str, color: ColumnColor) -> bool {
        self.with_column(column_id, |column| column.color = color)
    }

    pub fn update_column_icon(&mut self, column_id: &str, icon: ColumnIcon) -> bool {
        self.with_column(column_id, |column| column.icon = icon)
    }

    fn with_column(&mut self, column_id: &str, apply: impl FnOnce(&mut Column)) -> bool {
        match self.columns.iter_mut().find(|column| column.id == column_id) {
            Some(column) => {
                apply(column);
                true
            }
            None => false,
        }
    }

    // Orphans go to the first non-terminal column so they stay unfinished.
    pub fn delete_column(&mut self, column_id: &str, now: NaiveDateTime) -> bool {
        if self.columns.len() <= MIN_COLUMNS || is_terminal_status(column_id) {
            return false;
        }
        let Some(index) = self.columns.iter().position(|column| column.id == column_id) else {
            return false;
        };
        let Some(fallback) = self
            .columns
            .iter()
            .find(|column| column.id != column_id && !is_terminal_status(&column.id))
            .map(|column| column.id.clone())
        else {
            return false;
        };
        self.columns.remove(index);

        for task in self.tasks.iter_mut().filter(|task| task.status == column_id) {
            set_status(task, &fallback, now);
        }
        true
    }

    pub fn reorder_column(&mut self, from: usize, to: usize) -> bool {
        if from >= self.columns.len() || to >= self.columns.len() {
            return false;
        }
        let column = self.columns.remove(from);
        self.columns.insert(to, column);
        true
    }

    pub fn complete_unfinished(&mut self, now: NaiveDateTime) -> usize {
        let mut completed = 0;
        for task in self.tasks.iter_mut().filter(|task| !task.is_completed()) {
            set_status(task, COMPLETED_STATUS, now);
            completed += 1;
        }
        completed
    }

    pub fn purge_stale_completions(&mut self, today: &str) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|task| {
            if !task.is_completed() {
                return true;
            }
            match task.completed_at {
                Some(completed_at) => date_key(completed_at).as_str() >= today,
                None => true,
            }
        });
        before - self.tasks.len()
    }
}

fn set_status(task: &mut Task, status: &str, now: NaiveDateTime) {
    task.status = status.to_string();
    task.completed_at = is_terminal_status(status).then_some(now);
}
