use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const COMPLETED_STATUS: &str = "completed";
pub const MIN_COLUMNS: usize = 2;

pub const DAY_ABBREVIATIONS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: String,
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub completed_at: Option<NaiveDateTime>,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        is_terminal_status(&self.status)
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "task.id")?;
        validate_non_empty(&self.title, "task.title")?;
        if self.is_completed() != self.completed_at.is_some() {
            return Err("task.completed_at must be set exactly when the task is completed".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ColumnColor {
    Yellow,
    Blue,
    Green,
    Red,
    Purple,
    Pink,
    Indigo,
    Orange,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ColumnIcon {
    CircleDashed,
    Circle,
    CircleCheckBig,
    CircleDotDashed,
    CircleDot,
    CircleSlash,
    Triangle,
    Diamond,
    Pentagon,
    Hexagon,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Column {
    pub id: String,
    pub title: String,
    pub color: ColumnColor,
    pub icon: ColumnIcon,
}

impl Column {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "column.id")?;
        validate_non_empty(&self.title, "column.title")
    }
}

pub fn default_columns() -> Vec<Column> {
    vec![
        Column {
            id: "pending".to_string(),
            title: "Pending".to_string(),
            color: ColumnColor::Yellow,
            icon: ColumnIcon::CircleDashed,
        },
        Column {
            id: "in-progress".to_string(),
            title: "In Progress".to_string(),
            color: ColumnColor::Blue,
            icon: ColumnIcon::Circle,
        },
        Column {
            id: COMPLETED_STATUS.to_string(),
            title: "Completed".to_string(),
            color: ColumnColor::Green,
            icon: ColumnIcon::CircleCheckBig,
        },
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkTiming {
    pub start_time: String,
    pub end_time: String,
    pub work_days: Vec<u8>,
}

impl Default for WorkTiming {
    fn default() -> Self {
        Self {
            start_time: "09:00".to_string(),
            end_time: "18:00".to_string(),
            work_days: vec![1, 2, 3, 4, 5],
        }
    }
}

impl WorkTiming {
    pub fn validate(&self) -> Result<(), String> {
        validate_hhmm(&self.start_time, "work_timing.start_time")?;
        validate_hhmm(&self.end_time, "work_timing.end_time")?;
        if self.end_time < self.start_time {
            return Err("work_timing.end_time must not be before work_timing.start_time".to_string());
        }
        if self.work_days.is_empty() {
            return Err("work_timing.work_days must not be empty".to_string());
        }
        if let Some(day) = self.work_days.iter().find(|day| **day > 6) {
            return Err(format!("work_timing.work_days[] must be 0..=6, got {day}"));
        }
        Ok(())
    }

    pub fn includes_day(&self, day: u32) -> bool {
        self.work_days.iter().any(|candidate| u32::from(*candidate) == day)
    }

    pub fn normalized(&self) -> Self {
        let mut work_days = self.work_days.clone();
        work_days.sort_unstable();
        work_days.dedup();
        Self {
            start_time: self.start_time.trim().to_string(),
            end_time: self.end_time.trim().to_string(),
            work_days,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub name: String,
    pub work_timing: WorkTiming,
}

impl Settings {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.name, "settings.name")?;
        self.work_timing
            .validate()
            .map_err(|message| format!("settings.{message}"))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum DayRange {
    Single(u8),
    Range(u8, u8),
}

impl DayRange {
    pub fn days(self) -> impl Iterator<Item = u8> {
        let (start, end) = match self {
            Self::Single(day) => (day, day),
            Self::Range(start, end) => (start, end),
        };
        start..=end
    }
}

pub fn is_terminal_status(status: &str) -> bool {
    status == COMPLETED_STATUS
}

pub fn validate_columns(columns: &[Column]) -> Result<(), String> {
    if columns.len() < MIN_COLUMNS {
        return Err(format!("columns must contain at least {MIN_COLUMNS} entries"));
    }
    for column in columns {
        column.validate()?;
    }
    Ok(())
}

pub(crate) fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

pub(crate) fn validate_hhmm(value: &str, field_name: &str) -> Result<(), String> {
    let invalid = || format!("{field_name} must be HH:MM");
    let bytes = value.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return Err(invalid());
    }
    let digits = [bytes[0], bytes[1], bytes[3], bytes[4]];
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(invalid());
    }
    let hour = (bytes[0] - b'0') * 10 + (bytes[1] - b'0');
    let minute = (bytes[3] - b'0') * 10 + (bytes[4] - b'0');
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fixed_time(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .expect("valid datetime")
    }

    fn sample_task() -> Task {
        Task {
            id: "tsk-1".to_string(),
            title: "Write tests".to_string(),
            description: Some("for the board".to_string()),
            status: "pending".to_string(),
            created_at: fixed_time(8, 0),
            completed_at: None,
        }
    }

    #[test]
    fn hhmm_validation_matches_zero_padded_pattern() {
        for valid in ["00:00", "09:30", "19:59", "23:59"] {
            assert!(validate_hhmm(valid, "t").is_ok(), "{valid} should be accepted");
        }
        for invalid in ["9:00", "24:00", "12:60", "12-00", "1200", "12:5", " 12:00", "ab:cd"] {
            assert!(validate_hhmm(invalid, "t").is_err(), "{invalid} should be rejected");
        }
    }

    #[test]
    fn work_timing_validate_rejects_empty_days_and_reversed_window() {
        assert!(WorkTiming::default().validate().is_ok());

        let mut timing = WorkTiming::default();
        timing.work_days.clear();
        assert!(timing.validate().is_err());

        let mut timing = WorkTiming::default();
        timing.start_time = "18:30".to_string();
        assert!(timing.validate().is_err());

        let mut timing = WorkTiming::default();
        timing.work_days.push(7);
        assert!(timing.validate().is_err());
    }

    #[test]
    fn settings_validate_requires_name() {
        let settings = Settings {
            name: "  ".to_string(),
            work_timing: WorkTiming::default(),
        };
        let error = settings.validate().expect_err("empty name rejected");
        assert!(error.contains("settings.name"));
    }

    #[test]
    fn task_validate_enforces_completion_invariant() {
        let mut task = sample_task();
        assert!(task.validate().is_ok());

        task.status = COMPLETED_STATUS.to_string();
        assert!(task.validate().is_err());

        task.completed_at = Some(fixed_time(17, 0));
        assert!(task.validate().is_ok());
    }

    #[test]
    fn day_range_serializes_like_nested_arrays() {
        let ranges = vec![DayRange::Range(0, 3), DayRange::Single(5)];
        let encoded = serde_json::to_string(&ranges).expect("serialize ranges");
        assert_eq!(encoded, "[[0,3],5]");
    }

    #[test]
    fn task_json_uses_camel_case_keys() {
        let value = serde_json::to_value(sample_task()).expect("serialize task");
        assert!(value.get("createdAt").is_some());
        assert!(value.get("completedAt").is_some());
        let decoded: Task = serde_json::from_value(value).expect("deserialize task");
        assert_eq!(decoded, sample_task());
    }

    #[test]
    fn default_columns_hold_the_floor_and_terminal_column() {
        let columns = default_columns();
        assert!(validate_columns(&columns).is_ok());
        assert!(columns.iter().any(|column| is_terminal_status(&column.id)));
        assert!(validate_columns(&columns[..1]).is_err());
    }
}
