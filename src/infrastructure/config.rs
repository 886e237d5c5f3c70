use crate::infrastructure::error::AppError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

const APP_JSON: &str = "app.json";
const SUPPORTED_SCHEMA: u64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotifierConfig {
    pub poll_interval_seconds: u64,
    pub cleanup_delay_millis: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 60,
            cleanup_delay_millis: 1_000,
        }
    }
}

impl NotifierConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds.max(1))
    }

    pub fn cleanup_delay(&self) -> Duration {
        Duration::from_millis(self.cleanup_delay_millis)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub schema: u64,
    pub app_name: String,
    pub database_file: String,
    pub log_level: String,
    #[serde(default)]
    pub notifier: NotifierConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema: SUPPORTED_SCHEMA,
            app_name: "Kanban".to_string(),
            database_file: "kanban.sqlite".to_string(),
            log_level: "info".to_string(),
            notifier: NotifierConfig::default(),
        }
    }
}

pub fn ensure_default_config(config_dir: &Path) -> Result<(), AppError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&AppConfig::default())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, AppError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| AppError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != SUPPORTED_SCHEMA {
        return Err(AppError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_app_config(config_dir: &Path) -> Result<AppConfig, AppError> {
    let path = config_dir.join(APP_JSON);
    let parsed = read_config(&path)?;
    let config: AppConfig = serde_json::from_value(parsed)?;
    if config.database_file.trim().is_empty() {
        return Err(AppError::InvalidConfig(format!(
            "databaseFile must not be empty in {}",
            path.display()
        )));
    }
    Ok(config)
}
