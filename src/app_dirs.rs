use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "aimforge";

/// Where the trainer keeps its files on this machine.
pub struct AppDirs;

impl AppDirs {
    /// `$HOME/.local/state/aimforge`, else the platform's local data dir.
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join(APP_NAME),
            )
        } else {
            ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_local_dir().to_path_buf())
        }
    }

    pub fn db_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("history.db"))
    }

    pub fn log_dir() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("logs"))
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().join("config.json"))
    }
}
