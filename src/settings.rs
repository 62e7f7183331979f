use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::models::AppEntry;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Directory holding the per-user history and latest snapshot files.
    pub data_dir: PathBuf,
    /// SQLite file backing the graph store.
    pub graph_db_path: PathBuf,
    /// First names of the user roster; full ids are `first_name + user_domain`.
    pub users: Vec<String>,
    pub user_domain: String,
    /// Fixed ordered app roster; snapshot entries follow this order.
    pub apps: Vec<AppEntry>,
    /// Strict upper bound on the sum of minutes in one snapshot.
    pub daily_cap_minutes: u32,
    /// Delay before the single per-phase retry.
    pub retry_delay_secs: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            graph_db_path: PathBuf::from("data/usagegraph.sqlite3"),
            users: ["vinit", "guilermo", "christian", "elly", "don"]
                .map(String::from)
                .to_vec(),
            user_domain: "@tribes.ai".into(),
            apps: vec![
                AppEntry::new("slack", "communication"),
                AppEntry::new("gmail", "communication"),
                AppEntry::new("jira", "task_management"),
                AppEntry::new("google drive", "file_management"),
                AppEntry::new("chrome", "web_browser"),
                AppEntry::new("spotify", "entertainment_music"),
            ],
            daily_cap_minutes: 480,
            retry_delay_secs: 60,
        }
    }
}

impl PipelineSettings {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        match serde_json::from_str(&contents) {
            Ok(settings) => Ok(settings),
            Err(err) => {
                warn!(
                    "settings file {} is malformed ({err}), using defaults",
                    path.display()
                );
                Ok(Self::default())
            }
        }
    }

    pub fn user_id(&self, first_name: &str) -> String {
        format!("{first_name}{}", self.user_domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_the_fixed_rosters() {
        let settings = PipelineSettings::default();
        assert_eq!(5, settings.users.len());
        assert_eq!(6, settings.apps.len());
        assert_eq!("slack", settings.apps[0].name);
        assert_eq!("spotify", settings.apps[5].name);
        assert_eq!(480, settings.daily_cap_minutes);
        assert_eq!("vinit@tribes.ai", settings.user_id("vinit"));
    }

    #[test]
    fn missing_settings_file_falls_back_to_defaults() {
        let settings = PipelineSettings::load(Path::new("does-not-exist.json")).unwrap();
        assert_eq!(PipelineSettings::default().users, settings.users);
    }

    #[test]
    fn settings_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut custom = PipelineSettings::default();
        custom.users = vec!["vinit".into()];
        custom.retry_delay_secs = 0;
        fs::write(&path, serde_json::to_string_pretty(&custom).unwrap()).unwrap();

        let loaded = PipelineSettings::load(&path).unwrap();
        assert_eq!(vec!["vinit".to_string()], loaded.users);
        assert_eq!(0, loaded.retry_delay_secs);
    }
}
