use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

use crate::models::UserSnapshot;

/// Per-user snapshot files under one data directory: `{user}.json` is an
/// append-only history of pretty-printed JSON objects separated by a blank
/// line (a stream of objects, not an array), `{user}_latest.json` holds the
/// single most recent snapshot and is overwritten each cycle.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create data directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn history_path(&self, user: &str) -> PathBuf {
        self.dir.join(format!("{user}.json"))
    }

    fn latest_path(&self, user: &str) -> PathBuf {
        self.dir.join(format!("{user}_latest.json"))
    }

    pub fn append_history(&self, user: &str, snapshot: &UserSnapshot) -> Result<()> {
        let path = self.history_path(user);
        let serialized = serde_json::to_string_pretty(snapshot)
            .with_context(|| format!("failed to serialize snapshot for {user}"))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open history file {}", path.display()))?;
        writeln!(file, "{serialized}")
            .and_then(|_| writeln!(file))
            .with_context(|| format!("failed to append to history file {}", path.display()))?;

        Ok(())
    }

    pub fn write_latest(&self, user: &str, snapshot: &UserSnapshot) -> Result<()> {
        let path = self.latest_path(user);
        let serialized = serde_json::to_string_pretty(snapshot)
            .with_context(|| format!("failed to serialize snapshot for {user}"))?;
        fs::write(&path, serialized)
            .with_context(|| format!("failed to write latest snapshot {}", path.display()))
    }

    /// Read and decode the latest snapshot. A missing or malformed file is an
    /// error for the caller; nothing is caught here.
    pub fn read_latest(&self, user: &str) -> Result<UserSnapshot> {
        let path = self.latest_path(user);
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read latest snapshot {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("malformed latest snapshot {}", path.display()))
    }

    /// Decode the whole history stream. A user with no history reads as empty.
    pub fn read_history(&self, user: &str) -> Result<Vec<UserSnapshot>> {
        let path = self.history_path(user);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read history file {}", path.display()))?;
        serde_json::Deserializer::from_str(&contents)
            .into_iter::<UserSnapshot>()
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("malformed history file {}", path.display()))
    }
}
