use anyhow::Result;
use chrono::NaiveDate;

use crate::generator;
use crate::graph::GraphDb;
use crate::loader;
use crate::settings::PipelineSettings;
use crate::storage::SnapshotStore;

/// Collect phase: generate and persist one snapshot per roster user.
pub fn collect_phase(settings: &PipelineSettings, execution_date: NaiveDate) -> Result<()> {
    let store = SnapshotStore::new(settings.data_dir.clone())?;
    let mut rng = rand::thread_rng();
    generator::collect_usage(settings, &store, execution_date, &mut rng)
}

/// Load phase: rebuild the graph from the latest snapshots.
pub fn load_phase(settings: &PipelineSettings) -> Result<()> {
    let store = SnapshotStore::new(settings.data_dir.clone())?;
    let mut graph = GraphDb::new(settings.graph_db_path.clone())?;
    loader::load_latest(&mut graph, &store, settings)
}

/// One full cycle: collect runs to completion for all users before the load
/// phase starts.
pub fn run_cycle(settings: &PipelineSettings, execution_date: NaiveDate) -> Result<()> {
    collect_phase(settings, execution_date)?;
    load_phase(settings)
}
