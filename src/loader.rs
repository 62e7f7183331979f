use anyhow::{Context, Result};
use serde_json::json;

use crate::graph::{GraphDb, GraphRepository};
use crate::models::UserSnapshot;
use crate::settings::PipelineSettings;
use crate::storage::SnapshotStore;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Clock value fetched from the store itself and stamped onto every
/// relationship created for a user.
const REALTIME_QUERY: &str = "SELECT strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

/// Load phase: wipe the whole graph, then recreate one node/relationship
/// cluster per user from that user's latest snapshot. The entire reload runs
/// in one transaction, so a failure on any user rolls back to the previous
/// population. A missing or undecodable latest file is such a failure; nothing
/// is caught here.
pub fn load_latest(
    graph: &mut GraphDb,
    store: &SnapshotStore,
    settings: &PipelineSettings,
) -> Result<()> {
    let tx = graph.transaction()?;
    {
        let repo = GraphRepository::new(&tx);
        repo.clear_all()?;

        for first_name in &settings.users {
            let snapshot = store.read_latest(first_name)?;
            load_user(&repo, &snapshot)?;
        }

        log_info!(
            "graph reloaded: {} nodes, {} relationships",
            repo.node_count()?,
            repo.relationship_count()?
        );
    }
    tx.commit().context("failed to commit graph reload")?;

    Ok(())
}

fn load_user(repo: &GraphRepository<'_>, snapshot: &UserSnapshot) -> Result<()> {
    // One clock fetch per user, never cached across users.
    let time_created = repo
        .run_query(REALTIME_QUERY)?
        .into_iter()
        .next()
        .context("graph store returned no clock value")?;

    // Only the first usage entry is projected into the graph; the remaining
    // records stay file-only.
    let first_usage = snapshot
        .usages
        .first()
        .with_context(|| format!("latest snapshot for {} has no usage entries", snapshot.user_id))?;

    // Nodes are created unconditionally, with no merge by identity; values
    // shared across users (same OS, same brand) become duplicate nodes.
    let user = repo.create_node(
        "User",
        json!({"name": "User", "IdMaster": snapshot.user_id}),
    )?;
    let app = repo.create_node(
        "App",
        json!({
            "name": "App",
            "IdMaster": first_usage.app_name,
            "AppCategory": first_usage.app_category,
        }),
    )?;
    let device = repo.create_node(
        "Device",
        json!({"name": "Device", "IdMaster": snapshot.device.os}),
    )?;
    let brand = repo.create_node(
        "Brand",
        json!({"name": "Brand", "IdMaster": snapshot.device.brand}),
    )?;

    repo.create_relationship(
        user,
        "USED",
        app,
        json!({
            "TimeCreated": time_created,
            "TimeEvent": snapshot.usages_date,
            "UsageMinutes": first_usage.minutes_used,
        }),
    )?;
    repo.create_relationship(app, "ON", device, json!({"TimeCreated": time_created}))?;
    repo.create_relationship(device, "OFF", brand, json!({"TimeCreated": time_created}))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn settings_in(dir: &std::path::Path, users: &[&str]) -> PipelineSettings {
        let mut settings = PipelineSettings::default();
        settings.data_dir = dir.to_path_buf();
        settings.users = users.iter().map(|u| u.to_string()).collect();
        settings
    }

    fn collect(settings: &PipelineSettings, store: &SnapshotStore, seed: u64) {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        generator::collect_usage(settings, store, date, &mut rng).unwrap();
    }

    #[test]
    fn reload_creates_four_nodes_and_three_relationships_per_user() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path(), &["vinit", "guilermo", "christian", "elly", "don"]);
        let store = SnapshotStore::new(settings.data_dir.clone()).unwrap();
        collect(&settings, &store, 1);

        let mut graph = GraphDb::open_in_memory().unwrap();
        load_latest(&mut graph, &store, &settings).unwrap();

        let repo = graph.repository();
        assert_eq!(4 * 5, repo.node_count().unwrap());
        assert_eq!(3 * 5, repo.relationship_count().unwrap());
        // Shared device values duplicate per user rather than merging.
        assert_eq!(5, repo.nodes_with_label("Device").unwrap().len());
        assert_eq!(5, repo.nodes_with_label("Brand").unwrap().len());
    }

    #[test]
    fn single_user_scenario_maps_the_first_usage_entry_only() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path(), &["vinit"]);
        let store = SnapshotStore::new(settings.data_dir.clone()).unwrap();
        collect(&settings, &store, 2);
        let snapshot = store.read_latest("vinit").unwrap();

        let mut graph = GraphDb::open_in_memory().unwrap();
        load_latest(&mut graph, &store, &settings).unwrap();

        let repo = graph.repository();
        let users = repo.nodes_with_label("User").unwrap();
        assert_eq!(1, users.len());
        assert_eq!("vinit@tribes.ai", users[0]["IdMaster"]);

        let apps = repo.nodes_with_label("App").unwrap();
        assert_eq!(1, apps.len());
        assert_eq!("slack", apps[0]["IdMaster"]);
        assert_eq!("communication", apps[0]["AppCategory"]);

        assert_eq!("ios", repo.nodes_with_label("Device").unwrap()[0]["IdMaster"]);
        assert_eq!("apple", repo.nodes_with_label("Brand").unwrap()[0]["IdMaster"]);

        let used = repo.relationships_of_type("USED").unwrap();
        assert_eq!(1, used.len());
        let (_, _, props) = &used[0];
        assert_eq!(json!(snapshot.usages[0].minutes_used), props["UsageMinutes"]);
        assert_eq!("2024-01-01", props["TimeEvent"]);
        assert!(props["TimeCreated"].as_str().unwrap().ends_with('Z'));

        for rel_type in ["ON", "OFF"] {
            let rels = repo.relationships_of_type(rel_type).unwrap();
            assert_eq!(1, rels.len());
            assert!(rels[0].2["TimeCreated"].is_string());
            assert!(rels[0].2.get("UsageMinutes").is_none());
        }
    }

    #[test]
    fn reload_is_a_full_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path(), &["vinit", "elly"]);
        let store = SnapshotStore::new(settings.data_dir.clone()).unwrap();
        collect(&settings, &store, 3);

        let mut graph = GraphDb::open_in_memory().unwrap();
        // Stray pre-existing population must be entirely absent afterwards.
        graph
            .repository()
            .create_node("Stale", json!({"IdMaster": "old"}))
            .unwrap();

        load_latest(&mut graph, &store, &settings).unwrap();
        load_latest(&mut graph, &store, &settings).unwrap();

        let repo = graph.repository();
        assert_eq!(4 * 2, repo.node_count().unwrap());
        assert_eq!(3 * 2, repo.relationship_count().unwrap());
        assert!(repo.nodes_with_label("Stale").unwrap().is_empty());
    }

    #[test]
    fn missing_latest_file_aborts_and_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path(), &["vinit", "ghost"]);
        let store = SnapshotStore::new(settings.data_dir.clone()).unwrap();
        // Only vinit has a latest file.
        let solo = settings_in(dir.path(), &["vinit"]);
        collect(&solo, &store, 4);

        let mut graph = GraphDb::open_in_memory().unwrap();
        load_latest(&mut graph, &store, &solo).unwrap();

        assert!(load_latest(&mut graph, &store, &settings).is_err());
        // The failed reload rolled back; the previous population survives.
        let repo = graph.repository();
        assert_eq!(4, repo.node_count().unwrap());
        assert_eq!(3, repo.relationship_count().unwrap());
    }
}
