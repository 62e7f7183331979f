use anyhow::{Context, Result};
use log::{error, info};
use rusqlite::{params, Connection, Transaction};
use serde_json::Value;
use std::path::PathBuf;

mod migrations;

use migrations::run_migrations;

/// Embedded graph store: labelled nodes and typed relationships, each with a
/// JSON property blob.
pub struct GraphDb {
    conn: Connection,
}

impl GraphDb {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create graph database directory {}", parent.display())
            })?;
        }

        let mut conn = Connection::open(&db_path)
            .with_context(|| format!("failed to open graph database {}", db_path.display()))?;

        if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
            error!("Failed to enable WAL mode: {err}");
        }
        if let Err(err) = conn.pragma_update(None, "foreign_keys", "ON") {
            error!("Failed to enable foreign keys: {err}");
        }

        run_migrations(&mut conn).context("failed to run graph schema migrations")?;
        info!("Graph store initialized at {}", db_path.display());

        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let mut conn =
            Connection::open_in_memory().context("failed to open in-memory graph database")?;
        run_migrations(&mut conn).context("failed to run graph schema migrations")?;
        Ok(Self { conn })
    }

    pub fn transaction(&mut self) -> Result<Transaction<'_>> {
        self.conn
            .transaction()
            .context("failed to open graph transaction")
    }

    pub fn repository(&self) -> GraphRepository<'_> {
        GraphRepository::new(&self.conn)
    }
}

pub struct GraphRepository<'a> {
    conn: &'a Connection,
}

impl<'a> GraphRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Remove every relationship and node. Full refresh, not a merge.
    pub fn clear_all(&self) -> Result<()> {
        self.conn
            .execute("DELETE FROM relationships", [])
            .context("failed to clear relationships")?;
        self.conn
            .execute("DELETE FROM nodes", [])
            .context("failed to clear nodes")?;
        Ok(())
    }

    /// Run an arbitrary statement and return the first column of each row as
    /// text. The loader uses this to fetch a store-side clock value.
    pub fn run_query(&self, stmt: &str) -> Result<Vec<String>> {
        let mut prepared = self
            .conn
            .prepare(stmt)
            .with_context(|| format!("failed to prepare query: {stmt}"))?;
        let rows = prepared
            .query_map([], |row| row.get::<_, String>(0))
            .with_context(|| format!("failed to run query: {stmt}"))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.with_context(|| format!("failed to read query row: {stmt}"))?);
        }
        Ok(out)
    }

    pub fn create_node(&self, label: &str, properties: Value) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO nodes (label, properties) VALUES (?1, ?2)",
                params![label, properties.to_string()],
            )
            .with_context(|| format!("failed to create {label} node"))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn create_relationship(
        &self,
        from_node: i64,
        rel_type: &str,
        to_node: i64,
        properties: Value,
    ) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO relationships (from_node, to_node, rel_type, properties)
                 VALUES (?1, ?2, ?3, ?4)",
                params![from_node, to_node, rel_type, properties.to_string()],
            )
            .with_context(|| format!("failed to create {rel_type} relationship"))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn node_count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))
            .context("failed to count nodes")
    }

    pub fn relationship_count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM relationships", [], |row| row.get(0))
            .context("failed to count relationships")
    }

    pub fn nodes_with_label(&self, label: &str) -> Result<Vec<Value>> {
        let mut stmt = self
            .conn
            .prepare("SELECT properties FROM nodes WHERE label = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![label], |row| row.get::<_, String>(0))?;

        let mut out = Vec::new();
        for raw in rows {
            let raw = raw?;
            out.push(
                serde_json::from_str(&raw)
                    .with_context(|| format!("invalid properties on {label} node"))?,
            );
        }
        Ok(out)
    }

    pub fn relationships_of_type(&self, rel_type: &str) -> Result<Vec<(i64, i64, Value)>> {
        let mut stmt = self.conn.prepare(
            "SELECT from_node, to_node, properties FROM relationships
             WHERE rel_type = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![rel_type], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (from_node, to_node, raw) = row?;
            let properties = serde_json::from_str(&raw)
                .with_context(|| format!("invalid properties on {rel_type} relationship"))?;
            out.push((from_node, to_node, properties));
        }
        Ok(out)
    }
}
