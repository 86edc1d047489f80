//! In-memory tables used when no `DATABASE_URL` is configured.
//!
//! Each table keeps records in their JSON form so the same
//! [`Condition`](fleet_core::Condition) evaluator serves every entity.
//! Identifiers come from a per-table sequence starting at 1, mirroring a
//! `BIGSERIAL` column.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::state::Store;

/// One entity table.
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Records keyed by id, soft-deleted rows included.
    pub rows: Store<Value>,
    sequence: Arc<AtomicI64>,
}

impl Table {
    /// Draw the next identifier. Identifiers are never reused.
    pub fn next_id(&self) -> i64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether a live (non-deleted) row with `id` exists.
    pub fn is_live(&self, id: i64) -> bool {
        self.rows
            .get(id)
            .is_some_and(|row| row.get("deletedAt").map_or(true, Value::is_null))
    }
}

/// Set of tables and join tables, created on first use.
#[derive(Debug, Clone, Default)]
pub struct MemoryDb {
    tables: Arc<RwLock<HashMap<&'static str, Table>>>,
    links: Arc<RwLock<HashMap<&'static str, Store<BTreeSet<i64>>>>>,
}

impl MemoryDb {
    /// Create an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to a table.
    pub fn table(&self, name: &'static str) -> Table {
        if let Some(table) = self.tables.read().get(name) {
            return table.clone();
        }
        self.tables.write().entry(name).or_default().clone()
    }

    /// Handle to a join table: owner id to the set of target ids.
    pub fn links(&self, name: &'static str) -> Store<BTreeSet<i64>> {
        if let Some(links) = self.links.read().get(name) {
            return links.clone();
        }
        self.links.write().entry(name).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sequences_are_per_table() {
        let db = MemoryDb::new();
        assert_eq!(db.table("countries").next_id(), 1);
        assert_eq!(db.table("countries").next_id(), 2);
        assert_eq!(db.table("states").next_id(), 1);
    }

    #[test]
    fn handles_share_rows() {
        let db = MemoryDb::new();
        db.table("labels").rows.insert(1, json!({ "id": 1 }));
        assert!(db.table("labels").rows.contains(1));
        assert!(db.clone().table("labels").rows.contains(1));
    }

    #[test]
    fn deleted_rows_are_not_live() {
        let table = MemoryDb::new().table("nodes");
        table.rows.insert(1, json!({ "id": 1, "deletedAt": null }));
        table
            .rows
            .insert(2, json!({ "id": 2, "deletedAt": "2024-01-01T00:00:00Z" }));
        assert!(table.is_live(1));
        assert!(!table.is_live(2));
        assert!(!table.is_live(3));
    }

    #[test]
    fn link_sets_replace() {
        let db = MemoryDb::new();
        let links = db.links("node_labels");
        links.insert(1, BTreeSet::from([3, 4]));
        links.insert(1, BTreeSet::from([5]));
        assert_eq!(db.links("node_labels").get(1), Some(BTreeSet::from([5])));
    }
}
