use crate::model::{Record, Row};
use admission_core_types::RecordId;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Process-local table storage shared by every [`InMemoryRepository`](super::InMemoryRepository)
/// created from it.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    tables: RwLock<HashMap<&'static str, Table>>,
}

#[derive(Default)]
struct Table {
    rows: BTreeMap<RecordId, Row>,
    last_id: RecordId,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads records as-is, keeping their ids.
    pub fn seed<E: Record>(&self, records: &[E]) {
        let mut tables = self.inner.tables.write();
        let table = tables.entry(E::TABLE).or_default();
        for record in records {
            let id = record.record_id();
            table.last_id = table.last_id.max(id);
            table.rows.insert(id, record.to_row());
        }
    }

    pub fn store(&self, table: &'static str, id: RecordId, row: Row) {
        let mut tables = self.inner.tables.write();
        let entry = tables.entry(table).or_default();
        entry.last_id = entry.last_id.max(id);
        entry.rows.insert(id, row);
    }

    pub fn fetch(&self, table: &str, id: RecordId) -> Option<Row> {
        self.inner
            .tables
            .read()
            .get(table)
            .and_then(|t| t.rows.get(&id).cloned())
    }

    pub fn list(&self, table: &str) -> Vec<Row> {
        self.inner
            .tables
            .read()
            .get(table)
            .map(|t| t.rows.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn remove(&self, table: &str, id: RecordId) -> Option<Row> {
        self.inner
            .tables
            .write()
            .get_mut(table)
            .and_then(|t| t.rows.remove(&id))
    }

    pub fn allocate_id(&self, table: &'static str) -> RecordId {
        let mut tables = self.inner.tables.write();
        let entry = tables.entry(table).or_default();
        entry.last_id += 1;
        entry.last_id
    }
}
