//! In-memory [`TableStore`] with controllable rotation.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sync_core::{ChangeRecord, ChangeStream, SyncError, SyncWindow, TableStore, TrackedTable};

#[derive(Default)]
struct Inner {
    tables: HashMap<String, Vec<ChangeRecord>>,
    transient_exists_failures: usize,
    transient_fetch_failures: usize,
}

/// Rows keyed by physical table id. Clones share state, so a test can
/// keep mutating the store while a spawned sync loop reads from it.
#[derive(Clone, Default)]
pub struct MemoryTableStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryTableStore {
    pub fn new() -> MemoryTableStore {
        MemoryTableStore::default()
    }

    pub fn create_table(&self, table: &TrackedTable) {
        self.inner
            .lock()
            .unwrap()
            .tables
            .entry(table.physical_id())
            .or_default();
    }

    pub fn drop_table(&self, table: &TrackedTable) {
        self.inner.lock().unwrap().tables.remove(&table.physical_id());
    }

    /// Deletes `from` and creates its successor in one step, the way the
    /// daily rotation replaces an intraday table.
    pub fn rotate(&self, from: &TrackedTable) -> TrackedTable {
        let successor = from.successor();
        let mut inner = self.inner.lock().unwrap();
        inner.tables.remove(&from.physical_id());
        inner.tables.entry(successor.physical_id()).or_default();
        successor
    }

    pub fn append(&self, table: &TrackedTable, record: ChangeRecord) {
        self.inner
            .lock()
            .unwrap()
            .tables
            .entry(table.physical_id())
            .or_default()
            .push(record);
    }

    /// Make the next `n` existence checks fail transiently.
    pub fn fail_next_exists(&self, n: usize) {
        self.inner.lock().unwrap().transient_exists_failures = n;
    }

    /// Make the next `n` change-feed queries fail transiently.
    pub fn fail_next_fetch(&self, n: usize) {
        self.inner.lock().unwrap().transient_fetch_failures = n;
    }
}

#[async_trait]
impl TableStore for MemoryTableStore {
    async fn table_exists(&self, table: &TrackedTable) -> Result<bool, SyncError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.transient_exists_failures > 0 {
            inner.transient_exists_failures -= 1;
            return Err(SyncError::Transient("injected metadata failure".into()));
        }
        Ok(inner.tables.contains_key(&table.physical_id()))
    }

    async fn fetch_changes(
        &self,
        table: &TrackedTable,
        window: &SyncWindow,
    ) -> Result<Box<dyn ChangeStream>, SyncError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.transient_fetch_failures > 0 {
            inner.transient_fetch_failures -= 1;
            return Err(SyncError::Transient("injected query failure".into()));
        }
        let rows = inner
            .tables
            .get(&table.physical_id())
            .ok_or_else(|| SyncError::TableNotFound(table.physical_id()))?;
        let records = rows
            .iter()
            .filter(|r| {
                window.start.map_or(true, |start| r.change_timestamp >= start)
                    && r.change_timestamp < window.end
            })
            .cloned()
            .collect();
        Ok(Box::new(MemoryChangeStream { records }))
    }
}

struct MemoryChangeStream {
    records: VecDeque<ChangeRecord>,
}

#[async_trait]
impl ChangeStream for MemoryChangeStream {
    async fn next(&mut self) -> Option<Result<ChangeRecord, SyncError>> {
        self.records.pop_front().map(Ok)
    }
}
