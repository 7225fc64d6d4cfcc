//! Durable storage for the floating window placement.
//!
//! One record under one fixed key, global across sessions (not per-item).
//! Loaded once on the first entry into minimized mode and written on every
//! drag/resize commit. No other component touches this store.
//!
//! The store is an injected collaborator so the mode state machine stays
//! testable without a real database.

use std::path::Path;

use redb::{Database, TableDefinition};
use thiserror::Error;
use tracing::warn;

use crate::drag_resize::FloatingGeometry;

/// Only plain scalars are persisted: `(x, y, width, height)`.
const GEOMETRY_TABLE: TableDefinition<&str, (i32, i32, u32, u32)> =
    TableDefinition::new("floating_geometry");

/// The single fixed key; placement is global, not per-movie.
const GEOMETRY_KEY: &str = "floating_window";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open placement database: {0}")]
    Open(#[from] redb::DatabaseError),
    #[error("placement transaction failed: {0}")]
    Transaction(#[from] redb::TransactionError),
    #[error("placement table failed: {0}")]
    Table(#[from] redb::TableError),
    #[error("placement read/write failed: {0}")]
    Storage(#[from] redb::StorageError),
    #[error("placement commit failed: {0}")]
    Commit(#[from] redb::CommitError),
}

/// Key-value contract for the floating window placement.
///
/// A broken store is never fatal to the widget: implementations log and
/// degrade to "no saved placement".
pub trait PositionStore {
    /// Last saved geometry, or `None` when nothing was ever saved.
    fn load(&mut self) -> Option<FloatingGeometry>;

    /// Persist the geometry under the fixed key.
    fn save(&mut self, geometry: FloatingGeometry);
}

/// redb-backed store used by the real application.
pub struct RedbPositionStore {
    db: Database,
}

impl RedbPositionStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let db = Database::create(path)?;
        Ok(Self { db })
    }

    fn read_geometry(&self) -> Result<Option<FloatingGeometry>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = match txn.open_table(GEOMETRY_TABLE) {
            Ok(table) => table,
            // First run: the table does not exist until the first save.
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let value = table.get(GEOMETRY_KEY)?.map(|guard| {
            let (x, y, width, height) = guard.value();
            FloatingGeometry {
                x,
                y,
                width,
                height,
            }
        });
        Ok(value)
    }

    fn write_geometry(&self, geometry: FloatingGeometry) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(GEOMETRY_TABLE)?;
            table.insert(
                GEOMETRY_KEY,
                (geometry.x, geometry.y, geometry.width, geometry.height),
            )?;
        }
        txn.commit()?;
        Ok(())
    }
}

impl PositionStore for RedbPositionStore {
    fn load(&mut self) -> Option<FloatingGeometry> {
        match self.read_geometry() {
            Ok(geometry) => geometry,
            Err(e) => {
                warn!("could not load window placement: {e}");
                None
            }
        }
    }

    fn save(&mut self, geometry: FloatingGeometry) {
        if let Err(e) = self.write_geometry(geometry) {
            warn!("could not save window placement: {e}");
        }
    }
}

/// In-memory store for tests and for hosts that opt out of persistence.
#[derive(Debug, Default)]
pub struct MemoryPositionStore {
    saved: Option<FloatingGeometry>,
    pub save_count: usize,
}

impl MemoryPositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_saved(geometry: FloatingGeometry) -> Self {
        Self {
            saved: Some(geometry),
            save_count: 0,
        }
    }
}

impl PositionStore for MemoryPositionStore {
    fn load(&mut self) -> Option<FloatingGeometry> {
        self.saved
    }

    fn save(&mut self, geometry: FloatingGeometry) {
        self.saved = Some(geometry);
        self.save_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_before_any_save_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RedbPositionStore::open(&dir.path().join("placement.redb")).unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("placement.redb");
        let geometry = FloatingGeometry {
            x: 1576,
            y: 24,
            width: 320,
            height: 180,
        };

        let mut store = RedbPositionStore::open(&path).unwrap();
        store.save(geometry);
        assert_eq!(store.load(), Some(geometry));
    }

    #[test]
    fn placement_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("placement.redb");
        let geometry = FloatingGeometry {
            x: 10,
            y: 20,
            width: 200,
            height: 150,
        };

        {
            let mut store = RedbPositionStore::open(&path).unwrap();
            store.save(geometry);
        }
        let mut reopened = RedbPositionStore::open(&path).unwrap();
        assert_eq!(reopened.load(), Some(geometry));
    }

    #[test]
    fn last_save_wins() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RedbPositionStore::open(&dir.path().join("placement.redb")).unwrap();
        let first = FloatingGeometry {
            x: 0,
            y: 0,
            width: 150,
            height: 150,
        };
        let second = FloatingGeometry {
            x: 300,
            y: 400,
            width: 600,
            height: 600,
        };
        store.save(first);
        store.save(second);
        assert_eq!(store.load(), Some(second));
    }
}
