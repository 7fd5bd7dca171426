//! Redb (Rust embedded database) backend.
//!
//! Each collection maps to two tables: the documents keyed by id, and an
//! insertion-sequence table (`u64 -> id`) that gives listings their order.
//! Inserts touch both tables inside one write transaction.

use crate::{StoreBackend, StoreError};
use ::redb::{Database, ReadableTable, TableDefinition, TableError};
use std::path::Path;
use std::sync::RwLock;

/// Redb backend for persistent document storage.
///
/// The database handle is dropped on [`close`](StoreBackend::close), which
/// releases the file lock.
pub struct RedbBackend {
    db: RwLock<Option<Database>>,
}

impl RedbBackend {
    /// Open or create a Redb database at the given path.
    ///
    /// ```no_run
    /// use store::RedbBackend;
    ///
    /// let backend = RedbBackend::open("/tmp/chartdeck.redb").unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = Database::create(path).map_err(StoreError::backend)?;
        Ok(Self {
            db: RwLock::new(Some(db)),
        })
    }

    fn with_db<T>(&self, f: impl FnOnce(&Database) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let guard = self
            .db
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        let db = guard.as_ref().ok_or(StoreError::Closed)?;
        f(db)
    }
}

fn order_table_name(collection: &str) -> String {
    format!("{collection}#order")
}

impl StoreBackend for RedbBackend {
    fn insert(&self, collection: &str, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let order_name = order_table_name(collection);
        let docs_def: TableDefinition<&str, &[u8]> = TableDefinition::new(collection);
        let order_def: TableDefinition<u64, &str> = TableDefinition::new(&order_name);

        self.with_db(|db| {
            let write_txn = db.begin_write().map_err(StoreError::backend)?;
            {
                let mut docs = write_txn.open_table(docs_def).map_err(StoreError::backend)?;
                if docs.get(key).map_err(StoreError::backend)?.is_some() {
                    return Err(StoreError::DuplicateKey(key.to_string()));
                }
                docs.insert(key, value).map_err(StoreError::backend)?;

                let mut order = write_txn.open_table(order_def).map_err(StoreError::backend)?;
                let next = order
                    .last()
                    .map_err(StoreError::backend)?
                    .map(|(seq, _)| seq.value() + 1)
                    .unwrap_or(0);
                order.insert(next, key).map_err(StoreError::backend)?;
            }
            write_txn.commit().map_err(StoreError::backend)?;
            Ok(())
        })
    }

    fn get(&self, collection: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let docs_def: TableDefinition<&str, &[u8]> = TableDefinition::new(collection);

        self.with_db(|db| {
            let read_txn = db.begin_read().map_err(StoreError::backend)?;
            let docs = match read_txn.open_table(docs_def) {
                Ok(table) => table,
                Err(TableError::TableDoesNotExist(_)) => return Ok(None),
                Err(e) => return Err(StoreError::backend(e)),
            };
            Ok(docs
                .get(key)
                .map_err(StoreError::backend)?
                .map(|doc| doc.value().to_vec()))
        })
    }

    fn scan(
        &self,
        collection: &str,
        limit: usize,
        visitor: &mut dyn FnMut(&[u8]) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let order_name = order_table_name(collection);
        let docs_def: TableDefinition<&str, &[u8]> = TableDefinition::new(collection);
        let order_def: TableDefinition<u64, &str> = TableDefinition::new(&order_name);

        self.with_db(|db| {
            let read_txn = db.begin_read().map_err(StoreError::backend)?;
            let (order, docs) = match (read_txn.open_table(order_def), read_txn.open_table(docs_def)) {
                (Ok(order), Ok(docs)) => (order, docs),
                (Err(TableError::TableDoesNotExist(_)), _)
                | (_, Err(TableError::TableDoesNotExist(_))) => return Ok(()),
                (Err(e), _) | (_, Err(e)) => return Err(StoreError::backend(e)),
            };

            for entry in order.iter().map_err(StoreError::backend)?.take(limit) {
                let (_, key) = entry.map_err(StoreError::backend)?;
                if let Some(doc) = docs.get(key.value()).map_err(StoreError::backend)? {
                    visitor(doc.value())?;
                }
            }
            Ok(())
        })
    }

    fn ping(&self) -> Result<(), StoreError> {
        self.with_db(|db| {
            db.begin_read().map_err(StoreError::backend)?;
            Ok(())
        })
    }

    fn close(&self) -> Result<(), StoreError> {
        self.db
            .write()
            .map_err(|_| StoreError::backend("poisoned lock"))?
            .take();
        Ok(())
    }
}
