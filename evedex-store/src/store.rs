use evedex_model::{CollectionSchema, Record};
use rusqlite::{Connection, params};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};

use crate::{Collection, StorageError, StorageResult};

const SCHEMA_SQL: &str = "
    CREATE TABLE IF NOT EXISTS records (
        collection TEXT NOT NULL,
        pk TEXT NOT NULL,
        seq INTEGER NOT NULL,
        body TEXT NOT NULL,
        PRIMARY KEY (collection, pk)
    );
    CREATE INDEX IF NOT EXISTS idx_records_seq ON records (collection, seq);
";

/// The local persistent store.
///
/// Writes go through one SQLite connection; reads are served from the
/// current in-memory snapshot of each collection.
pub struct LocalStore {
    conn: Mutex<Connection>,
    collections: RwLock<HashMap<String, Arc<Collection>>>,
}

impl LocalStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened local store");
        Self::with_connection(conn)
    }

    /// Opens a store that lives only as long as this value.
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StorageResult<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
            collections: RwLock::new(HashMap::new()),
        })
    }

    /// Registers a collection and loads any rows already persisted for it.
    ///
    /// Defining the same schema twice is a no-op; a different schema under
    /// an existing name is rejected.
    pub fn define(&self, schema: CollectionSchema) -> StorageResult<()> {
        schema.validate()?;
        if let Some(existing) = self.read_collections()?.get(&schema.name) {
            if existing.schema() == &schema {
                return Ok(());
            }
            return Err(StorageError::SchemaConflict(schema.name));
        }

        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        let mut stmt = conn.prepare("SELECT body FROM records WHERE collection = ?1 ORDER BY seq")?;
        let rows = stmt.query_map(params![schema.name], |row| row.get::<_, String>(0))?;
        let mut records = Vec::new();
        for body in rows {
            records.push(Record::from_json(&body?)?);
        }

        let name = schema.name.clone();
        let collection = Collection::from_records(schema, records)?;
        debug!(collection = %name, rows = collection.len(), "defined collection");

        let mut collections = self.collections.write().map_err(|_| StorageError::Poisoned)?;
        if let Some(existing) = collections.get(&name) {
            // Lost a race with another define of the same name.
            if existing.schema() != collection.schema() {
                return Err(StorageError::SchemaConflict(name));
            }
            return Ok(());
        }
        collections.insert(name, Arc::new(collection));
        Ok(())
    }

    /// Returns the current snapshot of a collection.
    pub fn collection(&self, name: &str) -> StorageResult<Arc<Collection>> {
        self.read_collections()?
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::UnknownCollection(name.to_string()))
    }

    /// Names of all defined collections, sorted.
    pub fn names(&self) -> StorageResult<Vec<String>> {
        let names: BTreeSet<String> = self.read_collections()?.keys().cloned().collect();
        Ok(names.into_iter().collect())
    }

    pub fn count(&self, name: &str) -> StorageResult<usize> {
        Ok(self.collection(name)?.len())
    }

    /// Inserts or replaces records by primary key. A replaced record keeps
    /// its natural position. Returns the number of records written.
    pub fn bulk_put(&self, name: &str, records: Vec<Record>) -> StorageResult<usize> {
        let incoming = records.len();
        let mut conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;

        // Holding the connection lock serializes writers, so this snapshot
        // cannot be replaced under us.
        let current = self.collection(name)?;
        let (next, placed) = current.upserted(records)?;

        let positions: BTreeSet<usize> = placed.iter().map(|(pos, _)| *pos).collect();
        let keys: HashMap<usize, &evedex_model::IndexKey> =
            placed.iter().map(|(pos, key)| (*pos, key)).collect();
        let rows: Vec<_> = next.iter().collect();

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO records (collection, pk, seq, body) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (collection, pk) DO UPDATE SET body = excluded.body",
            )?;
            for pos in positions {
                let key = keys
                    .get(&pos)
                    .ok_or_else(|| StorageError::InvalidData(format!("no key for position {pos}")))?;
                let pk = serde_json::to_string(key)?;
                let body = rows[pos].to_json()?;
                stmt.execute(params![name, pk, pos as i64, body])?;
            }
        }
        tx.commit()?;

        debug!(collection = %name, incoming, total = next.len(), "bulk put");
        self.collections
            .write()
            .map_err(|_| StorageError::Poisoned)?
            .insert(name.to_string(), Arc::new(next));
        Ok(incoming)
    }

    /// Replaces the whole contents of a collection.
    ///
    /// Every record is validated before anything is written. On any error
    /// the stored rows and the current snapshot are left untouched. Returns
    /// the number of records stored.
    pub fn replace_all(&self, name: &str, records: Vec<Record>) -> StorageResult<usize> {
        let mut conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        let current = self.collection(name)?;
        let next = Collection::from_records(current.schema().clone(), records)?;

        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM records WHERE collection = ?1", params![name])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO records (collection, pk, seq, body) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (pos, record) in next.iter().enumerate() {
                let pk = serde_json::to_string(&next.schema().key_of(record)?)?;
                stmt.execute(params![name, pk, pos as i64, record.to_json()?])?;
            }
        }
        tx.commit()?;

        let total = next.len();
        info!(collection = %name, removed, total, "replaced collection");
        self.collections
            .write()
            .map_err(|_| StorageError::Poisoned)?
            .insert(name.to_string(), Arc::new(next));
        Ok(total)
    }

    /// Removes every record from a collection. The collection stays defined.
    pub fn clear(&self, name: &str) -> StorageResult<()> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        let current = self.collection(name)?;
        let removed = conn.execute("DELETE FROM records WHERE collection = ?1", params![name])?;
        info!(collection = %name, removed, "cleared collection");
        self.collections
            .write()
            .map_err(|_| StorageError::Poisoned)?
            .insert(name.to_string(), Arc::new(Collection::empty(current.schema().clone())));
        Ok(())
    }

    fn read_collections(
        &self,
    ) -> StorageResult<std::sync::RwLockReadGuard<'_, HashMap<String, Arc<Collection>>>> {
        self.collections.read().map_err(|_| StorageError::Poisoned)
    }
}
