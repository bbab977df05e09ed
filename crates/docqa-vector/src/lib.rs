//! docqa-vector
//!
//! Vector stores behind [`docqa_core::traits::VectorStore`]: an on-disk
//! LanceDB store for real use and a brute-force in-memory store for tests.
//! The Lance store is async underneath; it owns a tokio runtime and blocks on
//! it so callers stay synchronous.

use anyhow::Result;
use lancedb::Connection;
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;

use docqa_core::traits::VectorStore;
use docqa_core::types::{QueryMatch, StoredVector};

pub mod distance;
pub mod memory;
pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use memory::MemoryVectorStore;

pub struct LanceVectorStore {
    rt: Runtime,
    db: Connection,
    db_dir: PathBuf,
}

impl LanceVectorStore {
    /// Open (or create) the database directory at `db_dir`.
    pub fn open(db_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(db_dir)?;
        let rt = Runtime::new()?;
        let db = rt.block_on(table::open_db(db_dir.to_string_lossy().as_ref()))?;
        tracing::info!(dir = %db_dir.display(), "opened LanceDB");
        Ok(Self { rt, db, db_dir: db_dir.to_path_buf() })
    }

    pub fn db_dir(&self) -> &Path {
        &self.db_dir
    }
}

impl VectorStore for LanceVectorStore {
    fn upsert(&self, collection: &str, records: &[StoredVector]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        self.rt.block_on(writer::upsert_records(&self.db, collection, records))
    }

    fn query(&self, collection: &str, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>> {
        self.rt.block_on(search::nearest(&self.db, collection, vector, top_k))
    }

    fn delete_collection(&self, collection: &str) -> Result<()> {
        table::drop_table_dir(&self.db_dir, collection)
    }

    fn list_collections(&self) -> Result<Vec<String>> {
        let mut names = self.rt.block_on(async { self.db.table_names().execute().await })?;
        names.sort();
        Ok(names)
    }

    fn count(&self, collection: &str) -> Result<usize> {
        self.rt.block_on(search::row_count(&self.db, collection))
    }

    fn sources(&self, collection: &str) -> Result<Vec<String>> {
        self.rt.block_on(search::distinct_sources(&self.db, collection))
    }
}
