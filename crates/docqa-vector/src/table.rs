//! LanceDB connection and housekeeping helpers.
//!
//! Opening the database, probing and dropping tables. A local LanceDB table
//! lives in `<db_dir>/<name>.lance`.
use anyhow::{bail, Result};
use lancedb::{connect, Connection, Table};
use std::path::Path;

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let names = conn.table_names().execute().await?;
    Ok(names.iter().any(|n| n == name))
}

/// `None` when the table has never been written.
pub async fn open_table_opt(conn: &Connection, name: &str) -> Result<Option<Table>> {
    if !table_exists(conn, name).await? {
        return Ok(None);
    }
    Ok(Some(conn.open_table(name).execute().await?))
}

/// Table names map to one directory under the database; anything that could
/// resolve elsewhere is rejected.
pub fn check_table_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name.contains("..") || name.contains(['/', '\\']) {
        bail!("invalid collection name: {name:?}");
    }
    Ok(())
}

/// Remove the table's files. Missing tables are not an error.
pub fn drop_table_dir(db_dir: &Path, name: &str) -> Result<()> {
    check_table_name(name)?;
    let dir = db_dir.join(format!("{name}.lance"));
    if dir.exists() {
        std::fs::remove_dir_all(&dir)?;
        tracing::info!(table = name, "dropped table");
    }
    Ok(())
}
