use anyhow::{anyhow, Result};
use arrow_array::{Array, Float32Array, Int32Array, RecordBatch, StringArray};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{Connection, DistanceType};
use std::collections::BTreeSet;

use docqa_core::types::{ChunkMeta, QueryMatch};

use crate::table::open_table_opt;

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| anyhow!("column '{}' missing or of unexpected type", name))
}

/// Cosine nearest neighbours, closest first. A missing table yields no rows.
pub async fn nearest(conn: &Connection, table_name: &str, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>> {
    let Some(table) = open_table_opt(conn, table_name).await? else { return Ok(Vec::new()) };
    if top_k == 0 { return Ok(Vec::new()); }
    let batches: Vec<RecordBatch> = table
        .vector_search(vector.to_vec())?
        .distance_type(DistanceType::Cosine)
        .limit(top_k)
        .execute()
        .await?
        .try_collect()
        .await?;

    let mut out = Vec::new();
    for batch in &batches {
        let ids = column::<StringArray>(batch, "id")?;
        let sources = column::<StringArray>(batch, "source_id")?;
        let indices = column::<Int32Array>(batch, "chunk_index")?;
        let contents = column::<StringArray>(batch, "content")?;
        let distances = column::<Float32Array>(batch, "_distance")?;
        for i in 0..batch.num_rows() {
            out.push(QueryMatch {
                id: ids.value(i).to_string(),
                document: contents.value(i).to_string(),
                distance: distances.value(i),
                metadata: ChunkMeta {
                    source_id: sources.value(i).to_string(),
                    index: usize::try_from(indices.value(i)).unwrap_or_default(),
                },
            });
        }
    }
    out.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    out.truncate(top_k);
    Ok(out)
}

pub async fn distinct_sources(conn: &Connection, table_name: &str) -> Result<Vec<String>> {
    let Some(table) = open_table_opt(conn, table_name).await? else { return Ok(Vec::new()) };
    let batches: Vec<RecordBatch> = table
        .query()
        .select(Select::columns(&["source_id"]))
        .execute()
        .await?
        .try_collect()
        .await?;
    let mut seen = BTreeSet::new();
    for batch in &batches {
        let col = column::<StringArray>(batch, "source_id")?;
        for i in 0..batch.num_rows() {
            seen.insert(col.value(i).to_string());
        }
    }
    Ok(seen.into_iter().collect())
}

pub async fn row_count(conn: &Connection, table_name: &str) -> Result<usize> {
    match open_table_opt(conn, table_name).await? {
        Some(table) => Ok(table.count_rows(None).await?),
        None => Ok(0),
    }
}
