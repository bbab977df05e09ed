use anyhow::{bail, Result};
use arrow_array::{FixedSizeListArray, Int32Array, RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use chrono::Utc;
use lancedb::Connection;
use std::sync::Arc;

use docqa_core::types::StoredVector;

use crate::schema::build_chunk_schema;
use crate::table::open_table_opt;

/// Upper bound on rows per Arrow batch handed to LanceDB.
const WRITE_BATCH: usize = 1000;

pub fn records_to_batch(records: &[StoredVector]) -> Result<RecordBatch> {
    let Some(first) = records.first() else { bail!("no records to write") };
    let dim = first.embedding.len();
    if dim == 0 { bail!("record {} has an empty embedding", first.id); }
    if let Some(bad) = records.iter().find(|r| r.embedding.len() != dim) {
        bail!("record {} has {} dims, expected {}", bad.id, bad.embedding.len(), dim);
    }
    let schema = build_chunk_schema(i32::try_from(dim)?);
    let now = Utc::now().timestamp_millis();

    let mut ids = Vec::with_capacity(records.len());
    let mut sources = Vec::with_capacity(records.len());
    let mut indices = Vec::with_capacity(records.len());
    let mut contents = Vec::with_capacity(records.len());
    let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(records.len());
    for r in records {
        ids.push(r.id.as_str());
        sources.push(r.metadata.source_id.as_str());
        indices.push(i32::try_from(r.metadata.index)?);
        contents.push(r.chunk_text.as_str());
        vectors.push(Some(r.embedding.iter().map(|&x| Some(x)).collect()));
    }
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(sources)),
            Arc::new(Int32Array::from(indices)),
            Arc::new(StringArray::from(contents)),
            Arc::new(TimestampMillisecondArray::from(vec![now; records.len()])),
            Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors, i32::try_from(dim)?)),
        ],
    )?;
    Ok(batch)
}

/// Insert or overwrite rows keyed by `id`, creating the table on first write.
pub async fn upsert_records(conn: &Connection, table_name: &str, records: &[StoredVector]) -> Result<()> {
    for part in records.chunks(WRITE_BATCH) {
        let batch = records_to_batch(part)?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        match open_table_opt(conn, table_name).await? {
            Some(table) => {
                let mut mi = table.merge_insert(&["id"]);
                mi.when_matched_update_all(None).when_not_matched_insert_all();
                mi.execute(reader).await?;
            }
            None => {
                conn.create_table(table_name, reader).execute().await?;
                tracing::info!(table = table_name, "created table");
            }
        }
    }
    tracing::debug!(table = table_name, rows = records.len(), "upserted rows");
    Ok(())
}
