use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

/// Row layout of a chunk collection. `dim` is fixed per table at creation.
pub fn build_chunk_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("source_id", DataType::Utf8, false),
        Field::new("chunk_index", DataType::Int32, false),
        Field::new("content", DataType::Utf8, false),
        Field::new("indexed_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
        Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
    ]))
}
