use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

pub const PASSAGES_TABLE: &str = "passages";
pub const META_TABLE: &str = "meta";

pub fn build_passages_schema(dim: usize) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("id", DataType::Utf8, false),
		Field::new("document_id", DataType::Utf8, false),
		Field::new("title", DataType::Utf8, false),
		Field::new("text", DataType::Utf8, false),
		Field::new("start_offset", DataType::Int64, false),
		Field::new("end_offset", DataType::Int64, false),
		Field::new("chunk_index", DataType::Int32, false),
		Field::new("total_chunks", DataType::Int32, false),
		Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim as i32), true),
	]))
}

pub fn build_meta_schema() -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("key", DataType::Utf8, false),
		Field::new("value", DataType::Utf8, false),
		Field::new("updated_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
	]))
}
