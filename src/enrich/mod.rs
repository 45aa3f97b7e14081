//! Batch enrichment and result persistence

pub mod batch;
pub mod store;

pub use batch::{BatchOptions, BatchSummary, EnrichmentRecord, SkuItem, WorkItem, enrich_batch};
pub use store::{JsonDocumentStore, KeyedRecord, RecordSink, write_json_atomic};
