pub mod engine;
pub mod memory;
pub mod record;

pub use engine::RecordStore;
pub use memory::MemoryRecordStore;
pub use record::{Fields, Filters, Record, SelectParams, SortKey, SortOrder, SortSpec};
