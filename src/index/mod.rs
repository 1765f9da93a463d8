pub mod bulk;
pub mod error;
pub mod group;
pub mod index;
pub mod population;
pub mod scroll;

pub use bulk::{bulk_payload, is_write_lock_error, BulkEntry, BulkStats};
pub use error::{FailedItem, IndexError, IndexResult};
pub use group::IndexGroup;
pub use index::Index;
pub use population::{load_stream, reindex, DocumentSource, IndexSource, NdjsonSource, PopulationPool};
pub use scroll::ScrollCursor;
