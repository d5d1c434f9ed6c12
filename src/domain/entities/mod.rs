pub mod cached_entry;
pub mod drain_report;
pub mod queued_operation;

pub use cached_entry::CachedEntry;
pub use drain_report::DrainReport;
pub use queued_operation::{OperationDraft, QueuedOperation};
