mod sync_scheduler;

pub use sync_scheduler::SyncScheduler;
