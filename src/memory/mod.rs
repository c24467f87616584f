//! Memory tracker (component B): a realloc-style allocation tracker with
//! per-call-site accounting, queried for total usage, active count, and
//! free count. This does not replace the global allocator — it is a
//! bookkeeping layer extensions opt into when they want visibility into
//! their own allocation traffic, following the DOP data/operations split
//! used throughout this crate.

mod memory_data;
mod memory_operations;

pub use memory_data::{AllocationSite, MemoryTrackerData, MemoryUsageReport};
pub use memory_operations::{
    create_memory_tracker, track_alloc, track_free, track_realloc, usage_report,
};
