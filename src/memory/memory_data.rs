//! Memory tracker data - pure DOP.
//!
//! NO METHODS. Just data. All transformations happen in
//! memory_operations.rs.

use rustc_hash::FxHashMap;

/// Per-call-site allocation accounting, keyed by a caller-supplied tag
/// (typically `concat!(file!(), ":", line!())` at the call site).
#[derive(Debug, Clone, Default)]
pub struct AllocationSite {
    pub live_bytes: usize,
    pub live_count: usize,
    pub total_allocs: u64,
    pub total_frees: u64,
}

/// Tracker state: one entry per call site, plus running totals.
#[derive(Debug, Default)]
pub struct MemoryTrackerData {
    pub sites: FxHashMap<&'static str, AllocationSite>,
    pub total_live_bytes: usize,
    pub total_live_count: usize,
}

/// A point-in-time snapshot returned by `usage_report`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryUsageReport {
    pub total_live_bytes: usize,
    pub total_live_count: usize,
    pub total_sites: usize,
}
