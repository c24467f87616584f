//! Memory tracker operations - pure DOP functions.
//!
//! All functions are pure: take data, return results, no side effects
//! beyond mutating the passed-in tracker.

use super::memory_data::{MemoryTrackerData, MemoryUsageReport};

pub fn create_memory_tracker() -> MemoryTrackerData {
    MemoryTrackerData::default()
}

/// Record a new allocation of `size` bytes attributed to `site`.
pub fn track_alloc(data: &mut MemoryTrackerData, site: &'static str, size: usize) {
    let entry = data.sites.entry(site).or_default();
    entry.live_bytes += size;
    entry.live_count += 1;
    entry.total_allocs += 1;
    data.total_live_bytes += size;
    data.total_live_count += 1;
}

/// Record a realloc: the same call site shrinks or grows by `new_size -
/// old_size`.
pub fn track_realloc(data: &mut MemoryTrackerData, site: &'static str, old_size: usize, new_size: usize) {
    let entry = data.sites.entry(site).or_default();
    entry.live_bytes = entry.live_bytes.saturating_sub(old_size) + new_size;
    entry.total_allocs += 1;
    data.total_live_bytes = data.total_live_bytes.saturating_sub(old_size) + new_size;
}

/// Record a free of `size` bytes previously attributed to `site`.
pub fn track_free(data: &mut MemoryTrackerData, site: &'static str, size: usize) {
    if let Some(entry) = data.sites.get_mut(site) {
        entry.live_bytes = entry.live_bytes.saturating_sub(size);
        entry.live_count = entry.live_count.saturating_sub(1);
        entry.total_frees += 1;
    }
    data.total_live_bytes = data.total_live_bytes.saturating_sub(size);
    data.total_live_count = data.total_live_count.saturating_sub(1);
}

/// Query total usage, active count, and the number of distinct call
/// sites currently holding live allocations.
pub fn usage_report(data: &MemoryTrackerData) -> MemoryUsageReport {
    MemoryUsageReport {
        total_live_bytes: data.total_live_bytes,
        total_live_count: data.total_live_count,
        total_sites: data.sites.values().filter(|s| s.live_count > 0).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_free_roundtrip() {
        let mut tracker = create_memory_tracker();
        track_alloc(&mut tracker, "a.rs:10", 128);
        track_alloc(&mut tracker, "a.rs:10", 64);
        let report = usage_report(&tracker);
        assert_eq!(report.total_live_bytes, 192);
        assert_eq!(report.total_live_count, 2);

        track_free(&mut tracker, "a.rs:10", 128);
        let report = usage_report(&tracker);
        assert_eq!(report.total_live_bytes, 64);
        assert_eq!(report.total_live_count, 1);
    }

    #[test]
    fn test_realloc_adjusts_site_bytes() {
        let mut tracker = create_memory_tracker();
        track_alloc(&mut tracker, "b.rs:5", 100);
        track_realloc(&mut tracker, "b.rs:5", 100, 250);
        let site = &tracker.sites["b.rs:5"];
        assert_eq!(site.live_bytes, 250);
        assert_eq!(tracker.total_live_bytes, 250);
    }

    #[test]
    fn test_distinct_sites_counted() {
        let mut tracker = create_memory_tracker();
        track_alloc(&mut tracker, "a.rs:1", 10);
        track_alloc(&mut tracker, "b.rs:2", 10);
        track_free(&mut tracker, "a.rs:1", 10);
        let report = usage_report(&tracker);
        assert_eq!(report.total_sites, 1);
    }
}
