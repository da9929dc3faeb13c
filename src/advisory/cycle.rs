//! Cycle-length arithmetic over flow-bearing entries.

use crate::tracking::types::Entry;

/// Returned when no usable gap exists.
pub const DEFAULT_CYCLE_LENGTH: u32 = 28;

/// Gaps at or beyond this many days are treated as missing data, not cycles.
pub const MAX_CYCLE_GAP_DAYS: i64 = 60;

/// Entries with a recorded flow other than `none`, in input order.
pub fn flow_entries(entries: &[Entry]) -> Vec<&Entry> {
    entries.iter().filter(|e| e.flow.has_flow()).collect()
}

/// Whole-day gaps between consecutive flow entries, each computed as the
/// earlier element's time minus the later element's. Input is expected
/// newest first; gaps outside `(0, 60)` are dropped, which also drops the
/// negative gaps produced by out-of-order input.
pub fn flow_gaps(flow: &[&Entry]) -> Vec<i64> {
    flow.windows(2)
        .map(|pair| (pair[0].recorded_at - pair[1].recorded_at).num_days())
        .filter(|gap| *gap > 0 && *gap < MAX_CYCLE_GAP_DAYS)
        .collect()
}

/// Rounded mean of `gaps`, or [`DEFAULT_CYCLE_LENGTH`] when empty.
pub fn average_cycle_length(gaps: &[i64]) -> u32 {
    if gaps.is_empty() {
        return DEFAULT_CYCLE_LENGTH;
    }
    let mean = gaps.iter().sum::<i64>() as f64 / gaps.len() as f64;
    mean.round() as u32
}
