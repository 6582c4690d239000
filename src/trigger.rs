// Copyright (c) 2019 King's College London created by the Software Development
// Team <http://soft-dev.org/>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, or the MIT license <LICENSE-MIT
// or http://opensource.org/licenses/MIT>, or the UPL-1.0 license
// <http://opensource.org/licenses/UPL> at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The dual-counter collection trigger policy (spec §4.4).
//!
//! A collection fires iff *both* the allocation-count and byte-volume
//! counters strictly exceed their thresholds -- frequent tiny allocations
//! and rare huge ones each have to clear some minimum bar before a scan is
//! paid for.

use std::sync::atomic::{AtomicUsize, Ordering};

const DEFAULT_ALLOC_THRESHOLD: usize = 1 << 10;
const DEFAULT_BYTE_THRESHOLD: usize = 1 << 30;

static BYTES_SINCE_COLLECT: AtomicUsize = AtomicUsize::new(0);
static ALLOCS_SINCE_COLLECT: AtomicUsize = AtomicUsize::new(0);
static ALLOC_THRESHOLD: AtomicUsize = AtomicUsize::new(DEFAULT_ALLOC_THRESHOLD);
static BYTE_THRESHOLD: AtomicUsize = AtomicUsize::new(DEFAULT_BYTE_THRESHOLD);

/// Records one tracked allocation/resize of `bytes` bytes and reports
/// whether a collection should run *before* the caller's allocator call.
/// The counters are bumped before this check, so a single allocation large
/// or numerous enough on its own can trip the threshold.
pub(crate) fn note_alloc(bytes: usize) -> bool {
    let allocs = ALLOCS_SINCE_COLLECT.fetch_add(1, Ordering::SeqCst) + 1;
    let bytes_total = BYTES_SINCE_COLLECT.fetch_add(bytes, Ordering::SeqCst) + bytes;
    allocs > ALLOC_THRESHOLD.load(Ordering::SeqCst) && bytes_total > BYTE_THRESHOLD.load(Ordering::SeqCst)
}

/// Zeroes both counters. Called at the start of every collection cycle.
pub(crate) fn reset() {
    ALLOCS_SINCE_COLLECT.store(0, Ordering::SeqCst);
    BYTES_SINCE_COLLECT.store(0, Ordering::SeqCst);
}

/// Sets `alloc-threshold` (spec §6 tunable table).
pub fn set_alloc_threshold(n: usize) {
    ALLOC_THRESHOLD.store(n, Ordering::SeqCst);
}

/// Sets `byte-threshold` (spec §6 tunable table).
pub fn set_byte_threshold(n: usize) {
    BYTE_THRESHOLD.store(n, Ordering::SeqCst);
}

/// Convenience: sets both thresholds to the same value, as used by the
/// teacher's own test suite to make automatic collection tests fast.
pub fn set_threshold(n: usize) {
    set_alloc_threshold(n);
    set_byte_threshold(n);
}
