// Copyright (c) 2019 King's College London created by the Software Development
// Team <http://soft-dev.org/>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, or the MIT license <LICENSE-MIT
// or http://opensource.org/licenses/MIT>, or the UPL-1.0 license
// <http://opensource.org/licenses/UPL> at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The tracked allocator: the replacements for `malloc` / `calloc` /
//! `realloc` / `free` that delegate to the raw allocator and keep the
//! registry in sync (spec §4.3).

use crate::collector;
use crate::raw::{raw_allocate, raw_release, raw_resize, raw_zero_allocate};
use crate::registry;
use crate::trigger;

/// Tracked `malloc`. Updates the trigger counters *before* delegating, so a
/// single large allocation can itself trip a collection; retries once after
/// a collection if the raw allocator is exhausted.
pub fn allocate(size: usize) -> *mut u8 {
    if trigger::note_alloc(size) {
        collector::collect();
    }

    let mut p = unsafe { raw_allocate(size) };
    if p.is_null() {
        collector::collect();
        p = unsafe { raw_allocate(size) };
    }

    if !p.is_null() {
        registry::insert(p as usize, size);
    }
    p
}

/// Tracked `calloc`.
pub fn zero_allocate(count: usize, size: usize) -> *mut u8 {
    let total = count.saturating_mul(size);
    if trigger::note_alloc(total) {
        collector::collect();
    }

    let mut p = unsafe { raw_zero_allocate(count, size) };
    if p.is_null() {
        collector::collect();
        p = unsafe { raw_zero_allocate(count, size) };
    }

    if !p.is_null() {
        registry::insert(p as usize, total);
    }
    p
}

/// Tracked `realloc`. `resize(null, n)` behaves exactly like `allocate(n)`
/// (spec §8 property 6).
///
/// # Safety
///
/// `ptr` must be either null or a pointer previously returned by this
/// module's allocator functions and not yet released.
pub unsafe fn resize(ptr: *mut u8, size: usize) -> *mut u8 {
    if ptr.is_null() {
        return allocate(size);
    }

    if trigger::note_alloc(size) {
        collector::collect();
    }

    let mut new_ptr = raw_resize(ptr, size);
    if new_ptr.is_null() {
        collector::collect();
        new_ptr = raw_resize(ptr, size);
    }

    if !new_ptr.is_null() {
        // If the old record isn't found (e.g. `ptr` was never tracked),
        // this is simply a no-op removal -- the new block is still
        // inserted fresh (spec §7 "Resize to a block not in the registry").
        registry::remove(ptr as usize);
        registry::insert(new_ptr as usize, size);
    }
    // If raw_resize failed, `ptr`'s block is still live and still tracked;
    // the registry is left untouched.
    new_ptr
}

/// Tracked `free`. A no-op if `ptr` is not a tracked allocation (already
/// swept, never tracked, or already released).
///
/// # Safety
///
/// `ptr` must be either null or a pointer previously returned by this
/// module's allocator functions.
pub unsafe fn release(ptr: *mut u8) {
    if ptr.is_null() {
        return;
    }
    if registry::lookup(ptr as usize).is_some() {
        raw_release(ptr);
        registry::remove(ptr as usize);
    }
}
