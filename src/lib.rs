// Copyright (c) 2019 King's College London created by the Software Development
// Team <http://soft-dev.org/>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, or the MIT license <LICENSE-MIT
// or http://opensource.org/licenses/MIT>, or the UPL-1.0 license
// <http://opensource.org/licenses/UPL> at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A conservative, stop-the-world, mark-and-sweep allocator.
//!
//! This crate replaces the platform allocator's `malloc` / `calloc` /
//! `realloc` / `free` with tracked equivalents
//! ([`allocate`], [`zero_allocate`], [`resize`], [`release`]) that record
//! every live allocation in a side table. Periodically -- or whenever you
//! call [`collect`] yourself -- it scans the call stack and the program's
//! static data region, treats any machine word that matches a tracked
//! allocation's base address as a pointer to it, and reclaims everything
//! it didn't find.
//!
//! It is *conservative*: there's no type information, so a word that
//! merely happens to equal a live base address is treated as a reference
//! to it, and only base-pointer matches are recognized (an interior
//! pointer into the middle of a block will not keep it alive).
//!
//! # Getting managed memory
//!
//! Call [`allocate`] / [`zero_allocate`] / [`resize`] / [`release`]
//! directly wherever you'd otherwise call `malloc` / `calloc` / `realloc`
//! / `free`. Wrap your `main` in [`gc_main!`] (or call [`boot::run`]
//! yourself) so the collector can capture the stack base before any of
//! your code runs:
//!
//! ```ignore
//! gcmalloc::gc_main! {
//!     fn main() {
//!         let p = gcmalloc::allocate(128);
//!         assert!(gcmalloc::is_managed(p));
//!     }
//! }
//! ```
//!
//! With the `global_allocator` feature, [`GcAllocator`] can instead be
//! installed as the process's `#[global_allocator]`, so ordinary `Box`,
//! `Vec`, `String`, etc. are transparently tracked with no call-site
//! changes at all.

mod alloc;
pub mod boot;
mod collector;
mod raw;
mod registry;
mod trigger;

pub use alloc::{allocate, release, resize, zero_allocate};
pub use collector::DebugFlags;
pub use trigger::{set_alloc_threshold, set_byte_threshold, set_threshold};

/// Runs one collection cycle now, regardless of the trigger counters.
pub fn collect() {
    collector::collect();
}

/// Replaces the collector's debug flags (which phases actually run). Meant
/// for tests that want to observe an intermediate state; the default
/// (`DebugFlags::new()`) runs both phases.
pub fn debug_flags(flags: DebugFlags) {
    collector::debug_flags(flags);
}

/// The number of allocations currently tracked by the registry (spec
/// §4.7).
pub fn count_managed() -> usize {
    registry::count()
}

/// Whether `ptr` is a currently-tracked allocation (spec §4.7).
pub fn is_managed(ptr: *const u8) -> bool {
    registry::lookup(ptr as usize).is_some()
}

#[cfg(feature = "global_allocator")]
mod global;
#[cfg(feature = "global_allocator")]
pub use global::GcAllocator;
