// Copyright (c) 2019 King's College London created by the Software Development
// Team <http://soft-dev.org/>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, or the MIT license <LICENSE-MIT
// or http://opensource.org/licenses/MIT>, or the UPL-1.0 license
// <http://opensource.org/licenses/UPL> at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The collector: clear marks, scan roots, trace transitively, sweep
//! (spec §4.5).

use crate::raw::{raw_allocate, raw_resize};
use crate::registry::{self, AllocRecord};
use crate::trigger;
use parking_lot::Mutex;
use std::mem::size_of;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

static WORD_SIZE: usize = std::mem::size_of::<usize>();

/// The collector's own mark-phase worklist. Backed by the raw allocator, not
/// `Vec`, so that growing it mid-collection never calls back into the
/// tracked allocator -- which would insert a fresh registry record after
/// `clear_all_marks()` has already run (leaving it unmarked and swept this
/// same cycle) and, under `GcAllocator`, could re-enter the non-reentrant
/// `COLLECTOR` lock. Mirrors `registry.rs`'s `Bucket` storage pattern.
struct RawWorklist {
    records: *mut AllocRecord,
    len: usize,
    cap: usize,
}

// SAFETY: a `RawWorklist` is only ever touched while holding `COLLECTOR`'s
// lock (it lives inside `Collector`, guarded by `static COLLECTOR:
// Mutex<Collector>`), so there is no unsynchronized shared access.
unsafe impl Send for RawWorklist {}

impl RawWorklist {
    const EMPTY: RawWorklist = RawWorklist {
        records: ptr::null_mut(),
        len: 0,
        cap: 0,
    };

    /// Doubles capacity (starting at 1). Returns `false`, leaving the
    /// worklist exactly as it was, if the raw allocator is exhausted.
    unsafe fn grow(&mut self) -> bool {
        let new_cap = if self.cap == 0 { 1 } else { self.cap * 2 };
        let new_bytes = new_cap * size_of::<AllocRecord>();
        let new_records = if self.records.is_null() {
            raw_allocate(new_bytes) as *mut AllocRecord
        } else {
            raw_resize(self.records as *mut u8, new_bytes) as *mut AllocRecord
        };
        if new_records.is_null() {
            return false;
        }
        self.records = new_records;
        self.cap = new_cap;
        true
    }

    /// Pushes a record, growing the backing storage if needed. If the raw
    /// allocator can't grow it, the record is dropped from the trace --
    /// the same documented degradation as a registry bucket growth failure
    /// (spec §4.2), rather than panicking mid-collection.
    unsafe fn push(&mut self, record: AllocRecord) {
        if self.len == self.cap && !self.grow() {
            log::warn!("gcmalloc: could not grow collector worklist; trace may be incomplete");
            return;
        }
        ptr::write(self.records.add(self.len), record);
        self.len += 1;
    }

    unsafe fn pop(&mut self) -> Option<AllocRecord> {
        if self.len == 0 {
            None
        } else {
            self.len -= 1;
            Some(ptr::read(self.records.add(self.len)))
        }
    }
}

type Address = usize;
type Word = usize;

type StackScanCallback = extern "sysv64" fn(&mut Collector, Address);

#[cfg_attr(not(target_arch = "x86_64"), allow(dead_code))]
#[link(name = "gcmalloc_spill_registers", kind = "static")]
extern "sysv64" {
    /// Pushes the callee-saved registers onto the stack (so the subsequent
    /// stack walk can see any pointers sitting in them) and calls back into
    /// the collector with the post-spill stack pointer.
    #[allow(improper_ctypes)]
    fn spill_registers(collector: *mut u8, callback: StackScanCallback);
}

/// The address captured in the program's outermost frame at startup (spec
/// §4.6 step 1). `0` until `boot::run` sets it.
pub(crate) static STACK_BASE: AtomicUsize = AtomicUsize::new(0);

pub(crate) fn set_stack_base(addr: usize) {
    STACK_BASE.store(addr, Ordering::SeqCst);
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum CollectorState {
    Ready,
    RootScanning,
    Marking,
    Sweeping,
}

/// Toggles for the two collection phases, useful for tests that want to
/// observe an intermediate state (e.g. "did clearing marks alone undo
/// reachability").
#[derive(Debug, Clone, Copy)]
pub struct DebugFlags {
    pub mark_phase: bool,
    pub sweep_phase: bool,
}

impl DebugFlags {
    pub fn new() -> Self {
        Self {
            mark_phase: true,
            sweep_phase: true,
        }
    }

    pub fn mark_phase(mut self, val: bool) -> Self {
        self.mark_phase = val;
        self
    }

    pub fn sweep_phase(mut self, val: bool) -> Self {
        self.sweep_phase = val;
        self
    }
}

impl Default for DebugFlags {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct Collector {
    worklist: RawWorklist,
    pub(crate) state: CollectorState,
    pub(crate) debug_flags: DebugFlags,
}

impl Collector {
    const fn new() -> Self {
        Self {
            worklist: RawWorklist::EMPTY,
            state: CollectorState::Ready,
            debug_flags: DebugFlags {
                mark_phase: true,
                sweep_phase: true,
            },
        }
    }

    /// Runs one collection cycle: clear marks, scan roots, trace, sweep.
    /// Not reentrant -- if a collection is already running (which should
    /// only be reachable via a bug, since the mutator is single-threaded
    /// per spec §5), this call is skipped.
    fn collect(&mut self) {
        if self.state != CollectorState::Ready {
            return;
        }
        self.state = CollectorState::RootScanning;

        trigger::reset();
        registry::clear_all_marks();

        // Register spilling is platform-specific; implemented in a small
        // assembly stub so callee-saved registers land on the stack before
        // we walk it.
        #[cfg(target_arch = "x86_64")]
        unsafe {
            spill_registers(self as *mut Collector as *mut u8, Collector::scan_stack);
        }
        #[cfg(not(target_arch = "x86_64"))]
        {
            // No register-spilling stub for this architecture: roots
            // sitting only in callee-saved registers are invisible. Still
            // scan the stack itself.
            let mut local = 0usize;
            self.scan_stack(&mut local as *mut usize as Address);
        }

        self.scan_static();

        if self.debug_flags.mark_phase {
            self.enter_mark_phase();
        }

        let reclaimed = if self.debug_flags.sweep_phase {
            self.enter_sweep_phase()
        } else {
            self.state = CollectorState::Ready;
            0
        };

        log::debug!("gcmalloc: collection reclaimed {} object(s)", reclaimed);
    }

    /// Stack root scan (spec §4.5(b)). `sp` is the address of a local
    /// variable inside (or spilled by) `collect`, approximating the current
    /// stack pointer; the region runs from there to the captured stack
    /// base. Only the extent matters, so the two ends are sorted before
    /// walking low to high.
    extern "sysv64" fn scan_stack(&mut self, sp: Address) {
        let base = STACK_BASE.load(Ordering::SeqCst);
        if base == 0 {
            return;
        }
        let (lo, hi) = if sp < base { (sp, base) } else { (base, sp) };
        unsafe { self.scan_region(lo, hi) };
    }

    /// Static-data root scan (spec §4.5(c)). The registry's own backing
    /// storage is excluded -- it contains the `base` field of every tracked
    /// record, and scanning it would make every allocation look reachable
    /// from a root forever.
    fn scan_static(&mut self) {
        let (data_start, data_end) = match static_region_bounds() {
            Some(bounds) => bounds,
            None => return,
        };
        let (reg_start, reg_end) = registry::table_bounds();

        // Sub-range before the registry.
        if reg_start > data_start {
            let lo = data_start;
            let hi = reg_start.min(data_end);
            if hi > lo {
                unsafe { self.scan_region(lo, hi) };
            }
        }
        // Sub-range after the registry. May be empty, or the registry may
        // sit past `data_end` entirely -- both are guarded against rather
        // than assumed away (spec §9 open questions (b)/(c)).
        if data_end > reg_end {
            let lo = reg_end.max(data_start);
            let hi = data_end;
            if hi > lo {
                unsafe { self.scan_region(lo, hi) };
            }
        }
    }

    /// Walks `[lo, hi)` as pointer-sized words, queuing any tracked base
    /// address found for marking. Unaligned pointer values within the
    /// region are invisible -- the scan advances strictly by `WORD_SIZE`.
    unsafe fn scan_region(&mut self, lo: usize, hi: usize) {
        let mut addr = lo;
        while addr + WORD_SIZE <= hi {
            let word = *(addr as *const Word);
            self.consider(word);
            addr += WORD_SIZE;
        }
    }

    /// If `word` is the base address of a currently-unmarked tracked
    /// allocation, marks it and queues it for transitive tracing. Marking
    /// happens before queuing so cycles terminate.
    fn consider(&mut self, word: Word) {
        if let Some(record) = registry::lookup(word) {
            if !record.marked && registry::mark(word) {
                unsafe {
                    self.worklist.push(AllocRecord {
                        marked: true,
                        ..record
                    });
                }
            }
        }
    }

    /// Drains the worklist, scanning each marked block's own interior bytes
    /// for further pointers (spec §4.5(d)). This sweeps in padding and
    /// uninitialized bytes too, which is acceptable only because the
    /// collector is conservative by design (spec §9 open question (a)).
    fn enter_mark_phase(&mut self) {
        self.state = CollectorState::Marking;
        while let Some(AllocRecord { base, size, .. }) = unsafe { self.worklist.pop() } {
            unsafe { self.scan_region(base, base + size) };
        }
    }

    fn enter_sweep_phase(&mut self) -> usize {
        self.state = CollectorState::Sweeping;
        let reclaimed = registry::sweep();
        self.state = CollectorState::Ready;
        reclaimed
    }
}

/// The boundary symbols for the static data region. ELF-specific; ported
/// platforms must substitute their own segment-delimiting mechanism (spec
/// §9 "Boundary symbols for the static region").
#[cfg(target_os = "linux")]
extern "C" {
    static __data_start: u8;
    static _end: u8;
}

#[cfg(target_os = "linux")]
fn static_region_bounds() -> Option<(usize, usize)> {
    unsafe {
        let start = &__data_start as *const u8 as usize;
        let end = &_end as *const u8 as usize;
        if end > start {
            Some((start, end))
        } else {
            None
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn static_region_bounds() -> Option<(usize, usize)> {
    None
}

static COLLECTOR: Mutex<Collector> = Mutex::new(Collector::new());

/// Runs one collection cycle now.
pub(crate) fn collect() {
    COLLECTOR.lock().collect();
}

/// Replaces the active `DebugFlags`. Intended for tests that want to
/// observe an intermediate phase.
pub fn debug_flags(flags: DebugFlags) {
    COLLECTOR.lock().debug_flags = flags;
}
