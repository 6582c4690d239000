// Copyright (c) 2019 King's College London created by the Software Development
// Team <http://soft-dev.org/>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, or the MIT license <LICENSE-MIT
// or http://opensource.org/licenses/MIT>, or the UPL-1.0 license
// <http://opensource.org/licenses/UPL> at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Entry-point scaffolding (spec §4.6): capture the stack base before any
//! user allocation happens, initialize the registry, run the user's code,
//! collect once more on the way out, then tear the registry down.

use crate::collector;
use crate::registry;

/// Runs `f` with the collector fully set up around it. `f` must be the very
/// first thing to run in the program's outermost frame -- everything below
/// it on the stack is invisible to conservative scanning, so any live
/// allocation whose only reference sits in an earlier frame will look
/// unreachable.
pub fn run<T>(f: impl FnOnce() -> T) -> T {
    // This local's address approximates the highest address the mutator's
    // stack will ever reach; the original C macro this is modeled on
    // captures exactly this, in exactly this spot.
    let stack_base_sentinel: usize = 0;
    collector::set_stack_base(&stack_base_sentinel as *const usize as usize);

    registry::init();
    let result = f();
    collector::collect();
    registry::teardown();
    result
}

/// Wraps a `fn main` with the collector's entry-point scaffolding, the Rust
/// expression of the original's `#define main(ARGC, ARGV)` wrapper macro.
///
/// The body runs inside a closure, not `main` itself, so a bare `return`
/// inside it exits the closure rather than the process -- the same caveat
/// `#[tokio::main]`-style wrappers carry. Use the block's tail expression
/// (or `std::process::exit`) instead of an early `return` for early exit.
///
/// ```ignore
/// gcmalloc::gc_main! {
///     fn main() {
///         // user code, fully managed
///     }
/// }
/// ```
#[macro_export]
macro_rules! gc_main {
    (fn main() $body:block) => {
        fn main() {
            $crate::boot::run(|| $body);
        }
    };
    (fn main() -> $ret:ty $body:block) => {
        fn main() -> $ret {
            $crate::boot::run(|| $body)
        }
    };
}
