// Run-time:
//  status: success

extern crate gcmalloc;

use gcmalloc::DebugFlags;

// Disabling the sweep phase lets a collection clear marks and trace
// reachability without reclaiming anything; re-enabling it then reclaims
// whatever is still unreachable.
gcmalloc::gc_main! {
    fn main() {
        let mut p = gcmalloc::allocate(64);
        assert!(!p.is_null());
        p = std::ptr::null_mut();
        let _ = p;

        gcmalloc::debug_flags(DebugFlags::new().sweep_phase(false));
        gcmalloc::collect();
        assert_eq!(gcmalloc::count_managed(), 1);

        gcmalloc::debug_flags(DebugFlags::new());
        gcmalloc::collect();
        assert_eq!(gcmalloc::count_managed(), 0);
    }
}
