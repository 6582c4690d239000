// Run-time:
//  status: success

extern crate gcmalloc;

gcmalloc::gc_main! {
    fn main() {
        let mut p = gcmalloc::allocate(128);
        assert!(!p.is_null());

        gcmalloc::collect();
        assert!(gcmalloc::is_managed(p));
        assert_eq!(gcmalloc::count_managed(), 1);

        // Overwrite the only stack reference, then collect again.
        p = std::ptr::null_mut();
        let _ = p;

        gcmalloc::collect();
        assert_eq!(gcmalloc::count_managed(), 0);
    }
}
