// Run-time:
//  status: success

extern crate gcmalloc;

// resize(null, n) must be indistinguishable from allocate(n).
gcmalloc::gc_main! {
    fn main() {
        let p = gcmalloc::allocate(256);
        assert!(!p.is_null());

        let q = unsafe { gcmalloc::resize(std::ptr::null_mut(), 256) };
        assert!(!q.is_null());
        assert_ne!(p, q);

        assert!(gcmalloc::is_managed(p));
        assert!(gcmalloc::is_managed(q));
        assert_eq!(gcmalloc::count_managed(), 2);
    }
}
