// Run-time:
//  status: success

extern crate gcmalloc;

// Releasing a pointer this collector never tracked must not corrupt the
// registry, and releasing a tracked pointer twice must be safe.
gcmalloc::gc_main! {
    fn main() {
        use std::alloc::{alloc, dealloc, Layout};

        let layout = Layout::from_size_align(16, 8).unwrap();
        let unmanaged = unsafe { alloc(layout) };
        assert!(!unmanaged.is_null());

        let before = gcmalloc::count_managed();
        unsafe { gcmalloc::release(unmanaged) };
        assert_eq!(gcmalloc::count_managed(), before);
        unsafe { dealloc(unmanaged, layout) };

        let p = gcmalloc::allocate(32);
        assert!(!p.is_null());
        unsafe { gcmalloc::release(p) };
        assert!(!gcmalloc::is_managed(p));

        let after_first_release = gcmalloc::count_managed();
        unsafe { gcmalloc::release(p) };
        assert_eq!(gcmalloc::count_managed(), after_first_release);
    }
}
