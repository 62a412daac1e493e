/*!
 * Allocator Wrapper
 * Global-allocator shim observing every heap request
 *
 * `ScopeAlloc` delegates each request to the real allocator first and
 * only then records the outcome, so a failing or succeeding allocation
 * behaves exactly as it would without the profiler. Install it with
 * `#[global_allocator]`.
 */

use crate::core::types::AllocKind;
use std::alloc::{GlobalAlloc, Layout, System};

/// Wraps a real allocator and reports every served request to the
/// current thread's scope tree.
///
/// On Linux the tracked size is `malloc_usable_size` of the returned
/// block, which assumes a malloc-backed inner allocator (the `System`
/// default is). Elsewhere the layout size is used on both the allocation
/// and the free side, which keeps the accounting symmetric either way.
pub struct ScopeAlloc<A: GlobalAlloc = System> {
    inner: A,
}

impl ScopeAlloc<System> {
    pub const fn system() -> Self {
        Self { inner: System }
    }
}

impl<A: GlobalAlloc> ScopeAlloc<A> {
    pub const fn new(inner: A) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }
}

/// The allocator's actually-reserved size for this block (>= requested).
/// Free queries the same way, so both sides of the ledger match.
#[cfg(target_os = "linux")]
#[inline]
fn usable_size(ptr: *mut u8, _layout: Layout) -> u64 {
    unsafe { libc::malloc_usable_size(ptr as *mut libc::c_void) as u64 }
}

#[cfg(not(target_os = "linux"))]
#[inline]
fn usable_size(_ptr: *mut u8, layout: Layout) -> u64 {
    layout.size() as u64
}

unsafe impl<A: GlobalAlloc> GlobalAlloc for ScopeAlloc<A> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = self.inner.alloc(layout);
        if !ptr.is_null() {
            super::on_alloc(AllocKind::Malloc, usable_size(ptr, layout));
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = self.inner.alloc_zeroed(layout);
        if !ptr.is_null() {
            super::on_alloc(AllocKind::Calloc, usable_size(ptr, layout));
        }
        ptr
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = self.inner.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() {
            // the whole new block is charged to the current scope; the old
            // block's home scope is unknown and stays charged
            let new_layout = Layout::from_size_align_unchecked(new_size, layout.align());
            super::on_alloc(AllocKind::Realloc, usable_size(new_ptr, new_layout));
        }
        new_ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // query before the block is gone
        let usable = usable_size(ptr, layout);
        self.inner.dealloc(ptr, layout);
        super::on_free(usable);
    }
}
