/*!
 * Hot-path allocation-freedom check
 * Guard construction/destruction must never reach the real allocator
 */

use mtag::{EngineConfig, ScopeAlloc, ScopeGuard};
use pretty_assertions::assert_eq;
use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

/// System allocator that counts every allocation request it serves
struct CountingSystem {
    calls: AtomicU64,
}

impl CountingSystem {
    fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

unsafe impl GlobalAlloc for CountingSystem {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        System.alloc(layout)
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        System.alloc_zeroed(layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        System.realloc(ptr, layout, new_size)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }
}

#[global_allocator]
static ALLOC: ScopeAlloc<CountingSystem> = ScopeAlloc::new(CountingSystem {
    calls: AtomicU64::new(0),
});

fn main() {
    assert!(mtag::init(EngineConfig::default()));
    thread::Builder::new()
        .name("hot_worker".into())
        .spawn(worker)
        .unwrap()
        .join()
        .expect("worker panicked");
    println!("hot_path: ok");
}

fn worker() {
    // first guard on this thread registers the tree (that may allocate,
    // with hooks off); afterwards the paths below must be allocation-free
    {
        let _warmup = ScopeGuard::new("outer");
        let _nested = ScopeGuard::new("inner");
    }

    let before = ALLOC.inner().calls();
    for _ in 0..10_000 {
        let _outer = ScopeGuard::new("outer");
        let _inner = ScopeGuard::new("inner");
    }
    let after = ALLOC.inner().calls();
    assert_eq!(
        before, after,
        "push/pop made {} allocator calls",
        after - before
    );

    // the failure paths are allocation-free too: exhaust the fanout bound
    {
        let _parent = ScopeGuard::new("crowd");
        let names: Vec<String> = (0..20).map(|i| format!("s{i}")).collect();
        for name in &names {
            let _child = ScopeGuard::new(name);
        }
        let before = ALLOC.inner().calls();
        for name in &names {
            let _child = ScopeGuard::new(name); // 16 hits + 4 refused pushes
        }
        assert_eq!(before, ALLOC.inner().calls());
    }
}
