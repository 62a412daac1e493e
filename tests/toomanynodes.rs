/*!
 * Node-pool exhaustion corner case
 * A full pool refuses pushes; existing scopes keep tracking
 */

use mtag::{EngineConfig, ScopeAlloc, ScopeGuard};
use pretty_assertions::assert_eq;
use std::alloc::{alloc, dealloc, Layout};
use std::thread;

#[global_allocator]
static ALLOC: ScopeAlloc = ScopeAlloc::system();

const MAX_NODES: u32 = 50;
const OUTER: usize = 7;
const INNER: usize = 6;

fn main() {
    assert!(mtag::init(EngineConfig {
        max_tree_nodes: MAX_NODES,
        ..EngineConfig::default()
    }));
    thread::Builder::new()
        .name("tmn_worker".into())
        .spawn(worker)
        .unwrap()
        .join()
        .expect("worker panicked");
    println!("toomanynodes: ok");
}

fn worker() {
    // node creation order: root, wrapper, then each outer scope followed
    // by its 6 inner scopes: 1 + 1 + 7 + 6*6 = 45 nodes through outer6,
    // whose dummy0..dummy4 take slots 46..50; dummy5 finds the pool dry
    {
        let _wrapper = ScopeGuard::new("TooManyNodes");
        for outer in 0..OUTER {
            let outer_name = format!("outer{outer}");
            let _outer = ScopeGuard::new(&outer_name);
            for inner in 0..INNER {
                let inner_name = format!("dummy{inner}");
                let _inner = ScopeGuard::new(&inner_name);
                let layout = Layout::from_size_align(64, 8).unwrap();
                let p = unsafe { alloc(layout) };
                assert!(!p.is_null());
                unsafe { dealloc(p, layout) };
            }
        }
    }

    let map = mtag::collect_stats_map();
    let prefix = mtag::stat_key_prefix_for_thread(0);
    let base = format!("{prefix}tmn_worker.TooManyNodes");

    assert_eq!(map[&format!("{prefix}.nTreeNodesInUse")], u64::from(MAX_NODES));
    assert_eq!(map[&format!("{prefix}.nMaxTreeNodes")], u64::from(MAX_NODES));
    assert!(map[&format!("{prefix}.nPushNodeFailures")] >= 1);

    // every outer scope before the exhausted one is fully built
    for outer in 0..OUTER - 1 {
        for inner in 0..INNER {
            assert!(map.contains_key(&format!(
                "{base}.outer{outer}.dummy{inner}.nBytesSelfAllocated"
            )));
        }
    }
    // the last scope that still got a node is outer6.dummy4
    assert!(map.contains_key(&format!("{base}.outer6.dummy4.nBytesSelfAllocated")));
    assert!(!map.contains_key(&format!("{base}.outer6.dummy5.nBytesSelfAllocated")));

    // allocations at refused scopes fell through to outer6 itself
    assert!(map[&format!("{base}.outer6.nBytesSelfAllocated")] >= 64);
}
