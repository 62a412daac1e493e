/*!
 * Multithread scenario
 * One tree per allocating thread, named after the kernel thread name
 */

use mtag::{EngineConfig, ScopeAlloc, ScopeGuard};
use pretty_assertions::assert_eq;
use std::thread;

#[global_allocator]
static ALLOC: ScopeAlloc = ScopeAlloc::system();

const N_THREADS: usize = 3;

fn main() {
    assert!(mtag::init(EngineConfig::default()));

    let handles: Vec<_> = (0..N_THREADS)
        .map(|i| {
            thread::Builder::new()
                .name(format!("mt_worker{i}"))
                .spawn(move || worker(i))
                .unwrap()
        })
        .collect();
    let prefixes: Vec<String> = handles
        .into_iter()
        .map(|h| h.join().expect("worker panicked"))
        .collect();

    let map = mtag::collect_stats_map();

    // main + one tree per allocating thread
    assert_eq!(map[".nTrees"], (N_THREADS + 1) as u64);

    for (i, prefix) in prefixes.iter().enumerate() {
        // the tree root carries the kernel-assigned thread name
        let root = format!("{prefix}mt_worker{i}");
        let scope = format!("{root}.Work{i}");
        assert_eq!(map[&format!("{scope}.nCallsTo_malloc")], 1);
        assert!(map[&format!("{scope}.nBytesSelfAllocated")] >= 1000);
        assert_eq!(map[&format!("{scope}.nTimesEnteredAndExited")], 1);

        // per-tree totals: root total = root self + its single subtree
        assert_eq!(
            map[&format!("{root}.nBytesTotalAllocated")],
            map[&format!("{root}.nBytesSelfAllocated")]
                + map[&format!("{scope}.nBytesTotalAllocated")]
        );
    }
    println!("multithread: ok");
}

fn worker(i: usize) -> String {
    let scope_name = format!("Work{i}");
    {
        let _scope = ScopeGuard::new(&scope_name);
        let buf: Vec<u8> = Vec::with_capacity(1000 + i * 512);
        drop(buf);
    }
    mtag::stat_key_prefix_for_thread(0)
}
