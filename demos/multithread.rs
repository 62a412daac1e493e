/*!
 * Multithread Demo
 * Named worker threads each building their own scope tree
 */

use mtag::{CollectOptions, EngineConfig, OutputFormat, ScopeAlloc, ScopeGuard};
use std::thread;

#[global_allocator]
static ALLOC: ScopeAlloc = ScopeAlloc::system();

const NUM_WORKERS: usize = 2;

fn example_thread(thread_id: usize) {
    let _scope = ScopeGuard::new("ExampleThread");

    func_a(thread_id);
    let direct: Vec<u8> = Vec::with_capacity(5); // allocated directly by this scope
    drop(direct);
    func_b(thread_id);
}

fn func_a(thread_id: usize) {
    let _scope = ScopeGuard::new("FuncA");

    // each worker allocates a slightly different amount
    let buf: Vec<u8> = Vec::with_capacity(100 + thread_id * 1024);
    drop(buf);
    func_b(thread_id);
}

fn func_b(thread_id: usize) {
    let _scope = ScopeGuard::new("FuncB");

    let mut table = std::collections::BTreeMap::new();
    for i in 0..1000 + thread_id * 1000 {
        table.insert(format!("onemorekey{i}"), i as u64);
    }
}

fn uninstrumented_thread() {
    // no scopes: everything lands on this thread's root node
    let mut held = Vec::new();
    for i in 0..1000 {
        held.push("c".repeat(100 + i % 101));
    }
}

fn main() {
    if !mtag::init(EngineConfig::from_env()) {
        eprintln!("profiler failed to start");
        return;
    }

    let mut handles = Vec::new();
    for id in 0..NUM_WORKERS {
        handles.push(
            thread::Builder::new()
                .name(format!("ExampleThr/{id}"))
                .spawn(move || example_thread(id))
                .expect("spawn failed"),
        );
    }
    handles.push(
        thread::Builder::new()
            .name("NonInstrThr".into())
            .spawn(uninstrumented_thread)
            .expect("spawn failed"),
    );
    for h in handles {
        let _ = h.join();
    }

    print!(
        "{}",
        mtag::collect_stats(OutputFormat::HumanText, &CollectOptions::default())
    );

    let map = mtag::collect_stats_map();
    println!("trees: {}", map[".nTrees"]);

    if mtag::write_stats(OutputFormat::All, "", &CollectOptions::default()) {
        println!("wrote stats files to the env-configured paths");
    }
}
