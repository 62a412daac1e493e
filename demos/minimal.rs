/*!
 * Minimal Demo
 * Two nested scopes, stats printed to stdout
 */

use mtag::{CollectOptions, EngineConfig, OutputFormat, ScopeAlloc, ScopeGuard};

#[global_allocator]
static ALLOC: ScopeAlloc = ScopeAlloc::system();

fn func_a() {
    let _scope = ScopeGuard::new("FuncA");

    let mut buffer: Vec<u8> = Vec::with_capacity(1024);
    buffer.extend_from_slice(b"some payload");
    func_b();
}

fn func_b() {
    let _scope = ScopeGuard::with_class("Worker", "run");

    // a map triggers a shower of small allocations
    let mut table = std::collections::HashMap::new();
    for i in 0..1000u32 {
        table.insert(format!("onemorekey{i}"), i);
    }
}

fn main() {
    if !mtag::init(EngineConfig::from_env()) {
        eprintln!("profiler failed to start");
        return;
    }

    func_a();

    print!(
        "{}",
        mtag::collect_stats(OutputFormat::HumanText, &CollectOptions::default())
    );

    // honors MTAG_STATS_OUTPUT_JSON / MTAG_STATS_OUTPUT_GRAPHVIZ_DOT
    if mtag::write_stats(OutputFormat::All, "", &CollectOptions::default()) {
        println!("wrote stats files to the env-configured paths");
    }
}
