/*!
 * Happy-path scenarios
 * Nested scope attribution, realloc accounting, unbalanced frees
 */

use mtag::{CollectOptions, EngineConfig, OutputFormat, ScopeAlloc, ScopeGuard};
use pretty_assertions::assert_eq;
use std::alloc::{alloc, dealloc, realloc, Layout};
use std::thread;

#[global_allocator]
static ALLOC: ScopeAlloc = ScopeAlloc::system();

fn main() {
    assert!(mtag::init(EngineConfig::default()));
    thread::Builder::new()
        .name("hp_worker".into())
        .spawn(worker)
        .unwrap()
        .join()
        .expect("worker panicked");
    json_document_is_well_formed();
    human_text_renders();
    println!("happy_path: ok");
}

fn worker() {
    nested_scopes();
    realloc_in_scope();
    free_outside_home_scope();
    class_scope();

    let map = mtag::collect_stats_map();
    let prefix = mtag::stat_key_prefix_for_thread(0);
    let root = format!("{prefix}hp_worker");

    // nested allocations attribute to the innermost open scope
    let a = format!("{root}.A");
    let b = format!("{root}.A.B");
    assert!(map[&format!("{a}.nBytesSelfAllocated")] >= 100);
    assert!(map[&format!("{b}.nBytesSelfAllocated")] >= 200);
    assert_eq!(map[&format!("{a}.nCallsTo_malloc")], 1);
    assert_eq!(map[&format!("{b}.nCallsTo_malloc")], 1);
    assert_eq!(map[&format!("{b}.nTimesEnteredAndExited")], 1);
    // usable sizes are symmetric: alloc+free inside one scope balances
    assert_eq!(
        map[&format!("{b}.nBytesSelfAllocated")],
        map[&format!("{b}.nBytesSelfFreed")]
    );

    // totals aggregate self plus children
    assert_eq!(
        map[&format!("{a}.nBytesTotalAllocated")],
        map[&format!("{a}.nBytesSelfAllocated")] + map[&format!("{b}.nBytesTotalAllocated")]
    );

    // realloc counts as a fresh allocation of the new usable size
    let r = format!("{root}.R");
    assert_eq!(map[&format!("{r}.nCallsTo_malloc")], 1);
    assert_eq!(map[&format!("{r}.nCallsTo_realloc")], 1);
    assert_eq!(map[&format!("{r}.nCallsTo_free")], 1);
    assert!(
        map[&format!("{r}.nBytesSelfAllocated")] >= map[&format!("{r}.nBytesSelfFreed")],
        "realloc accounting must not underflow"
    );

    // a free of a block allocated elsewhere clamps at zero and is counted
    let f = format!("{root}.F");
    assert_eq!(map[&format!("{f}.nBytesSelfAllocated")], 0);
    assert!(map[&format!("{f}.nBytesSelfFreed")] >= 300);
    assert_eq!(map[&format!("{f}.nCallsTo_free")], 1);
    assert!(map[&format!("{prefix}.nFreeTrackingFailed")] >= 1);

    // class-qualified scopes join with "::"
    let c = format!("{root}.Codec::decode");
    assert_eq!(map[&format!("{c}.nCallsTo_malloc")], 1);
    assert!(map[&format!("{c}.nBytesSelfAllocated")] >= 128);

    // quiescent thread: a second pass returns the same counters
    let again = mtag::collect_stats_map();
    for key in [
        format!("{a}.nBytesSelfAllocated"),
        format!("{b}.nBytesSelfAllocated"),
        format!("{r}.nCallsTo_realloc"),
    ] {
        assert_eq!(map[&key], again[&key], "map not stable for {key}");
    }
}

fn nested_scopes() {
    let layout_a = Layout::from_size_align(100, 8).unwrap();
    let layout_b = Layout::from_size_align(200, 8).unwrap();
    let _a = ScopeGuard::new("A");
    let pa = unsafe { alloc(layout_a) };
    assert!(!pa.is_null());
    {
        let _b = ScopeGuard::new("B");
        let pb = unsafe { alloc(layout_b) };
        assert!(!pb.is_null());
        unsafe { dealloc(pb, layout_b) };
    }
    unsafe { dealloc(pa, layout_a) };
}

fn realloc_in_scope() {
    let _r = ScopeGuard::new("R");
    unsafe {
        let layout = Layout::from_size_align(100, 8).unwrap();
        let p = alloc(layout);
        assert!(!p.is_null());
        let p2 = realloc(p, layout, 200);
        assert!(!p2.is_null());
        dealloc(p2, Layout::from_size_align(200, 8).unwrap());
    }
}

fn free_outside_home_scope() {
    let layout = Layout::from_size_align(300, 8).unwrap();
    // allocated at the root scope...
    let p = unsafe { alloc(layout) };
    assert!(!p.is_null());
    {
        // ...freed in a scope that never allocated anything
        let _f = ScopeGuard::new("F");
        unsafe { dealloc(p, layout) };
    }
}

fn class_scope() {
    let layout = Layout::from_size_align(128, 8).unwrap();
    let _scope = ScopeGuard::with_class("Codec", "decode");
    let p = unsafe { alloc(layout) };
    assert!(!p.is_null());
    unsafe { dealloc(p, layout) };
}

fn json_document_is_well_formed() {
    let doc = mtag::collect_stats(OutputFormat::Json, &CollectOptions::default());
    let v: serde_json::Value = serde_json::from_str(&doc).expect("stats must be valid JSON");
    assert_eq!(v["PID"], std::process::id());
    assert!(v.get("tmStartProfiling").is_some());
    assert!(v.get("tmCurrentSnapshot").is_some());
    assert!(v.get("nBytesAllocBeforeInit").is_some());
    assert!(v.get("nTotalTrackedBytes").is_some());
    assert!(v["nBytesMallocTagSelfUsage"].as_u64().unwrap() > 0);
    let obj = v.as_object().unwrap();
    assert!(
        obj.keys().any(|k| k.starts_with("tree_for_TID")),
        "document must carry one object per tree"
    );
}

fn human_text_renders() {
    let text = mtag::collect_stats(OutputFormat::HumanText, &CollectOptions::default());
    assert!(text.contains("Thread '"));
    assert!(text.contains("Total tracked across all threads"));
}
