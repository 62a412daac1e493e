/*!
 * OS Introspection
 * Kernel thread ids and names, procfs memory figures, stack sizes
 *
 * Everything here is best-effort: a failed query degrades to a fallback
 * value and the profiler keeps going. None of these functions run on the
 * allocation hot path.
 */

use crate::core::types::{ScopeName, Tid};

/// Process id
#[inline]
pub fn pid() -> u32 {
    std::process::id()
}

/// Kernel thread id of the calling thread
#[cfg(target_os = "linux")]
#[inline]
pub fn gettid() -> Tid {
    // gettid(2) has no glibc wrapper on older toolchains
    unsafe { libc::syscall(libc::SYS_gettid) as Tid }
}

#[cfg(not(target_os = "linux"))]
#[inline]
pub fn gettid() -> Tid {
    std::process::id() as Tid
}

/// Kernel-assigned name of the calling thread (PR_GET_NAME), used as the
/// root scope name of the thread's tree.
#[cfg(target_os = "linux")]
pub fn current_thread_name() -> ScopeName {
    let mut buf = [0u8; 16]; // PR_GET_NAME writes at most 16 bytes incl. NUL
    let rc = unsafe { libc::prctl(libc::PR_GET_NAME, buf.as_mut_ptr()) };
    if rc == 0 && buf[0] != 0 {
        ScopeName::from_raw_bytes(&buf)
    } else {
        ScopeName::new("unknown")
    }
}

#[cfg(not(target_os = "linux"))]
pub fn current_thread_name() -> ScopeName {
    match std::thread::current().name() {
        Some(name) => ScopeName::new(name),
        None => ScopeName::new("unknown"),
    }
}

/// Current process virtual size (`VmSize`) in bytes
pub fn process_vm_size_bytes() -> Option<u64> {
    read_status_field("VmSize:")
}

/// Current process resident set (`VmRSS`) in bytes
pub fn process_vm_rss_bytes() -> Option<u64> {
    read_status_field("VmRSS:")
}

#[cfg(target_os = "linux")]
fn read_status_field(key: &str) -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_status_field(&status, key)
}

#[cfg(not(target_os = "linux"))]
fn read_status_field(_key: &str) -> Option<u64> {
    None
}

/// Parse a `/proc/self/status` line of the form `VmSize:   123456 kB`
fn parse_status_field(status: &str, key: &str) -> Option<u64> {
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix(key) {
            let kb: u64 = rest.split_whitespace().next()?.parse().ok()?;
            return Some(kb * 1024);
        }
    }
    None
}

/// Stack size of the calling thread
#[cfg(target_os = "linux")]
pub fn current_thread_stack_size() -> Option<u64> {
    unsafe {
        let mut attr: libc::pthread_attr_t = std::mem::zeroed();
        if libc::pthread_getattr_np(libc::pthread_self(), &mut attr) != 0 {
            return None;
        }
        let mut stack_addr: *mut libc::c_void = std::ptr::null_mut();
        let mut stack_size: libc::size_t = 0;
        let rc = libc::pthread_attr_getstack(&attr, &mut stack_addr, &mut stack_size);
        libc::pthread_attr_destroy(&mut attr);
        if rc == 0 {
            Some(stack_size as u64)
        } else {
            None
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub fn current_thread_stack_size() -> Option<u64> {
    None
}
