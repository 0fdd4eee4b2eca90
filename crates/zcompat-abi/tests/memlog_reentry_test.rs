//! Logging entry points called from inside a global allocator.
//!
//! The allocator below reports every allocation made on an armed thread
//! through one of the entry points. Each entry point allocates while it logs,
//! so without a per-thread guard the report would re-enter itself until the
//! stack ran out.

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;
use std::ffi::CString;
use std::fs;
use std::hint::black_box;
use std::sync::atomic::{AtomicUsize, Ordering};

use zcompat_abi::memlog_abi::{__memlog_alloc, __memputs};

/// Nesting at which the allocator stops reporting, so a regression fails the
/// assertion instead of overflowing the stack.
const DEPTH_CAP: usize = 8;

const HOOK_OFF: u8 = 0;
const HOOK_MEMPUTS: u8 = 1;
const HOOK_MEMLOG_ALLOC: u8 = 2;

static MAX_DEPTH: AtomicUsize = AtomicUsize::new(0);
static MESSAGE: &[u8] = b"allocation observed\0";

thread_local! {
    static HOOK: Cell<u8> = const { Cell::new(HOOK_OFF) };
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

struct ReportingAlloc;

unsafe impl GlobalAlloc for ReportingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: forwarding the caller's layout to the system allocator.
        let ptr = unsafe { System.alloc(layout) };
        let hook = HOOK.with(Cell::get);
        if hook == HOOK_OFF {
            return ptr;
        }
        let depth = DEPTH.with(|d| {
            d.set(d.get() + 1);
            d.get()
        });
        MAX_DEPTH.fetch_max(depth, Ordering::Relaxed);
        if depth <= DEPTH_CAP {
            match hook {
                // SAFETY: MESSAGE is NUL-terminated and static.
                HOOK_MEMPUTS => unsafe {
                    __memputs(MESSAGE.as_ptr().cast());
                },
                _ => {
                    __memlog_alloc(ptr.cast(), layout.size());
                }
            }
        }
        DEPTH.with(|d| d.set(d.get() - 1));
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: `ptr` came from `alloc` above, which used the system allocator.
        unsafe { System.dealloc(ptr, layout) };
    }
}

#[global_allocator]
static GLOBAL: ReportingAlloc = ReportingAlloc;

/// Make one allocation with `hook` armed on this thread and return the
/// deepest allocator nesting it caused.
fn allocate_with_hook(hook: u8) -> usize {
    MAX_DEPTH.store(0, Ordering::Relaxed);
    HOOK.with(|h| h.set(hook));
    let block: Vec<u8> = Vec::with_capacity(black_box(64));
    HOOK.with(|h| h.set(HOOK_OFF));
    black_box(&block);
    drop(block);
    MAX_DEPTH.load(Ordering::Relaxed)
}

#[test]
fn reports_from_allocator_do_not_recurse() {
    let path = std::env::temp_dir().join(format!(
        "zcompat-abi-reentry-{}.log",
        std::process::id()
    ));
    let _ = fs::remove_file(&path);

    // SAFETY: this binary has one test and nothing else reads the environment yet.
    unsafe {
        std::env::set_var("ZCOMPAT_MEMLOG_FILE", &path);
        std::env::set_var("ZCOMPAT_MEMLOG_LEVEL", "all");
        std::env::remove_var("ZCOMPAT_MEMLOG");
        std::env::remove_var("ZCOMPAT_MEMLOG_INC");
        std::env::remove_var("ZCOMPAT_MEMLOG_FORMAT");
    }

    // First use builds the runtime from inside the allocator as well.
    assert_eq!(allocate_with_hook(HOOK_MEMPUTS), 2);
    assert_eq!(allocate_with_hook(HOOK_MEMPUTS), 2);
    assert_eq!(allocate_with_hook(HOOK_MEMLOG_ALLOC), 2);

    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3, "unexpected log contents: {text:?}");
    assert!(lines[0].ends_with(": allocation observed"));
    assert!(lines[1].ends_with(": allocation observed"));
    assert!(lines[2].contains("size=64"));

    // Outside the allocator the entry point still writes normally.
    let msg = CString::new("after").unwrap();
    assert!(unsafe { __memputs(msg.as_ptr()) } > 0);

    let _ = fs::remove_file(&path);
}
