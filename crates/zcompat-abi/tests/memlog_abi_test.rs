//! Integration test for the memory diagnostics entry points.
//!
//! The runtime reads the environment once, so everything runs in a single
//! test that configures the process before the first entry-point call.

use std::ffi::{CStr, CString};
use std::fs;

use zcompat_abi::current_tid;
use zcompat_abi::memlog_abi::{
    __doLogMemoryAll, __doLogMemoryInc, __doLogMemoryUsage, __doLogMemoryWarning,
    __getLogMemoryFileNo, __getMemoryUsageLogFile, __memlog_alloc, __memlog_alloc_failed,
    __memlog_free, __memputs, __memputsx,
};

#[test]
fn file_destination_end_to_end() {
    let path = std::env::temp_dir().join(format!("zcompat-abi-memlog-{}.log", std::process::id()));
    let _ = fs::remove_file(&path);

    // SAFETY: this binary has one test and nothing else reads the environment yet.
    unsafe {
        std::env::set_var("ZCOMPAT_MEMLOG_FILE", &path);
        std::env::set_var("ZCOMPAT_MEMLOG_LEVEL", "all");
        std::env::set_var("ZCOMPAT_MEMLOG_INC", "1K");
        std::env::remove_var("ZCOMPAT_MEMLOG");
        std::env::remove_var("ZCOMPAT_MEMLOG_FORMAT");
    }

    assert!(__doLogMemoryUsage());
    assert!(__doLogMemoryAll());
    assert!(!__doLogMemoryWarning());

    let name = __getMemoryUsageLogFile();
    assert!(!name.is_null());
    // SAFETY: the runtime keeps the name alive for the process lifetime.
    let name = unsafe { CStr::from_ptr(name) };
    assert_eq!(name.to_str().unwrap(), path.to_str().unwrap());

    let msg = CString::new("malloc(64) = 0x1000").unwrap();
    let written = unsafe { __memputs(msg.as_ptr()) };
    assert!(written > msg.as_bytes().len() as i32);
    let raw = CString::new("--- summary ---").unwrap();
    assert_eq!(unsafe { __memputsx(raw.as_ptr()) }, 16);
    assert_eq!(unsafe { __memputs(std::ptr::null()) }, 0);

    assert!(__getLogMemoryFileNo() > 2);

    // Increment gate with a caller-owned last value; 0 means never reported.
    let mut last: usize = 0;
    assert!(unsafe { __doLogMemoryInc(500, &mut last) });
    assert_eq!(last, 500);
    assert!(!unsafe { __doLogMemoryInc(1200, &mut last) });
    assert_eq!(last, 500);
    assert!(unsafe { __doLogMemoryInc(1524, &mut last) });
    assert_eq!(last, 1524);
    assert!(unsafe { __doLogMemoryInc(10, std::ptr::null_mut()) });

    let block = 0x7f00_0000_1000usize as *const std::ffi::c_void;
    assert!(__memlog_alloc(block, 4096));
    assert!(!__memlog_alloc(block, 8));
    assert!(!__memlog_free(block, 8));
    assert!(__memlog_alloc_failed(1 << 40));

    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    let pid = std::process::id().to_string();
    assert!(lines[0].ends_with(": malloc(64) = 0x1000"));
    let (prefix, _) = lines[0].split_once(": ").unwrap();
    let (line_pid, line_tid) = prefix.split_once(' ').unwrap();
    assert_eq!(line_pid, pid);
    // The tid is the kernel's, so it names an entry under /proc/<pid>/task.
    assert_eq!(line_tid, current_tid().to_string());
    assert!(std::path::Path::new(&format!("/proc/{pid}/task/{line_tid}")).exists());
    assert!(lines[2].starts_with(prefix));
    assert_eq!(lines[1], "--- summary ---");
    assert!(lines[2].contains("size=4096 outstanding=4096"));
    assert!(lines[3].contains("failed"));
    assert_eq!(lines.len(), 4);

    let _ = fs::remove_file(&path);
}
