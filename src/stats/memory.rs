//! Process memory sampling
//!
//! Allocation counts come from [`CountingAllocator`], which a binary opts
//! into with `#[global_allocator]`. The resident set size comes from
//! `sysinfo`, and the stack size from `/proc/self/status` on Linux. Without
//! the allocator installed, heap usage falls back to the resident set size
//! and the alloc/free counts stay at 0.

use std::alloc::{GlobalAlloc, Layout, System as SystemAlloc};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use sysinfo::{Pid, System};

static ALLOCATIONS: AtomicU64 = AtomicU64::new(0);
static DEALLOCATIONS: AtomicU64 = AtomicU64::new(0);
static LIVE_BYTES: AtomicU64 = AtomicU64::new(0);

/// Raw memory numbers read at one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemorySample {
    /// Heap bytes in use
    pub heap_in_use: u64,
    /// Stack bytes in use
    pub stack_in_use: u64,
    /// Cumulative allocation count
    pub mallocs: u64,
    /// Cumulative free count
    pub frees: u64,
}

/// Source of memory statistics for the aggregator
pub trait MemoryProbe: Send + Sync {
    /// Read the current numbers
    fn sample(&self) -> io::Result<MemorySample>;
}

/// Global allocator wrapper that counts allocations
///
/// ```no_run
/// #[global_allocator]
/// static ALLOC: roomcast::stats::CountingAllocator = roomcast::stats::CountingAllocator;
///
/// fn main() {}
/// ```
pub struct CountingAllocator;

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = SystemAlloc.alloc(layout);
        if !ptr.is_null() {
            ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
            LIVE_BYTES.fetch_add(layout.size() as u64, Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = SystemAlloc.alloc_zeroed(layout);
        if !ptr.is_null() {
            ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
            LIVE_BYTES.fetch_add(layout.size() as u64, Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        SystemAlloc.dealloc(ptr, layout);
        DEALLOCATIONS.fetch_add(1, Ordering::Relaxed);
        LIVE_BYTES.fetch_sub(layout.size() as u64, Ordering::Relaxed);
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = SystemAlloc.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() {
            if new_size >= layout.size() {
                LIVE_BYTES.fetch_add((new_size - layout.size()) as u64, Ordering::Relaxed);
            } else {
                LIVE_BYTES.fetch_sub((layout.size() - new_size) as u64, Ordering::Relaxed);
            }
        }
        new_ptr
    }
}

impl CountingAllocator {
    /// Counters recorded so far: (allocations, deallocations, live bytes)
    pub fn counts() -> (u64, u64, u64) {
        (
            ALLOCATIONS.load(Ordering::Relaxed),
            DEALLOCATIONS.load(Ordering::Relaxed),
            LIVE_BYTES.load(Ordering::Relaxed),
        )
    }

    /// Whether the allocator is installed and has seen traffic
    pub fn is_active() -> bool {
        ALLOCATIONS.load(Ordering::Relaxed) > 0
    }
}

/// Default probe for the current process
///
/// Resident size comes from `sysinfo`; the stack size is only available on
/// Linux, where it is read from `/proc/self/status`.
pub struct ProcessProbe {
    system: Mutex<System>,
    pid: Pid,
}

impl ProcessProbe {
    /// Create a probe for the running process
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
            pid: Pid::from_u32(std::process::id()),
        }
    }

    fn resident_bytes(&self) -> io::Result<u64> {
        let mut sys = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        sys.refresh_process(self.pid);

        sys.process(self.pid)
            .map(|process| process.memory())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "process not visible"))
    }
}

impl Default for ProcessProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for ProcessProbe {
    fn sample(&self) -> io::Result<MemorySample> {
        let (mallocs, frees, live) = CountingAllocator::counts();

        let heap_in_use = if CountingAllocator::is_active() {
            live
        } else {
            self.resident_bytes()?
        };

        Ok(MemorySample {
            heap_in_use,
            stack_in_use: stack_bytes(),
            mallocs,
            frees,
        })
    }
}

#[cfg(target_os = "linux")]
fn stack_bytes() -> u64 {
    std::fs::read_to_string("/proc/self/status")
        .map(|content| parse_stack(&content))
        .unwrap_or(0)
}

#[cfg(not(target_os = "linux"))]
fn stack_bytes() -> u64 {
    0
}

/// `VmStk` from a `/proc/<pid>/status` listing, in bytes
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_stack(content: &str) -> u64 {
    content
        .lines()
        .find_map(|line| line.strip_prefix("VmStk:"))
        .and_then(|value| value.split_whitespace().next())
        .and_then(|kb| kb.parse::<u64>().ok())
        .map(|kb| kb * 1024)
        .unwrap_or(0)
}
