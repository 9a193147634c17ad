//! Trampoline memory allocation
//!
//! Hands out small executable blocks and pointer slots. On x86-64 every block
//! lies within ±2GB of the address it was requested for so that the
//! RIP-relative `jmp [slot]` encoding can reach it; on x86 any address works.
//!
//! Pages are mapped read/write/execute and never returned to the system.

use parking_lot::Mutex;
use std::collections::BTreeMap;

use super::emitter::SLOT_SIZE;
use super::inline::HookError;

/// Default trampoline size (relocated prologue plus the jump back)
pub const TRAMPOLINE_SIZE: usize = 64;

/// Alignment for code blocks
pub const CODE_ALIGN: usize = 16;

/// Maximum distance between a block and its target (just under 2GB)
const MAX_RANGE: usize = 0x7FFF_0000;

/// Distance between successive placement hints
const HINT_STEP: usize = 0x4_0000;

/// Global trampoline allocator
static ALLOCATOR: Mutex<TrampolineAllocator> = Mutex::new(TrampolineAllocator::new());

/// Allocator for executable trampolines
struct TrampolineAllocator {
    /// Pages allocated, keyed by base address
    pages: BTreeMap<usize, PageInfo>,
}

struct PageInfo {
    size: usize,
    used: usize,
}

fn distance(a: usize, b: usize) -> usize {
    a.abs_diff(b)
}

/// Whether `[base, base + size)` is reachable from `target` with a 32-bit displacement
fn in_range(base: usize, size: usize, target: usize) -> bool {
    if cfg!(target_pointer_width = "32") {
        return true;
    }
    distance(base, target) < MAX_RANGE && distance(base + size, target) < MAX_RANGE
}

fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

impl TrampolineAllocator {
    const fn new() -> Self {
        Self {
            pages: BTreeMap::new(),
        }
    }

    /// Carve `size` bytes out of a page near `target`
    fn alloc_near(&mut self, target: usize, size: usize, align: usize) -> Option<usize> {
        for (&base, page) in &mut self.pages {
            let offset = align_up(page.used, align);
            if offset + size <= page.size && in_range(base + offset, size, target) {
                page.used = offset + size;
                return Some(base + offset);
            }
        }

        let page_size = region::page::size();
        if size > page_size {
            tracing::error!("Trampoline request of {} bytes exceeds a page", size);
            return None;
        }

        let base = self.alloc_page_near(target, page_size)?;
        self.pages.insert(
            base,
            PageInfo {
                size: page_size,
                used: size,
            },
        );
        Some(base)
    }

    /// Placement hints, alternating above and below the target
    fn hints(target: usize) -> impl Iterator<Item = usize> {
        let target = target & !(HINT_STEP - 1);
        (1..MAX_RANGE / HINT_STEP)
            .flat_map(move |i| {
                let step = i * HINT_STEP;
                [target.checked_sub(step), target.checked_add(step)]
            })
            .flatten()
            .filter(|&hint| hint != 0)
    }

    #[cfg(unix)]
    fn alloc_page_near(&mut self, target: usize, page_size: usize) -> Option<usize> {
        use nix::sys::mman::{mmap_anonymous, munmap, MapFlags, ProtFlags};
        use std::num::NonZeroUsize;

        let length = NonZeroUsize::new(page_size)?;
        let prot = ProtFlags::PROT_READ | ProtFlags::PROT_WRITE | ProtFlags::PROT_EXEC;
        let flags = MapFlags::MAP_PRIVATE | MapFlags::MAP_ANONYMOUS;

        let map = |hint: Option<NonZeroUsize>| unsafe { mmap_anonymous(hint, length, prot, flags) };

        if cfg!(target_pointer_width = "32") {
            return map(None).ok().map(|ptr| ptr.as_ptr() as usize);
        }

        for hint in Self::hints(target) {
            let Ok(ptr) = map(NonZeroUsize::new(hint)) else {
                continue;
            };

            let actual = ptr.as_ptr() as usize;
            if in_range(actual, page_size, target) {
                return Some(actual);
            }

            // The kernel ignored the hint; nothing free around it
            unsafe {
                let _ = munmap(ptr, page_size);
            }
        }

        tracing::error!("Failed to allocate page near {:#x}", target);
        None
    }

    #[cfg(windows)]
    fn alloc_page_near(&mut self, target: usize, page_size: usize) -> Option<usize> {
        use windows::Win32::System::Memory::{
            VirtualAlloc, VirtualFree, MEM_COMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_EXECUTE_READWRITE,
        };

        let alloc = |hint: Option<usize>| unsafe {
            VirtualAlloc(
                hint.map(|h| h as *const std::ffi::c_void),
                page_size,
                MEM_COMMIT | MEM_RESERVE,
                PAGE_EXECUTE_READWRITE,
            )
        };

        if cfg!(target_pointer_width = "32") {
            let ptr = alloc(None);
            return (!ptr.is_null()).then_some(ptr as usize);
        }

        for hint in Self::hints(target) {
            let ptr = alloc(Some(hint));
            if ptr.is_null() {
                continue;
            }

            let actual = ptr as usize;
            if in_range(actual, page_size, target) {
                return Some(actual);
            }

            unsafe {
                let _ = VirtualFree(ptr, 0, MEM_RELEASE);
            }
        }

        tracing::error!("Failed to allocate page near {:#x}", target);
        None
    }

    #[cfg(not(any(unix, windows)))]
    fn alloc_page_near(&mut self, target: usize, _page_size: usize) -> Option<usize> {
        tracing::error!("No executable allocator for this platform (target {:#x})", target);
        None
    }
}

/// Allocate an executable block of `size` bytes near `target`
pub fn alloc_code(target: usize, size: usize) -> Result<usize, HookError> {
    ALLOCATOR
        .lock()
        .alloc_near(target, size, CODE_ALIGN)
        .ok_or(HookError::Allocation { target, size })
}

/// Allocate a default-sized trampoline near `target`
pub fn alloc_trampoline(target: usize) -> Result<usize, HookError> {
    alloc_code(target, TRAMPOLINE_SIZE)
}

/// Allocate a pointer slot near `target` holding `value`
pub fn alloc_slot(target: usize, value: usize) -> Result<usize, HookError> {
    let slot = ALLOCATOR
        .lock()
        .alloc_near(target, SLOT_SIZE, SLOT_SIZE)
        .ok_or(HookError::Allocation {
            target,
            size: SLOT_SIZE,
        })?;

    unsafe { set_slot(slot, value) };
    Ok(slot)
}

/// Overwrite the pointer held by a slot
///
/// # Safety
/// `slot` must come from [`alloc_slot`].
pub unsafe fn set_slot(slot: usize, value: usize) {
    (slot as *mut usize).write_volatile(value);
}

/// Read the pointer held by a slot
///
/// # Safety
/// `slot` must come from [`alloc_slot`].
pub unsafe fn slot_value(slot: usize) -> usize {
    (slot as *const usize).read_volatile()
}

/// Copy code into an allocated block
///
/// # Safety
/// `block` must come from [`alloc_code`] with at least `code.len()` bytes.
pub unsafe fn write_code(block: usize, code: &[u8]) {
    std::ptr::copy_nonoverlapping(code.as_ptr(), block as *mut u8, code.len());
}
