//! Host image discovery
//!
//! Finds where the main executable of the current process is loaded. The
//! result changes between runs (ASLR), so it is always queried live.

use crate::error::ImageError;

/// Base address of the main executable image of the current process
#[cfg(windows)]
pub fn current_image_base() -> Result<usize, ImageError> {
    use windows::core::PCWSTR;
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;

    // SAFETY: a null module name asks for the executable that created the process
    let module = unsafe { GetModuleHandleW(PCWSTR::null()) }
        .map_err(|e| ImageError::NotFound(e.to_string()))?;

    if module.is_invalid() {
        return Err(ImageError::NotFound("GetModuleHandleW returned null".into()));
    }

    Ok(module.0 as usize)
}

/// Base address of the main executable image of the current process
///
/// The first object reported by `dl_iterate_phdr` is the main program. Its
/// base is the load bias plus the lowest `PT_LOAD` virtual address, which
/// matches what a disassembler shows as the image base.
#[cfg(target_os = "linux")]
pub fn current_image_base() -> Result<usize, ImageError> {
    use std::ffi::{c_int, c_void};

    unsafe extern "C" fn first_object(
        info: *mut libc::dl_phdr_info,
        _size: usize,
        data: *mut c_void,
    ) -> c_int {
        let out = &mut *(data as *mut Option<usize>);
        let info = &*info;

        let mut lowest: Option<usize> = None;
        if !info.dlpi_phdr.is_null() {
            let headers = std::slice::from_raw_parts(info.dlpi_phdr, info.dlpi_phnum as usize);
            for header in headers {
                if header.p_type == libc::PT_LOAD {
                    let vaddr = header.p_vaddr as usize;
                    lowest = Some(lowest.map_or(vaddr, |l| l.min(vaddr)));
                }
            }
        }

        *out = Some((info.dlpi_addr as usize).wrapping_add(lowest.unwrap_or(0)));

        // Non-zero stops the iteration after the main program
        1
    }

    let mut base: Option<usize> = None;
    unsafe {
        libc::dl_iterate_phdr(Some(first_object), &mut base as *mut Option<usize> as *mut c_void);
    }

    base.ok_or_else(|| ImageError::NotFound("dl_iterate_phdr reported no objects".into()))
}

/// Base address of the main executable image of the current process
#[cfg(not(any(windows, target_os = "linux")))]
pub fn current_image_base() -> Result<usize, ImageError> {
    Err(ImageError::Unsupported)
}
