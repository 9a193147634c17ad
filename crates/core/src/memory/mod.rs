//! Foreign memory access
//!
//! Reads and writes arbitrary byte ranges at absolute addresses in the host
//! process. Every access temporarily makes the range readable, writable and
//! executable, performs the transfer, then restores whatever protection each
//! page had before (the guard remembers it, nothing is hard-coded).
//!
//! No synchronization with the host's own threads is attempted. Callers are
//! expected to patch code the host is not executing at that moment.

use region::{Protection, ProtectGuard};

/// Error type for memory access
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("Null address")]
    NullAddress,

    #[error("Failed to change protection of {size} bytes at {address:#x}: {source}")]
    Protection {
        address: usize,
        size: usize,
        #[source]
        source: region::Error,
    },
}

/// Make `[address, address + size)` RWX until the guard drops
unsafe fn unlock(address: usize, size: usize) -> Result<ProtectGuard, MemoryError> {
    if address == 0 {
        return Err(MemoryError::NullAddress);
    }

    region::protect_with_handle(address as *const u8, size, Protection::READ_WRITE_EXECUTE)
        .map_err(|source| MemoryError::Protection {
            address,
            size,
            source,
        })
}

/// Copy `size` bytes out of `address`
///
/// # Safety
/// `address..address + size` must be mapped memory of this process.
pub unsafe fn read_bytes(address: usize, size: usize) -> Result<Vec<u8>, MemoryError> {
    if size == 0 {
        return Ok(Vec::new());
    }

    let _guard = unlock(address, size)?;
    let mut out = vec![0u8; size];
    std::ptr::copy_nonoverlapping(address as *const u8, out.as_mut_ptr(), size);
    Ok(out)
}

/// Copy `bytes` to `address`
///
/// # Safety
/// `address..address + bytes.len()` must be mapped memory of this process and
/// no thread may be executing or reading it concurrently.
pub unsafe fn write_bytes(address: usize, bytes: &[u8]) -> Result<(), MemoryError> {
    if bytes.is_empty() {
        return Ok(());
    }

    let _guard = unlock(address, bytes.len())?;
    std::ptr::copy_nonoverlapping(bytes.as_ptr(), address as *mut u8, bytes.len());
    Ok(())
}

/// Set `len` bytes at `address` to `byte`
///
/// # Safety
/// Same as [`write_bytes`].
pub unsafe fn fill(address: usize, byte: u8, len: usize) -> Result<(), MemoryError> {
    if len == 0 {
        return Ok(());
    }

    let _guard = unlock(address, len)?;
    std::ptr::write_bytes(address as *mut u8, byte, len);
    Ok(())
}

/// Read a `T` from `address` (no alignment requirement)
///
/// # Safety
/// Same as [`read_bytes`], and the bytes must be a valid `T`.
pub unsafe fn read<T: Copy>(address: usize) -> Result<T, MemoryError> {
    let _guard = unlock(address, std::mem::size_of::<T>())?;
    Ok((address as *const T).read_unaligned())
}

/// Write a `T` to `address` (no alignment requirement)
///
/// # Safety
/// Same as [`write_bytes`].
pub unsafe fn write<T: Copy>(address: usize, value: &T) -> Result<(), MemoryError> {
    let _guard = unlock(address, std::mem::size_of::<T>())?;
    (address as *mut T).write_unaligned(*value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_roundtrip_on_heap() {
        let mut buffer = vec![0u8; 32];
        let address = buffer.as_mut_ptr() as usize;

        unsafe {
            write_bytes(address + 4, &[1, 2, 3, 4]).unwrap();
            assert_eq!(read_bytes(address + 4, 4).unwrap(), vec![1, 2, 3, 4]);
        }

        assert_eq!(&buffer[4..8], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_typed_access_unaligned() {
        let mut buffer = vec![0u8; 16];
        let address = buffer.as_mut_ptr() as usize + 1;

        unsafe {
            write::<f32>(address, &2.5).unwrap();
            assert_eq!(read::<f32>(address).unwrap(), 2.5);
        }
    }

    #[test]
    fn test_write_restores_previous_protection() {
        let mut page = region::alloc(region::page::size(), Protection::READ).unwrap();
        let address = page.as_mut_ptr::<u8>() as usize;

        unsafe {
            write_bytes(address, &[0xC3]).unwrap();
            assert_eq!(read::<u8>(address).unwrap(), 0xC3);

            let info = region::query(address as *const u8).unwrap();
            assert_eq!(info.protection(), Protection::READ);
        }
    }

    #[test]
    fn test_fill() {
        let mut buffer = vec![0u8; 8];
        let address = buffer.as_mut_ptr() as usize;

        unsafe { fill(address + 2, 0x90, 4).unwrap() };

        assert_eq!(buffer, vec![0, 0, 0x90, 0x90, 0x90, 0x90, 0, 0]);
    }

    #[test]
    fn test_null_address_is_rejected() {
        let result = unsafe { read_bytes(0, 4) };
        assert!(matches!(result, Err(MemoryError::NullAddress)));
    }

    #[test]
    fn test_empty_ranges_are_noops() {
        unsafe {
            assert!(read_bytes(0, 0).unwrap().is_empty());
            write_bytes(0, &[]).unwrap();
        }
    }
}
