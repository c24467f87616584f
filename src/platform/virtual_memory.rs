//! Page-granular virtual memory, mirroring the `plVirtualMemoryI` table's
//! `get_page_size`/`reserve`/`commit`/`uncommit`/`free` operations. Used by
//! the memory tracker (component B) to back large, sparsely-committed
//! arenas (ECS component pools) without committing physical pages until
//! touched.

use std::ffi::c_void;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VirtualMemoryError {
    #[error("mmap reservation of {size} bytes failed (errno {errno})")]
    ReserveFailed { size: usize, errno: i32 },
    #[error("mprotect commit of {size} bytes at {addr:p} failed (errno {errno})")]
    CommitFailed {
        addr: *const c_void,
        size: usize,
        errno: i32,
    },
    #[error("munmap of {size} bytes at {addr:p} failed (errno {errno})")]
    FreeFailed {
        addr: *const c_void,
        size: usize,
        errno: i32,
    },
}

/// The OS page size, queried once and cached.
pub fn page_size() -> usize {
    lazy_static::lazy_static! {
        static ref PAGE_SIZE: usize = unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize };
    }
    *PAGE_SIZE
}

/// Reserve (but do not commit) `size` bytes of address space, rounded up
/// to a page boundary.
pub fn reserve(size: usize) -> Result<*mut c_void, VirtualMemoryError> {
    let size = round_up_to_page(size);
    // SAFETY: a bare anonymous reservation with no backing file; the
    // returned pointer is handed back to the caller who owns its lifetime
    // until `free`.
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            size,
            libc::PROT_NONE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        )
    };
    if ptr == libc::MAP_FAILED {
        return Err(VirtualMemoryError::ReserveFailed {
            size,
            errno: unsafe { *libc::__errno_location() },
        });
    }
    Ok(ptr)
}

/// Commit `size` bytes starting at `addr` (previously returned by
/// `reserve`), making them readable/writable.
///
/// # Safety
/// `addr` must point into a region previously reserved with `reserve` and
/// not yet freed, with `size` not exceeding the remaining reservation.
pub unsafe fn commit(addr: *mut c_void, size: usize) -> Result<(), VirtualMemoryError> {
    let size = round_up_to_page(size);
    let result = libc::mprotect(addr, size, libc::PROT_READ | libc::PROT_WRITE);
    if result != 0 {
        return Err(VirtualMemoryError::CommitFailed {
            addr,
            size,
            errno: *libc::__errno_location(),
        });
    }
    Ok(())
}

/// Uncommit (decommit) `size` bytes starting at `addr`, returning them to
/// `PROT_NONE` without releasing the address space.
///
/// # Safety
/// Same preconditions as `commit`.
pub unsafe fn uncommit(addr: *mut c_void, size: usize) -> Result<(), VirtualMemoryError> {
    let size = round_up_to_page(size);
    let result = libc::mprotect(addr, size, libc::PROT_NONE);
    if result != 0 {
        return Err(VirtualMemoryError::CommitFailed {
            addr,
            size,
            errno: *libc::__errno_location(),
        });
    }
    Ok(())
}

/// Release a reservation made with `reserve`.
///
/// # Safety
/// `addr`/`size` must exactly match a prior `reserve` call; the region
/// must not be used after this call.
pub unsafe fn free(addr: *mut c_void, size: usize) -> Result<(), VirtualMemoryError> {
    let size = round_up_to_page(size);
    let result = libc::munmap(addr, size);
    if result != 0 {
        return Err(VirtualMemoryError::FreeFailed {
            addr,
            size,
            errno: *libc::__errno_location(),
        });
    }
    Ok(())
}

fn round_up_to_page(size: usize) -> usize {
    let page = page_size();
    (size + page - 1) / page * page
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_plausible() {
        let size = page_size();
        assert!(size >= 4096);
        assert_eq!(size & (size - 1), 0, "page size should be a power of two");
    }

    #[test]
    fn test_reserve_commit_free_roundtrip() {
        let size = page_size() * 4;
        let addr = reserve(size).expect("reserve");
        unsafe {
            commit(addr, size).expect("commit");
            let byte_ptr = addr as *mut u8;
            *byte_ptr = 42;
            assert_eq!(*byte_ptr, 42);
            free(addr, size).expect("free");
        }
    }

    #[test]
    fn test_round_up_to_page() {
        let page = page_size();
        assert_eq!(round_up_to_page(1), page);
        assert_eq!(round_up_to_page(page), page);
        assert_eq!(round_up_to_page(page + 1), page * 2);
    }
}
