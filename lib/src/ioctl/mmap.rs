use std::num::NonZeroUsize;
use std::ops::{Deref, DerefMut};
use std::os::unix::io::AsFd;
use std::ptr::NonNull;
use std::slice;

use log::error;
use nix::errno::Errno;
use nix::libc::{c_void, off_t};
use nix::sys::mman;
use thiserror::Error;

/// A read-write, shared mapping of a buffer object into the process address space.
///
/// The memory is unmapped when this object is dropped.
pub struct PlaneMapping {
    // A mapping remains valid until we munmap it, that is, until the
    // PlaneMapping object is deleted. Hence the static lifetime.
    data: &'static mut [u8],
}

impl PlaneMapping {
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.data.as_ptr()
    }

    /// Returns the start address of the mapping and forgets about it, i.e. the memory will not be
    /// unmapped when the returned pointer goes out of scope.
    pub fn leak(self) -> *mut c_void {
        let ptr = self.data.as_ptr() as *mut c_void;
        std::mem::forget(self);
        ptr
    }
}

impl std::fmt::Debug for PlaneMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaneMapping")
            .field("addr", &self.data.as_ptr())
            .field("size", &self.data.len())
            .finish()
    }
}

impl AsRef<[u8]> for PlaneMapping {
    fn as_ref(&self) -> &[u8] {
        &self.data[..]
    }
}

impl AsMut<[u8]> for PlaneMapping {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.data[..]
    }
}

impl Deref for PlaneMapping {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.data[..]
    }
}

impl DerefMut for PlaneMapping {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data[..]
    }
}

impl Drop for PlaneMapping {
    fn drop(&mut self) {
        // Safe because the pointer and length were constructed in mmap() and
        // are always valid.
        let len = self.data.len();
        let addr = NonNull::from(&mut *self.data).cast::<c_void>();
        unsafe { mman::munmap(addr, len) }.unwrap_or_else(|e| {
            error!("Error while unmapping plane: {}", e);
        });
    }
}

#[derive(Debug, Error)]
pub enum MmapError {
    #[error("cannot map an empty range")]
    ZeroLength,
    #[error("offset {0:#x} cannot be represented on this platform")]
    InvalidOffset(u64),
    #[error("mmap error: {0}")]
    MmapError(#[from] Errno),
}

impl From<MmapError> for Errno {
    fn from(err: MmapError) -> Self {
        match err {
            MmapError::ZeroLength | MmapError::InvalidOffset(_) => Errno::EINVAL,
            MmapError::MmapError(e) => e,
        }
    }
}

/// Maps `length` bytes of `fd` starting at `offset`, read-write and shared.
pub fn mmap(fd: &impl AsFd, offset: u64, length: usize) -> Result<PlaneMapping, MmapError> {
    let non_zero_length = NonZeroUsize::new(length).ok_or(MmapError::ZeroLength)?;
    let offset = off_t::try_from(offset).map_err(|_| MmapError::InvalidOffset(offset))?;

    let data = unsafe {
        mman::mmap(
            None,
            non_zero_length,
            mman::ProtFlags::PROT_READ | mman::ProtFlags::PROT_WRITE,
            mman::MapFlags::MAP_SHARED,
            fd,
            offset,
        )
    }?;

    Ok(PlaneMapping {
        // Safe because we know the pointer is valid and has enough data mapped
        // to cover the length.
        data: unsafe { slice::from_raw_parts_mut(data.as_ptr() as *mut u8, length) },
    })
}
