use std::num::NonZeroU32;
use std::os::unix::io::OwnedFd;

use crate::ioctl::{
    CreateDumbError, DumbBuffer, GemCloseError, GemCreateError, GemFlags, GemFlinkError,
    GemOpenError, MapDumbError, MmapError, OpenedGem, PlaneMapping, PrimeFlags,
    PrimeHandleToFdError,
};

/// Trait for a session able to submit the GEM requests used by this crate.
///
/// Each method corresponds to exactly one request/response exchange with the kernel. The
/// `memory` module only ever reaches the device through this trait, so any implementor can stand
/// in for a real DRM node.
///
/// Implementors are not required to be reentrant: callers sharing a session across threads must
/// serialize their calls.
pub trait GemDevice {
    /// Allocates a buffer object of `size` bytes with driver-specific placement `flags`.
    fn gem_create(&self, size: u64, flags: GemFlags) -> Result<u32, GemCreateError>;

    /// Allocates a dumb buffer object large enough for `width`x`height` pixels of `bpp` bits.
    fn create_dumb(&self, bpp: u32, width: u32, height: u32)
        -> Result<DumbBuffer, CreateDumbError>;

    /// Releases `handle`.
    fn gem_close(&self, handle: u32) -> Result<(), GemCloseError>;

    /// Exports `handle` as a new DMABUF fd.
    fn prime_handle_to_fd(
        &self,
        handle: u32,
        flags: PrimeFlags,
    ) -> Result<OwnedFd, PrimeHandleToFdError>;

    /// Returns the offset to pass to [`GemDevice::mmap`] in order to map `handle`.
    fn map_dumb(&self, handle: u32) -> Result<u64, MapDumbError>;

    /// Maps `length` bytes of the device at `offset`.
    fn mmap(&self, offset: u64, length: usize) -> Result<PlaneMapping, MmapError>;

    /// Publishes `handle` under a global name.
    fn gem_flink(&self, handle: u32) -> Result<NonZeroU32, GemFlinkError>;

    /// Opens the buffer object published under `name` in this session.
    fn gem_open(&self, name: u32) -> Result<OpenedGem, GemOpenError>;
}
