//! This module provides safer versions of the DRM GEM ioctls through simple functions working on a
//! `RawFd`. This module can be used directly, but the `memory` module is very likely to be a
//! better fit for application code.
//!
//! DRM ioctls are called with a single structure as argument, which serves to store both the
//! input and output of the ioctl. Each ioctl proxy function here takes the relevant input as
//! parameters and returns the output fields, converted into the type desired by the caller using
//! `From<kernel_struct>`. For instance [`create_dumb()`] takes the requested bpp and dimensions
//! and returns anything that can be built from a `struct drm_mode_create_dumb`, like
//! [`DumbBuffer`] or a bare `u32` handle.
//!
//! Every ioctl is transparently re-issued when it fails with `EINTR` or `EAGAIN`. Each ioctl also
//! has its own error type, which can be converted back to its original error code using its
//! `Into<Errno>` implementation.

mod create_dumb;
mod flink;
mod gem_close;
mod gem_create;
mod map_dumb;
mod mmap;
mod prime;

pub use create_dumb::*;
pub use flink::*;
pub use gem_close::*;
pub use gem_create::*;
pub use map_dumb::*;
pub use mmap::*;
pub use prime::*;

use std::mem;
use std::os::raw::c_int;
use std::os::unix::io::AsRawFd;

use log::{error, trace};
use nix::errno::Errno;

use crate::bindings;
use crate::{Error, Result};

/// Extension trait for allowing easy conversion of ioctl errors into their originating error code.
pub trait IntoErrno {
    fn into_errno(self) -> i32;
}

impl<T> IntoErrno for T
where
    T: Into<Errno>,
{
    fn into_errno(self) -> i32 {
        self.into() as i32
    }
}

/// Runs `f` until it returns something else than `EINTR` or `EAGAIN`.
///
/// DRM ioctls can be interrupted by signals or asked to be restarted by the kernel, in which case
/// the exact same request must simply be submitted again.
pub(crate) fn drm_ioctl<F>(mut f: F) -> nix::Result<c_int>
where
    F: FnMut() -> nix::Result<c_int>,
{
    loop {
        match f() {
            Err(e @ (Errno::EINTR | Errno::EAGAIN)) => {
                trace!("ioctl interrupted ({}), retrying", e);
            }
            res => return res,
        }
    }
}

/// Computes the request code of the driver-private read/write command `command_index` taking an
/// argument of `size` bytes.
pub fn driver_command_code(command_index: u8, size: usize) -> nix::sys::ioctl::ioctl_num_type {
    nix::request_code_readwrite!(
        bindings::DRM_IOCTL_BASE,
        bindings::DRM_COMMAND_BASE + command_index,
        size
    )
}

/// Submits the driver-private command `command_index` with `data` as both its input and output.
///
/// This is the generic submission primitive for driver commands, which are numbered from
/// `DRM_COMMAND_BASE` and do not have a fixed request code in the DRM core headers. A rejected
/// command is reported as [`Error::IoctlFailed`].
pub fn command_write_read<T>(fd: &impl AsRawFd, command_index: u8, data: &mut T) -> Result<()> {
    let request = driver_command_code(command_index, mem::size_of::<T>());
    let data: *mut T = data;

    // Safe because `data` points to a properly sized structure that the kernel is allowed to
    // write into, and outlives the call.
    drm_ioctl(|| Errno::result(unsafe { nix::libc::ioctl(fd.as_raw_fd(), request, data) }))
        .map_err(|e| {
            error!("driver command {:#x} failed: {}", request, e);
            Error::IoctlFailed(e)
        })?;

    Ok(())
}
