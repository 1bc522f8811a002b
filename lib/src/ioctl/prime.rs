//! Safe wrapper for the `DRM_IOCTL_PRIME_HANDLE_TO_FD` ioctl.
use bitflags::bitflags;
use nix::errno::Errno;
use nix::fcntl::OFlag;
use std::os::unix::io::{AsRawFd, FromRawFd};
use thiserror::Error;

use crate::bindings::drm_prime_handle;

bitflags! {
    /// Flags that can be passed when exporting a buffer object.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PrimeFlags: u32 {
        const CLOEXEC = OFlag::O_CLOEXEC.bits() as u32;
        const RDWR = OFlag::O_RDWR.bits() as u32;
    }
}

impl Default for PrimeFlags {
    /// Exported fds are not leaked to child processes. `RDWR` is only accepted by kernels 4.6 and
    /// later, so it must be requested explicitly.
    fn default() -> Self {
        PrimeFlags::CLOEXEC
    }
}

#[doc(hidden)]
mod ioctl {
    use crate::bindings::drm_prime_handle;
    nix::ioctl_readwrite!(drm_ioctl_prime_handle_to_fd, b'd', 0x2d, drm_prime_handle);
}

#[derive(Debug, Error)]
pub enum PrimeHandleToFdError {
    #[error("GEM handle {0} does not exist")]
    NoSuchHandle(u32),
    #[error("ioctl error: {0}")]
    IoctlError(Errno),
}

impl From<PrimeHandleToFdError> for Errno {
    fn from(err: PrimeHandleToFdError) -> Self {
        match err {
            PrimeHandleToFdError::NoSuchHandle(_) => Errno::ENOENT,
            PrimeHandleToFdError::IoctlError(e) => e,
        }
    }
}

/// Safe wrapper around the `DRM_IOCTL_PRIME_HANDLE_TO_FD` ioctl.
///
/// The returned fd is a DMABUF referencing the same memory as `handle`, with its own lifetime.
pub fn prime_handle_to_fd<R: FromRawFd>(
    fd: &impl AsRawFd,
    handle: u32,
    flags: PrimeFlags,
) -> Result<R, PrimeHandleToFdError> {
    let mut prime = drm_prime_handle {
        handle,
        flags: flags.bits(),
        fd: -1,
    };

    match super::drm_ioctl(|| unsafe {
        ioctl::drm_ioctl_prime_handle_to_fd(fd.as_raw_fd(), &mut prime)
    }) {
        // Safe because the kernel just handed us ownership of this new fd.
        Ok(_) => Ok(unsafe { R::from_raw_fd(prime.fd) }),
        Err(Errno::ENOENT) => Err(PrimeHandleToFdError::NoSuchHandle(handle)),
        Err(e) => Err(PrimeHandleToFdError::IoctlError(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_flags() {
        assert_eq!(PrimeFlags::default(), PrimeFlags::CLOEXEC);
        assert_eq!(PrimeFlags::default().bits(), nix::libc::O_CLOEXEC as u32);
        assert!(!PrimeFlags::default().contains(PrimeFlags::RDWR));
    }
}
