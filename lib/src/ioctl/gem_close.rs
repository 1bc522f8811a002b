//! Safe wrapper for the `DRM_IOCTL_GEM_CLOSE` ioctl.
use nix::errno::Errno;
use std::os::unix::io::AsRawFd;
use thiserror::Error;

use crate::bindings::drm_gem_close;

#[doc(hidden)]
mod ioctl {
    use crate::bindings::drm_gem_close;
    nix::ioctl_write_ptr!(drm_ioctl_gem_close, b'd', 0x09, drm_gem_close);
}

#[derive(Debug, Error)]
pub enum GemCloseError {
    #[error("invalid GEM handle {0}")]
    InvalidHandle(u32),
    #[error("ioctl error: {0}")]
    IoctlError(Errno),
}

impl From<GemCloseError> for Errno {
    fn from(err: GemCloseError) -> Self {
        match err {
            GemCloseError::InvalidHandle(_) => Errno::EINVAL,
            GemCloseError::IoctlError(e) => e,
        }
    }
}

/// Safe wrapper around the `DRM_IOCTL_GEM_CLOSE` ioctl.
pub fn gem_close(fd: &impl AsRawFd, handle: u32) -> Result<(), GemCloseError> {
    let close = drm_gem_close {
        handle,
        ..Default::default()
    };

    match super::drm_ioctl(|| unsafe { ioctl::drm_ioctl_gem_close(fd.as_raw_fd(), &close) }) {
        Ok(_) => Ok(()),
        Err(Errno::EINVAL) => Err(GemCloseError::InvalidHandle(handle)),
        Err(e) => Err(GemCloseError::IoctlError(e)),
    }
}
