//! Safe wrappers for the `DRM_IOCTL_GEM_FLINK` and `DRM_IOCTL_GEM_OPEN` ioctls.
use nix::errno::Errno;
use std::num::NonZeroU32;
use std::os::unix::io::AsRawFd;
use thiserror::Error;

use crate::bindings::{drm_gem_flink, drm_gem_open};

#[doc(hidden)]
mod ioctl {
    use crate::bindings::{drm_gem_flink, drm_gem_open};
    nix::ioctl_readwrite!(drm_ioctl_gem_flink, b'd', 0x0a, drm_gem_flink);
    nix::ioctl_readwrite!(drm_ioctl_gem_open, b'd', 0x0b, drm_gem_open);
}

#[derive(Debug, Error)]
pub enum GemFlinkError {
    #[error("GEM handle {0} does not exist")]
    NoSuchHandle(u32),
    #[error("kernel returned the invalid name 0")]
    NullName,
    #[error("ioctl error: {0}")]
    IoctlError(Errno),
}

impl From<GemFlinkError> for Errno {
    fn from(err: GemFlinkError) -> Self {
        match err {
            GemFlinkError::NoSuchHandle(_) => Errno::ENOENT,
            GemFlinkError::NullName => Errno::EINVAL,
            GemFlinkError::IoctlError(e) => e,
        }
    }
}

/// Safe wrapper around the `DRM_IOCTL_GEM_FLINK` ioctl.
///
/// Valid global names are never zero.
pub fn gem_flink(fd: &impl AsRawFd, handle: u32) -> Result<NonZeroU32, GemFlinkError> {
    let mut flink = drm_gem_flink {
        handle,
        ..Default::default()
    };

    match super::drm_ioctl(|| unsafe { ioctl::drm_ioctl_gem_flink(fd.as_raw_fd(), &mut flink) }) {
        Ok(_) => NonZeroU32::new(flink.name).ok_or(GemFlinkError::NullName),
        Err(Errno::ENOENT) => Err(GemFlinkError::NoSuchHandle(handle)),
        Err(e) => Err(GemFlinkError::IoctlError(e)),
    }
}

/// Buffer object opened from a global name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenedGem {
    pub handle: u32,
    pub size: u64,
}

impl From<drm_gem_open> for OpenedGem {
    fn from(open: drm_gem_open) -> Self {
        OpenedGem {
            handle: open.handle,
            size: open.size,
        }
    }
}

impl From<drm_gem_open> for u32 {
    fn from(open: drm_gem_open) -> Self {
        open.handle
    }
}

#[derive(Debug, Error)]
pub enum GemOpenError {
    #[error("no buffer object published under name {0}")]
    UnknownName(u32),
    #[error("ioctl error: {0}")]
    IoctlError(Errno),
}

impl From<GemOpenError> for Errno {
    fn from(err: GemOpenError) -> Self {
        match err {
            GemOpenError::UnknownName(_) => Errno::ENOENT,
            GemOpenError::IoctlError(e) => e,
        }
    }
}

/// Safe wrapper around the `DRM_IOCTL_GEM_OPEN` ioctl.
pub fn gem_open<O: From<drm_gem_open>>(fd: &impl AsRawFd, name: u32) -> Result<O, GemOpenError> {
    let mut open = drm_gem_open {
        name,
        ..Default::default()
    };

    match super::drm_ioctl(|| unsafe { ioctl::drm_ioctl_gem_open(fd.as_raw_fd(), &mut open) }) {
        Ok(_) => Ok(O::from(open)),
        Err(Errno::ENOENT) => Err(GemOpenError::UnknownName(name)),
        Err(e) => Err(GemOpenError::IoctlError(e)),
    }
}
