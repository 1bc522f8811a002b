//! Safe wrapper for the `DRM_IOCTL_MODE_CREATE_DUMB` ioctl.
use nix::errno::Errno;
use std::os::unix::io::AsRawFd;
use thiserror::Error;

use crate::bindings::drm_mode_create_dumb;

#[doc(hidden)]
mod ioctl {
    use crate::bindings::drm_mode_create_dumb;
    nix::ioctl_readwrite!(drm_ioctl_mode_create_dumb, b'd', 0xb2, drm_mode_create_dumb);
}

/// Result of a dumb buffer creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumbBuffer {
    /// GEM handle of the new buffer object.
    pub handle: u32,
    /// Bytes per line chosen by the driver.
    pub pitch: u32,
    /// Total size of the allocation, as rounded up by the driver.
    pub size: u64,
}

impl From<drm_mode_create_dumb> for DumbBuffer {
    fn from(create: drm_mode_create_dumb) -> Self {
        DumbBuffer {
            handle: create.handle,
            pitch: create.pitch,
            size: create.size,
        }
    }
}

/// In case we are only interested in the handle.
impl From<drm_mode_create_dumb> for u32 {
    fn from(create: drm_mode_create_dumb) -> Self {
        create.handle
    }
}

#[derive(Debug, Error)]
pub enum CreateDumbError {
    #[error("invalid dumb buffer geometry {bpp}bpp {width}x{height}")]
    InvalidGeometry { bpp: u32, width: u32, height: u32 },
    #[error("not enough memory to allocate the buffer")]
    NoMem,
    #[error("ioctl error: {0}")]
    IoctlError(Errno),
}

impl From<CreateDumbError> for Errno {
    fn from(err: CreateDumbError) -> Self {
        match err {
            CreateDumbError::InvalidGeometry { .. } => Errno::EINVAL,
            CreateDumbError::NoMem => Errno::ENOMEM,
            CreateDumbError::IoctlError(e) => e,
        }
    }
}

/// Safe wrapper around the `DRM_IOCTL_MODE_CREATE_DUMB` ioctl.
pub fn create_dumb<O: From<drm_mode_create_dumb>>(
    fd: &impl AsRawFd,
    bpp: u32,
    width: u32,
    height: u32,
) -> Result<O, CreateDumbError> {
    let mut create = drm_mode_create_dumb {
        bpp,
        width,
        height,
        ..Default::default()
    };

    match super::drm_ioctl(|| unsafe {
        ioctl::drm_ioctl_mode_create_dumb(fd.as_raw_fd(), &mut create)
    }) {
        Ok(_) => Ok(O::from(create)),
        Err(Errno::EINVAL) => Err(CreateDumbError::InvalidGeometry { bpp, width, height }),
        Err(Errno::ENOMEM) => Err(CreateDumbError::NoMem),
        Err(e) => Err(CreateDumbError::IoctlError(e)),
    }
}
