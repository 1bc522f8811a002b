//! Safe wrapper for the `DRM_IOCTL_MODE_MAP_DUMB` ioctl.
use nix::errno::Errno;
use std::os::unix::io::AsRawFd;
use thiserror::Error;

use crate::bindings::drm_mode_map_dumb;

#[doc(hidden)]
mod ioctl {
    use crate::bindings::drm_mode_map_dumb;
    nix::ioctl_readwrite!(drm_ioctl_mode_map_dumb, b'd', 0xb3, drm_mode_map_dumb);
}

#[derive(Debug, Error)]
pub enum MapDumbError {
    #[error("GEM handle {0} does not exist")]
    NoSuchHandle(u32),
    #[error("ioctl error: {0}")]
    IoctlError(Errno),
}

impl From<MapDumbError> for Errno {
    fn from(err: MapDumbError) -> Self {
        match err {
            MapDumbError::NoSuchHandle(_) => Errno::ENOENT,
            MapDumbError::IoctlError(e) => e,
        }
    }
}

/// Safe wrapper around the `DRM_IOCTL_MODE_MAP_DUMB` ioctl.
///
/// Returns the fake offset at which `handle` can be mapped from the DRM device fd.
pub fn map_dumb(fd: &impl AsRawFd, handle: u32) -> Result<u64, MapDumbError> {
    let mut map = drm_mode_map_dumb {
        handle,
        ..Default::default()
    };

    match super::drm_ioctl(|| unsafe { ioctl::drm_ioctl_mode_map_dumb(fd.as_raw_fd(), &mut map) }) {
        Ok(_) => Ok(map.offset),
        Err(Errno::ENOENT) => Err(MapDumbError::NoSuchHandle(handle)),
        Err(e) => Err(MapDumbError::IoctlError(e)),
    }
}
