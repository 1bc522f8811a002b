//! Safe wrapper for the vendor `DRM_NX_GEM_CREATE` driver command.
use bitflags::bitflags;
use nix::errno::Errno;
use std::os::unix::io::AsRawFd;
use thiserror::Error;

use crate::bindings;
use crate::bindings::nx_drm_gem_create;

bitflags! {
    /// Placement and caching flags of a generic GEM buffer. The empty set requests physically
    /// contiguous, non-cachable memory.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct GemFlags: u32 {
        const NONCONTIG = bindings::NEXELL_BO_NONCONTIG;
        const CACHABLE = bindings::NEXELL_BO_CACHABLE;
        const WC = bindings::NEXELL_BO_WC;
    }
}

impl From<nx_drm_gem_create> for u32 {
    fn from(create: nx_drm_gem_create) -> Self {
        create.handle
    }
}

#[derive(Debug, Error)]
pub enum GemCreateError {
    #[error("ioctl error: {0}")]
    IoctlError(#[from] Errno),
}

impl From<GemCreateError> for Errno {
    fn from(err: GemCreateError) -> Self {
        match err {
            GemCreateError::IoctlError(e) => e,
        }
    }
}

/// Safe wrapper around the `DRM_NX_GEM_CREATE` driver command.
pub fn gem_create<O: From<nx_drm_gem_create>>(
    fd: &impl AsRawFd,
    size: u64,
    flags: GemFlags,
) -> Result<O, GemCreateError> {
    let mut create = nx_drm_gem_create {
        size,
        flags: flags.bits(),
        ..Default::default()
    };

    super::command_write_read(fd, bindings::DRM_NX_GEM_CREATE, &mut create)
        .map_err(|e| GemCreateError::IoctlError(e.into()))?;

    Ok(O::from(create))
}
