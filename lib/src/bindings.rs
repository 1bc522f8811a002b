#![allow(dead_code)]
#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(clippy::all)]

// Kernel ABI of the DRM GEM ioctls used by this crate, from `drm.h`, `drm_mode.h` and the vendor
// `nexell_drm.h`. The layouts are identical on 32 and 64-bit targets.

pub const DRM_IOCTL_BASE: u8 = b'd';
pub const DRM_COMMAND_BASE: u8 = 0x40;

/// Driver-private command index of the vendor GEM create request.
pub const DRM_NX_GEM_CREATE: u8 = 0x00;

pub const NEXELL_BO_NONCONTIG: u32 = 1 << 0;
pub const NEXELL_BO_CACHABLE: u32 = 1 << 1;
pub const NEXELL_BO_WC: u32 = 1 << 2;

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct drm_gem_close {
    pub handle: u32,
    pub pad: u32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct drm_gem_flink {
    pub handle: u32,
    pub name: u32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct drm_gem_open {
    pub name: u32,
    pub handle: u32,
    pub size: u64,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct drm_prime_handle {
    pub handle: u32,
    pub flags: u32,
    pub fd: i32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct drm_mode_create_dumb {
    pub height: u32,
    pub width: u32,
    pub bpp: u32,
    pub flags: u32,
    pub handle: u32,
    pub pitch: u32,
    pub size: u64,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct drm_mode_map_dumb {
    pub handle: u32,
    pub pad: u32,
    pub offset: u64,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct nx_drm_gem_create {
    pub size: u64,
    pub flags: u32,
    pub handle: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn abi_sizes() {
        assert_eq!(size_of::<drm_gem_close>(), 8);
        assert_eq!(size_of::<drm_gem_flink>(), 8);
        assert_eq!(size_of::<drm_gem_open>(), 16);
        assert_eq!(size_of::<drm_prime_handle>(), 12);
        assert_eq!(size_of::<drm_mode_create_dumb>(), 32);
        assert_eq!(size_of::<drm_mode_map_dumb>(), 16);
        assert_eq!(size_of::<nx_drm_gem_create>(), 16);
    }
}
