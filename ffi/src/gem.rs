//! Allocation and sharing of single buffer objects.
//!
//! Every function takes the DRM fd returned by [`crate::nx_drm_open_device`] (or any DRM node
//! opened by the caller) and does not close it.

use std::num::NonZeroU32;
use std::os::raw::{c_int, c_uint, c_void};
use std::os::unix::io::IntoRawFd;

use log::error;
use nxgem::ioctl::{GemFlags, IntoErrno};
use nxgem::memory;
use nxgem::PixelFormat;

use crate::{c_size, caller_device};

/// Allocates a buffer object of `size` bytes through the driver's own create command. `flags` is
/// a combination of `NEXELL_BO_*` placement flags.
///
/// Returns the GEM handle of the buffer object.
#[no_mangle]
pub extern "C" fn nx_drm_alloc_gem(drm_fd: c_int, size: c_uint, flags: c_int) -> c_int {
    let device = match unsafe { caller_device(drm_fd) } {
        Ok(device) => device,
        Err(e) => return -(e as c_int),
    };

    let flags = GemFlags::from_bits_truncate(flags as u32);
    let res = memory::alloc_generic(&device, size as u64, flags);
    match res {
        Ok(handle) => handle.into_raw() as c_int,
        Err(e) => -e.into_errno(),
    }
}

/// Allocates a dumb buffer object of `width`x`height` pixels of `bpp` bits.
///
/// Returns the GEM handle of the buffer object, or `-ENOMEM` if the driver refused the
/// allocation.
#[no_mangle]
pub extern "C" fn nx_drm_alloc_dumb(
    drm_fd: c_int,
    bpp: c_uint,
    width: c_uint,
    height: c_uint,
) -> c_int {
    let device = match unsafe { caller_device(drm_fd) } {
        Ok(device) => device,
        Err(e) => return -(e as c_int),
    };

    let res = memory::alloc_dumb(&device, bpp, width, height);
    match res {
        Ok(handle) => handle.into_raw() as c_int,
        Err(e) => -e.into_errno(),
    }
}

/// Allocates a single dumb buffer object holding all the planes of a `width`x`height` frame of
/// DRM fourcc `format`.
///
/// Returns the GEM handle of the buffer object, `-EINVAL` if `format` is not supported, or
/// `-ENOMEM` if the driver refused the allocation. On success, the number of bytes used by the
/// frame is written into `size` unless it is NULL, saturated to `UINT_MAX`.
///
/// # Safety
///
/// `size` must be NULL or point to writable memory.
#[no_mangle]
pub unsafe extern "C" fn nx_drm_alloc_dumb_gem(
    drm_fd: c_int,
    width: c_uint,
    height: c_uint,
    format: c_uint,
    size: *mut c_uint,
) -> c_int {
    let device = match caller_device(drm_fd) {
        Ok(device) => device,
        Err(e) => return -(e as c_int),
    };

    let format = PixelFormat::from_u32(format);
    let res = memory::alloc_dumb_for_format(&device, width, height, format);
    match res {
        Ok(alloc) => {
            if let Some(size) = size.as_mut() {
                *size = c_size(alloc.size);
            }
            alloc.handle.into_raw() as c_int
        }
        Err(e) => -e.into_errno(),
    }
}

/// Releases GEM handle `gem`. Releasing an invalid handle does nothing.
#[no_mangle]
pub extern "C" fn nx_drm_free_gem(drm_fd: c_int, gem: c_int) {
    if let Ok(device) = unsafe { caller_device(drm_fd) } {
        memory::free(&device, gem as u32);
    }
}

/// Exports GEM handle `gem` as a DMABUF.
///
/// Returns the DMABUF fd, or -1 on failure.
#[no_mangle]
pub extern "C" fn nx_drm_gem_to_dmafd(drm_fd: c_int, gem: c_int) -> c_int {
    let device = match unsafe { caller_device(drm_fd) } {
        Ok(device) => device,
        Err(_) => return -1,
    };

    memory::export_dmabuf(&device, gem as u32).map_or(-1, |fd| fd.into_raw_fd())
}

/// Maps the first `size` bytes of dumb buffer `gem` read-write, and writes the address of the
/// mapping into `vaddr`. The mapping stays valid until the caller `munmap()`s it.
///
/// Returns 0 on success, -1 on failure.
///
/// # Safety
///
/// `vaddr` must be NULL or point to writable memory.
#[no_mangle]
pub unsafe extern "C" fn nx_drm_get_vaddr(
    drm_fd: c_int,
    gem: c_int,
    size: c_int,
    vaddr: *mut *mut c_void,
) -> c_int {
    let vaddr = match vaddr.as_mut() {
        Some(vaddr) => vaddr,
        None => {
            error!("NULL vaddr pointer");
            return -1;
        }
    };
    let size = match usize::try_from(size) {
        Ok(size) => size,
        Err(_) => {
            error!("invalid mapping size {}", size);
            return -1;
        }
    };
    let device = match caller_device(drm_fd) {
        Ok(device) => device,
        Err(_) => return -1,
    };

    match memory::map(&device, gem as u32, size) {
        Ok(mapping) => {
            *vaddr = mapping.leak();
            0
        }
        Err(_) => -1,
    }
}

/// Publishes GEM handle `gem` under a global name that other processes can pass to
/// [`nx_drm_import_gem_from_flink`].
///
/// Returns the name, or 0 on failure.
#[no_mangle]
pub extern "C" fn nx_drm_get_flink_name(drm_fd: c_int, gem: c_int) -> c_uint {
    match unsafe { caller_device(drm_fd) } {
        Ok(device) => memory::publish_name(&device, gem as u32).map_or(0, NonZeroU32::get),
        Err(_) => 0,
    }
}

/// Opens the buffer object published under `flink_name`.
///
/// Returns a new GEM handle for the buffer object, or `-EINVAL` if the name cannot be opened.
#[no_mangle]
pub extern "C" fn nx_drm_import_gem_from_flink(drm_fd: c_int, flink_name: c_uint) -> c_int {
    let device = match unsafe { caller_device(drm_fd) } {
        Ok(device) => device,
        Err(e) => return -(e as c_int),
    };

    let res = memory::import_by_name(&device, flink_name);
    match res {
        Ok(handle) => handle.into_raw() as c_int,
        Err(e) => -e.into_errno(),
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::os::unix::io::AsRawFd;
    use std::ptr;

    use nix::errno::Errno;

    use super::*;

    // A node that rejects every DRM request.
    fn not_a_drm_device() -> File {
        File::open("/dev/null").unwrap()
    }

    #[test]
    fn bad_fd() {
        assert_eq!(nx_drm_alloc_gem(-1, 4096, 0), -(Errno::EBADF as c_int));
        assert_eq!(nx_drm_alloc_dumb(-1, 32, 16, 16), -(Errno::EBADF as c_int));
        assert_eq!(nx_drm_gem_to_dmafd(-1, 1), -1);
        assert_eq!(nx_drm_get_flink_name(-1, 1), 0);
        nx_drm_free_gem(-1, 1);
    }

    #[test]
    fn generic_failure_reports_driver_error() {
        let node = not_a_drm_device();
        assert_eq!(
            nx_drm_alloc_gem(node.as_raw_fd(), 4096, 0),
            -(Errno::ENOTTY as c_int)
        );
    }

    #[test]
    fn dumb_failure_is_enomem() {
        let node = not_a_drm_device();
        assert_eq!(
            nx_drm_alloc_dumb(node.as_raw_fd(), 32, 16, 16),
            -(Errno::ENOMEM as c_int)
        );
    }

    #[test]
    fn dumb_gem_unsupported_format() {
        let node = not_a_drm_device();
        let mut size: c_uint = 42;
        let ret =
            unsafe { nx_drm_alloc_dumb_gem(node.as_raw_fd(), 64, 64, 0x2020_2020, &mut size) };
        assert_eq!(ret, -(Errno::EINVAL as c_int));
        assert_eq!(size, 42);

        let ret = unsafe {
            nx_drm_alloc_dumb_gem(
                node.as_raw_fd(),
                64,
                64,
                PixelFormat::from(b"NV12").to_u32(),
                ptr::null_mut(),
            )
        };
        assert_eq!(ret, -(Errno::ENOMEM as c_int));
    }

    #[test]
    fn sharing_failures() {
        let node = not_a_drm_device();
        let fd = node.as_raw_fd();
        assert_eq!(nx_drm_gem_to_dmafd(fd, 1), -1);
        assert_eq!(nx_drm_get_flink_name(fd, 1), 0);
        assert_eq!(
            nx_drm_import_gem_from_flink(fd, 1),
            -(Errno::EINVAL as c_int)
        );
    }

    #[test]
    fn vaddr_failures() {
        let node = not_a_drm_device();
        let mut vaddr: *mut c_void = ptr::null_mut();
        unsafe {
            assert_eq!(nx_drm_get_vaddr(node.as_raw_fd(), 1, 4096, &mut vaddr), -1);
            assert_eq!(nx_drm_get_vaddr(node.as_raw_fd(), 1, -1, &mut vaddr), -1);
            assert_eq!(
                nx_drm_get_vaddr(node.as_raw_fd(), 1, 4096, ptr::null_mut()),
                -1
            );
        }
        assert!(vaddr.is_null());
    }
}
