//! Multi-plane frame buffers, with one buffer object per plane.
#![allow(non_camel_case_types)]

use std::os::raw::{c_int, c_uint};

use log::error;
use nix::errno::Errno;
use nxgem::format::resolve_plane_count;
use nxgem::ioctl::IntoErrno;
use nxgem::memory::{self, RawPlane, MAX_PLANES};
use nxgem::PixelFormat;

use crate::{c_size, caller_device};

/// A multi-plane frame buffer allocated by [`nx_drm_alloc_nx_gem`].
///
/// Only the first `num_planes` entries of each array are meaningful. A `dma_fds` entry is -1 if
/// the plane could not be exported.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct nx_gem_buffer {
    pub num_planes: u32,
    pub sizes: [u32; MAX_PLANES],
    pub strides: [u32; MAX_PLANES],
    pub gem_fds: [c_int; MAX_PLANES],
    pub dma_fds: [c_int; MAX_PLANES],
}

impl Default for nx_gem_buffer {
    fn default() -> Self {
        nx_gem_buffer {
            num_planes: 0,
            sizes: [0; MAX_PLANES],
            strides: [0; MAX_PLANES],
            gem_fds: [-1; MAX_PLANES],
            dma_fds: [-1; MAX_PLANES],
        }
    }
}

impl nx_gem_buffer {
    fn set_plane(&mut self, index: usize, plane: &RawPlane) {
        self.sizes[index] = c_size(plane.size);
        self.strides[index] = plane.stride;
        self.gem_fds[index] = plane.handle as c_int;
        self.dma_fds[index] = plane.dmabuf_fd;
    }
}

/// Allocates a `width`x`height` frame of DRM fourcc `format` as one dumb buffer object per plane,
/// and exports every plane as a DMABUF. The result is written into `buf`.
///
/// Returns 0 on success, `-EINVAL` if `format` is not supported, or a negative errno value if a
/// plane could not be allocated. In the latter case the planes allocated before the failure are
/// still described in `buf` and must be released by the caller.
///
/// # Safety
///
/// `buf` must be NULL or point to writable memory.
#[no_mangle]
pub unsafe extern "C" fn nx_drm_alloc_nx_gem(
    drm_fd: c_int,
    width: c_uint,
    height: c_uint,
    format: c_uint,
    buf: *mut nx_gem_buffer,
) -> c_int {
    let buf = match buf.as_mut() {
        Some(buf) => buf,
        None => {
            error!("NULL buffer pointer");
            return -(Errno::EINVAL as c_int);
        }
    };
    let device = match caller_device(drm_fd) {
        Ok(device) => device,
        Err(e) => return -(e as c_int),
    };
    let format = PixelFormat::from_u32(format);

    *buf = nx_gem_buffer {
        num_planes: resolve_plane_count(format) as u32,
        ..Default::default()
    };

    let res = memory::alloc_multiplane(&device, width, height, format);
    match res {
        Ok(buffer) => {
            for (i, plane) in buffer.leak().iter().enumerate() {
                buf.set_plane(i, plane);
            }
            0
        }
        Err(e) => {
            let (err, allocated) = e.leak_allocated();
            for (i, plane) in allocated.iter().enumerate() {
                buf.set_plane(i, plane);
            }
            -err.into_errno()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::mem;
    use std::os::unix::io::AsRawFd;
    use std::ptr;

    use super::*;

    #[test]
    fn layout() {
        assert_eq!(mem::size_of::<nx_gem_buffer>(), 52);
        assert_eq!(mem::align_of::<nx_gem_buffer>(), 4);
    }

    #[test]
    fn unsupported_format() {
        let node = File::open("/dev/null").unwrap();
        let mut buf = nx_gem_buffer::default();
        let ret = unsafe { nx_drm_alloc_nx_gem(node.as_raw_fd(), 64, 64, 0x2020_2020, &mut buf) };
        assert_eq!(ret, -(Errno::EINVAL as c_int));
        assert_eq!(buf.num_planes, 1);
    }

    #[test]
    fn first_plane_failure() {
        let node = File::open("/dev/null").unwrap();
        let mut buf = nx_gem_buffer::default();
        let ret = unsafe {
            nx_drm_alloc_nx_gem(
                node.as_raw_fd(),
                64,
                64,
                PixelFormat::from(b"YU12").to_u32(),
                &mut buf,
            )
        };
        assert_eq!(ret, -(Errno::ENOMEM as c_int));
        assert_eq!(buf.num_planes, 3);
        assert_eq!(buf.gem_fds, [-1; MAX_PLANES]);
        assert_eq!(buf.dma_fds, [-1; MAX_PLANES]);
    }

    #[test]
    fn null_buffer() {
        let ret = unsafe { nx_drm_alloc_nx_gem(-1, 64, 64, 0, ptr::null_mut()) };
        assert_eq!(ret, -(Errno::EINVAL as c_int));
    }
}
