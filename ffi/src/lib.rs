//! C FFI of the nxgem crate.
//!
//! This crate provides a C API over raw DRM fds and GEM handles, for client programs that manage
//! the lifetime of these objects themselves. Handles and fds returned through this API are never
//! released by Rust code: the caller must give them back to [`gem::nx_drm_free_gem`] or `close()`.
//!
//! Functions returning an `int` return a negative errno value on failure unless documented
//! otherwise.

pub mod buffer;
pub mod gem;

use std::os::raw::c_int;
use std::os::unix::io::{BorrowedFd, IntoRawFd, OwnedFd};

use log::error;
use nix::errno::Errno;
use nxgem::device::{DeviceConfig, DrmDevice};
use nxgem::ioctl::IntoErrno;

static INIT: std::sync::Once = std::sync::Once::new();

/// Initialize the nxgem library. This only sets up the proper hooks for
/// logging, so although it is not a hard requirement to call this function,
/// failure to do so will result in no logs being printed.
#[no_mangle]
pub extern "C" fn nx_drm_init() {
    INIT.call_once(|| {
        #[cfg(feature = "env_logger")]
        env_logger::builder().format_timestamp(None).init();

        #[cfg(feature = "android")]
        android_logger::init_once(
            android_logger::Config::default().with_min_level(log::Level::Trace),
        );
    });
}

/// Opens the DRM device and returns its fd.
///
/// The device is `/dev/dri/card0` unless the `NXGEM_DRM_DEVICE` environment variable designates
/// another node.
#[no_mangle]
pub extern "C" fn nx_drm_open_device() -> c_int {
    match DrmDevice::open(DeviceConfig::from_env()) {
        Ok(device) => OwnedFd::from(device).into_raw_fd(),
        Err(e) => -e.into_errno(),
    }
}

/// Borrows the DRM node `fd` owned by the C caller. Returns `EBADF` if `fd` cannot be a valid fd.
///
/// # Safety
///
/// `fd` must be an open fd that stays open for as long as the returned object is alive.
unsafe fn caller_device<'a>(fd: c_int) -> Result<BorrowedFd<'a>, Errno> {
    if fd < 0 {
        error!("invalid DRM fd {}", fd);
        return Err(Errno::EBADF);
    }

    Ok(BorrowedFd::borrow_raw(fd))
}

/// Converts a buffer size for a C `unsigned int` field, saturating at `UINT_MAX`.
fn c_size(size: u64) -> u32 {
    u32::try_from(size).unwrap_or(u32::MAX)
}
