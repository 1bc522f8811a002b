//! DRM device session.
//!
//! A [`DrmDevice`] is an open DRM node. It is passed explicitly to every allocation and sharing
//! operation of the `memory` module through the [`GemDevice`] trait.
pub mod traits;
#[cfg(test)]
pub(crate) mod fake;

pub use traits::GemDevice;

use std::env;
use std::fs::OpenOptions;
use std::num::NonZeroU32;
use std::os::unix::io::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::path::{Path, PathBuf};

use log::{debug, error};

use crate::ioctl::{
    self, CreateDumbError, DumbBuffer, GemCloseError, GemCreateError, GemFlags, GemFlinkError,
    GemOpenError, MapDumbError, MmapError, OpenedGem, PlaneMapping, PrimeFlags,
    PrimeHandleToFdError,
};
use crate::{Error, Result};

/// Device node opened when no other path is configured.
pub const DEFAULT_DEVICE_PATH: &str = "/dev/dri/card0";

/// Environment variable that can be set to override [`DEFAULT_DEVICE_PATH`] when using
/// [`DeviceConfig::from_env`].
pub const DEVICE_PATH_ENV: &str = "NXGEM_DRM_DEVICE";

#[derive(Debug, Clone)]
pub struct DeviceConfig {
    path: PathBuf,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            path: PathBuf::from(DEFAULT_DEVICE_PATH),
        }
    }
}

impl DeviceConfig {
    pub fn new() -> Self {
        Default::default()
    }

    /// Default configuration, with the device path taken from the `NXGEM_DRM_DEVICE`
    /// environment variable if it is set.
    pub fn from_env() -> Self {
        match env::var_os(DEVICE_PATH_ENV) {
            Some(path) => DeviceConfig::new().path(path),
            None => DeviceConfig::new(),
        }
    }

    pub fn path<P: Into<PathBuf>>(self, path: P) -> Self {
        DeviceConfig { path: path.into() }
    }

    pub fn device_path(&self) -> &Path {
        &self.path
    }
}

/// An open DRM device node. The node is closed when this object is dropped.
#[derive(Debug)]
pub struct DrmDevice {
    fd: OwnedFd,
}

impl DrmDevice {
    /// Opens the device node designated by `config` for reading and writing.
    pub fn open(config: DeviceConfig) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&config.path)
            .map_err(|e| {
                error!("cannot open {}: {}", config.path.display(), e);
                Error::DeviceUnavailable {
                    path: config.path.clone(),
                    source: e,
                }
            })?;
        debug!("opened DRM device {}", config.path.display());

        Ok(DrmDevice { fd: file.into() })
    }
}

/// Takes ownership of an already-opened DRM node.
impl From<OwnedFd> for DrmDevice {
    fn from(fd: OwnedFd) -> Self {
        DrmDevice { fd }
    }
}

impl From<DrmDevice> for OwnedFd {
    fn from(device: DrmDevice) -> Self {
        device.fd
    }
}

impl AsRawFd for DrmDevice {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl AsFd for DrmDevice {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

/// A DRM node fd borrowed from its owner, e.g. foreign code.
impl GemDevice for BorrowedFd<'_> {
    fn gem_create(&self, size: u64, flags: GemFlags) -> std::result::Result<u32, GemCreateError> {
        ioctl::gem_create(self, size, flags)
    }

    fn create_dumb(
        &self,
        bpp: u32,
        width: u32,
        height: u32,
    ) -> std::result::Result<DumbBuffer, CreateDumbError> {
        ioctl::create_dumb(self, bpp, width, height)
    }

    fn gem_close(&self, handle: u32) -> std::result::Result<(), GemCloseError> {
        ioctl::gem_close(self, handle)
    }

    fn prime_handle_to_fd(
        &self,
        handle: u32,
        flags: PrimeFlags,
    ) -> std::result::Result<OwnedFd, PrimeHandleToFdError> {
        ioctl::prime_handle_to_fd(self, handle, flags)
    }

    fn map_dumb(&self, handle: u32) -> std::result::Result<u64, MapDumbError> {
        ioctl::map_dumb(self, handle)
    }

    fn mmap(&self, offset: u64, length: usize) -> std::result::Result<PlaneMapping, MmapError> {
        ioctl::mmap(self, offset, length)
    }

    fn gem_flink(&self, handle: u32) -> std::result::Result<NonZeroU32, GemFlinkError> {
        ioctl::gem_flink(self, handle)
    }

    fn gem_open(&self, name: u32) -> std::result::Result<OpenedGem, GemOpenError> {
        ioctl::gem_open(self, name)
    }
}

impl GemDevice for DrmDevice {
    fn gem_create(&self, size: u64, flags: GemFlags) -> std::result::Result<u32, GemCreateError> {
        self.as_fd().gem_create(size, flags)
    }

    fn create_dumb(
        &self,
        bpp: u32,
        width: u32,
        height: u32,
    ) -> std::result::Result<DumbBuffer, CreateDumbError> {
        self.as_fd().create_dumb(bpp, width, height)
    }

    fn gem_close(&self, handle: u32) -> std::result::Result<(), GemCloseError> {
        self.as_fd().gem_close(handle)
    }

    fn prime_handle_to_fd(
        &self,
        handle: u32,
        flags: PrimeFlags,
    ) -> std::result::Result<OwnedFd, PrimeHandleToFdError> {
        self.as_fd().prime_handle_to_fd(handle, flags)
    }

    fn map_dumb(&self, handle: u32) -> std::result::Result<u64, MapDumbError> {
        self.as_fd().map_dumb(handle)
    }

    fn mmap(&self, offset: u64, length: usize) -> std::result::Result<PlaneMapping, MmapError> {
        self.as_fd().mmap(offset, length)
    }

    fn gem_flink(&self, handle: u32) -> std::result::Result<NonZeroU32, GemFlinkError> {
        self.as_fd().gem_flink(handle)
    }

    fn gem_open(&self, name: u32) -> std::result::Result<OpenedGem, GemOpenError> {
        self.as_fd().gem_open(name)
    }
}
