use std::fmt::{self, Debug};
use std::mem;
use std::num::NonZeroU32;
use std::os::unix::io::OwnedFd;

use log::{debug, error, warn};
use nix::errno::Errno;

use crate::device::GemDevice;
use crate::ioctl::{PlaneMapping, PrimeFlags};
use crate::{Error, Result};

/// A buffer object owned by this process, referenced by its handle in the session of `device`.
///
/// The buffer object is released when the handle is dropped, unless it has been detached with
/// [`GemHandle::into_raw`].
pub struct GemHandle<'a, D: GemDevice> {
    device: &'a D,
    handle: u32,
}

impl<'a, D: GemDevice> GemHandle<'a, D> {
    /// Takes ownership of `handle`, which must be a valid handle of `device`'s session that is
    /// not owned by anything else.
    pub fn from_raw(device: &'a D, handle: u32) -> Self {
        GemHandle { device, handle }
    }

    /// Returns the raw handle of this buffer object.
    pub fn raw(&self) -> u32 {
        self.handle
    }

    pub fn device(&self) -> &'a D {
        self.device
    }

    /// Detaches the buffer object from this handle and returns its raw value. The buffer object
    /// will not be released anymore, and must be released with [`free`] eventually.
    pub fn into_raw(self) -> u32 {
        let handle = self.handle;
        mem::forget(self);
        handle
    }

    /// Releases the buffer object. This is equivalent to dropping the handle.
    pub fn free(self) {}

    /// Exports this buffer object as a DMABUF fd.
    pub fn export_dmabuf(&self) -> Result<OwnedFd> {
        export_dmabuf(self.device, self.handle)
    }

    /// Maps the first `size` bytes of this buffer object.
    pub fn map(&self, size: usize) -> Result<PlaneMapping> {
        map(self.device, self.handle, size)
    }

    /// Publishes this buffer object under a global name.
    pub fn publish_name(&self) -> Option<NonZeroU32> {
        publish_name(self.device, self.handle)
    }
}

impl<'a, D: GemDevice> Drop for GemHandle<'a, D> {
    fn drop(&mut self) {
        free(self.device, self.handle);
    }
}

impl<'a, D: GemDevice> Debug for GemHandle<'a, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GemHandle").field(&self.handle).finish()
    }
}

/// Releases `handle`.
///
/// Failure is logged but otherwise ignored: releasing an invalid or already released handle is a
/// no-op.
pub fn free<D: GemDevice>(device: &D, handle: u32) {
    match device.gem_close(handle) {
        Ok(()) => debug!("released GEM handle {}", handle),
        Err(e) => warn!("failed to release GEM handle {}: {}", handle, e),
    }
}

/// Exports `handle` as a DMABUF fd. The fd has its own lifetime: closing it does not release
/// `handle`, and vice-versa.
pub fn export_dmabuf<D: GemDevice>(device: &D, handle: u32) -> Result<OwnedFd> {
    device
        .prime_handle_to_fd(handle, PrimeFlags::default())
        .map_err(|e| {
            error!("failed to export GEM handle {} as DMABUF: {}", handle, e);
            Error::ExportFailed {
                handle,
                errno: e.into(),
            }
        })
}

/// Maps the first `size` bytes of the dumb buffer `handle`, read-write and shared.
pub fn map<D: GemDevice>(device: &D, handle: u32, size: usize) -> Result<PlaneMapping> {
    let map_failed = |errno: Errno| {
        error!("failed to map {} bytes of GEM handle {}: {}", size, handle, errno);
        Error::MapFailed { handle, errno }
    };

    let offset = device
        .map_dumb(handle)
        .map_err(|e| map_failed(e.into()))?;
    device
        .mmap(offset, size)
        .map_err(|e| map_failed(e.into()))
}

/// Publishes `handle` under a global name, which another session can open with
/// [`import_by_name`].
///
/// Anyone who knows the name can open the buffer object. Returns `None` if the name could not be
/// obtained.
pub fn publish_name<D: GemDevice>(device: &D, handle: u32) -> Option<NonZeroU32> {
    match device.gem_flink(handle) {
        Ok(name) => {
            debug!("GEM handle {} published as name {}", handle, name);
            Some(name)
        }
        Err(e) => {
            error!("failed to get a global name for GEM handle {}: {}", handle, e);
            None
        }
    }
}

/// Opens the buffer object published under `name` into `device`'s session.
pub fn import_by_name<D: GemDevice>(device: &D, name: u32) -> Result<GemHandle<'_, D>> {
    match device.gem_open(name) {
        Ok(opened) => {
            debug!(
                "opened GEM name {} as handle {} ({} bytes)",
                name, opened.handle, opened.size
            );
            Ok(GemHandle::from_raw(device, opened.handle))
        }
        Err(e) => {
            error!("cannot open GEM name {}: {}", name, e);
            Err(Error::ImportFailed {
                name,
                errno: e.into(),
            })
        }
    }
}
