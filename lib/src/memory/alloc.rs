use std::convert::TryFrom;

use log::{debug, error};
use nix::errno::Errno;

use super::GemHandle;
use crate::device::GemDevice;
use crate::format::{self, FormatInfo};
use crate::ioctl::GemFlags;
use crate::{Error, PixelFormat, Result};

/// Allocates a buffer object of `size` bytes, placed according to `flags`.
pub fn alloc_generic<D: GemDevice>(
    device: &D,
    size: u64,
    flags: GemFlags,
) -> Result<GemHandle<'_, D>> {
    match device.gem_create(size, flags) {
        Ok(handle) => {
            debug!(
                "allocated GEM handle {} ({} bytes, flags {:?})",
                handle, size, flags
            );
            Ok(GemHandle::from_raw(device, handle))
        }
        Err(e) => {
            error!("failed to allocate {} bytes GEM buffer: {}", size, e);
            Err(Error::AllocFailed(e.into()))
        }
    }
}

/// Allocates a dumb buffer object of `width`x`height` pixels of `bpp` bits.
///
/// Every failure of the driver, including rejection of the requested geometry, is reported as
/// [`Error::OutOfMemory`].
pub fn alloc_dumb<D: GemDevice>(
    device: &D,
    bpp: u32,
    width: u32,
    height: u32,
) -> Result<GemHandle<'_, D>> {
    match device.create_dumb(bpp, width, height) {
        Ok(dumb) => {
            debug!(
                "allocated dumb GEM handle {} ({}bpp {}x{}, pitch {}, {} bytes)",
                dumb.handle, bpp, width, height, dumb.pitch, dumb.size
            );
            Ok(GemHandle::from_raw(device, dumb.handle))
        }
        Err(e) => {
            error!("failed to create dumb buffer: {}", e);
            Err(Error::OutOfMemory(e.into()))
        }
    }
}

/// A single buffer object holding all the planes of a frame.
#[derive(Debug)]
pub struct DumbAllocation<'a, D: GemDevice> {
    pub handle: GemHandle<'a, D>,
    /// Bytes used by the frame, i.e. `bpp / 8 * width * virtual_height`.
    pub size: u64,
}

/// Allocates a single dumb buffer object large enough for a `width`x`height` frame of `format`
/// with all its planes stacked vertically.
///
/// Unsupported formats are rejected before any request is sent to the device.
pub fn alloc_dumb_for_format<D: GemDevice>(
    device: &D,
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<DumbAllocation<'_, D>> {
    let bpp = FormatInfo::lookup(format)?.bpp;
    let virtual_height = format::resolve_luma_virtual_height(format, height);
    let size = (bpp / 8) as u64 * width as u64 * virtual_height;

    let dumb_height = u32::try_from(virtual_height).map_err(|_| {
        error!(
            "height {} of format {:?} does not fit a dumb buffer",
            height, format
        );
        Error::OutOfMemory(Errno::EOVERFLOW)
    })?;

    Ok(DumbAllocation {
        handle: alloc_dumb(device, bpp, width, dumb_height)?,
        size,
    })
}
