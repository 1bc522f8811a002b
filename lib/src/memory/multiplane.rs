use std::convert::TryFrom;
use std::fmt::{self, Debug};
use std::os::unix::io::{AsRawFd, IntoRawFd, OwnedFd, RawFd};

use log::{debug, error, warn};
use nix::errno::Errno;
use thiserror::Error as ThisError;

use super::{alloc_dumb, export_dmabuf, GemHandle};
use crate::device::GemDevice;
use crate::format::{self, FormatInfo};
use crate::{Error, PixelFormat};

/// Maximum number of planes of a multi-plane buffer.
pub const MAX_PLANES: usize = 3;

/// One plane of a [`MultiPlaneBuffer`], backed by its own buffer object.
pub struct Plane<'a, D: GemDevice> {
    /// Bytes per line.
    pub stride: u32,
    /// Bytes used by the plane, i.e. `stride * height`.
    pub size: u64,
    pub handle: GemHandle<'a, D>,
    /// DMABUF exported from `handle`, or `None` if the export failed.
    pub dmabuf: Option<OwnedFd>,
}

/// A plane whose buffer object and DMABUF have been detached from Rust ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPlane {
    pub stride: u32,
    pub size: u64,
    pub handle: u32,
    /// `-1` if the export failed.
    pub dmabuf_fd: RawFd,
}

impl<'a, D: GemDevice> Plane<'a, D> {
    /// Raw fd of the exported DMABUF, or `-1` if the export failed.
    pub fn dmabuf_raw_fd(&self) -> RawFd {
        self.dmabuf.as_ref().map_or(-1, |fd| fd.as_raw_fd())
    }

    /// Detaches the buffer object and DMABUF of this plane. Both must be released by the caller.
    pub fn leak(self) -> RawPlane {
        RawPlane {
            stride: self.stride,
            size: self.size,
            handle: self.handle.into_raw(),
            dmabuf_fd: self.dmabuf.map_or(-1, |fd| fd.into_raw_fd()),
        }
    }
}

impl<'a, D: GemDevice> Debug for Plane<'a, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plane")
            .field("stride", &self.stride)
            .field("size", &self.size)
            .field("handle", &self.handle)
            .field("dmabuf", &self.dmabuf)
            .finish()
    }
}

/// A frame made of one buffer object per plane, each exported as a DMABUF.
pub struct MultiPlaneBuffer<'a, D: GemDevice> {
    format: PixelFormat,
    width: u32,
    height: u32,
    planes: Vec<Plane<'a, D>>,
}

impl<'a, D: GemDevice> MultiPlaneBuffer<'a, D> {
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of planes, between 1 and [`MAX_PLANES`].
    pub fn num_planes(&self) -> usize {
        self.planes.len()
    }

    pub fn planes(&self) -> &[Plane<'a, D>] {
        &self.planes
    }

    pub fn into_planes(self) -> Vec<Plane<'a, D>> {
        self.planes
    }

    /// Detaches all the planes of this buffer, see [`Plane::leak`].
    pub fn leak(self) -> Vec<RawPlane> {
        self.planes.into_iter().map(Plane::leak).collect()
    }
}

impl<'a, D: GemDevice> Debug for MultiPlaneBuffer<'a, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiPlaneBuffer")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("planes", &self.planes)
            .finish()
    }
}

/// Failure of [`alloc_multiplane`].
///
/// The planes allocated before the failing one are not released by [`alloc_multiplane`]: they
/// are returned in `allocated`, still live. Dropping this error releases them; use
/// [`MultiPlaneAllocError::leak_allocated`] to keep them alive instead.
#[derive(ThisError)]
#[error("failed to allocate plane {plane} of {format:?}: {source}")]
pub struct MultiPlaneAllocError<'a, D: GemDevice> {
    pub format: PixelFormat,
    /// Index of the plane whose allocation failed.
    pub plane: usize,
    pub source: Error,
    pub allocated: Vec<Plane<'a, D>>,
}

impl<'a, D: GemDevice> MultiPlaneAllocError<'a, D> {
    fn new(format: PixelFormat, plane: usize, source: Error, allocated: Vec<Plane<'a, D>>) -> Self {
        MultiPlaneAllocError {
            format,
            plane,
            source,
            allocated,
        }
    }

    /// Detaches the planes allocated before the failure and returns the underlying error.
    pub fn leak_allocated(self) -> (Error, Vec<RawPlane>) {
        let allocated = self.allocated.into_iter().map(Plane::leak).collect();
        (self.source, allocated)
    }
}

impl<'a, D: GemDevice> Debug for MultiPlaneAllocError<'a, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiPlaneAllocError")
            .field("format", &self.format)
            .field("plane", &self.plane)
            .field("source", &self.source)
            .field("allocated", &self.allocated)
            .finish()
    }
}

/// Releases the planes allocated before the failure.
impl<'a, D: GemDevice> From<MultiPlaneAllocError<'a, D>> for Error {
    fn from(err: MultiPlaneAllocError<'a, D>) -> Self {
        err.source
    }
}

fn overflow(format: PixelFormat, width: u32, height: u32) -> Error {
    error!("{}x{} is too large for format {:?}", width, height, format);
    Error::OutOfMemory(Errno::EOVERFLOW)
}

/// Allocates a `width`x`height` frame of `format` as one buffer object per plane, and exports each
/// of them as a DMABUF.
///
/// The luma (or only) plane has a stride of `bpp / 8 * width` bytes. The chroma planes follow the
/// subsampling of `format`, e.g. for YUV420 at 640x480 the planes have strides of 640, 320 and
/// 320 bytes and sizes of 307200, 76800 and 76800 bytes.
///
/// Unsupported formats are rejected before any request is sent to the device. If the allocation
/// of a plane fails, the call fails and the planes allocated so far are returned in the error. A
/// failed export only results in the corresponding plane's `dmabuf` being `None`.
pub fn alloc_multiplane<D: GemDevice>(
    device: &D,
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<MultiPlaneBuffer<'_, D>, MultiPlaneAllocError<'_, D>> {
    let info = FormatInfo::lookup(format)
        .map_err(|e| MultiPlaneAllocError::new(format, 0, e, vec![]))?;
    let num_planes = info.num_planes();
    let bpp = info.bpp;

    let (chroma_stride, chroma_height) = if num_planes > 1 {
        let chroma = format::resolve_chroma_geometry(format, width, height)
            .map_err(|e| MultiPlaneAllocError::new(format, 1, e, vec![]))?;
        (chroma.stride, chroma.height)
    } else {
        (0, 0)
    };
    let chroma_size = chroma_stride as u64 * chroma_height as u64;

    let luma_stride = u32::try_from((bpp / 8) as u64 * width as u64).map_err(|_| {
        MultiPlaneAllocError::new(format, 0, overflow(format, width, height), vec![])
    })?;
    let luma_size = luma_stride as u64 * height as u64;

    let mut planes = Vec::with_capacity(num_planes);
    for i in 0..num_planes {
        let (stride, size, handle) = if i == 0 {
            (luma_stride, luma_size, alloc_dumb(device, bpp, width, height))
        } else {
            (
                chroma_stride,
                chroma_size,
                alloc_dumb(device, bpp, chroma_stride, chroma_height),
            )
        };
        let handle = match handle {
            Ok(handle) => handle,
            Err(e) => return Err(MultiPlaneAllocError::new(format, i, e, planes)),
        };

        let dmabuf = match export_dmabuf(device, handle.raw()) {
            Ok(fd) => Some(fd),
            Err(e) => {
                warn!("plane {} of {:?} will not be shareable: {}", i, format, e);
                None
            }
        };

        planes.push(Plane {
            stride,
            size,
            handle,
            dmabuf,
        });
    }

    debug!(
        "allocated {}x{} {:?} buffer: {:?}",
        width, height, format, planes
    );

    Ok(MultiPlaneBuffer {
        format,
        width,
        height,
        planes,
    })
}
