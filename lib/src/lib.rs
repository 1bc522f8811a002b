//! This library provides safe allocation and sharing of DRM GEM buffers, for use as display
//! scanout surfaces or video codec frames.
//!
//! It is organized in layers:
//!
//! * The `ioctl` module provides direct, thin wrappers over the DRM GEM ioctls with added
//!   safety. This is a 1:1 mapping over the ioctls: it won't guard against passing data that the
//!   kernel will reject, it just makes sure that data passed from and to the kernel can be
//!   accessed safely.
//!
//! * The `device` module provides the session object used to talk to a DRM node, and the
//!   `GemDevice` trait through which every higher-level operation reaches the kernel.
//!
//! * The `format` module computes bits-per-pixel, plane count and plane geometry from a DRM
//!   fourcc.
//!
//! * The `memory` module allocates buffer objects (single block or one object per plane), and
//!   wraps them into handles that are released when dropped and can be exported as DMABUF fds,
//!   mapped, or shared through a global name.
#[doc(hidden)]
pub mod bindings;
pub mod device;
pub mod format;
pub mod ioctl;
pub mod memory;

use std::fmt;
use std::io;
use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

/// A DRM fourcc pixel format. It can be converted back and forth from a 32-bit integer, or a
/// 4-bytes string.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct PixelFormat(u32);

impl PixelFormat {
    pub const fn from_u32(v: u32) -> Self {
        Self(v)
    }

    pub const fn to_u32(self) -> u32 {
        self.0
    }

    pub const fn from_fourcc(n: &[u8; 4]) -> Self {
        Self(n[0] as u32 | (n[1] as u32) << 8 | (n[2] as u32) << 16 | (n[3] as u32) << 24)
    }

    pub const fn to_fourcc(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

/// Converts a fourcc in 32-bit integer format (like the ones found in `drm_fourcc.h`) into the
/// matching pixel format.
///
/// # Examples
///
/// ```
/// # use nxgem::PixelFormat;
/// // Fourcc representation of NV12.
/// let nv12: u32 = 0x3231564e;
/// let f = PixelFormat::from(nv12);
/// assert_eq!(u32::from(f), nv12);
/// ```
impl From<u32> for PixelFormat {
    fn from(i: u32) -> Self {
        Self::from_u32(i)
    }
}

impl From<PixelFormat> for u32 {
    fn from(format: PixelFormat) -> Self {
        format.to_u32()
    }
}

/// Simple way to convert a string litteral (e.g. b"NV12") into a pixel format.
///
/// # Examples
///
/// ```
/// # use nxgem::PixelFormat;
/// let nv12 = b"NV12";
/// let f = PixelFormat::from(nv12);
/// assert_eq!(&<[u8; 4]>::from(f), nv12);
/// ```
impl From<&[u8; 4]> for PixelFormat {
    fn from(n: &[u8; 4]) -> Self {
        Self::from_fourcc(n)
    }
}

impl From<PixelFormat> for [u8; 4] {
    fn from(format: PixelFormat) -> Self {
        format.to_fourcc()
    }
}

/// Produces a debug string for this PixelFormat, including its hexadecimal
/// and string representation.
///
/// # Examples
///
/// ```
/// # use nxgem::PixelFormat;
/// let f = PixelFormat::from_u32(0x3231564e);
/// assert_eq!(format!("{:?}", f), "0x3231564e (NV12)");
/// ```
impl fmt::Debug for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_fmt(format_args!("0x{:08x} ({})", self.0, self))
    }
}

/// Produces a displayable form of this PixelFormat. Non-printable bytes are
/// replaced by `?`.
///
/// # Examples
///
/// ```
/// # use nxgem::PixelFormat;
/// let f = PixelFormat::from_u32(0x3231564e);
/// assert_eq!(f.to_string(), "NV12");
/// ```
impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let fourcc = self
            .0
            .to_le_bytes()
            .iter()
            .map(|&x| {
                if x.is_ascii_graphic() || x == b' ' {
                    x as char
                } else {
                    '?'
                }
            })
            .collect::<String>();
        f.write_str(fourcc.as_str())
    }
}

/// Errors returned by the buffer allocation and sharing operations.
///
/// Every variant carries the numeric code (format, handle, name or OS error) that caused it.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot open DRM device {}: {source}", .path.display())]
    DeviceUnavailable { path: PathBuf, source: io::Error },
    #[error("driver command failed: {0}")]
    IoctlFailed(Errno),
    #[error("unsupported format {0:?}")]
    UnsupportedFormat(PixelFormat),
    #[error("failed to allocate GEM buffer: {0}")]
    AllocFailed(Errno),
    #[error("failed to create dumb buffer: {0}")]
    OutOfMemory(Errno),
    #[error("failed to export GEM handle {handle} as DMABUF: {errno}")]
    ExportFailed { handle: u32, errno: Errno },
    #[error("failed to map GEM handle {handle}: {errno}")]
    MapFailed { handle: u32, errno: Errno },
    #[error("cannot open GEM name {name}: {errno}")]
    ImportFailed { name: u32, errno: Errno },
}

impl From<Error> for Errno {
    fn from(err: Error) -> Self {
        match err {
            Error::DeviceUnavailable { source, .. } => source
                .raw_os_error()
                .map_or(Errno::ENODEV, Errno::from_raw),
            Error::IoctlFailed(e) => e,
            Error::UnsupportedFormat(_) => Errno::EINVAL,
            Error::AllocFailed(e) => e,
            Error::OutOfMemory(_) => Errno::ENOMEM,
            Error::ExportFailed { errno, .. } => errno,
            Error::MapFailed { errno, .. } => errno,
            Error::ImportFailed { .. } => Errno::EINVAL,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
