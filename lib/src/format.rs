//! Pixel format resolution: bits-per-pixel, plane count and plane geometry of DRM fourcc formats.
//!
//! Two geometry models coexist and must not be mixed up:
//!
//! * the per-plane model ([`resolve_chroma_geometry`]) used when each plane is a separate buffer
//!   object, where chroma planes get their own stride and height;
//! * the single-block model ([`resolve_luma_virtual_height`]) used when all planes are stacked in
//!   one allocation, which is then described as a taller luma-only surface.
use std::convert::TryFrom;

use enumn::N;
use log::error;

use crate::{Error, PixelFormat, Result};

const fn fourcc(n: &[u8; 4]) -> u32 {
    PixelFormat::from_fourcc(n).to_u32()
}

/// The formats known to this crate, with their `drm_fourcc.h` codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, N)]
#[repr(u32)]
pub enum DrmFormat {
    Nv12 = fourcc(b"NV12"),
    Nv21 = fourcc(b"NV21"),
    Nv16 = fourcc(b"NV16"),
    Nv61 = fourcc(b"NV61"),
    Yuv420 = fourcc(b"YU12"),
    Yvu420 = fourcc(b"YV12"),

    Argb4444 = fourcc(b"AR12"),
    Xrgb4444 = fourcc(b"XR12"),
    Abgr4444 = fourcc(b"AB12"),
    Xbgr4444 = fourcc(b"XB12"),
    Rgba4444 = fourcc(b"RA12"),
    Rgbx4444 = fourcc(b"RX12"),
    Bgra4444 = fourcc(b"BA12"),
    Bgrx4444 = fourcc(b"BX12"),
    Argb1555 = fourcc(b"AR15"),
    Xrgb1555 = fourcc(b"XR15"),
    Abgr1555 = fourcc(b"AB15"),
    Xbgr1555 = fourcc(b"XB15"),
    Rgba5551 = fourcc(b"RA15"),
    Rgbx5551 = fourcc(b"RX15"),
    Bgra5551 = fourcc(b"BA15"),
    Bgrx5551 = fourcc(b"BX15"),
    Rgb565 = fourcc(b"RG16"),
    Bgr565 = fourcc(b"BG16"),
    Uyvy = fourcc(b"UYVY"),
    Vyuy = fourcc(b"VYUY"),
    Yuyv = fourcc(b"YUYV"),
    Yvyu = fourcc(b"YVYU"),

    Bgr888 = fourcc(b"BG24"),
    Rgb888 = fourcc(b"RG24"),

    Argb8888 = fourcc(b"AR24"),
    Xrgb8888 = fourcc(b"XR24"),
    Abgr8888 = fourcc(b"AB24"),
    Xbgr8888 = fourcc(b"XB24"),
    Rgba8888 = fourcc(b"RA24"),
    Rgbx8888 = fourcc(b"RX24"),
    Bgra8888 = fourcc(b"BA24"),
    Bgrx8888 = fourcc(b"BX24"),
    Argb2101010 = fourcc(b"AR30"),
    Xrgb2101010 = fourcc(b"XR30"),
    Abgr2101010 = fourcc(b"AB30"),
    Xbgr2101010 = fourcc(b"XB30"),
    Rgba1010102 = fourcc(b"RA30"),
    Rgbx1010102 = fourcc(b"RX30"),
    Bgra1010102 = fourcc(b"BA30"),
    Bgrx1010102 = fourcc(b"BX30"),
}

impl TryFrom<PixelFormat> for DrmFormat {
    type Error = Error;

    fn try_from(format: PixelFormat) -> Result<Self> {
        DrmFormat::n(format.to_u32()).ok_or(Error::UnsupportedFormat(format))
    }
}

impl From<DrmFormat> for PixelFormat {
    fn from(format: DrmFormat) -> Self {
        PixelFormat::from_u32(format as u32)
    }
}

/// How the components of a format are split into planes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaneLayout {
    /// All components interleaved in a single plane.
    Packed,
    /// Luma plane followed by one interleaved CbCr plane at half vertical resolution.
    SemiPlanar420,
    /// Luma plane followed by one interleaved CbCr plane at full vertical resolution.
    SemiPlanar422,
    /// Luma plane followed by two chroma planes at half horizontal and vertical resolution.
    Planar420,
}

impl PlaneLayout {
    pub fn num_planes(self) -> usize {
        match self {
            PlaneLayout::Packed => 1,
            PlaneLayout::SemiPlanar420 | PlaneLayout::SemiPlanar422 => 2,
            PlaneLayout::Planar420 => 3,
        }
    }
}

/// Entry of the format table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatInfo {
    pub format: DrmFormat,
    pub bpp: u32,
    pub layout: PlaneLayout,
}

const fn info(format: DrmFormat, bpp: u32, layout: PlaneLayout) -> FormatInfo {
    FormatInfo {
        format,
        bpp,
        layout,
    }
}

use DrmFormat::*;
use PlaneLayout::*;

static FORMATS: [FormatInfo; 46] = [
    info(Nv12, 8, SemiPlanar420),
    info(Nv21, 8, SemiPlanar420),
    info(Nv16, 8, SemiPlanar422),
    info(Nv61, 8, SemiPlanar422),
    info(Yuv420, 8, Planar420),
    info(Yvu420, 8, Planar420),
    info(Argb4444, 16, Packed),
    info(Xrgb4444, 16, Packed),
    info(Abgr4444, 16, Packed),
    info(Xbgr4444, 16, Packed),
    info(Rgba4444, 16, Packed),
    info(Rgbx4444, 16, Packed),
    info(Bgra4444, 16, Packed),
    info(Bgrx4444, 16, Packed),
    info(Argb1555, 16, Packed),
    info(Xrgb1555, 16, Packed),
    info(Abgr1555, 16, Packed),
    info(Xbgr1555, 16, Packed),
    info(Rgba5551, 16, Packed),
    info(Rgbx5551, 16, Packed),
    info(Bgra5551, 16, Packed),
    info(Bgrx5551, 16, Packed),
    info(Rgb565, 16, Packed),
    info(Bgr565, 16, Packed),
    info(Uyvy, 16, Packed),
    info(Vyuy, 16, Packed),
    info(Yuyv, 16, Packed),
    info(Yvyu, 16, Packed),
    info(Bgr888, 24, Packed),
    info(Rgb888, 24, Packed),
    info(Argb8888, 32, Packed),
    info(Xrgb8888, 32, Packed),
    info(Abgr8888, 32, Packed),
    info(Xbgr8888, 32, Packed),
    info(Rgba8888, 32, Packed),
    info(Rgbx8888, 32, Packed),
    info(Bgra8888, 32, Packed),
    info(Bgrx8888, 32, Packed),
    info(Argb2101010, 32, Packed),
    info(Xrgb2101010, 32, Packed),
    info(Abgr2101010, 32, Packed),
    info(Xbgr2101010, 32, Packed),
    info(Rgba1010102, 32, Packed),
    info(Rgbx1010102, 32, Packed),
    info(Bgra1010102, 32, Packed),
    info(Bgrx1010102, 32, Packed),
];

/// Returns all the formats this crate knows how to allocate.
pub fn supported_formats() -> &'static [FormatInfo] {
    &FORMATS
}

impl FormatInfo {
    /// Returns the table entry of `format`, or `None` if this crate does not know it.
    pub fn find(format: PixelFormat) -> Option<&'static FormatInfo> {
        let drm = DrmFormat::try_from(format).ok()?;
        FORMATS.iter().find(|i| i.format == drm)
    }

    /// Looks `format` up in the format table, logging unsupported formats.
    pub fn lookup(format: PixelFormat) -> Result<&'static FormatInfo> {
        FormatInfo::find(format).ok_or_else(|| {
            error!("unsupported format 0x{:08x}", format.to_u32());
            Error::UnsupportedFormat(format)
        })
    }

    pub fn num_planes(&self) -> usize {
        self.layout.num_planes()
    }
}

/// Returns the number of bits per pixel of the luma (or only) plane of `format`.
pub fn resolve_bpp(format: PixelFormat) -> Result<u32> {
    FormatInfo::lookup(format).map(|i| i.bpp)
}

/// Returns the number of planes, i.e. separate buffer objects, used by `format`.
///
/// Formats this crate does not know about are considered single-planar.
pub fn resolve_plane_count(format: PixelFormat) -> usize {
    FormatInfo::find(format).map_or(1, FormatInfo::num_planes)
}

/// Stride and height of every chroma plane of a multi-planar format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChromaGeometry {
    pub stride: u32,
    pub height: u32,
}

/// Computes the chroma plane geometry of `format` for a `width`x`height` frame.
///
/// Odd dimensions of subsampled formats are truncated. Single-planar formats have no chroma
/// plane and are rejected.
pub fn resolve_chroma_geometry(
    format: PixelFormat,
    width: u32,
    height: u32,
) -> Result<ChromaGeometry> {
    match FormatInfo::lookup(format)?.layout {
        Planar420 => Ok(ChromaGeometry {
            stride: width / 2,
            height: height / 2,
        }),
        SemiPlanar420 => Ok(ChromaGeometry {
            stride: width,
            height: height / 2,
        }),
        SemiPlanar422 => Ok(ChromaGeometry {
            stride: width,
            height,
        }),
        Packed => {
            error!("format {:?} has no chroma plane", format);
            Err(Error::UnsupportedFormat(format))
        }
    }
}

/// Returns the height of a luma-only surface large enough to hold all the planes of a
/// `height`-lines frame of `format` stacked one after the other.
///
/// Formats this crate does not know about are returned unchanged.
pub fn resolve_luma_virtual_height(format: PixelFormat, height: u32) -> u64 {
    let height = height as u64;
    match FormatInfo::find(format).map(|i| i.layout) {
        Some(SemiPlanar420 | Planar420) => height * 3 / 2,
        Some(SemiPlanar422) => height * 2,
        Some(Packed) | None => height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nv12() -> PixelFormat {
        PixelFormat::from(b"NV12")
    }

    #[test]
    fn table_matches_enum() {
        for info in supported_formats() {
            let raw = PixelFormat::from(info.format);
            assert_eq!(DrmFormat::try_from(raw).unwrap(), info.format);
            assert_eq!(FormatInfo::lookup(raw).unwrap(), info);
            assert_eq!(FormatInfo::find(raw), Some(info));
        }
        assert_eq!(FormatInfo::find(PixelFormat::from(b"NV24")), None);
        // Every format appears exactly once.
        for (i, a) in FORMATS.iter().enumerate() {
            assert!(FORMATS[i + 1..].iter().all(|b| b.format != a.format));
        }
    }

    #[test]
    fn bpp_of_supported_formats() {
        for info in supported_formats() {
            let bpp = resolve_bpp(info.format.into()).unwrap();
            assert!([8, 16, 24, 32].contains(&bpp), "{:?}", info);
        }
        assert_eq!(resolve_bpp(nv12()).unwrap(), 8);
        assert_eq!(resolve_bpp(PixelFormat::from(b"RG16")).unwrap(), 16);
        assert_eq!(resolve_bpp(PixelFormat::from(b"YUYV")).unwrap(), 16);
        assert_eq!(resolve_bpp(PixelFormat::from(b"BG24")).unwrap(), 24);
        assert_eq!(resolve_bpp(PixelFormat::from(b"XR30")).unwrap(), 32);
    }

    #[test]
    fn bpp_of_unsupported_formats() {
        for raw in [0, 0xffff_ffff, fourcc(b"NV24"), fourcc(b"P010"), fourcc(b"R8  ")] {
            match resolve_bpp(PixelFormat::from_u32(raw)) {
                Err(Error::UnsupportedFormat(f)) => assert_eq!(f.to_u32(), raw),
                r => panic!("unexpected result {:?} for 0x{:08x}", r, raw),
            }
        }
    }

    #[test]
    fn plane_count() {
        assert_eq!(resolve_plane_count(nv12()), 2);
        assert_eq!(resolve_plane_count(PixelFormat::from(b"NV21")), 2);
        assert_eq!(resolve_plane_count(PixelFormat::from(b"NV16")), 2);
        assert_eq!(resolve_plane_count(PixelFormat::from(b"NV61")), 2);
        assert_eq!(resolve_plane_count(PixelFormat::from(b"YU12")), 3);
        assert_eq!(resolve_plane_count(PixelFormat::from(b"YV12")), 3);
        assert_eq!(resolve_plane_count(PixelFormat::from(b"XR24")), 1);
        assert_eq!(resolve_plane_count(PixelFormat::from(b"UYVY")), 1);
        // Unknown formats are single-planar.
        assert_eq!(resolve_plane_count(PixelFormat::from(b"NV24")), 1);
    }

    #[test]
    fn chroma_geometry() {
        let yuv420 = PixelFormat::from(b"YU12");
        assert_eq!(
            resolve_chroma_geometry(yuv420, 640, 480).unwrap(),
            ChromaGeometry {
                stride: 320,
                height: 240
            }
        );
        // Odd dimensions are truncated.
        assert_eq!(
            resolve_chroma_geometry(yuv420, 641, 481).unwrap(),
            ChromaGeometry {
                stride: 320,
                height: 240
            }
        );
        assert_eq!(
            resolve_chroma_geometry(nv12(), 1920, 1080).unwrap(),
            ChromaGeometry {
                stride: 1920,
                height: 540
            }
        );
        assert_eq!(
            resolve_chroma_geometry(PixelFormat::from(b"NV61"), 1920, 1080).unwrap(),
            ChromaGeometry {
                stride: 1920,
                height: 1080
            }
        );
        assert!(matches!(
            resolve_chroma_geometry(PixelFormat::from(b"XR24"), 64, 64),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(matches!(
            resolve_chroma_geometry(PixelFormat::from(b"NV24"), 64, 64),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn chroma_never_taller_than_luma() {
        for info in supported_formats().iter().filter(|i| i.num_planes() > 1) {
            for (w, h) in [(0, 0), (1, 1), (3, 7), (640, 480), (1920, 1080)] {
                let chroma = resolve_chroma_geometry(info.format.into(), w, h).unwrap();
                assert!(chroma.height <= h);
                assert!(chroma.stride <= w);
                match info.layout {
                    SemiPlanar422 => assert_eq!(chroma.height, h),
                    _ => assert_eq!(chroma.height, h / 2),
                }
            }
        }
    }

    #[test]
    fn virtual_height() {
        assert_eq!(resolve_luma_virtual_height(nv12(), 1080), 1620);
        assert_eq!(resolve_luma_virtual_height(PixelFormat::from(b"YV12"), 480), 720);
        assert_eq!(resolve_luma_virtual_height(PixelFormat::from(b"NV16"), 480), 960);
        assert_eq!(resolve_luma_virtual_height(PixelFormat::from(b"AR24"), 480), 480);
        assert_eq!(resolve_luma_virtual_height(PixelFormat::from(b"NV24"), 480), 480);
        // Truncated like the chroma planes.
        assert_eq!(resolve_luma_virtual_height(nv12(), 5), 7);
        assert_eq!(
            resolve_luma_virtual_height(nv12(), u32::MAX),
            u32::MAX as u64 * 3 / 2
        );
    }
}
