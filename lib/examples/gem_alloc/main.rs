use std::os::unix::io::AsRawFd;

use anyhow::{anyhow, Context, Result};
use clap::{Arg, Command};
use log::info;
use nxgem::{
    device::{DeviceConfig, DrmDevice, DEFAULT_DEVICE_PATH},
    format::{resolve_luma_virtual_height, FormatInfo},
    memory::{alloc_dumb_for_format, alloc_multiplane},
    PixelFormat,
};

fn parse_size(s: &str) -> Result<(u32, u32)> {
    let (width, height) = s
        .split_once('x')
        .ok_or_else(|| anyhow!("invalid frame size {:?}, expected WIDTHxHEIGHT", s))?;

    Ok((width.parse()?, height.parse()?))
}

fn parse_fourcc(s: &str) -> Result<PixelFormat> {
    let fourcc: [u8; 4] = s
        .as_bytes()
        .try_into()
        .map_err(|_| anyhow!("invalid fourcc {:?}", s))?;

    Ok(PixelFormat::from(&fourcc))
}

fn main() -> Result<()> {
    env_logger::init();

    let matches = Command::new("GEM buffer allocation test")
        .arg(
            Arg::new("device")
                .long("device")
                .takes_value(true)
                .default_value(DEFAULT_DEVICE_PATH)
                .help("Path to the DRM device"),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .takes_value(true)
                .default_value("NV12")
                .help("Fourcc of the pixel format to allocate (e.g. \"YU12\")"),
        )
        .arg(
            Arg::new("frame_size")
                .long("size")
                .takes_value(true)
                .default_value("640x480")
                .help("Size of the frame to allocate (e.g. \"640x480\")"),
        )
        .arg(
            Arg::new("single_block")
                .long("single-block")
                .help("Allocate all the planes in a single buffer object"),
        )
        .get_matches();

    let device_path = matches.value_of("device").unwrap_or(DEFAULT_DEVICE_PATH);
    let format = parse_fourcc(matches.value_of("format").unwrap_or("NV12"))?;
    let (width, height) = parse_size(matches.value_of("frame_size").unwrap_or("640x480"))?;

    let info = FormatInfo::lookup(format)?;
    info!(
        "{:?}: {} bpp, {} plane(s)",
        format,
        info.bpp,
        info.num_planes()
    );

    let device = DrmDevice::open(DeviceConfig::new().path(device_path))?;

    if matches.is_present("single_block") {
        let alloc = alloc_dumb_for_format(&device, width, height, format)?;
        println!(
            "{}x{} {}: handle {}, {} bytes (virtual height {})",
            width,
            height,
            format,
            alloc.handle.raw(),
            alloc.size,
            resolve_luma_virtual_height(format, height)
        );

        let mut mapping = alloc
            .handle
            .map(alloc.size as usize)
            .context("cannot map buffer")?;
        mapping.fill(0x80);

        let dmabuf = alloc.handle.export_dmabuf()?;
        println!("exported as DMABUF fd {}", dmabuf.as_raw_fd());
        if let Some(name) = alloc.handle.publish_name() {
            println!("published as global name {}", name);
        }

        return Ok(());
    }

    let buffer = alloc_multiplane(&device, width, height, format).map_err(nxgem::Error::from)?;
    for (i, plane) in buffer.planes().iter().enumerate() {
        println!(
            "plane {}: handle {}, stride {}, size {}, dmabuf fd {}",
            i,
            plane.handle.raw(),
            plane.stride,
            plane.size,
            plane.dmabuf_raw_fd()
        );
    }

    let luma = &buffer.planes()[0];
    let mut mapping = luma
        .handle
        .map(luma.size as usize)
        .context("cannot map luma plane")?;
    for (i, line) in mapping.chunks_mut(luma.stride.max(1) as usize).enumerate() {
        line.fill((i % 256) as u8);
    }
    info!("filled luma plane with a gradient");

    Ok(())
}
