//! In-memory stand-in for a DRM node, for testing without hardware.
//!
//! Buffer objects live in a [`FakeKernel`] shared by all the sessions created from it, and are
//! backed by memfds so they can actually be mapped and exported. Handles are per-session, global
//! names are per-kernel, like on a real device.
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::CStr;
use std::fs::File;
use std::num::NonZeroU32;
use std::os::unix::io::OwnedFd;
use std::rc::Rc;

use nix::errno::Errno;
use nix::sys::memfd::{memfd_create, MemFdCreateFlag};

use super::GemDevice;
use crate::ioctl::{
    self, CreateDumbError, DumbBuffer, GemCloseError, GemCreateError, GemFlags, GemFlinkError,
    GemOpenError, MapDumbError, MmapError, OpenedGem, PlaneMapping, PrimeFlags,
    PrimeHandleToFdError,
};

const OFFSET_SHIFT: u32 = 28;

struct Object {
    memory: File,
    size: u64,
    name: Option<NonZeroU32>,
}

#[derive(Default)]
struct Kernel {
    objects: BTreeMap<u64, Object>,
    names: BTreeMap<u32, u64>,
    next_object: u64,
    next_name: u32,
}

impl Kernel {
    fn create_object(&mut self, size: u64) -> Result<u64, Errno> {
        if size == 0 {
            return Err(Errno::EINVAL);
        }

        let name = CStr::from_bytes_with_nul(b"nxgem-fake\0").map_err(|_| Errno::EINVAL)?;
        let memory = File::from(memfd_create(name, MemFdCreateFlag::MFD_CLOEXEC)?);
        memory.set_len(size).map_err(|_| Errno::ENOMEM)?;

        self.next_object += 1;
        let id = self.next_object;
        self.objects.insert(
            id,
            Object {
                memory,
                size,
                name: None,
            },
        );

        Ok(id)
    }
}

/// Fake kernel-side state, shared by sessions.
#[derive(Clone, Default)]
pub(crate) struct FakeKernel(Rc<RefCell<Kernel>>);

impl FakeKernel {
    pub fn new() -> Self {
        Default::default()
    }

    /// Opens a new session on this kernel.
    pub fn open(&self) -> FakeDevice {
        FakeDevice {
            kernel: self.clone(),
            handles: Default::default(),
            next_handle: Cell::new(0),
            calls: Cell::new(0),
            dumb_creates: Cell::new(0),
            fail_dumb_create: Cell::new(None),
            fail_export: Default::default(),
        }
    }
}

/// One session on a [`FakeKernel`].
pub(crate) struct FakeDevice {
    kernel: FakeKernel,
    handles: RefCell<BTreeMap<u32, u64>>,
    next_handle: Cell<u32>,
    calls: Cell<usize>,
    dumb_creates: Cell<usize>,
    fail_dumb_create: Cell<Option<usize>>,
    fail_export: RefCell<BTreeSet<u32>>,
}

impl FakeDevice {
    /// Opens a session on a fresh kernel.
    pub fn new() -> Self {
        FakeKernel::new().open()
    }

    pub fn kernel(&self) -> &FakeKernel {
        &self.kernel
    }

    /// Number of requests submitted so far through this session.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// Number of handles currently open in this session.
    pub fn live_handles(&self) -> usize {
        self.handles.borrow().len()
    }

    pub fn is_live(&self, handle: u32) -> bool {
        self.handles.borrow().contains_key(&handle)
    }

    /// Makes the `nth` (0-based) dumb buffer creation of this session fail with `ENOMEM`.
    pub fn fail_dumb_create(&self, nth: usize) {
        self.fail_dumb_create.set(Some(nth));
    }

    /// Makes every export of `handle` fail with `EMFILE`.
    pub fn fail_export(&self, handle: u32) {
        self.fail_export.borrow_mut().insert(handle);
    }

    fn submit(&self) {
        self.calls.set(self.calls.get() + 1);
    }

    fn new_handle(&self, object: u64) -> u32 {
        let handle = self.next_handle.get() + 1;
        self.next_handle.set(handle);
        self.handles.borrow_mut().insert(handle, object);
        handle
    }

    fn object(&self, handle: u32) -> Option<u64> {
        self.handles.borrow().get(&handle).copied()
    }
}

impl GemDevice for FakeDevice {
    fn gem_create(&self, size: u64, _flags: GemFlags) -> Result<u32, GemCreateError> {
        self.submit();
        let object = self.kernel.0.borrow_mut().create_object(size)?;
        Ok(self.new_handle(object))
    }

    fn create_dumb(
        &self,
        bpp: u32,
        width: u32,
        height: u32,
    ) -> Result<DumbBuffer, CreateDumbError> {
        self.submit();
        let nth = self.dumb_creates.get();
        self.dumb_creates.set(nth + 1);
        if self.fail_dumb_create.get() == Some(nth) {
            return Err(CreateDumbError::NoMem);
        }

        let pitch = (width as u64 * bpp as u64 + 7) / 8;
        let size = pitch * height as u64;
        let object = self
            .kernel
            .0
            .borrow_mut()
            .create_object(size)
            .map_err(|e| match e {
                Errno::EINVAL => CreateDumbError::InvalidGeometry { bpp, width, height },
                e => CreateDumbError::IoctlError(e),
            })?;

        Ok(DumbBuffer {
            handle: self.new_handle(object),
            pitch: pitch as u32,
            size,
        })
    }

    fn gem_close(&self, handle: u32) -> Result<(), GemCloseError> {
        self.submit();
        self.handles
            .borrow_mut()
            .remove(&handle)
            .map(|_| ())
            .ok_or(GemCloseError::InvalidHandle(handle))
    }

    fn prime_handle_to_fd(
        &self,
        handle: u32,
        _flags: PrimeFlags,
    ) -> Result<OwnedFd, PrimeHandleToFdError> {
        self.submit();
        let object = self
            .object(handle)
            .ok_or(PrimeHandleToFdError::NoSuchHandle(handle))?;
        if self.fail_export.borrow().contains(&handle) {
            return Err(PrimeHandleToFdError::IoctlError(Errno::EMFILE));
        }

        let kernel = self.kernel.0.borrow();
        let memory = kernel.objects[&object]
            .memory
            .try_clone()
            .map_err(|_| PrimeHandleToFdError::IoctlError(Errno::EMFILE))?;

        Ok(memory.into())
    }

    fn map_dumb(&self, handle: u32) -> Result<u64, MapDumbError> {
        self.submit();
        self.object(handle)
            .map(|object| object << OFFSET_SHIFT)
            .ok_or(MapDumbError::NoSuchHandle(handle))
    }

    fn mmap(&self, offset: u64, length: usize) -> Result<PlaneMapping, MmapError> {
        self.submit();
        let kernel = self.kernel.0.borrow();
        let object = kernel
            .objects
            .get(&(offset >> OFFSET_SHIFT))
            .ok_or(MmapError::InvalidOffset(offset))?;
        if length as u64 > object.size {
            return Err(MmapError::MmapError(Errno::EINVAL));
        }

        ioctl::mmap(&object.memory, 0, length)
    }

    fn gem_flink(&self, handle: u32) -> Result<NonZeroU32, GemFlinkError> {
        self.submit();
        let object = self
            .object(handle)
            .ok_or(GemFlinkError::NoSuchHandle(handle))?;

        let mut kernel = self.kernel.0.borrow_mut();
        if let Some(name) = kernel.objects[&object].name {
            return Ok(name);
        }
        kernel.next_name += 1;
        let name = kernel.next_name;
        kernel.names.insert(name, object);
        let name = NonZeroU32::new(name).ok_or(GemFlinkError::NullName)?;
        if let Some(o) = kernel.objects.get_mut(&object) {
            o.name = Some(name);
        }

        Ok(name)
    }

    fn gem_open(&self, name: u32) -> Result<OpenedGem, GemOpenError> {
        self.submit();
        let (object, size) = {
            let kernel = self.kernel.0.borrow();
            let object = *kernel
                .names
                .get(&name)
                .ok_or(GemOpenError::UnknownName(name))?;
            (object, kernel.objects[&object].size)
        };

        Ok(OpenedGem {
            handle: self.new_handle(object),
            size,
        })
    }
}
