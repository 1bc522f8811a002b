//! Allocation and sharing of GEM buffer objects.
//!
//! Buffer objects are represented by [`GemHandle`], which borrows the [`GemDevice`] session they
//! have been created from and releases the object when dropped. A handle can be exported as a
//! DMABUF fd, mapped into the process address space, or published under a global name that
//! another session can open with [`import_by_name`].
//!
//! Three allocators are provided:
//!
//! * [`alloc_generic`], for raw byte-sized buffers with driver-specific placement flags;
//! * [`alloc_dumb`] and [`alloc_dumb_for_format`], which allocate a single buffer object, the
//!   latter being large enough for all the planes of a format stacked one after the other;
//! * [`alloc_multiplane`], which allocates and exports one buffer object per plane of a format.
//!
//! Functions taking a raw `u32` handle are provided for handles that have been detached from
//! their [`GemHandle`], e.g. when they are managed by foreign code.
//!
//! [`GemDevice`]: crate::device::GemDevice
mod alloc;
mod gem;
mod multiplane;

pub use alloc::*;
pub use gem::*;
pub use multiplane::*;
