//! Device collaborators
//!
//! The mirrors in this crate only ever call *into* a device; they never
//! implement one. [`BufferDevice`] covers resources written by ranged uploads,
//! [`ProgramDevice`] covers per-field "set at location" calls.
//!
//! Both traits take `&self`, like `wgpu::Device` and `wgpu::Queue`, so one
//! device can be shared through an `Arc` by every table and buffer using it.

pub mod recording;
#[cfg(feature = "wgpu")]
pub mod wgpu_backend;

use std::fmt;

use crate::error::MirrorResult;
use crate::layout::FieldType;

pub use recording::{DeviceCall, RecordingDevice};
#[cfg(feature = "wgpu")]
pub use wgpu_backend::WgpuDevice;

/// Opaque id of one device buffer resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceHandle(pub u64);

/// Opaque id of a program-like object exposing named fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramHandle(pub u64);

/// Device-side location of one named field within a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location(pub i32);

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer#{}", self.0)
    }
}

impl fmt::Display for ProgramHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "program#{}", self.0)
    }
}

/// Sink for buffer resources
pub trait BufferDevice {
    /// Allocate a resource of `size` bytes; contents are unspecified
    fn allocate(&self, size: u64) -> MirrorResult<DeviceHandle>;

    /// Overwrite `bytes.len()` bytes of `handle` starting at `offset`
    fn write_range(&self, handle: DeviceHandle, offset: u64, bytes: &[u8]) -> MirrorResult<()>;

    /// Attach `handle` to binding slot `slot` for later shader use
    fn bind_slot(&self, handle: DeviceHandle, slot: u32) -> MirrorResult<()>;

    /// Give the resource back; called exactly once per allocated handle
    fn release(&self, handle: DeviceHandle);
}

/// Sink for per-field program state
pub trait ProgramDevice {
    /// Location of `name` in `program`, `None` if the program does not use it
    fn resolve_field_location(&self, program: ProgramHandle, name: &str) -> Option<Location>;

    /// Set `count` elements of `field_type` at `location` from tightly packed bytes
    fn set_field(
        &self,
        location: Location,
        field_type: FieldType,
        count: u32,
        bytes: &[u8],
    ) -> MirrorResult<()>;
}
