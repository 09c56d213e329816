//! Host-mirrored GPU buffer synchronization
//!
//! CPU-side mirrors of device resources that remember which bytes changed,
//! so that pushing them to the device costs one write per flush no matter how
//! many fields were touched.
//!
//! - [`layout`]: field placement under tight, std140 and std430 packing
//! - [`table`]: typed field tables, buffer-backed or set field by field
//! - [`buffer`]: growable element sequences with a staging stack for batched inserts
//! - [`device`]: the device traits, an in-memory recording device and a `wgpu` backend
//!
//! ```
//! use std::sync::Arc;
//! use gpu_mirror::{BufferBackedTable, FieldType, PackingMode, RecordingDevice, TableSchema};
//!
//! let device = Arc::new(RecordingDevice::new());
//! let schema = TableSchema::new()
//!     .field("tint", FieldType::VEC3)
//!     .field("exposure", FieldType::FLOAT);
//! let mut table = BufferBackedTable::with_schema(device, PackingMode::Std140, &schema)?;
//!
//! table.set("exposure", 1.5f32)?;
//! table.flush()?;
//! table.bind(0)?;
//! # Ok::<(), gpu_mirror::MirrorError>(())
//! ```

pub mod buffer;
pub mod constants;
pub mod device;
pub mod dirty;
pub mod error;
pub mod layout;
pub mod stats;
pub mod table;

pub use buffer::{GrowableMirroredBuffer, GrowthConfig};
pub use device::{
    BufferDevice, DeviceCall, DeviceHandle, Location, ProgramDevice, ProgramHandle,
    RecordingDevice,
};
#[cfg(feature = "wgpu")]
pub use device::WgpuDevice;
pub use dirty::DirtyRange;
pub use error::{MirrorError, MirrorErrorContext, MirrorResult};
pub use layout::{
    calculate_layout, FieldDescriptor, FieldSpec, FieldType, LayoutInfo, PackingMode, ScalarKind,
};
pub use stats::SyncStats;
pub use table::{BufferBackedTable, DirectTable, ShaderValue, TableSchema, TypedTable};
