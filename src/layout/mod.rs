//! Field layout under tight, std140 and std430 packing
//!
//! Pure calculation only: nothing here owns memory or talks to a device.

pub mod calculator;
pub mod columns;
pub mod types;

pub use calculator::{
    align_size, calculate_layout, padding_for_alignment, FieldDescriptor, FieldSpec, LayoutBuilder,
    LayoutInfo, PackingMode,
};
pub use types::{FieldType, ScalarKind};
