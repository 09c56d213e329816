//! Typed field tables mirrored to a device
//!
//! - [`TypedTable`]: schema, CPU mirror and dirty tracking
//! - [`BufferBackedTable`]: std140/std430, one device buffer, ranged flushes
//! - [`DirectTable`]: tight layout, per-field set calls into a program

pub mod buffer_backed;
pub mod direct;
pub mod schema;
pub mod typed_table;
pub mod value;

pub use buffer_backed::BufferBackedTable;
pub use direct::DirectTable;
pub use schema::TableSchema;
pub use typed_table::TypedTable;
pub use value::ShaderValue;
