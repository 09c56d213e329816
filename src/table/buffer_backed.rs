//! Table mirrored into one device buffer resource
//!
//! The resource is created on the first [`flush`](BufferBackedTable::flush),
//! so a table can be declared and filled before its device is ready to take
//! uploads. Each flush after that is at most one ranged write.

use std::ops::Deref;
use std::sync::Arc;

use crate::constants::layout::DEVICE_SIZE_ALIGNMENT;
use crate::device::{BufferDevice, DeviceHandle};
use crate::error::{invalid_field, MirrorError, MirrorResult};
use crate::layout::{align_size, FieldSpec, PackingMode};
use crate::stats::SyncStats;
use crate::table::schema::TableSchema;
use crate::table::typed_table::TypedTable;
use crate::table::value::ShaderValue;

const RESOURCE: &str = "BufferBackedTable";

/// Std140/std430 table synchronized through ranged writes
///
/// Reads go through `Deref<Target = TypedTable>`; writes only through the
/// forwarding setters, so the dirty range can only be cleared by a flush.
///
/// ```compile_fail
/// use std::sync::Arc;
/// use gpu_mirror::{BufferBackedTable, PackingMode, RecordingDevice};
///
/// let device = Arc::new(RecordingDevice::new());
/// let mut table = BufferBackedTable::new(device, PackingMode::Std140).unwrap();
/// table.take_dirty();
/// ```
pub struct BufferBackedTable<D: BufferDevice> {
    table: TypedTable,
    device: Arc<D>,
    handle: Option<DeviceHandle>,
    stats: SyncStats,
}

impl<D: BufferDevice> BufferBackedTable<D> {
    /// Unregistered table; `packing` must be one of the standardized layouts
    pub fn new(device: Arc<D>, packing: PackingMode) -> MirrorResult<Self> {
        if !packing.is_standardized() {
            return Err(invalid_field(
                RESOURCE,
                "buffer-backed tables need std140 or std430 packing",
            ));
        }

        Ok(Self {
            table: TypedTable::new(packing),
            device,
            handle: None,
            stats: SyncStats::default(),
        })
    }

    pub fn with_fields(device: Arc<D>, packing: PackingMode, specs: &[FieldSpec]) -> MirrorResult<Self> {
        let mut table = Self::new(device, packing)?;
        table.register(specs)?;
        Ok(table)
    }

    /// Register the schema; refused once the device resource exists
    pub fn register(&mut self, specs: &[FieldSpec]) -> MirrorResult<()> {
        if self.handle.is_some() {
            return Err(MirrorError::AlreadyInitialized);
        }
        self.table.register(specs)
    }

    pub fn register_schema(&mut self, schema: &TableSchema) -> MirrorResult<()> {
        self.register(schema.specs())
    }

    pub fn set<T: ShaderValue>(&mut self, name: &str, value: T) -> MirrorResult<()> {
        self.table.set(name, value)
    }

    pub fn set_element<T: ShaderValue>(
        &mut self,
        name: &str,
        index: usize,
        value: T,
    ) -> MirrorResult<()> {
        self.table.set_element(name, index, value)
    }

    pub fn set_array<T: ShaderValue>(&mut self, name: &str, values: &[T]) -> MirrorResult<()> {
        self.table.set_array(name, values)
    }

    pub fn with_schema(device: Arc<D>, packing: PackingMode, schema: &TableSchema) -> MirrorResult<Self> {
        Self::with_fields(device, packing, schema.specs())
    }

    /// Bytes the device resource is (or will be) allocated with
    pub fn device_size(&self) -> u64 {
        align_size(self.table.total_size().max(1), DEVICE_SIZE_ALIGNMENT)
    }

    fn allocate(&mut self) -> MirrorResult<DeviceHandle> {
        let size = self.device_size();
        log::debug!(
            "[BufferBackedTable] Allocating {} bytes for {} fields",
            size,
            self.table.field_count()
        );

        let handle = self.device.allocate(size)?;
        self.handle = Some(handle);
        self.stats.record_allocation();

        // Fresh resource contents are unspecified: upload everything once
        self.table.mark_all_dirty();
        Ok(handle)
    }

    /// Upload the dirty range, allocating the device resource on first use
    pub fn flush(&mut self) -> MirrorResult<()> {
        if !self.table.is_registered() {
            return Err(invalid_field(RESOURCE, "flush before a schema is registered"));
        }
        self.stats.record_flush();

        let handle = match self.handle {
            Some(handle) => handle,
            None => self.allocate()?,
        };

        let Some(range) = self.table.dirty_range() else {
            return Ok(());
        };

        let bytes = &self.table.mirror()[range.as_range()];
        self.device.write_range(handle, range.low, bytes)?;
        self.stats.record_write(range.len());
        self.table.clear_dirty();

        log::trace!(
            "[BufferBackedTable] Flushed bytes {}..={} to {}",
            range.low,
            range.high,
            handle
        );
        Ok(())
    }

    /// Attach the device resource to a binding slot
    pub fn bind(&self, slot: u32) -> MirrorResult<()> {
        let handle = self.handle()?;
        self.device.bind_slot(handle, slot)
    }

    pub fn handle(&self) -> MirrorResult<DeviceHandle> {
        self.handle
            .ok_or(MirrorError::NotYetAllocated { resource: RESOURCE })
    }

    pub fn is_allocated(&self) -> bool {
        self.handle.is_some()
    }

    pub fn table(&self) -> &TypedTable {
        &self.table
    }

    pub fn device(&self) -> &Arc<D> {
        &self.device
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }
}

impl<D: BufferDevice> Deref for BufferBackedTable<D> {
    type Target = TypedTable;

    fn deref(&self) -> &TypedTable {
        &self.table
    }
}

impl<D: BufferDevice> Drop for BufferBackedTable<D> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            log::debug!("[BufferBackedTable] Releasing {}", handle);
            self.device.release(handle);
        }
    }
}
