//! Table synchronized by per-field set calls
//!
//! No device buffer backs a direct table. Each field is pushed to a location
//! resolved in a program object, one call per field touched by the dirty
//! range. Layout is always tight so a field's bytes are already in the form
//! the set call expects.

use std::ops::Deref;

use rustc_hash::FxHashMap;

use crate::device::{Location, ProgramDevice, ProgramHandle};
use crate::error::MirrorResult;
use crate::layout::{FieldSpec, PackingMode};
use crate::stats::SyncStats;
use crate::table::schema::TableSchema;
use crate::table::typed_table::TypedTable;
use crate::table::value::ShaderValue;

/// Tight table flushed field by field into a program
///
/// ```compile_fail
/// let mut table = gpu_mirror::DirectTable::new();
/// table.take_dirty();
/// ```
#[derive(Debug, Clone)]
pub struct DirectTable {
    table: TypedTable,
    /// Per program, one entry per field in registration order
    locations: FxHashMap<ProgramHandle, Vec<Option<Location>>>,
    stats: SyncStats,
}

impl Default for DirectTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectTable {
    pub fn new() -> Self {
        Self {
            table: TypedTable::new(PackingMode::Tight),
            locations: FxHashMap::default(),
            stats: SyncStats::default(),
        }
    }

    pub fn with_fields(specs: &[FieldSpec]) -> MirrorResult<Self> {
        let mut table = Self::new();
        table.register(specs)?;
        Ok(table)
    }

    pub fn with_schema(schema: &TableSchema) -> MirrorResult<Self> {
        Self::with_fields(schema.specs())
    }

    pub fn register(&mut self, specs: &[FieldSpec]) -> MirrorResult<()> {
        self.table.register(specs)?;
        self.locations.clear();
        Ok(())
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

    /// Resolve and cache the location of every field in `program`
    pub fn resolve<P: ProgramDevice + ?Sized>(
        &mut self,
        device: &P,
        program: ProgramHandle,
    ) -> &[Option<Location>] {
        let table = &self.table;
        self.locations.entry(program).or_insert_with(|| {
            table
                .fields()
                .map(|field| {
                    let location = device.resolve_field_location(program, &field.name);
                    if location.is_none() {
                        log::warn!(
                            "[DirectTable] Field '{}' not exposed by {}, skipping",
                            field.name,
                            program
                        );
                    }
                    location
                })
                .collect()
        })
    }

    pub fn is_resolved(&self, program: ProgramHandle) -> bool {
        self.locations.contains_key(&program)
    }

    /// Forget the cached locations of `program`
    pub fn forget(&mut self, program: ProgramHandle) {
        self.locations.remove(&program);
    }

    /// Push every field touched by the dirty range to `program`
    ///
    /// On a device error the dirty range is kept, so the flush can be retried.
    /// Fields already pushed before the failure are pushed again.
    pub fn flush<P: ProgramDevice + ?Sized>(
        &mut self,
        device: &P,
        program: ProgramHandle,
    ) -> MirrorResult<()> {
        self.stats.record_flush();

        let Some(range) = self.table.dirty_range() else {
            return Ok(());
        };

        self.resolve(device, program);
        let locations = match self.locations.get(&program) {
            Some(locations) => locations,
            None => return Ok(()),
        };

        let mirror = self.table.mirror();
        for (field, location) in self.table.fields().zip(locations) {
            if !field.intersects(range.low, range.high) {
                continue;
            }
            let Some(location) = *location else {
                continue;
            };

            let bytes = &mirror[field.offset as usize..field.end() as usize];
            device.set_field(location, field.field_type, field.arity, bytes)?;
            self.stats.record_write(bytes.len() as u64);

            log::trace!(
                "[DirectTable] {} -> {:?} in {}",
                field.name,
                location,
                program
            );
        }

        self.table.clear_dirty();
        Ok(())
    }

    pub fn table(&self) -> &TypedTable {
        &self.table
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }
}

impl Deref for DirectTable {
    type Target = TypedTable;

    fn deref(&self) -> &TypedTable {
        &self.table
    }
}
