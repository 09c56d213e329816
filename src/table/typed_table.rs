//! Typed field table over a CPU byte mirror
//!
//! The engine shared by [`BufferBackedTable`](super::BufferBackedTable) and
//! [`DirectTable`](super::DirectTable). It owns the field descriptors and the
//! mirror bytes, validates every typed access against the declared schema and
//! widens a single dirty range on each write. It never talks to a device.

use indexmap::IndexMap;

use crate::dirty::{DirtyRange, DirtyTracker};
use crate::error::{MirrorError, MirrorResult};
use crate::layout::columns::{gather_columns, scatter_columns};
use crate::layout::{calculate_layout, FieldDescriptor, FieldSpec, FieldType, PackingMode};
use crate::table::schema::TableSchema;
use crate::table::value::ShaderValue;

/// Named, typed fields laid out into one byte mirror
#[derive(Debug, Clone)]
pub struct TypedTable {
    packing: PackingMode,
    fields: IndexMap<String, FieldDescriptor>,
    mirror: Vec<u8>,
    dirty: DirtyTracker,
    initialized: bool,
}

/// Resolve `name` and check the caller's type against the declared one
fn lookup<'a>(
    fields: &'a IndexMap<String, FieldDescriptor>,
    name: &str,
    found: FieldType,
) -> MirrorResult<&'a FieldDescriptor> {
    let field = fields.get(name).ok_or_else(|| MirrorError::UnknownField {
        name: name.to_string(),
    })?;
    if field.field_type != found {
        return Err(MirrorError::TypeMismatch {
            field: name.to_string(),
            expected: field.field_type,
            found,
        });
    }
    Ok(field)
}

fn check_index(field: &FieldDescriptor, index: usize) -> MirrorResult<()> {
    if index >= field.arity as usize {
        return Err(MirrorError::IndexOutOfRange {
            index: index as isize,
            len: field.arity as usize,
        });
    }
    Ok(())
}

/// Write one element's native bytes at its padded position
fn write_element(mirror: &mut [u8], field: &FieldDescriptor, index: usize, native: &[u8]) {
    let start = field.element_offset(index as u32) as usize;
    let end = start + field.element_extent() as usize;
    scatter_columns(
        &mut mirror[start..end],
        native,
        field.field_type.column_size() as usize,
        field.stride as usize,
    );
}

fn read_element(mirror: &[u8], field: &FieldDescriptor, index: usize) -> Vec<u8> {
    let start = field.element_offset(index as u32) as usize;
    let end = start + field.element_extent() as usize;
    gather_columns(
        &mirror[start..end],
        field.field_type.columns() as usize,
        field.field_type.column_size() as usize,
        field.stride as usize,
    )
}

impl TypedTable {
    /// Empty, unregistered table
    pub fn new(packing: PackingMode) -> Self {
        Self {
            packing,
            fields: IndexMap::new(),
            mirror: Vec::new(),
            dirty: DirtyTracker::new(),
            initialized: false,
        }
    }

    pub fn with_fields(packing: PackingMode, specs: &[FieldSpec]) -> MirrorResult<Self> {
        let mut table = Self::new(packing);
        table.register(specs)?;
        Ok(table)
    }

    pub fn with_schema(packing: PackingMode, schema: &TableSchema) -> MirrorResult<Self> {
        Self::with_fields(packing, schema.specs())
    }

    /// Lay out `specs` and allocate the zeroed mirror; allowed exactly once
    pub fn register(&mut self, specs: &[FieldSpec]) -> MirrorResult<()> {
        if self.initialized {
            return Err(MirrorError::AlreadyInitialized);
        }

        let layout = calculate_layout(specs, self.packing)?;
        self.mirror = vec![0; layout.total_size as usize];
        self.fields = layout
            .fields
            .into_iter()
            .map(|field| (field.name.clone(), field))
            .collect();
        self.dirty.clear();
        self.initialized = true;

        log::debug!(
            "[TypedTable] Registered {} fields, {} bytes ({:?})",
            self.fields.len(),
            self.mirror.len(),
            self.packing
        );
        Ok(())
    }

    pub fn register_schema(&mut self, schema: &TableSchema) -> MirrorResult<()> {
        self.register(schema.specs())
    }

    pub fn set<T: ShaderValue>(&mut self, name: &str, value: T) -> MirrorResult<()> {
        self.set_element(name, 0, value)
    }

    /// Write element `index` of an array field
    pub fn set_element<T: ShaderValue>(
        &mut self,
        name: &str,
        index: usize,
        value: T,
    ) -> MirrorResult<()> {
        let field = lookup(&self.fields, name, T::FIELD_TYPE)?;
        check_index(field, index)?;

        write_element(&mut self.mirror, field, index, &value.to_native_bytes());
        self.dirty.mark(
            field.element_offset(index as u32),
            field.element_extent(),
        );

        log::trace!("[TypedTable] {}[{}] <- {}", name, index, T::FIELD_TYPE);
        Ok(())
    }

    /// Write elements `0..values.len()` with one dirty extension
    pub fn set_array<T: ShaderValue>(&mut self, name: &str, values: &[T]) -> MirrorResult<()> {
        let field = lookup(&self.fields, name, T::FIELD_TYPE)?;
        if values.is_empty() {
            return Ok(());
        }
        check_index(field, values.len() - 1)?;

        for (index, value) in values.iter().enumerate() {
            write_element(&mut self.mirror, field, index, &value.to_native_bytes());
        }
        let last = values.len() - 1;
        self.dirty.mark(
            field.offset,
            last as u64 * field.element_stride() + field.element_extent(),
        );
        Ok(())
    }

    pub fn get<T: ShaderValue>(&self, name: &str) -> MirrorResult<T> {
        self.get_element(name, 0)
    }

    pub fn get_element<T: ShaderValue>(&self, name: &str, index: usize) -> MirrorResult<T> {
        let field = lookup(&self.fields, name, T::FIELD_TYPE)?;
        check_index(field, index)?;
        Ok(T::from_native_bytes(&read_element(&self.mirror, field, index)))
    }

    /// Every element of an array field
    pub fn get_array<T: ShaderValue>(&self, name: &str) -> MirrorResult<Vec<T>> {
        let field = lookup(&self.fields, name, T::FIELD_TYPE)?;
        Ok((0..field.arity as usize)
            .map(|index| T::from_native_bytes(&read_element(&self.mirror, field, index)))
            .collect())
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    /// Fields in registration order
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values()
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn packing(&self) -> PackingMode {
        self.packing
    }

    pub fn is_registered(&self) -> bool {
        self.initialized
    }

    pub fn total_size(&self) -> u64 {
        self.mirror.len() as u64
    }

    pub fn mirror(&self) -> &[u8] {
        &self.mirror
    }

    pub fn dirty_range(&self) -> Option<DirtyRange> {
        self.dirty.get()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_dirty()
    }

    /// Current dirty range, marking the table clean
    pub fn take_dirty(&mut self) -> Option<DirtyRange> {
        self.dirty.take()
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    /// Mark every mirror byte dirty
    pub(crate) fn mark_all_dirty(&mut self) {
        self.dirty.mark(0, self.total_size());
    }
}
