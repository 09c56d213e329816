//! Fluent schema declaration

use crate::layout::{FieldSpec, FieldType};
use crate::table::value::ShaderValue;

/// Ordered list of field declarations, registered once into a table
///
/// ```
/// use gpu_mirror::table::TableSchema;
/// use gpu_mirror::layout::FieldType;
///
/// let schema = TableSchema::new()
///     .field("view", FieldType::MAT4)
///     .array("lights", FieldType::VEC3, 8)
///     .field_of::<f32>("exposure");
/// assert_eq!(schema.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSchema {
    fields: Vec<FieldSpec>,
}

impl TableSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.array(name, field_type, 1)
    }

    pub fn array(mut self, name: impl Into<String>, field_type: FieldType, arity: u32) -> Self {
        self.fields.push(FieldSpec::new(name, field_type, arity));
        self
    }

    /// Declare a field with the type of `T`
    pub fn field_of<T: ShaderValue>(self, name: impl Into<String>) -> Self {
        self.array(name, T::FIELD_TYPE, 1)
    }

    pub fn array_of<T: ShaderValue>(self, name: impl Into<String>, arity: u32) -> Self {
        self.array(name, T::FIELD_TYPE, arity)
    }

    pub fn specs(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Vec<FieldSpec>> for TableSchema {
    fn from(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }
}
