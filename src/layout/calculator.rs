//! Field layout calculation
//!
//! Turns an ordered list of `(name, type, arity)` declarations into byte
//! offsets, strides and alignments under one of three packing modes. The
//! std140/std430 numbers are an external contract and are reproduced per type,
//! including vec3 taking vec4 alignment and std140 promoting every array
//! stride to 16 bytes.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::constants::layout::{COMPONENT_SIZE, STD140_ARRAY_STRIDE_ALIGNMENT, VEC4_ALIGNMENT};
use crate::error::{invalid_field, MirrorResult};
use crate::layout::types::FieldType;

/// How fields are packed into the mirror
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackingMode {
    /// Native in-memory sizes, component alignment only
    Tight,
    /// Uniform-block rules
    Std140,
    /// Storage-block rules
    Std430,
}

impl PackingMode {
    pub fn is_standardized(&self) -> bool {
        !matches!(self, PackingMode::Tight)
    }
}

/// One field declaration, as fed to the calculator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    pub arity: u32,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType, arity: u32) -> Self {
        Self {
            name: name.into(),
            field_type,
            arity,
        }
    }
}

/// Computed placement of one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
    /// Declared array length, at least 1
    pub arity: u32,
    /// Byte offset of element 0
    pub offset: u64,
    /// Bytes per array element, or per column for matrices
    pub stride: u64,
    pub alignment: u64,
}

impl FieldDescriptor {
    /// Bytes between consecutive array elements
    pub fn element_stride(&self) -> u64 {
        self.stride * self.field_type.columns()
    }

    /// Byte offset of array element `index`
    pub fn element_offset(&self, index: u32) -> u64 {
        self.offset + index as u64 * self.element_stride()
    }

    /// Bytes actually written for one element: padding after the last column excluded
    pub fn element_extent(&self) -> u64 {
        (self.field_type.columns() - 1) * self.stride + self.field_type.column_size()
    }

    /// Bytes reserved for the whole field
    pub fn byte_span(&self) -> u64 {
        self.element_stride() * self.arity as u64
    }

    /// One past the last reserved byte
    pub fn end(&self) -> u64 {
        self.offset + self.byte_span()
    }

    /// Whether the inclusive byte range `[low, high]` touches this field
    pub fn intersects(&self, low: u64, high: u64) -> bool {
        self.offset <= high && low < self.end()
    }
}

/// Align a size to the given (power of two) alignment
pub fn align_size(size: u64, alignment: u64) -> u64 {
    (size + alignment - 1) & !(alignment - 1)
}

/// Calculate padding needed for alignment
pub fn padding_for_alignment(current_offset: u64, alignment: u64) -> u64 {
    (alignment - (current_offset % alignment)) % alignment
}

/// Base alignment and size of a vector of `components` under std140/std430
fn vector_base(components: u64) -> (u64, u64) {
    let size = components * COMPONENT_SIZE;
    let alignment = match components {
        1 => COMPONENT_SIZE,
        2 => 2 * COMPONENT_SIZE,
        _ => VEC4_ALIGNMENT,
    };
    (alignment, size)
}

/// Alignment and stride of a vector used as an array element (or matrix column)
fn vector_array_rules(components: u64, mode: PackingMode) -> (u64, u64) {
    let (alignment, size) = vector_base(components);
    match mode {
        PackingMode::Std140 => (
            align_size(alignment, STD140_ARRAY_STRIDE_ALIGNMENT),
            align_size(size, STD140_ARRAY_STRIDE_ALIGNMENT),
        ),
        _ => (alignment, align_size(size, alignment)),
    }
}

/// `(alignment, stride)` for a field type; stride is per column for matrices
pub fn type_rules(field_type: FieldType, mode: PackingMode, arity: u32) -> (u64, u64) {
    if mode == PackingMode::Tight {
        return (COMPONENT_SIZE, field_type.column_size());
    }

    let components = field_type.column_components();
    if field_type.is_matrix() || arity > 1 {
        vector_array_rules(components, mode)
    } else {
        vector_base(components)
    }
}

/// Complete layout information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutInfo {
    pub fields: Vec<FieldDescriptor>,
    pub total_size: u64,
    pub packing: PackingMode,
}

impl LayoutInfo {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Generate a debug string showing the layout
    pub fn debug_string(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!(
            "Total size: {} bytes ({:?})\n",
            self.total_size, self.packing
        ));
        s.push_str("Fields:\n");

        for field in &self.fields {
            let ty = if field.arity > 1 {
                format!("{}[{}]", field.field_type, field.arity)
            } else {
                field.field_type.to_string()
            };
            s.push_str(&format!(
                "  {:20} @ {:4} (stride {:3}, align {:2}) : {}\n",
                field.name, field.offset, field.stride, field.alignment, ty
            ));
        }

        s
    }
}

/// Incremental layout builder with a running offset
pub struct LayoutBuilder {
    packing: PackingMode,
    current_offset: u64,
    fields: Vec<FieldDescriptor>,
    names: FxHashSet<String>,
}

impl LayoutBuilder {
    pub fn new(packing: PackingMode) -> Self {
        Self {
            packing,
            current_offset: 0,
            fields: Vec::new(),
            names: FxHashSet::default(),
        }
    }

    /// Place one field after the previous ones
    pub fn add_field(&mut self, spec: &FieldSpec) -> MirrorResult<&mut Self> {
        if spec.name.is_empty() {
            return Err(invalid_field(&spec.name, "empty name"));
        }
        if spec.arity == 0 {
            return Err(invalid_field(&spec.name, "arity must be at least 1"));
        }
        spec.field_type
            .validate()
            .map_err(|reason| invalid_field(&spec.name, reason))?;
        if self.names.contains(&spec.name) {
            return Err(invalid_field(&spec.name, "declared twice"));
        }

        let (alignment, stride) = type_rules(spec.field_type, self.packing, spec.arity);
        self.current_offset += padding_for_alignment(self.current_offset, alignment);

        let descriptor = FieldDescriptor {
            name: spec.name.clone(),
            field_type: spec.field_type,
            arity: spec.arity,
            offset: self.current_offset,
            stride,
            alignment,
        };
        self.current_offset += descriptor.byte_span();

        log::trace!(
            "[LayoutBuilder] {} {} @ {} (stride {})",
            descriptor.field_type,
            descriptor.name,
            descriptor.offset,
            descriptor.stride
        );

        self.names.insert(spec.name.clone());
        self.fields.push(descriptor);
        Ok(self)
    }

    pub fn build(self) -> LayoutInfo {
        LayoutInfo {
            fields: self.fields,
            total_size: self.current_offset,
            packing: self.packing,
        }
    }
}

/// Lay out `specs` in order under `packing`
pub fn calculate_layout(specs: &[FieldSpec], packing: PackingMode) -> MirrorResult<LayoutInfo> {
    let mut builder = LayoutBuilder::new(packing);
    for spec in specs {
        builder.add_field(spec)?;
    }
    let layout = builder.build();

    log::debug!(
        "[LayoutCalculator] {} fields, {} bytes ({:?})",
        layout.fields.len(),
        layout.total_size,
        packing
    );

    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MirrorError;
    use crate::layout::types::ScalarKind;

    fn build_layout(specs: &[(&str, FieldType, u32)], mode: PackingMode) -> LayoutInfo {
        let specs: Vec<FieldSpec> = specs
            .iter()
            .map(|(n, t, c)| FieldSpec::new(*n, *t, *c))
            .collect();
        calculate_layout(&specs, mode).unwrap()
    }

    #[test]
    fn test_vec3_then_float_std140() {
        let l = build_layout(
            &[("a", FieldType::VEC3, 1), ("b", FieldType::FLOAT, 1)],
            PackingMode::Std140,
        );
        assert_eq!(l.fields[0].offset, 0);
        assert_eq!(l.fields[0].stride, 12);
        assert_eq!(l.fields[1].offset, 12);
        assert_eq!(l.total_size, 16);
    }

    #[test]
    fn test_vec3_array_std140() {
        let l = build_layout(&[("a", FieldType::VEC3, 4)], PackingMode::Std140);
        assert_eq!(l.fields[0].stride, 16);
        assert_eq!(l.total_size, 64);
    }

    #[test]
    fn test_scalar_arrays_differ_between_modes() {
        let std140 = build_layout(&[("w", FieldType::FLOAT, 4)], PackingMode::Std140);
        let std430 = build_layout(&[("w", FieldType::FLOAT, 4)], PackingMode::Std430);
        let tight = build_layout(&[("w", FieldType::FLOAT, 4)], PackingMode::Tight);

        assert_eq!(std140.fields[0].stride, 16);
        assert_eq!(std140.total_size, 64);
        assert_eq!(std430.fields[0].stride, 4);
        assert_eq!(std430.total_size, 16);
        assert_eq!(tight.total_size, 16);
    }

    #[test]
    fn test_vec2_alignment() {
        let l = build_layout(
            &[("f", FieldType::FLOAT, 1), ("uv", FieldType::VEC2, 1)],
            PackingMode::Std430,
        );
        assert_eq!(l.fields[1].offset, 8);
        assert_eq!(l.fields[1].alignment, 8);

        let l = build_layout(
            &[("f", FieldType::FLOAT, 1), ("uv", FieldType::VEC2, 2)],
            PackingMode::Std140,
        );
        assert_eq!(l.fields[1].offset, 16);
        assert_eq!(l.fields[1].stride, 16);
    }

    #[test]
    fn test_vec3_takes_vec4_alignment() {
        let l = build_layout(
            &[("f", FieldType::FLOAT, 1), ("p", FieldType::IVEC3, 1)],
            PackingMode::Std430,
        );
        assert_eq!(l.fields[1].offset, 16);
        assert_eq!(l.total_size, 28);
    }

    #[test]
    fn test_matrix_columns() {
        let l = build_layout(
            &[("m", FieldType::MAT3, 1), ("s", FieldType::FLOAT, 1)],
            PackingMode::Std140,
        );
        assert_eq!(l.fields[0].stride, 16);
        assert_eq!(l.fields[0].element_stride(), 48);
        assert_eq!(l.fields[1].offset, 48);

        let l = build_layout(&[("m", FieldType::MAT2, 1)], PackingMode::Std140);
        assert_eq!(l.total_size, 32);

        let l = build_layout(&[("m", FieldType::MAT2, 1)], PackingMode::Std430);
        assert_eq!(l.fields[0].stride, 8);
        assert_eq!(l.total_size, 16);

        let l = build_layout(&[("m", FieldType::MAT4, 3)], PackingMode::Std430);
        assert_eq!(l.fields[0].element_stride(), 64);
        assert_eq!(l.total_size, 192);
    }

    #[test]
    fn test_tight_matrix_is_contiguous() {
        let l = build_layout(
            &[("m", FieldType::MAT3, 1), ("flag", FieldType::BOOL, 1)],
            PackingMode::Tight,
        );
        assert_eq!(l.fields[0].stride, 12);
        assert_eq!(l.fields[1].offset, 36);
        assert_eq!(l.total_size, 40);
    }

    #[test]
    fn test_offsets_respect_alignment() {
        let specs = [
            ("a", FieldType::FLOAT, 1),
            ("b", FieldType::VEC3, 1),
            ("c", FieldType::UVEC2, 3),
            ("d", FieldType::matrix(3, 2), 2),
            ("e", FieldType::vector(ScalarKind::Bool, 4), 1),
        ];
        for mode in [PackingMode::Tight, PackingMode::Std140, PackingMode::Std430] {
            let l = build_layout(&specs, mode);
            for f in &l.fields {
                assert_eq!(f.offset % f.alignment, 0, "{} under {:?}", f.name, mode);
            }
            for pair in l.fields.windows(2) {
                assert!(pair[0].end() <= pair[1].offset);
            }
        }
    }

    #[test]
    fn test_invalid_fields() {
        let err = calculate_layout(&[FieldSpec::new("x", FieldType::FLOAT, 0)], PackingMode::Std140)
            .unwrap_err();
        assert!(matches!(err, MirrorError::InvalidField { .. }));

        let err = calculate_layout(
            &[
                FieldSpec::new("x", FieldType::FLOAT, 1),
                FieldSpec::new("x", FieldType::VEC2, 1),
            ],
            PackingMode::Tight,
        )
        .unwrap_err();
        assert!(matches!(err, MirrorError::InvalidField { .. }));

        let err = calculate_layout(
            &[FieldSpec::new("m", FieldType::matrix(5, 5), 1)],
            PackingMode::Std430,
        )
        .unwrap_err();
        assert!(matches!(err, MirrorError::InvalidField { .. }));
    }

    #[test]
    fn test_debug_string_lists_fields() {
        let l = build_layout(
            &[("color", FieldType::VEC4, 1), ("lights", FieldType::VEC3, 8)],
            PackingMode::Std140,
        );
        let s = l.debug_string();
        assert!(s.contains("color"));
        assert!(s.contains("vec3[8]"));
        assert!(s.starts_with("Total size: 144 bytes"));
    }

    #[test]
    fn test_alignment_calculations() {
        assert_eq!(align_size(5, 4), 8);
        assert_eq!(align_size(16, 16), 16);
        assert_eq!(align_size(17, 16), 32);

        assert_eq!(padding_for_alignment(0, 16), 0);
        assert_eq!(padding_for_alignment(1, 16), 15);
        assert_eq!(padding_for_alignment(16, 16), 0);
    }
}
