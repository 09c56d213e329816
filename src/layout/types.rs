//! Shader-visible field types
//!
//! A [`FieldType`] is the runtime tag carried by every field descriptor and
//! every typed access. All supported components are four bytes wide.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::layout::{COMPONENT_SIZE, MAX_COMPONENTS, MIN_MATRIX_DIMENSION};

/// Component kind of a scalar or vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    Float,
    Int,
    Uint,
    /// Stored as a 4-byte unsigned integer holding 0 or 1
    Bool,
}

impl ScalarKind {
    fn prefix(self) -> &'static str {
        match self {
            ScalarKind::Float => "",
            ScalarKind::Int => "i",
            ScalarKind::Uint => "u",
            ScalarKind::Bool => "b",
        }
    }

    fn scalar_name(self) -> &'static str {
        match self {
            ScalarKind::Float => "float",
            ScalarKind::Int => "int",
            ScalarKind::Uint => "uint",
            ScalarKind::Bool => "bool",
        }
    }
}

/// Scalar, vector or (float, column-major) matrix type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Scalar(ScalarKind),
    Vector { kind: ScalarKind, components: u8 },
    Matrix { columns: u8, rows: u8 },
}

impl FieldType {
    pub const FLOAT: Self = Self::Scalar(ScalarKind::Float);
    pub const INT: Self = Self::Scalar(ScalarKind::Int);
    pub const UINT: Self = Self::Scalar(ScalarKind::Uint);
    pub const BOOL: Self = Self::Scalar(ScalarKind::Bool);

    pub const VEC2: Self = Self::vector(ScalarKind::Float, 2);
    pub const VEC3: Self = Self::vector(ScalarKind::Float, 3);
    pub const VEC4: Self = Self::vector(ScalarKind::Float, 4);
    pub const IVEC2: Self = Self::vector(ScalarKind::Int, 2);
    pub const IVEC3: Self = Self::vector(ScalarKind::Int, 3);
    pub const IVEC4: Self = Self::vector(ScalarKind::Int, 4);
    pub const UVEC2: Self = Self::vector(ScalarKind::Uint, 2);
    pub const UVEC3: Self = Self::vector(ScalarKind::Uint, 3);
    pub const UVEC4: Self = Self::vector(ScalarKind::Uint, 4);
    pub const BVEC2: Self = Self::vector(ScalarKind::Bool, 2);
    pub const BVEC3: Self = Self::vector(ScalarKind::Bool, 3);
    pub const BVEC4: Self = Self::vector(ScalarKind::Bool, 4);

    pub const MAT2: Self = Self::matrix(2, 2);
    pub const MAT3: Self = Self::matrix(3, 3);
    pub const MAT4: Self = Self::matrix(4, 4);

    pub const fn vector(kind: ScalarKind, components: u8) -> Self {
        Self::Vector { kind, components }
    }

    pub const fn matrix(columns: u8, rows: u8) -> Self {
        Self::Matrix { columns, rows }
    }

    /// Number of column vectors: the matrix column count, 1 otherwise
    pub fn columns(&self) -> u64 {
        match self {
            FieldType::Matrix { columns, .. } => *columns as u64,
            _ => 1,
        }
    }

    /// Components in one column (the vector width for non-matrices)
    pub fn column_components(&self) -> u64 {
        match self {
            FieldType::Scalar(_) => 1,
            FieldType::Vector { components, .. } => *components as u64,
            FieldType::Matrix { rows, .. } => *rows as u64,
        }
    }

    /// Unpadded bytes of one column
    pub fn column_size(&self) -> u64 {
        self.column_components() * COMPONENT_SIZE
    }

    /// Size of the contiguous in-memory (column-major) representation
    pub fn native_size(&self) -> u64 {
        self.columns() * self.column_size()
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self, FieldType::Matrix { .. })
    }

    /// Check vector widths and matrix dimensions
    pub fn validate(&self) -> Result<(), String> {
        match *self {
            FieldType::Scalar(_) => Ok(()),
            FieldType::Vector { components, .. } => {
                if (2..=MAX_COMPONENTS).contains(&components) {
                    Ok(())
                } else {
                    Err(format!("vector width {} outside 2..=4", components))
                }
            }
            FieldType::Matrix { columns, rows } => {
                let range = MIN_MATRIX_DIMENSION..=MAX_COMPONENTS;
                if range.contains(&columns) && range.contains(&rows) {
                    Ok(())
                } else {
                    Err(format!("matrix dimensions {}x{} outside 2..=4", columns, rows))
                }
            }
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            FieldType::Scalar(kind) => f.write_str(kind.scalar_name()),
            FieldType::Vector { kind, components } => {
                write!(f, "{}vec{}", kind.prefix(), components)
            }
            FieldType::Matrix { columns, rows } if columns == rows => write!(f, "mat{}", columns),
            FieldType::Matrix { columns, rows } => write!(f, "mat{}x{}", columns, rows),
        }
    }
}
