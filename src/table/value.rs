//! Rust values that can be stored in a table field
//!
//! Every implementor carries its [`FieldType`] tag and converts to and from
//! its contiguous native bytes (column-major for matrices). Padding for the
//! standardized layouts is applied by the table, never here.

use bytemuck::Pod;
use glam::{IVec2, IVec3, IVec4, Mat2, Mat3, Mat4, UVec2, UVec3, UVec4, Vec2, Vec3, Vec4};

use crate::layout::FieldType;

/// A value with a fixed shader-side field type
///
/// Only valid shader types implement it; a one-component bool array is not a vector:
///
/// ```compile_fail
/// use gpu_mirror::ShaderValue;
/// let _ = <[bool; 1]>::FIELD_TYPE;
/// ```
pub trait ShaderValue: Sized {
    const FIELD_TYPE: FieldType;

    /// Contiguous native bytes, `FIELD_TYPE.native_size()` long
    fn to_native_bytes(&self) -> Vec<u8>;

    /// Rebuild from at least `FIELD_TYPE.native_size()` native bytes
    fn from_native_bytes(bytes: &[u8]) -> Self;
}

fn pod_bytes<T: Pod>(value: &T) -> Vec<u8> {
    bytemuck::bytes_of(value).to_vec()
}

fn pod_read<T: Pod>(bytes: &[u8]) -> T {
    bytemuck::pod_read_unaligned(&bytes[..std::mem::size_of::<T>()])
}

macro_rules! impl_pod_value {
    ($($ty:ty => $field_type:expr),* $(,)?) => {
        $(
            impl ShaderValue for $ty {
                const FIELD_TYPE: FieldType = $field_type;

                fn to_native_bytes(&self) -> Vec<u8> {
                    pod_bytes(self)
                }

                fn from_native_bytes(bytes: &[u8]) -> Self {
                    pod_read(bytes)
                }
            }
        )*
    };
}

impl_pod_value! {
    f32 => FieldType::FLOAT,
    i32 => FieldType::INT,
    u32 => FieldType::UINT,

    [f32; 2] => FieldType::VEC2,
    [f32; 3] => FieldType::VEC3,
    [f32; 4] => FieldType::VEC4,
    [i32; 2] => FieldType::IVEC2,
    [i32; 3] => FieldType::IVEC3,
    [i32; 4] => FieldType::IVEC4,
    [u32; 2] => FieldType::UVEC2,
    [u32; 3] => FieldType::UVEC3,
    [u32; 4] => FieldType::UVEC4,

    Vec2 => FieldType::VEC2,
    Vec3 => FieldType::VEC3,
    Vec4 => FieldType::VEC4,
    IVec2 => FieldType::IVEC2,
    IVec3 => FieldType::IVEC3,
    IVec4 => FieldType::IVEC4,
    UVec2 => FieldType::UVEC2,
    UVec3 => FieldType::UVEC3,
    UVec4 => FieldType::UVEC4,

    Mat2 => FieldType::MAT2,
    Mat3 => FieldType::MAT3,
    Mat4 => FieldType::MAT4,

    // [[f32; rows]; columns]
    [[f32; 2]; 2] => FieldType::matrix(2, 2),
    [[f32; 3]; 2] => FieldType::matrix(2, 3),
    [[f32; 4]; 2] => FieldType::matrix(2, 4),
    [[f32; 2]; 3] => FieldType::matrix(3, 2),
    [[f32; 3]; 3] => FieldType::matrix(3, 3),
    [[f32; 4]; 3] => FieldType::matrix(3, 4),
    [[f32; 2]; 4] => FieldType::matrix(4, 2),
    [[f32; 3]; 4] => FieldType::matrix(4, 3),
    [[f32; 4]; 4] => FieldType::matrix(4, 4),
}

fn bool_to_word(value: bool) -> [u8; 4] {
    u32::from(value).to_ne_bytes()
}

fn word_to_bool(bytes: &[u8]) -> bool {
    pod_read::<u32>(bytes) != 0
}

impl ShaderValue for bool {
    const FIELD_TYPE: FieldType = FieldType::BOOL;

    fn to_native_bytes(&self) -> Vec<u8> {
        bool_to_word(*self).to_vec()
    }

    fn from_native_bytes(bytes: &[u8]) -> Self {
        word_to_bool(bytes)
    }
}

macro_rules! impl_bool_vector {
    ($($n:literal => $field_type:expr),* $(,)?) => {
        $(
            impl ShaderValue for [bool; $n] {
                const FIELD_TYPE: FieldType = $field_type;

                fn to_native_bytes(&self) -> Vec<u8> {
                    self.iter().flat_map(|b| bool_to_word(*b)).collect()
                }

                fn from_native_bytes(bytes: &[u8]) -> Self {
                    std::array::from_fn(|i| word_to_bool(&bytes[i * 4..]))
                }
            }
        )*
    };
}

impl_bool_vector! {
    2 => FieldType::BVEC2,
    3 => FieldType::BVEC3,
    4 => FieldType::BVEC4,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<T: ShaderValue + PartialEq + std::fmt::Debug>(value: T) {
        let bytes = value.to_native_bytes();
        assert_eq!(bytes.len() as u64, T::FIELD_TYPE.native_size());
        assert_eq!(T::from_native_bytes(&bytes), value);
    }

    #[test]
    fn test_scalars_and_vectors() {
        round_trip(1.5f32);
        round_trip(-7i32);
        round_trip(u32::MAX);
        round_trip(true);
        round_trip([false, true, true]);
        round_trip(Vec3::new(1.0, 2.0, 3.0));
        round_trip(IVec2::new(-1, 1));
        round_trip([9u32, 8, 7, 6]);
    }

    #[test]
    fn test_matrices_are_column_major() {
        let m = Mat2::from_cols(Vec2::new(1.0, 2.0), Vec2::new(3.0, 4.0));
        let floats: Vec<f32> = bytemuck::cast_slice(&m.to_native_bytes()).to_vec();
        assert_eq!(floats, vec![1.0, 2.0, 3.0, 4.0]);

        round_trip(Mat3::from_diagonal(Vec3::new(1.0, 2.0, 3.0)));
        round_trip(Mat4::IDENTITY);
        round_trip([[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    }

    #[test]
    fn test_bool_words() {
        assert_eq!(true.to_native_bytes(), 1u32.to_ne_bytes().to_vec());
        assert_eq!(<[bool; 2]>::FIELD_TYPE, FieldType::BVEC2);
        assert_eq!(<[bool; 4]>::FIELD_TYPE, FieldType::BVEC4);
        // Any non-zero word reads back as true
        assert!(bool::from_native_bytes(&7u32.to_ne_bytes()));
    }

    #[test]
    fn test_field_types() {
        assert_eq!(<[[f32; 3]; 2]>::FIELD_TYPE, FieldType::matrix(2, 3));
        assert_eq!(UVec3::FIELD_TYPE, FieldType::UVEC3);
        assert_eq!(<[f32; 4]>::FIELD_TYPE, Vec4::FIELD_TYPE);
    }
}
