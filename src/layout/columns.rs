//! Matrix column decomposition
//!
//! Callers hold values in their contiguous column-major form. Padded layouts
//! place each column at its own stride, so every typed read and write goes
//! through these two routines. Vectors and scalars are the one-column case.

/// Copy `src`, split into `column_bytes`-sized columns, into `dst` at
/// `stride` intervals. Bytes between columns are left untouched.
pub fn scatter_columns(dst: &mut [u8], src: &[u8], column_bytes: usize, stride: usize) {
    debug_assert!(column_bytes <= stride);
    for (i, column) in src.chunks_exact(column_bytes).enumerate() {
        let start = i * stride;
        dst[start..start + column_bytes].copy_from_slice(column);
    }
}

/// Inverse of [`scatter_columns`]: collect `columns` columns of
/// `column_bytes` from `src` at `stride` intervals into contiguous bytes.
pub fn gather_columns(src: &[u8], columns: usize, column_bytes: usize, stride: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(columns * column_bytes);
    for i in 0..columns {
        let start = i * stride;
        out.extend_from_slice(&src[start..start + column_bytes]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scatter_leaves_padding() {
        let mut dst = [0xAAu8; 32];
        let src: Vec<u8> = (1..=24).collect();

        // mat2x3-like: 2 columns of 12 bytes at stride 16
        scatter_columns(&mut dst, &src[..24], 12, 16);

        assert_eq!(&dst[0..12], &src[0..12]);
        assert_eq!(&dst[12..16], &[0xAA; 4]);
        assert_eq!(&dst[16..28], &src[12..24]);
        assert_eq!(&dst[28..32], &[0xAA; 4]);
    }

    #[test]
    fn test_gather_inverts_scatter() {
        let mut dst = [0u8; 48];
        let src: Vec<u8> = (0..36).collect();
        scatter_columns(&mut dst, &src, 12, 16);
        assert_eq!(gather_columns(&dst, 3, 12, 16), src);
    }

    #[test]
    fn test_tight_stride_is_plain_copy() {
        let mut dst = [0u8; 16];
        let src: Vec<u8> = (0..16).collect();
        scatter_columns(&mut dst, &src, 8, 8);
        assert_eq!(&dst[..], &src[..]);
    }
}
