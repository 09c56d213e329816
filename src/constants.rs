//! Layout and growth constants
//!
//! Central location for the standardized buffer-block numbers and the default
//! growth policy, so layout code and configuration agree on them.

/// Standardized buffer-block layout constants (std140 / std430)
pub mod layout {
    /// Width of every supported scalar component (f32, i32, u32, bool-as-u32)
    pub const COMPONENT_SIZE: u64 = 4;

    /// Base alignment of a vec4; also the std140 array and matrix-column alignment
    pub const VEC4_ALIGNMENT: u64 = 16;

    /// std140 rounds every array element stride up to this
    pub const STD140_ARRAY_STRIDE_ALIGNMENT: u64 = 16;

    /// Device allocations of buffer-backed tables are rounded up to this
    pub const DEVICE_SIZE_ALIGNMENT: u64 = 16;

    /// Largest vector width and matrix dimension
    pub const MAX_COMPONENTS: u8 = 4;

    /// Smallest vector width and matrix dimension
    pub const MIN_MATRIX_DIMENSION: u8 = 2;
}

/// Growth policy defaults for mirrored sequence buffers
pub mod growth {
    /// Smallest accepted growth rate for any of the three regions
    pub const MIN_GROW_RATE: f64 = 1.1;

    /// CPU mirror growth rate
    pub const DEFAULT_CPU_GROW_RATE: f64 = 1.5;

    /// Device resource growth rate
    pub const DEFAULT_DEVICE_GROW_RATE: f64 = 1.5;

    /// Staging stack growth rate
    pub const DEFAULT_STACK_GROW_RATE: f64 = 2.0;

    /// Initial CPU mirror capacity in elements
    pub const DEFAULT_CPU_CAPACITY: usize = 16;

    /// Initial device resource capacity in elements
    pub const DEFAULT_DEVICE_CAPACITY: usize = 16;

    /// Initial staging stack capacity in elements
    pub const DEFAULT_STACK_CAPACITY: usize = 8;

    /// Next capacity after one growth step: `floor(capacity * rate) + 1`
    ///
    /// `None` when the result does not fit in a `usize`.
    #[inline]
    pub fn next_capacity(capacity: usize, rate: f64) -> Option<usize> {
        let grown = (capacity as f64 * rate).floor();
        if grown.is_nan() || grown >= usize::MAX as f64 {
            return None;
        }
        (grown as usize).checked_add(1)
    }

    /// Grow `capacity` step by step until it holds at least `required` elements
    pub fn capacity_for(mut capacity: usize, required: usize, rate: f64) -> Option<usize> {
        while capacity < required {
            capacity = next_capacity(capacity, rate)?;
        }
        Some(capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::growth::*;

    #[test]
    fn test_next_capacity() {
        assert_eq!(next_capacity(0, 1.5), Some(1));
        assert_eq!(next_capacity(1, 1.5), Some(2));
        assert_eq!(next_capacity(10, 1.5), Some(16));
        assert_eq!(next_capacity(16, 2.0), Some(33));
    }

    #[test]
    fn test_capacity_for() {
        assert_eq!(capacity_for(4, 4, 1.5), Some(4));
        assert_eq!(capacity_for(4, 5, 1.5), Some(7));
        // 4 -> 7 -> 11 -> 17
        assert_eq!(capacity_for(4, 12, 1.5), Some(17));
        assert_eq!(capacity_for(0, 3, 1.1), Some(3));
    }

    #[test]
    fn test_defaults_are_valid_rates() {
        for rate in [DEFAULT_CPU_GROW_RATE, DEFAULT_DEVICE_GROW_RATE, DEFAULT_STACK_GROW_RATE] {
            assert!(rate >= MIN_GROW_RATE);
        }
        for capacity in [DEFAULT_CPU_CAPACITY, DEFAULT_DEVICE_CAPACITY, DEFAULT_STACK_CAPACITY] {
            assert!(capacity > 0);
        }
    }

    #[test]
    fn test_growth_overflow_is_none() {
        assert_eq!(next_capacity(usize::MAX, 1.5), None);
        assert_eq!(next_capacity(usize::MAX - 1, 1.1), None);
        assert_eq!(capacity_for(16, usize::MAX, 2.0), None);
    }
}
