//! Element trait for feature scalars

use bytemuck::{Pod, Zeroable};
use std::ops::{Add, Div, Mul, Sub};

/// Trait for types that can be feature elements
///
/// # Bounds
/// - `Copy + Send + Sync + 'static` - Basic trait requirements
/// - `Pod + Zeroable` - Feature buffers can be viewed as raw bytes (bytemuck)
/// - `Add + Sub + Mul + Div` - Arithmetic operations (Output = Self)
/// - `PartialOrd` - Comparison for max pooling
pub trait Element:
    Copy
    + Send
    + Sync
    + Pod
    + Zeroable
    + std::fmt::Debug
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + PartialOrd
{
    /// Zero value
    fn zero() -> Self;

    /// One value
    fn one() -> Self;

    /// Smallest finite value, the identity for max reductions
    fn lowest() -> Self;
}

impl Element for f64 {
    #[inline]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn one() -> Self {
        1.0
    }

    #[inline]
    fn lowest() -> Self {
        f64::MIN
    }
}

impl Element for f32 {
    #[inline]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn one() -> Self {
        1.0
    }

    #[inline]
    fn lowest() -> Self {
        f32::MIN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowest_is_max_identity() {
        assert!(f32::lowest() < -1e30);
        assert!(f64::lowest() < f64::from(f32::lowest()));
        assert_eq!(f64::one() + f64::zero(), 1.0);
    }
}
