//! Error types for sparseconv

use crate::coords::ParameterKey;
use thiserror::Error;

/// Result type alias using sparseconv's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building coordinate sets, kernel maps, or
/// running the numeric kernels that consume them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No coordinate set is registered at the requested stride
    #[error("No coordinate set registered at stride {stride:?}")]
    MissingCoords {
        /// Stride (pixel distance) that was looked up
        stride: Vec<i32>,
    },

    /// No in/out map has been built for the given parameters
    #[error("No kernel map registered for {key:?}")]
    MissingKernelMap {
        /// Key of the missing map
        key: ParameterKey,
    },

    /// A coordinate set is already registered at this stride
    #[error("Coordinate set already registered at stride {stride:?}")]
    CoordsExist {
        /// Stride that is already taken
        stride: Vec<i32>,
    },

    /// Input contains the same coordinate twice and duplicates are rejected
    #[error("Duplicate coordinate at input row {row}")]
    DuplicateCoordinate {
        /// First input row that repeats an earlier coordinate
        row: usize,
    },

    /// Buffer length or row count does not match what the map requires
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape
        expected: Vec<usize>,
        /// Actual shape
        got: Vec<usize>,
    },

    /// Spatial dimension of an argument differs from the metadata's dimension
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Dimension the metadata was created with
        expected: usize,
        /// Dimension of the offending argument
        got: usize,
    },

    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// Declared custom offset count does not match the supplied offsets
    #[error("Offset count mismatch: declared {declared}, provided {provided}")]
    OffsetCountMismatch {
        /// Count the caller declared
        declared: usize,
        /// Count actually present in the offset buffer
        provided: usize,
    },

    /// Concurrent table ran out of free slots
    #[error("Hash table capacity {capacity} exhausted")]
    CapacityExceeded {
        /// Slot count of the table
        capacity: usize,
    },

    /// Execution context could not be created
    #[error("Failed to create execution context: {0}")]
    ContextInit(String),
}

impl Error {
    /// Create a shape mismatch error
    pub fn shape_mismatch(expected: &[usize], got: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }

    /// Create a missing coordinate set error
    pub fn missing_coords(stride: &[i32]) -> Self {
        Self::MissingCoords {
            stride: stride.to_vec(),
        }
    }

    /// Status code reported across the foreign-function boundary.
    ///
    /// Always negative. Codes are stable:
    ///
    /// | code | meaning                      |
    /// |------|------------------------------|
    /// | -1   | missing prerequisite         |
    /// | -2   | shape or count mismatch      |
    /// | -3   | duplicate coordinate         |
    /// | -4   | invalid argument             |
    /// | -5   | execution context failure    |
    /// | -6   | hash table capacity          |
    /// | -7   | coordinate set already exists|
    pub fn status(&self) -> i64 {
        match self {
            Self::MissingCoords { .. } | Self::MissingKernelMap { .. } => -1,
            Self::ShapeMismatch { .. }
            | Self::DimensionMismatch { .. }
            | Self::OffsetCountMismatch { .. } => -2,
            Self::DuplicateCoordinate { .. } => -3,
            Self::InvalidArgument { .. } => -4,
            Self::ContextInit(_) => -5,
            Self::CapacityExceeded { .. } => -6,
            Self::CoordsExist { .. } => -7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_are_negative() {
        let errors = [
            Error::missing_coords(&[1, 1]),
            Error::shape_mismatch(&[3], &[2]),
            Error::DuplicateCoordinate { row: 4 },
            Error::invalid_argument("stride", "zero"),
            Error::ContextInit("no device".into()),
            Error::CapacityExceeded { capacity: 16 },
            Error::CoordsExist { stride: vec![2] },
        ];
        for err in &errors {
            assert!(err.status() < 0, "{err} should map to a negative status");
        }
        assert_eq!(errors[0].status(), -1);
        assert_eq!(errors[1].status(), -2);
    }

    #[test]
    fn test_display_names_stride() {
        let err = Error::missing_coords(&[2, 4]);
        assert_eq!(
            err.to_string(),
            "No coordinate set registered at stride [2, 4]"
        );
    }
}
