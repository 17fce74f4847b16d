//! Feature scalar types
//!
//! Coordinates are always `i32`; features, weights and gradients are generic
//! over [`Element`], which is implemented for the floating-point types the
//! numeric kernels support.

mod element;

pub use element::Element;
