//! CPU implementation of sparse operations.
//!
//! The host-serial client runs the shared implementations directly on the
//! calling thread.

mod sparse;
