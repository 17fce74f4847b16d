//! Parallel implementation of sparse operations.
//!
//! Convolutions split kernel offsets across the client's pool. Pooling and
//! broadcast kernels run inside the pool on the shared implementations.

mod sparse;
