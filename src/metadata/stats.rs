//! Build counters

/// Counts of the expensive work a [`Metadata`](super::Metadata) has done.
///
/// Counters are cumulative over the handle's lifetime and survive `clear`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Kernel and global maps computed
    pub kernel_maps_built: usize,
    /// Output and origin coordinate sets derived from an input set
    pub coord_sets_derived: usize,
    /// Map requests served from the cache
    pub cache_hits: usize,
}
