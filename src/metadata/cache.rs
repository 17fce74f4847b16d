//! Metadata cache

use super::stats::BuildStats;
use crate::coords::{
    Coord, CoordIndexMap, DuplicatePolicy, FingerprintBuildHasher, ParameterKey, fingerprint,
    global_key, origin_stride, out_pixel_dist, validate_positive_vec,
};
use crate::error::{Error, Result};
use crate::kernel::{InOutMap, KernelRegion};
use crate::ops::{ConvParams, MapView};
use crate::runtime::{Device, MapBuilder, Runtime, RuntimeClient};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, error, trace};

/// Coordinate sets and kernel maps of one evaluation session.
///
/// The handle is fixed to `dim` spatial dimensions at creation. It is not
/// internally synchronized; callers serialize access to one handle.
///
/// # Lifecycle
///
/// - The execution context (`R::Client`) is created on first use.
/// - [`clear`](Self::clear) drops every coordinate set and map but keeps the
///   context.
/// - Dropping the handle releases the context.
/// - If the context cannot be created the handle is poisoned: every later
///   call that needs it fails with `Error::ContextInit`.
///
/// Every fallible method validates and builds before it inserts anything, so
/// an error leaves the cache exactly as it was.
pub struct Metadata<R: Runtime> {
    dim: usize,
    device: R::Device,
    context: Option<R::Client>,
    context_failure: Option<String>,
    coords: BTreeMap<u64, CoordIndexMap>,
    kernel_maps: HashMap<ParameterKey, InOutMap, FingerprintBuildHasher>,
    stats: BuildStats,
}

impl<R: Runtime> Metadata<R> {
    /// Empty cache for `dim` spatial dimensions on the runtime's default device.
    pub fn new(dim: usize) -> Result<Self> {
        Self::with_device(dim, R::default_device())
    }

    /// Empty cache for `dim` spatial dimensions on `device`.
    pub fn with_device(dim: usize, device: R::Device) -> Result<Self> {
        if dim == 0 {
            return Err(Error::invalid_argument(
                "dim",
                "needs at least one spatial dimension",
            ));
        }
        Ok(Self {
            dim,
            device,
            context: None,
            context_failure: None,
            coords: BTreeMap::new(),
            kernel_maps: HashMap::default(),
            stats: BuildStats::default(),
        })
    }

    /// Number of spatial dimensions
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Device the context is created on
    #[inline]
    pub fn device(&self) -> &R::Device {
        &self.device
    }

    /// Returns true once the execution context exists
    #[inline]
    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    /// Build counters
    #[inline]
    pub fn stats(&self) -> BuildStats {
        self.stats
    }

    /// Execution context, created on first call.
    ///
    /// # Errors
    ///
    /// Returns the runtime's error if it cannot create a client. The failure
    /// is recorded and every later call returns `Error::ContextInit` without
    /// retrying.
    pub fn client(&mut self) -> Result<&R::Client> {
        if let Some(reason) = &self.context_failure {
            return Err(Error::ContextInit(reason.clone()));
        }
        let client = match self.context.take() {
            Some(client) => client,
            None => match R::create_client(&self.device) {
                Ok(client) => {
                    debug!(
                        runtime = R::name(),
                        device = %client.device().name(),
                        "execution context created"
                    );
                    client
                }
                Err(err) => {
                    error!(runtime = R::name(), %err, "execution context creation failed");
                    self.context_failure = Some(err.to_string());
                    return Err(err);
                }
            },
        };
        Ok(self.context.insert(client))
    }

    /// Returns true if creating the execution context failed.
    #[inline]
    pub fn is_poisoned(&self) -> bool {
        self.context_failure.is_some()
    }

    /// Context that an earlier `client()` call created.
    pub(super) fn context(&self) -> Result<&R::Client> {
        self.context
            .as_ref()
            .ok_or_else(|| Error::ContextInit("execution context not created".into()))
    }

    // ========================================================================
    // Coordinate sets
    // ========================================================================

    fn check_stride(&self, stride: &[i32], arg: &'static str) -> Result<()> {
        validate_positive_vec(stride, self.dim, arg)
    }

    /// Returns true if a set is registered at `stride`
    pub fn has_coords(&self, stride: &[i32]) -> bool {
        self.coords.contains_key(&fingerprint(stride))
    }

    /// Coordinate set registered at `stride`.
    pub fn coords(&self, stride: &[i32]) -> Result<&CoordIndexMap> {
        self.coords
            .get(&fingerprint(stride))
            .ok_or_else(|| Error::missing_coords(stride))
    }

    /// Number of rows of the set at `stride`.
    pub fn num_coords(&self, stride: &[i32]) -> Result<usize> {
        self.coords(stride).map(CoordIndexMap::len)
    }

    /// Number of registered coordinate sets
    pub fn num_coord_sets(&self) -> usize {
        self.coords.len()
    }

    /// Number of cached kernel and global maps
    pub fn num_kernel_maps(&self) -> usize {
        self.kernel_maps.len()
    }

    /// Register the base set at `stride` from a row-major `[n × (D + 1)]`
    /// buffer and return its row count.
    ///
    /// # Errors
    ///
    /// - `Error::CoordsExist` if a set is already registered at `stride`
    /// - `Error::DuplicateCoordinate` for a repeated row under
    ///   [`DuplicatePolicy::Reject`]
    pub fn initialize_coords(
        &mut self,
        coords: &[i32],
        stride: &[i32],
        policy: DuplicatePolicy,
    ) -> Result<usize> {
        self.check_stride(stride, "pixel_dist")?;
        if self.has_coords(stride) {
            return Err(Error::CoordsExist {
                stride: stride.to_vec(),
            });
        }
        let set = self.client()?.index_coords(coords, stride, policy)?;
        let rows = set.len();
        debug!(?stride, rows, ?policy, "coordinate set registered");
        self.coords.insert(fingerprint(stride), set);
        Ok(rows)
    }

    /// Derive (forward) or look up (transposed) the output set of a
    /// convolution with `stride` applied to the set at `pixel_dist`, and
    /// return its row count.
    ///
    /// # Errors
    ///
    /// `Error::MissingCoords` if the input set is absent, or for a transposed
    /// convolution if the finer output set was never registered.
    pub fn initialize_out_coords(
        &mut self,
        pixel_dist: &[i32],
        stride: &[i32],
        is_transpose: bool,
    ) -> Result<usize> {
        self.check_stride(pixel_dist, "pixel_dist")?;
        self.check_stride(stride, "stride")?;
        let out = out_pixel_dist(pixel_dist, stride, is_transpose)?;
        self.ensure_out_coords(pixel_dist, &out, is_transpose)
    }

    pub(super) fn ensure_out_coords(
        &mut self,
        pixel_dist: &[i32],
        out_stride: &[i32],
        is_transpose: bool,
    ) -> Result<usize> {
        self.coords(pixel_dist)?;
        if let Ok(existing) = self.coords(out_stride) {
            return Ok(existing.len());
        }
        if is_transpose {
            return Err(Error::missing_coords(out_stride));
        }
        self.client()?;
        let derived = self
            .context()?
            .stride_coords(self.coords(pixel_dist)?, out_stride)?;
        let rows = derived.len();
        debug!(?pixel_dist, ?out_stride, rows, "output coordinate set derived");
        self.coords.insert(fingerprint(out_stride), derived);
        self.stats.coord_sets_derived += 1;
        Ok(rows)
    }

    /// Register the per-batch origin set and return its row count.
    ///
    /// With `batch_size > 0` row `b` is batch `b`; every batch of the input
    /// set at `pixel_dist` must be below `batch_size`. With `batch_size == 0`
    /// the batches of the input set are used in first-seen order. An existing
    /// origin set is returned unchanged; an explicit `batch_size` must then
    /// match its row count.
    pub fn initialize_origin_coords(&mut self, pixel_dist: &[i32], batch_size: usize) -> Result<usize> {
        self.check_stride(pixel_dist, "pixel_dist")?;
        let input = self.coords(pixel_dist)?;
        let stride = origin_stride(self.dim);
        if let Ok(existing) = self.coords(&stride) {
            if batch_size > 0 && existing.len() != batch_size {
                return Err(Error::shape_mismatch(&[existing.len()], &[batch_size]));
            }
            return Ok(existing.len());
        }
        let origin = if batch_size == 0 {
            input.origin_of()
        } else {
            if let Some(batch) = input
                .batch_indices()
                .find(|&b| b < 0 || b as usize >= batch_size)
            {
                return Err(Error::invalid_argument(
                    "batch_size",
                    format!("batch index {batch} outside 0..{batch_size}"),
                ));
            }
            CoordIndexMap::origin(self.dim, batch_size)
        };
        let rows = origin.len();
        debug!(rows, batch_size, "origin coordinate set registered");
        self.coords.insert(fingerprint(&stride), origin);
        self.stats.coord_sets_derived += 1;
        Ok(rows)
    }

    /// Row of every queried coordinate in the set at `stride`, `-1` if absent.
    ///
    /// `coords` is row-major `[n × (D + 1)]`; `out` must hold `n` entries.
    pub fn index_map(&self, coords: &[i32], stride: &[i32], out: &mut [i64]) -> Result<()> {
        let set = self.coords(stride)?;
        let width = self.dim + 1;
        if coords.len() % width != 0 {
            return Err(Error::shape_mismatch(
                &[coords.len() / width, width],
                &[coords.len()],
            ));
        }
        let rows = coords.len() / width;
        if out.len() != rows {
            return Err(Error::shape_mismatch(&[rows], &[out.len()]));
        }
        for (dst, chunk) in out.iter_mut().zip(coords.chunks_exact(width)) {
            *dst = set.find(chunk).map_or(-1, |row| row as i64);
        }
        Ok(())
    }

    /// Copy the set at `stride` into `out` (`[N × (D + 1)]`, row order).
    pub fn write_coords(&self, stride: &[i32], out: &mut [i32]) -> Result<()> {
        self.coords(stride)?.write_flat(out)
    }

    /// Row in the set at `dst_stride` of every row of the set at
    /// `src_stride` after flooring, `-1` where the floored coordinate is
    /// absent.
    ///
    /// Each component of `dst_stride` must be a multiple of `src_stride`.
    pub fn permutation(&self, src_stride: &[i32], dst_stride: &[i32], out: &mut [i64]) -> Result<()> {
        self.check_stride(src_stride, "pixel_dist_src")?;
        self.check_stride(dst_stride, "pixel_dist_dst")?;
        if let Some((s, d)) = src_stride
            .iter()
            .zip(dst_stride)
            .find(|&(&s, &d)| d % s != 0)
        {
            return Err(Error::invalid_argument(
                "pixel_dist_dst",
                format!("{d} is not a multiple of {s}"),
            ));
        }
        let src = self.coords(src_stride)?;
        let dst = self.coords(dst_stride)?;
        if out.len() != src.len() {
            return Err(Error::shape_mismatch(&[src.len()], &[out.len()]));
        }
        for (slot, coord) in out.iter_mut().zip(src.rows()) {
            // a coordinate that cannot be floored has no row at dst_stride
            *slot = coord
                .floor_to(dst_stride)
                .ok()
                .and_then(|c| dst.get(&c))
                .map_or(-1, |row| row as i64);
        }
        Ok(())
    }

    // ========================================================================
    // Kernel maps
    // ========================================================================

    /// Kernel map cached for `params`, if any.
    pub fn kernel_map(&self, params: &ConvParams, is_transpose: bool) -> Option<&InOutMap> {
        self.kernel_maps.get(&params.key(is_transpose))
    }

    /// Look up or build the kernel map for `params` and return its key.
    ///
    /// A forward map derives its output set when needed; a transposed map
    /// requires both sets to be registered.
    pub fn ensure_kernel_map(&mut self, params: &ConvParams, is_transpose: bool) -> Result<ParameterKey> {
        params.validate(self.dim)?;
        let out_stride = params.out_pixel_dist(is_transpose)?;
        self.coords(&params.pixel_dist)?;
        if is_transpose {
            self.coords(&out_stride)?;
        }

        let key = params.key(is_transpose);
        if self.kernel_maps.contains_key(&key) {
            self.stats.cache_hits += 1;
            trace!(?key, "kernel map cache hit");
            return Ok(key);
        }

        let unit = if is_transpose {
            &out_stride
        } else {
            &params.pixel_dist
        };
        let region = KernelRegion::new(&params.kernel_size, &params.dilation, unit, &params.region)?;
        self.client()?;
        if !is_transpose {
            self.ensure_out_coords(&params.pixel_dist, &out_stride, false)?;
        }

        let map = self.context()?.kernel_map(
            self.coords(&params.pixel_dist)?,
            self.coords(&out_stride)?,
            &region,
            is_transpose,
        );
        debug!(
            ?key,
            is_transpose,
            volume = map.volume(),
            pairs = map.num_pairs(),
            "kernel map built"
        );
        self.kernel_maps.insert(key, map);
        self.stats.kernel_maps_built += 1;
        Ok(key)
    }

    /// Key of an already built kernel map for `params`.
    ///
    /// # Errors
    ///
    /// `Error::MissingCoords` or `Error::MissingKernelMap` if the forward pass
    /// that builds them has not run.
    pub fn existing_kernel_map(&self, params: &ConvParams, is_transpose: bool) -> Result<ParameterKey> {
        params.validate(self.dim)?;
        let out_stride = params.out_pixel_dist(is_transpose)?;
        self.coords(&params.pixel_dist)?;
        self.coords(&out_stride)?;
        let key = params.key(is_transpose);
        if !self.kernel_maps.contains_key(&key) {
            return Err(Error::MissingKernelMap { key });
        }
        Ok(key)
    }

    /// Look up or build the map from the set at `pixel_dist` to the origin
    /// set, deriving the origin set from the input's batches if absent.
    pub fn ensure_global_map(&mut self, pixel_dist: &[i32]) -> Result<ParameterKey> {
        self.check_stride(pixel_dist, "pixel_dist")?;
        self.coords(pixel_dist)?;
        let key = global_key(pixel_dist);
        if self.kernel_maps.contains_key(&key) {
            self.stats.cache_hits += 1;
            trace!(?key, "global map cache hit");
            return Ok(key);
        }

        self.client()?;
        let stride = origin_stride(self.dim);
        let input = self.coords(pixel_dist)?;
        let derived = match self.coords(&stride) {
            Ok(_) => None,
            Err(_) => Some(input.origin_of()),
        };
        let origin = match &derived {
            Some(origin) => origin,
            None => self.coords(&stride)?,
        };
        let map = self.context()?.global_map(input, origin)?;
        debug!(?key, batches = origin.len(), "global map built");

        if let Some(origin) = derived {
            self.coords.insert(fingerprint(&stride), origin);
            self.stats.coord_sets_derived += 1;
        }
        self.kernel_maps.insert(key, map);
        self.stats.kernel_maps_built += 1;
        Ok(key)
    }

    /// Key of an already built global map for the set at `pixel_dist`.
    pub fn existing_global_map(&self, pixel_dist: &[i32]) -> Result<ParameterKey> {
        self.check_stride(pixel_dist, "pixel_dist")?;
        self.coords(pixel_dist)?;
        self.coords(&origin_stride(self.dim))?;
        let key = global_key(pixel_dist);
        if !self.kernel_maps.contains_key(&key) {
            return Err(Error::MissingKernelMap { key });
        }
        Ok(key)
    }

    /// Origin row of every row of the set at `pixel_dist`.
    pub fn batch_rows(&self, pixel_dist: &[i32]) -> Result<Vec<usize>> {
        let input = self.coords(pixel_dist)?;
        let origin = self.coords(&origin_stride(self.dim))?;
        input
            .rows()
            .iter()
            .map(|coord: &Coord| {
                origin
                    .get(&Coord::origin(self.dim, coord.batch()))
                    .ok_or_else(|| Error::missing_coords(&origin_stride(self.dim)))
            })
            .collect()
    }

    /// Cached map `key` with the row counts of the sets it connects.
    pub(super) fn view(&self, key: &ParameterKey, in_stride: &[i32], out_stride: &[i32]) -> Result<MapView<'_>> {
        let map = self
            .kernel_maps
            .get(key)
            .ok_or(Error::MissingKernelMap { key: *key })?;
        Ok(MapView::new(
            map,
            self.coords(in_stride)?.len(),
            self.coords(out_stride)?.len(),
        ))
    }

    /// Drop every coordinate set and map; the execution context survives.
    pub fn clear(&mut self) {
        debug!(
            coord_sets = self.coords.len(),
            kernel_maps = self.kernel_maps.len(),
            "metadata cleared"
        );
        self.coords.clear();
        self.kernel_maps.clear();
    }
}

impl<R: Runtime> Drop for Metadata<R> {
    fn drop(&mut self) {
        if self.context.take().is_some() {
            debug!(runtime = R::name(), "execution context released");
        }
    }
}

impl<R: Runtime> std::fmt::Debug for Metadata<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metadata")
            .field("runtime", &R::name())
            .field("dim", &self.dim)
            .field("has_context", &self.has_context())
            .field("poisoned", &self.is_poisoned())
            .field("coord_sets", &self.coords.len())
            .field("kernel_maps", &self.kernel_maps.len())
            .field("stats", &self.stats)
            .finish()
    }
}
