//! Lock-free coordinate table for concurrent insertion
//!
//! Open addressing with linear probing over a fixed number of slots. Each
//! slot carries a state tag (`EMPTY`, `BUSY`, `FULL`) next to its key, so no
//! coordinate value has to be reserved as an "empty" marker. A thread claims
//! a slot with a compare-and-swap on the tag, writes the key, and publishes
//! it with a release store; threads that lose the race wait for the publish
//! and then compare keys, so concurrent inserts of one coordinate converge on
//! the winner's row.
//!
//! The table never grows. Size it up front with a load factor well below 1.

use super::coord::{Coord, CoordVec};
use super::hash::fingerprint;
use super::index_map::CoordIndexMap;
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicI32, AtomicU8, AtomicUsize, Ordering};

const EMPTY: u8 = 0;
const BUSY: u8 = 1;
const FULL: u8 = 2;

/// Smallest table ever allocated
const MIN_CAPACITY: usize = 16;

/// Fixed-capacity concurrent coordinate → row table.
///
/// Rows returned by [`insert`](Self::insert) are arrival tickets: unique,
/// dense in `[0, len)`, and identical for every caller that inserts the same
/// coordinate, but dependent on thread scheduling. Each insert also records a
/// caller-chosen position (usually the source row), and
/// [`into_index_map`](Self::into_index_map) renumbers rows by the earliest
/// position, which reproduces serial first-seen order.
pub struct ConcurrentCoordMap {
    stride: CoordVec,
    width: usize,
    states: Box<[AtomicU8]>,
    keys: Box<[AtomicI32]>,
    rows: Box<[AtomicUsize]>,
    first_seen: Box<[AtomicUsize]>,
    next_row: AtomicUsize,
}

impl ConcurrentCoordMap {
    /// Allocate a table for about `expected` coordinates at `stride`.
    ///
    /// Capacity is the next power of two of `expected / load_factor`.
    pub fn with_capacity(stride: &[i32], expected: usize, load_factor: f64) -> Result<Self> {
        if !(load_factor > 0.0 && load_factor < 1.0) {
            return Err(Error::invalid_argument(
                "load_factor",
                format!("must be in (0, 1), got {load_factor}"),
            ));
        }
        let wanted = (expected as f64 / load_factor).ceil() as usize;
        let capacity = wanted.max(MIN_CAPACITY).next_power_of_two();
        let width = stride.len() + 1;
        Ok(Self {
            stride: CoordVec::from_slice(stride),
            width,
            states: (0..capacity).map(|_| AtomicU8::new(EMPTY)).collect(),
            keys: (0..capacity * width).map(|_| AtomicI32::new(0)).collect(),
            rows: (0..capacity).map(|_| AtomicUsize::new(0)).collect(),
            first_seen: (0..capacity).map(|_| AtomicUsize::new(usize::MAX)).collect(),
            next_row: AtomicUsize::new(0),
        })
    }

    /// Number of slots
    #[inline]
    pub fn capacity(&self) -> usize {
        self.states.len()
    }

    /// Number of distinct coordinates inserted so far
    #[inline]
    pub fn len(&self) -> usize {
        self.next_row.load(Ordering::Acquire)
    }

    /// Returns true if nothing has been inserted
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn key(&self, slot: usize) -> &[AtomicI32] {
        &self.keys[slot * self.width..(slot + 1) * self.width]
    }

    #[inline]
    fn key_matches(&self, slot: usize, coord: &[i32]) -> bool {
        self.key(slot)
            .iter()
            .zip(coord)
            .all(|(k, &c)| k.load(Ordering::Relaxed) == c)
    }

    #[inline]
    fn wait_published(&self, slot: usize) -> u8 {
        loop {
            let state = self.states[slot].load(Ordering::Acquire);
            if state != BUSY {
                return state;
            }
            std::hint::spin_loop();
        }
    }

    /// Insert `coord`, recording `position` as a candidate first occurrence.
    ///
    /// Returns the coordinate's row and whether this call created it. Safe to
    /// call from many threads at once.
    pub fn insert(&self, coord: &[i32], position: usize) -> Result<(usize, bool)> {
        if coord.len() != self.width {
            return Err(Error::DimensionMismatch {
                expected: self.width - 1,
                got: coord.len().saturating_sub(1),
            });
        }
        let mask = self.capacity() - 1;
        let mut slot = fingerprint(coord) as usize & mask;
        for _ in 0..self.capacity() {
            match self.states[slot].compare_exchange(
                EMPTY,
                BUSY,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    for (k, &c) in self.key(slot).iter().zip(coord) {
                        k.store(c, Ordering::Relaxed);
                    }
                    let row = self.next_row.fetch_add(1, Ordering::AcqRel);
                    self.rows[slot].store(row, Ordering::Relaxed);
                    self.first_seen[slot].store(position, Ordering::Relaxed);
                    self.states[slot].store(FULL, Ordering::Release);
                    return Ok((row, true));
                }
                Err(_) => {
                    if self.wait_published(slot) == FULL && self.key_matches(slot, coord) {
                        self.first_seen[slot].fetch_min(position, Ordering::Relaxed);
                        return Ok((self.rows[slot].load(Ordering::Relaxed), false));
                    }
                }
            }
            slot = (slot + 1) & mask;
        }
        Err(Error::CapacityExceeded {
            capacity: self.capacity(),
        })
    }

    fn find_slot(&self, coord: &[i32]) -> Option<usize> {
        if coord.len() != self.width {
            return None;
        }
        let mask = self.capacity() - 1;
        let mut slot = fingerprint(coord) as usize & mask;
        for _ in 0..self.capacity() {
            match self.wait_published(slot) {
                EMPTY => return None,
                _ if self.key_matches(slot, coord) => return Some(slot),
                _ => slot = (slot + 1) & mask,
            }
        }
        None
    }

    /// Row of `coord`, if present.
    pub fn find(&self, coord: &[i32]) -> Option<usize> {
        self.find_slot(coord)
            .map(|slot| self.rows[slot].load(Ordering::Relaxed))
    }

    /// Smallest position recorded for `coord` so far.
    ///
    /// Once every insert has returned this is the coordinate's first
    /// occurrence in the source.
    pub fn first_position(&self, coord: &[i32]) -> Option<usize> {
        self.find_slot(coord)
            .map(|slot| self.first_seen[slot].load(Ordering::Relaxed))
    }

    /// Convert into a serial [`CoordIndexMap`] with rows in first-seen order.
    pub fn into_index_map(self) -> CoordIndexMap {
        let mut entries: Vec<(usize, usize, Coord)> = (0..self.capacity())
            .filter(|&slot| self.states[slot].load(Ordering::Acquire) == FULL)
            .map(|slot| {
                let components: CoordVec = self
                    .key(slot)
                    .iter()
                    .map(|k| k.load(Ordering::Relaxed))
                    .collect();
                (
                    self.first_seen[slot].load(Ordering::Relaxed),
                    self.rows[slot].load(Ordering::Relaxed),
                    Coord::from_slice(&components),
                )
            })
            .collect();
        entries.sort_unstable_by_key(|&(position, ticket, _)| (position, ticket));
        let rows = entries.into_iter().map(|(_, _, coord)| coord).collect();
        CoordIndexMap::from_ordered_rows(&self.stride, rows)
    }
}
