//! Concurrent coordinate table under real thread contention

mod common;

use common::random_coords_2d;
use sparseconv::coords::{ConcurrentCoordMap, CoordIndexMap, DuplicatePolicy};
use std::collections::HashSet;

const THREADS: usize = 8;

#[test]
fn test_racing_inserts_converge() {
    let coords = random_coords_2d(4000, 40, 3, 7);
    let n = coords.len() / 3;
    let distinct: HashSet<&[i32]> = coords.chunks_exact(3).collect();

    let table = ConcurrentCoordMap::with_capacity(&[1, 1], n, 0.5).unwrap();
    let seen: Vec<Vec<usize>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let table = &table;
                let coords = &coords;
                scope.spawn(move || {
                    // every thread inserts the whole list, starting at a different point
                    let mut rows = vec![0usize; n];
                    for step in 0..n {
                        let j = (step + t * n / THREADS) % n;
                        let (row, _) = table.insert(&coords[j * 3..j * 3 + 3], j).unwrap();
                        rows[j] = row;
                    }
                    rows
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(table.len(), distinct.len());
    for rows in &seen[1..] {
        assert_eq!(rows, &seen[0], "threads disagree on rows");
    }
    let mut tickets: Vec<usize> = seen[0].clone();
    tickets.sort_unstable();
    tickets.dedup();
    assert_eq!(tickets, (0..distinct.len()).collect::<Vec<_>>());

    for (j, chunk) in coords.chunks_exact(3).enumerate() {
        let first = table.first_position(chunk).unwrap();
        assert!(first <= j);
        assert_eq!(&coords[first * 3..first * 3 + 3], chunk);
    }

    let serial = CoordIndexMap::from_flat(&coords, &[1, 1], DuplicatePolicy::KeepFirst).unwrap();
    let parallel = table.into_index_map();
    assert_eq!(parallel.rows(), serial.rows());
}

#[test]
fn test_full_table_reports_capacity() {
    let table = ConcurrentCoordMap::with_capacity(&[1], 1, 0.5).unwrap();
    let capacity = table.capacity();
    for x in 0..capacity as i32 {
        table.insert(&[x, 0], x as usize).unwrap();
    }
    assert!(table.insert(&[-1, 0], capacity).is_err());
    // existing keys are still found once the table is full
    assert_eq!(table.find(&[3, 0]), Some(3));
}
