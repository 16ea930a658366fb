//! Broad-phase spatial partition
//!
//! A uniform grid of cubic sectors, rebuilt every tick. Only objects that
//! share a sector are handed to the narrow phase.

use std::collections::{BTreeMap, BTreeSet};

use glam::DVec3;

use crate::consts::MIN_SECTOR_SIZE;

/// Integer coordinates of a sector
pub type SectorKey = (i64, i64, i64);

/// Sector edge length for a tick whose largest swept extent is `max_extent`
///
/// Twice the largest extent keeps every object inside at most two sectors per
/// axis, which the 27-point sampling in [`Sectors::insert`] then covers.
pub fn sector_size(max_extent: f64) -> f64 {
    (2.0 * max_extent).max(MIN_SECTOR_SIZE)
}

/// Object indices bucketed by sector
#[derive(Debug, Clone, Default)]
pub struct Sectors {
    size: f64,
    cells: BTreeMap<SectorKey, Vec<usize>>,
}

impl Sectors {
    pub fn new(size: f64) -> Self {
        Self {
            size,
            cells: BTreeMap::new(),
        }
    }

    pub fn key(&self, point: DVec3) -> SectorKey {
        let cell = (point / self.size).floor();
        (cell.x as i64, cell.y as i64, cell.z as i64)
    }

    /// Insert object `index` into every sector its bounding cube touches
    pub fn insert(&mut self, index: usize, center: DVec3, extent: f64) {
        let mut keys: Vec<SectorKey> = Vec::with_capacity(8);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let offset = DVec3::new(dx as f64, dy as f64, dz as f64) * extent;
                    let key = self.key(center + offset);
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
            }
        }
        for key in keys {
            self.cells.entry(key).or_default().push(index);
        }
    }

    pub fn get(&self, key: &SectorKey) -> &[usize] {
        self.cells.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Occupied sector count
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Every unordered pair sharing a sector, as `(low, high)`, in order
    pub fn pairs(&self) -> BTreeSet<(usize, usize)> {
        let mut pairs = BTreeSet::new();
        for members in self.cells.values() {
            for (i, &a) in members.iter().enumerate() {
                for &b in &members[i + 1..] {
                    if a != b {
                        pairs.insert((a.min(b), a.max(b)));
                    }
                }
            }
        }
        pairs
    }

    /// Pairs `(mine, theirs)` of objects from the two grids sharing a sector
    ///
    /// Both grids must have been built with the same sector size.
    pub fn pairs_with(&self, other: &Sectors) -> BTreeSet<(usize, usize)> {
        let mut pairs = BTreeSet::new();
        for (key, members) in &self.cells {
            let theirs = other.get(key);
            for &a in members {
                for &b in theirs {
                    pairs.insert((a, b));
                }
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sector_size_has_floor() {
        assert_eq!(sector_size(1.0), MIN_SECTOR_SIZE);
        assert_eq!(sector_size(MIN_SECTOR_SIZE), 2.0 * MIN_SECTOR_SIZE);
    }

    #[test]
    fn test_key_floors_negative_coordinates() {
        let grid = Sectors::new(10.0);
        assert_eq!(grid.key(DVec3::new(5.0, -0.5, 10.0)), (0, -1, 1));
    }

    #[test]
    fn test_insert_deduplicates() {
        let mut grid = Sectors::new(100.0);
        // Well inside one sector
        grid.insert(0, DVec3::splat(50.0), 1.0);
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.get(&(0, 0, 0)), &[0]);

        // Straddles a corner shared by eight sectors
        grid.insert(1, DVec3::splat(100.0), 1.0);
        assert_eq!(grid.len(), 8);
        assert_eq!(grid.get(&(0, 0, 0)), &[0, 1]);
    }

    #[test]
    fn test_pairs_are_unique() {
        let mut grid = Sectors::new(100.0);
        grid.insert(0, DVec3::splat(100.0), 2.0);
        grid.insert(1, DVec3::splat(101.0), 2.0);
        grid.insert(2, DVec3::splat(-500.0), 2.0);
        let pairs: Vec<_> = grid.pairs().into_iter().collect();
        assert_eq!(pairs, vec![(0, 1)]);
    }

    #[test]
    fn test_pairs_with_other_grid() {
        let mut objects = Sectors::new(100.0);
        let mut shots = Sectors::new(100.0);
        objects.insert(0, DVec3::new(10.0, 10.0, 10.0), 5.0);
        objects.insert(1, DVec3::new(500.0, 10.0, 10.0), 5.0);
        shots.insert(2, DVec3::new(12.0, 10.0, 10.0), 1.0);
        shots.insert(3, DVec3::new(14.0, 10.0, 10.0), 1.0);

        let pairs: Vec<_> = shots.pairs_with(&objects).into_iter().collect();
        assert_eq!(pairs, vec![(2, 0), (3, 0)]);
        // Shots never pair with each other
        assert!(shots.pairs().iter().all(|&(a, b)| a >= 2 && b >= 2));
    }

    proptest! {
        #[test]
        fn prop_overlapping_spheres_share_a_sector(
            ax in -1000.0..1000.0f64, ay in -1000.0..1000.0f64, az in -1000.0..1000.0f64,
            dir in prop::array::uniform3(-1.0..1.0f64),
            ra in 0.1..80.0f64, rb in 0.1..80.0f64,
            t in 0.0..0.999f64,
        ) {
            let a = DVec3::new(ax, ay, az);
            let unit = DVec3::from_array(dir).try_normalize().unwrap_or(DVec3::X);
            let b = a + unit * (ra + rb) * t;

            let mut grid = Sectors::new(sector_size(ra.max(rb)));
            grid.insert(0, a, ra);
            grid.insert(1, b, rb);
            prop_assert!(grid.pairs().contains(&(0, 1)));
        }
    }
}
