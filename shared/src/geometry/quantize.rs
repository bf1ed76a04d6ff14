//! Quantized spatial hash for tolerance-based point matching.
//!
//! Points are bucketed by `floor(coord / cell)` on each axis. With `cell` equal to the
//! matching tolerance, any two points within tolerance land in the same or an adjacent
//! cell, so a query only inspects the 27-cell neighbourhood of its own cell.

use nalgebra::Point3;
use rustc_hash::FxHashMap;

pub type CellKey = [i64; 3];

/// Grid cell containing `p` for a grid of width `cell`.
#[inline]
pub fn quantize_position(p: &Point3<f32>, cell: f32) -> CellKey {
    let inv = 1.0 / cell as f64;
    [
        (p.x as f64 * inv).floor() as i64,
        (p.y as f64 * inv).floor() as i64,
        (p.z as f64 * inv).floor() as i64,
    ]
}

/// The 27 cells surrounding (and including) `key`.
pub fn neighborhood(key: CellKey) -> impl Iterator<Item = CellKey> {
    (-1..=1).flat_map(move |dx| {
        (-1..=1).flat_map(move |dy| (-1..=1).map(move |dz| [key[0] + dx, key[1] + dy, key[2] + dz]))
    })
}

/// Indices of points bucketed by quantized position.
///
/// The grid stores indices only; callers keep the positions and pass them back in on
/// query, so one grid can index any point list.
#[derive(Debug, Default)]
pub struct PointGrid {
    cell: f32,
    buckets: FxHashMap<CellKey, Vec<u32>>,
}

impl PointGrid {
    pub fn new(cell: f32) -> Self {
        Self {
            cell,
            buckets: FxHashMap::default(),
        }
    }

    pub fn insert(&mut self, p: &Point3<f32>, index: u32) {
        self.buckets
            .entry(quantize_position(p, self.cell))
            .or_default()
            .push(index);
    }

    /// Lowest index whose point satisfies `matches(index)` near `p`.
    ///
    /// Returning the lowest index keeps tie-breaking identical to a linear scan in
    /// insertion order.
    pub fn first_match(&self, p: &Point3<f32>, mut matches: impl FnMut(u32) -> bool) -> Option<u32> {
        neighborhood(quantize_position(p, self.cell))
            .filter_map(|key| self.buckets.get(&key))
            .flatten()
            .copied()
            .filter(|&i| matches(i))
            .min()
    }

    /// Every index whose point satisfies `matches(index)` near `p`, ascending.
    pub fn all_matches(&self, p: &Point3<f32>, mut matches: impl FnMut(u32) -> bool) -> Vec<u32> {
        let mut out: Vec<u32> = neighborhood(quantize_position(p, self.cell))
            .filter_map(|key| self.buckets.get(&key))
            .flatten()
            .copied()
            .filter(|&i| matches(i))
            .collect();
        out.sort_unstable();
        out
    }
}
