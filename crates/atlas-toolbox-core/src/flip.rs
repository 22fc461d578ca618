//! Flip and duplicate detection.
//!
//! Every trimmed buffer is hashed in its four orientations (as-is, mirrored horizontally,
//! vertically, both). Hash hits are confirmed pixel-by-pixel and merged in a disjoint set, so
//! chains like `a == flip_h(b)`, `b == flip_v(c)` end up in one group. The lowest index of each
//! group is its canonical member.

use std::collections::HashMap;

use image::{RgbaImage, imageops};

use crate::model::FlipRef;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Orientations in the order they are tried when recovering flags: identity first.
const ORIENTATIONS: [(bool, bool); 4] = [(false, false), (true, false), (false, true), (true, true)];

/// Disjoint-set forest over `0..len` with path halving and union by rank.
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Root of `p`'s set, or `None` when `p` is out of range.
    pub fn find(&mut self, p: usize) -> Option<usize> {
        if p >= self.parent.len() {
            return None;
        }
        let mut c = p;
        while c != self.parent[c] {
            // compress height
            self.parent[c] = self.parent[self.parent[c]];
            c = self.parent[c];
        }
        Some(c)
    }

    /// Merges the sets holding `p` and `q`. Returns true if they were distinct.
    pub fn union(&mut self, p: usize, q: usize) -> bool {
        let (Some(p_root), Some(q_root)) = (self.find(p), self.find(q)) else {
            return false;
        };
        if p_root == q_root {
            return false;
        }
        match self.rank[p_root].cmp(&self.rank[q_root]) {
            std::cmp::Ordering::Less => self.parent[p_root] = q_root,
            std::cmp::Ordering::Greater => self.parent[q_root] = p_root,
            std::cmp::Ordering::Equal => {
                self.parent[q_root] = p_root;
                self.rank[p_root] = self.rank[p_root].saturating_add(1);
            }
        }
        true
    }

    pub fn connected(&mut self, p: usize, q: usize) -> bool {
        match (self.find(p), self.find(q)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Returns `img` mirrored horizontally and/or vertically.
pub fn mirror(img: &RgbaImage, flip_h: bool, flip_v: bool) -> RgbaImage {
    match (flip_h, flip_v) {
        (false, false) => img.clone(),
        (true, false) => imageops::flip_horizontal(img),
        (false, true) => imageops::flip_vertical(img),
        (true, true) => imageops::rotate180(img),
    }
}

/// True if `mirror(a, flip_h, flip_v) == b`, compared without allocating.
pub fn mirrored_eq(a: &RgbaImage, b: &RgbaImage, flip_h: bool, flip_v: bool) -> bool {
    if a.dimensions() != b.dimensions() {
        return false;
    }
    let (w, h) = a.dimensions();
    for y in 0..h {
        let sy = if flip_v { h - 1 - y } else { y };
        for x in 0..w {
            let sx = if flip_h { w - 1 - x } else { x };
            if a.get_pixel(sx, sy) != b.get_pixel(x, y) {
                return false;
            }
        }
    }
    true
}

/// blake3 digest of `img` read in the given orientation. Dimensions are part of the digest.
fn orientation_hash(img: &RgbaImage, flip_h: bool, flip_v: bool) -> blake3::Hash {
    let (w, h) = img.dimensions();
    let mut hasher = blake3::Hasher::new();
    hasher.update(&w.to_le_bytes());
    hasher.update(&h.to_le_bytes());
    let mut row = Vec::with_capacity(w as usize * 4);
    for y in 0..h {
        let sy = if flip_v { h - 1 - y } else { y };
        row.clear();
        for x in 0..w {
            let sx = if flip_h { w - 1 - x } else { x };
            row.extend_from_slice(&img.get_pixel(sx, sy).0);
        }
        hasher.update(&row);
    }
    hasher.finalize()
}

fn all_orientation_hashes(img: &RgbaImage) -> [blake3::Hash; 4] {
    ORIENTATIONS.map(|(fh, fv)| orientation_hash(img, fh, fv))
}

/// Groups `buffers` into flip/duplicate sets.
///
/// The result has one entry per buffer: `None` for canonical members (and sprites with no
/// match), `Some(FlipRef)` pointing at the lowest buffer index of the group otherwise, with
/// flags such that `mirror(buffers[canonical], flip_h, flip_v) == buffers[i]`.
pub fn detect_flip_groups(buffers: &[&RgbaImage], parallel: bool) -> Vec<Option<FlipRef>> {
    let hashes = hash_buffers(buffers, parallel);

    let mut by_identity: HashMap<blake3::Hash, Vec<usize>> = HashMap::new();
    for (i, hs) in hashes.iter().enumerate() {
        by_identity.entry(hs[0]).or_default().push(i);
    }

    let mut set = DisjointSet::new(buffers.len());
    for (i, hs) in hashes.iter().enumerate() {
        for (o, &(fh, fv)) in ORIENTATIONS.iter().enumerate() {
            let Some(hits) = by_identity.get(&hs[o]) else {
                continue;
            };
            for &j in hits {
                if j == i || set.connected(i, j) {
                    continue;
                }
                if mirrored_eq(buffers[i], buffers[j], fh, fv) {
                    set.union(i, j);
                }
            }
        }
    }

    // canonical = lowest index per root
    let mut canonical_of_root: HashMap<usize, usize> = HashMap::new();
    let mut roots = Vec::with_capacity(buffers.len());
    for i in 0..buffers.len() {
        let root = set.find(i).unwrap_or(i);
        canonical_of_root.entry(root).or_insert(i);
        roots.push(root);
    }

    roots
        .iter()
        .enumerate()
        .map(|(i, root)| {
            let canonical = *canonical_of_root.get(root)?;
            if canonical == i {
                return None;
            }
            ORIENTATIONS
                .iter()
                .find(|&&(fh, fv)| mirrored_eq(buffers[canonical], buffers[i], fh, fv))
                .map(|&(flip_h, flip_v)| FlipRef {
                    canonical,
                    flip_h,
                    flip_v,
                })
        })
        .collect()
}

fn hash_buffers(buffers: &[&RgbaImage], parallel: bool) -> Vec<[blake3::Hash; 4]> {
    #[cfg(feature = "parallel")]
    {
        if parallel {
            return buffers.par_iter().map(|b| all_orientation_hashes(b)).collect();
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;
    buffers.iter().map(|b| all_orientation_hashes(b)).collect()
}
