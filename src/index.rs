use std::cmp::Ordering;

use rayon::prelude::*;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum IndexError {
    #[error("Dimension mismatch at vector {position:?}: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Offending vector position, or `None` for a query vector.
        position: Option<usize>,
        expected: usize,
        found: usize,
    },
}

pub type Result<T> = std::result::Result<T, IndexError>;

/// One search hit: catalog id and squared Euclidean distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: usize,
    pub distance: f64,
}

/// Exact nearest-neighbor index over fixed-length vectors.
///
/// Search is brute force: every query compares against every stored
/// vector, O(n·d). Assumes catalogs of at most a few hundred thousand
/// rows with d = 9; larger catalogs would need an approximate index.
#[derive(Debug)]
pub struct VectorIndex {
    dim: usize,
    /// Row-major storage: vector `i` occupies `data[i * dim..(i + 1) * dim]`.
    data: Vec<f64>,
}

impl VectorIndex {
    /// Build from vectors in id order. Every vector must have `dim` entries.
    pub fn build(dim: usize, vectors: &[Vec<f64>]) -> Result<Self> {
        let mut data = Vec::with_capacity(dim * vectors.len());
        for (position, v) in vectors.iter().enumerate() {
            if v.len() != dim {
                return Err(IndexError::DimensionMismatch {
                    position: Some(position),
                    expected: dim,
                    found: v.len(),
                });
            }
            data.extend_from_slice(v);
        }

        log::info!("Built index over {} vectors ({}-dim)", vectors.len(), dim);
        Ok(Self { dim, data })
    }

    pub fn len(&self) -> usize {
        if self.dim == 0 { 0 } else { self.data.len() / self.dim }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Stored vector for `id`.
    pub fn vector(&self, id: usize) -> Option<&[f64]> {
        let start = id.checked_mul(self.dim)?;
        let end = start.checked_add(self.dim)?;
        self.data.get(start..end)
    }

    /// The `k` nearest vectors to `query`, closest first, ties by ascending id.
    ///
    /// When `exclude` is set, `k + 1` neighbors are selected so that the
    /// excluded id (usually the query's own row) can be dropped without
    /// shortening the result.
    pub fn search(&self, query: &[f64], k: usize, exclude: Option<usize>) -> Result<Vec<Neighbor>> {
        if query.len() != self.dim {
            return Err(IndexError::DimensionMismatch {
                position: None,
                expected: self.dim,
                found: query.len(),
            });
        }

        let n = self.len();
        let wanted = if exclude.is_some() { k.saturating_add(1) } else { k };
        if wanted == 0 || n == 0 {
            return Ok(Vec::new());
        }

        let mut distances: Vec<Neighbor> = (0..n)
            .into_par_iter()
            .map(|id| Neighbor {
                id,
                distance: squared_euclidean(query, &self.data[id * self.dim..(id + 1) * self.dim]),
            })
            .collect();

        // Partial sort: only need the `wanted` smallest
        let keep = wanted.min(n);
        if keep < n {
            distances.select_nth_unstable_by(keep - 1, compare_neighbors);
            distances.truncate(keep);
        }
        distances.sort_by(compare_neighbors);

        if let Some(excluded) = exclude {
            distances.retain(|nb| nb.id != excluded);
        }
        distances.truncate(k);
        Ok(distances)
    }
}

/// Total order on hits: distance ascending, then id ascending.
fn compare_neighbors(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id))
}

/// Sum of squared per-dimension differences. No square root: only the
/// ordering matters.
pub fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
