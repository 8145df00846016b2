/**
 * RecoReco
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

use std::fmt;

use rand::Rng;

/// The two sides of the interaction matrix. A sweep along `Users` solves every row of U while V
/// stays fixed, a sweep along `Items` does the opposite.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Users,
    Items,
}

impl Axis {
    pub fn transposed(self) -> Axis {
        match self {
            Axis::Users => Axis::Items,
            Axis::Items => Axis::Users,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Axis::Users => write!(f, "user"),
            Axis::Items => write!(f, "item"),
        }
    }
}

/// A single observed cell of the interaction matrix, ratings are expected to be normalized to
/// [0, 1] already.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub user: u32,
    pub item: u32,
    pub rating: f64,
}

impl Interaction {
    pub fn new(user: u32, item: u32, rating: f64) -> Self {
        Interaction { user, item, rating }
    }

    /// Row key and column key of this interaction when grouped along `axis`.
    pub fn cell(&self, axis: Axis) -> (u32, u32) {
        match axis {
            Axis::Users => (self.user, self.item),
            Axis::Items => (self.item, self.user),
        }
    }
}

/// One non-empty row of the sparse interaction matrix, `values` is aligned positionally with
/// `indices`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SparseRow {
    pub key: u32,
    pub indices: Vec<u32>,
    pub values: Vec<f64>,
}

impl SparseRow {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn entries<'a>(&'a self) -> impl Iterator<Item=(u32, f64)> + 'a {
        self.indices.iter().cloned().zip(self.values.iter().cloned())
    }
}

/// Dense row-major factor matrix with `num_rows` rows of length `rank`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FactorMatrix {
    num_rows: usize,
    rank: usize,
    values: Vec<f64>,
}

impl FactorMatrix {

    pub fn zeros(num_rows: usize, rank: usize) -> Self {
        FactorMatrix { num_rows, rank, values: vec![0.0; num_rows * rank] }
    }

    /// Entries are drawn uniformly from [0, 1) and scaled by 1/sqrt(rank).
    pub fn random<R: Rng>(num_rows: usize, rank: usize, rng: &mut R) -> Self {
        let scale = 1.0 / (rank as f64).sqrt();
        let values = (0..num_rows * rank)
            .map(|_| rng.next_f64() * scale)
            .collect();

        FactorMatrix { num_rows, rank, values }
    }

    pub fn from_rows(rows: Vec<Vec<f64>>, rank: usize) -> Option<Self> {
        let num_rows = rows.len();
        let mut values = Vec::with_capacity(num_rows * rank);

        for row in rows {
            if row.len() != rank {
                return None;
            }
            values.extend(row);
        }

        Some(FactorMatrix { num_rows, rank, values })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of stored values, `num_rows * rank` for a well-formed matrix.
    pub fn num_values(&self) -> usize {
        self.values.len()
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn row(&self, index: usize) -> &[f64] {
        &self.values[index * self.rank..(index + 1) * self.rank]
    }

    pub fn row_mut(&mut self, index: usize) -> &mut [f64] {
        &mut self.values[index * self.rank..(index + 1) * self.rank]
    }

    pub fn rows(&self) -> ::std::slice::Chunks<f64> {
        self.values.chunks(self.rank)
    }

    /// Disjoint mutable batches of `rows_per_batch` consecutive rows, the last one may be shorter.
    pub fn row_batches_mut(&mut self, rows_per_batch: usize) -> ::std::slice::ChunksMut<f64> {
        self.values.chunks_mut(self.rank * rows_per_batch)
    }

    pub fn squared_frobenius_norm(&self) -> f64 {
        self.values.iter().map(|value| value * value).sum()
    }
}
