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

use crate::als;
use crate::errors::{Result, WalsError};
use crate::linalg;
use crate::types::FactorMatrix;

/// Embeds rows that were not part of training against frozen factors, e.g. new users against the
/// trained item factors. The Gram matrix of the frozen factors is computed once and reused for
/// every projection.
pub struct Projector<'a> {
    fixed: &'a FactorMatrix,
    gram: Vec<f64>,
    lambda: f64,
    unobserved_weight: f64,
}

impl<'a> Projector<'a> {

    pub fn new(fixed: &'a FactorMatrix, lambda: f64, unobserved_weight: f64) -> Self {
        Projector { fixed, gram: linalg::gram(fixed), lambda, unobserved_weight }
    }

    pub fn rank(&self) -> usize {
        self.fixed.rank()
    }

    /// Performs a single row update for the observed (index, rating) pairs. The frozen factors
    /// are never modified.
    pub fn project(&self, observed: &[(u32, f64)]) -> Result<Vec<f64>> {

        for &(index, rating) in observed {
            if index as usize >= self.fixed.num_rows() {
                return Err(WalsError::IndexOutOfBounds {
                    index,
                    dimension: self.fixed.num_rows(),
                });
            }
            if !(rating >= 0.0) || !rating.is_finite() {
                return Err(WalsError::InvalidRating { rating });
            }
        }

        let degenerate = self.lambda == 0.0 && self.unobserved_weight == 0.0;
        if degenerate && observed.is_empty() {
            return Err(WalsError::EmptyObservationSet);
        }

        als::solve_row(
            observed.iter().cloned(),
            self.fixed,
            &self.gram,
            self.lambda,
            self.unobserved_weight,
        ).ok_or(WalsError::SingularProjection { observations: observed.len() })
    }
}

/// Convenience wrapper for projecting a single row.
pub fn project(
    observed: &[(u32, f64)],
    fixed: &FactorMatrix,
    lambda: f64,
    unobserved_weight: f64,
) -> Result<Vec<f64>> {
    Projector::new(fixed, lambda, unobserved_weight).project(observed)
}
