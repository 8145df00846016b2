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

// Dense kernels on k×k systems. Square matrices are stored row-major in flat slices of length k².

use crate::types::FactorMatrix;

#[inline(always)]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Gram matrix FᵗF of a factor matrix, computed in a single pass over its rows.
pub fn gram(factors: &FactorMatrix) -> Vec<f64> {
    let k = factors.rank();
    let mut g = vec![0.0; k * k];

    for row in factors.rows() {
        for a in 0..k {
            let row_a = row[a];
            for b in a..k {
                g[a * k + b] += row_a * row[b];
            }
        }
    }

    for a in 0..k {
        for b in 0..a {
            g[a * k + b] = g[b * k + a];
        }
    }

    g
}

/// a += scale · v vᵗ
#[inline(always)]
pub fn add_scaled_outer(a: &mut [f64], v: &[f64], scale: f64) {
    let k = v.len();
    for row in 0..k {
        let scaled = scale * v[row];
        for col in 0..k {
            a[row * k + col] += scaled * v[col];
        }
    }
}

#[inline(always)]
pub fn add_to_diagonal(a: &mut [f64], k: usize, value: f64) {
    for index in 0..k {
        a[index * k + index] += value;
    }
}

/// In-place Cholesky factorization A = L Lᵗ, the lower triangle of `a` is overwritten with L.
/// Returns false if `a` is not (numerically) positive definite.
pub fn cholesky(a: &mut [f64], k: usize) -> bool {
    for i in 0..k {
        for j in 0..=i {
            let mut sum = a[i * k + j];
            for p in 0..j {
                sum -= a[i * k + p] * a[j * k + p];
            }

            if i == j {
                if !(sum > 0.0) || !sum.is_finite() {
                    return false;
                }
                a[i * k + i] = sum.sqrt();
            } else {
                a[i * k + j] = sum / a[j * k + j];
            }
        }
    }

    true
}

/// Solves L Lᵗ x = b in place, given the factor produced by `cholesky`.
pub fn cholesky_solve(l: &[f64], k: usize, b: &mut [f64]) {
    // Forward substitution: L y = b
    for i in 0..k {
        let mut sum = b[i];
        for p in 0..i {
            sum -= l[i * k + p] * b[p];
        }
        b[i] = sum / l[i * k + i];
    }

    // Backward substitution: Lᵗ x = y
    for i in (0..k).rev() {
        let mut sum = b[i];
        for p in (i + 1)..k {
            sum -= l[p * k + i] * b[p];
        }
        b[i] = sum / l[i * k + i];
    }
}

/// Solves the symmetric positive definite system A x = b, consuming both. Returns `None` if A
/// cannot be factored.
pub fn solve_spd(mut a: Vec<f64>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let k = b.len();
    if !cholesky(&mut a, k) {
        return None;
    }
    cholesky_solve(&a, k, &mut b);
    Some(b)
}
