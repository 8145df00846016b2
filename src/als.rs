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

use std::mem;
use std::sync::Mutex;
use std::time::Instant;

use rand::{SeedableRng, XorShiftRng};
use scoped_pool::Pool;
use tracing::{debug, warn};

use crate::config::TrainingConfig;
use crate::errors::{Result, WalsError};
use crate::linalg;
use crate::sparse;
use crate::types::{Axis, FactorMatrix, Interaction, SparseRow};
use crate::utils;

/// Number of consecutive rows solved by a single pool job.
const ROWS_PER_JOB: usize = 64;

/// Outcome of one sweep. Rows listed in `singular_rows` kept their previous factors.
#[derive(Clone, Debug, PartialEq)]
pub struct SweepReport {
    pub axis: Axis,
    pub rows_solved: usize,
    pub singular_rows: Vec<u32>,
}

impl SweepReport {
    /// One `SingularSystem` error per row that could not be solved.
    pub fn errors(&self) -> Vec<WalsError> {
        self.singular_rows.iter()
            .map(|row| WalsError::SingularSystem { axis: self.axis, row: *row })
            .collect()
    }
}

/// One sweep of an alternating optimizer: recompute every row of `target` while `fixed` stays
/// frozen. Implementations may only write to `target`, and must write each row from exactly one
/// job.
pub trait SweepStep: Sync {
    fn sweep(
        &self,
        axis: Axis,
        rows: &[SparseRow],
        fixed: &FactorMatrix,
        target: &mut FactorMatrix,
        pool: &Pool,
    ) -> SweepReport;
}

impl<'a, S: SweepStep> SweepStep for &'a S {
    fn sweep(
        &self,
        axis: Axis,
        rows: &[SparseRow],
        fixed: &FactorMatrix,
        target: &mut FactorMatrix,
        pool: &Pool,
    ) -> SweepReport {
        (**self).sweep(axis, rows, fixed, target, pool)
    }
}

/// Exact weighted least squares update of each row, unobserved cells carry the weight w0.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WalsStep {
    pub lambda: f64,
    pub unobserved_weight: f64,
}

impl WalsStep {
    pub fn new(lambda: f64, unobserved_weight: f64) -> Self {
        WalsStep { lambda, unobserved_weight }
    }
}

impl SweepStep for WalsStep {

    fn sweep(
        &self,
        axis: Axis,
        rows: &[SparseRow],
        fixed: &FactorMatrix,
        target: &mut FactorMatrix,
        pool: &Pool,
    ) -> SweepReport {

        let rank = target.rank();
        let num_rows = target.num_rows();

        // Must be complete before the first row is solved
        let gram = linalg::gram(fixed);

        let mut observed: Vec<Option<&SparseRow>> = vec![None; num_rows];
        for row in rows {
            observed[row.key as usize] = Some(row);
        }

        let singular_rows: Mutex<Vec<u32>> = Mutex::new(Vec::new());

        pool.scoped(|scope| {
            for (batch_index, batch) in target.row_batches_mut(ROWS_PER_JOB).enumerate() {

                let observed = &observed;
                let gram = &gram;
                let singular_rows = &singular_rows;

                scope.execute(move || {
                    for (offset, destination) in batch.chunks_mut(rank).enumerate() {
                        let row = batch_index * ROWS_PER_JOB + offset;
                        let observations = observed[row].into_iter().flat_map(|r| r.entries());

                        match solve_row(observations, fixed, gram, self.lambda, self.unobserved_weight) {
                            Some(solution) => destination.copy_from_slice(&solution),
                            None => singular_rows.lock().unwrap().push(row as u32),
                        }
                    }
                });
            }
        });

        let mut singular_rows = singular_rows.into_inner().unwrap();
        singular_rows.sort();

        SweepReport { axis, rows_solved: num_rows - singular_rows.len(), singular_rows }
    }
}

/// Solves A x = b for a single row, with
///
///   A = w0·G + (1 − w0)·Σ v_j v_jᵗ + λ·I
///   b = Σ r_j · v_j
///
/// where the sums run over the observations and v_j are rows of the frozen factors. Returns `None`
/// if A is not positive definite.
pub fn solve_row<I>(
    observations: I,
    fixed: &FactorMatrix,
    gram: &[f64],
    lambda: f64,
    unobserved_weight: f64,
) -> Option<Vec<f64>>
    where I: IntoIterator<Item=(u32, f64)> {

    let rank = fixed.rank();

    let mut a: Vec<f64> = gram.iter().map(|value| unobserved_weight * value).collect();
    let mut b: Vec<f64> = vec![0.0; rank];

    for (col, rating) in observations {
        let v = fixed.row(col as usize);
        linalg::add_scaled_outer(&mut a, v, 1.0 - unobserved_weight);
        for (b_a, v_a) in b.iter_mut().zip(v.iter()) {
            *b_a += rating * v_a;
        }
    }

    linalg::add_to_diagonal(&mut a, rank, lambda);

    linalg::solve_spd(a, b)
}

/// The weighted objective
///
///   Σ_obs (r − u·v)² + w0 · Σ_unobs (u·v)² + λ(‖U‖² + ‖V‖²)
///
/// The sum over unobserved cells is obtained as the sum over all cells minus the observed ones,
/// where Σ_all (u·v)² equals the elementwise inner product of the Gram matrices UᵗU and VᵗV.
pub fn weighted_loss(
    by_user: &[SparseRow],
    user_factors: &FactorMatrix,
    item_factors: &FactorMatrix,
    lambda: f64,
    unobserved_weight: f64,
) -> f64 {

    let mut observed_error = 0.0;
    let mut observed_predictions = 0.0;

    for row in by_user {
        let user = user_factors.row(row.key as usize);
        for (item, rating) in row.entries() {
            let prediction = linalg::dot(user, item_factors.row(item as usize));
            observed_error += (rating - prediction) * (rating - prediction);
            observed_predictions += prediction * prediction;
        }
    }

    let all_predictions = linalg::dot(&linalg::gram(user_factors), &linalg::gram(item_factors));
    let unobserved_predictions = (all_predictions - observed_predictions).max(0.0);

    let regularization = lambda *
        (user_factors.squared_frobenius_norm() + item_factors.squared_frobenius_norm());

    observed_error + unobserved_weight * unobserved_predictions + regularization
}

fn seeded_rng(seed: u64) -> XorShiftRng {
    // The first word is non-zero, XorShift rejects an all-zero seed
    XorShiftRng::from_seed([
        0x193a_6754,
        0xa8a7_d469 ^ (seed as u32),
        0x9783_0e05,
        0x113b_a7bb ^ ((seed >> 32) as u32),
    ])
}

/// Holds both factor matrices and the interaction rows during training. The numerical work
/// happens in sweeps, the decision when to stop is left to the caller.
pub struct ALSEngine<S: SweepStep = WalsStep> {
    config: TrainingConfig,
    user_factors: FactorMatrix,
    item_factors: FactorMatrix,
    by_user: Vec<SparseRow>,
    by_item: Vec<SparseRow>,
    step: S,
    pool: Pool,
}

impl ALSEngine<WalsStep> {

    pub fn new(
        config: TrainingConfig,
        by_user: Vec<SparseRow>,
        by_item: Vec<SparseRow>,
    ) -> Result<Self> {
        let step = WalsStep::new(config.lambda, config.unobserved_weight);
        Self::with_step(config, by_user, by_item, step)
    }
}

impl<S: SweepStep> ALSEngine<S> {

    pub fn with_step(
        config: TrainingConfig,
        by_user: Vec<SparseRow>,
        by_item: Vec<SparseRow>,
        step: S,
    ) -> Result<Self> {

        config.validate()?;

        check_rows(&by_user, config.num_users, config.num_items)?;
        check_rows(&by_item, config.num_items, config.num_users)?;

        let nonzeros_by_user: usize = by_user.iter().map(|row| row.len()).sum();
        let nonzeros_by_item: usize = by_item.iter().map(|row| row.len()).sum();

        if nonzeros_by_user != nonzeros_by_item {
            return Err(WalsError::DimensionMismatch {
                expected: nonzeros_by_user,
                found: nonzeros_by_item,
            });
        }

        check_transposed(&by_user, &by_item)?;

        let mut rng = seeded_rng(config.seed);
        let user_factors = FactorMatrix::random(config.num_users, config.rank, &mut rng);
        let item_factors = FactorMatrix::random(config.num_items, config.rank, &mut rng);

        let pool = Pool::new(config.num_threads);

        Ok(ALSEngine { config, user_factors, item_factors, by_user, by_item, step, pool })
    }

    /// Recomputes all rows along `axis` against the frozen opposite factors.
    pub fn run_sweep(&mut self, axis: Axis) -> SweepReport {

        let sweep_start = Instant::now();

        let (rows, fixed, target) = match axis {
            Axis::Users => (&self.by_user, &self.item_factors, &mut self.user_factors),
            Axis::Items => (&self.by_item, &self.user_factors, &mut self.item_factors),
        };

        let report = self.step.sweep(axis, rows, fixed, target, &self.pool);

        for error in report.errors() {
            warn!("{}, keeping previous factors", error);
        }

        debug!(
            %axis,
            rows_solved = report.rows_solved,
            millis = utils::to_millis(sweep_start.elapsed()),
            "sweep finished"
        );

        report
    }

    /// A full round, one row sweep followed by one column sweep.
    pub fn run_round(&mut self) -> (SweepReport, SweepReport) {
        let users = self.run_sweep(Axis::Users);
        let items = self.run_sweep(Axis::Items);
        (users, items)
    }

    pub fn compute_loss(&self) -> f64 {
        weighted_loss(
            &self.by_user,
            &self.user_factors,
            &self.item_factors,
            self.config.lambda,
            self.config.unobserved_weight,
        )
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn user_factors(&self) -> &FactorMatrix {
        &self.user_factors
    }

    pub fn item_factors(&self) -> &FactorMatrix {
        &self.item_factors
    }

    /// Ends training and hands out the factors as (U, V).
    pub fn into_factors(mut self) -> (FactorMatrix, FactorMatrix) {
        let rank = self.config.rank;
        let user_factors = mem::replace(&mut self.user_factors, FactorMatrix::zeros(0, rank));
        let item_factors = mem::replace(&mut self.item_factors, FactorMatrix::zeros(0, rank));
        (user_factors, item_factors)
    }
}

impl<S: SweepStep> Drop for ALSEngine<S> {
    fn drop(&mut self) {
        self.pool.shutdown();
    }
}

fn check_rows(rows: &[SparseRow], num_rows: usize, num_cols: usize) -> Result<()> {

    let mut seen = vec![false; num_rows];

    for row in rows {
        if row.key as usize >= num_rows {
            return Err(WalsError::IndexOutOfBounds { index: row.key, dimension: num_rows });
        }
        if row.indices.len() != row.values.len() {
            return Err(WalsError::DimensionMismatch {
                expected: row.indices.len(),
                found: row.values.len(),
            });
        }
        if seen[row.key as usize] {
            let col = row.indices.first().cloned().unwrap_or(0);
            return Err(WalsError::DuplicateCell { row: row.key, col });
        }
        seen[row.key as usize] = true;

        for col in &row.indices {
            if *col as usize >= num_cols {
                return Err(WalsError::IndexOutOfBounds { index: *col, dimension: num_cols });
            }
        }

        let mut cols = row.indices.clone();
        cols.sort();
        if let Some(pair) = cols.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(WalsError::DuplicateCell { row: row.key, col: pair[0] });
        }
    }

    Ok(())
}

/// Both orientations must hold exactly the same (user, item, rating) cells.
fn check_transposed(by_user: &[SparseRow], by_item: &[SparseRow]) -> Result<()> {

    let by_cell = |a: &Interaction, b: &Interaction| (a.user, a.item).cmp(&(b.user, b.item));

    let mut from_users = sparse::ungroup(by_user, Axis::Users);
    let mut from_items = sparse::ungroup(by_item, Axis::Items);
    from_users.sort_by(by_cell);
    from_items.sort_by(by_cell);

    match from_users.iter().zip(from_items.iter()).find(|&(a, b)| a != b) {
        Some((cell, _)) => Err(WalsError::TransposeMismatch { user: cell.user, item: cell.item }),
        None => Ok(()),
    }
}
