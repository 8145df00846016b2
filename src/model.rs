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

use crate::config::TrainingConfig;
use crate::errors::{Result, WalsError};
use crate::linalg;
use crate::projector::Projector;
use crate::stats::IdMapper;
use crate::types::FactorMatrix;

/// The trained artifact: both factor matrices plus the configuration that produced them, which is
/// required to reproduce projections later on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub config: TrainingConfig,
    pub user_factors: FactorMatrix,
    pub item_factors: FactorMatrix,
}

impl TrainedModel {

    pub fn new(
        config: TrainingConfig,
        user_factors: FactorMatrix,
        item_factors: FactorMatrix,
    ) -> Result<Self> {
        let model = TrainedModel { config, user_factors, item_factors };
        model.validate()?;
        Ok(model)
    }

    /// Checks that the factor shapes agree with the stored configuration.
    pub fn validate(&self) -> Result<()> {
        self.config.validate()?;

        let expected_shapes = [
            (self.config.num_users, self.user_factors.num_rows()),
            (self.config.num_items, self.item_factors.num_rows()),
            (self.config.rank, self.user_factors.rank()),
            (self.config.rank, self.item_factors.rank()),
            (self.config.num_users * self.config.rank, self.user_factors.num_values()),
            (self.config.num_items * self.config.rank, self.item_factors.num_values()),
        ];

        for &(expected, found) in expected_shapes.iter() {
            if expected != found {
                return Err(WalsError::DimensionMismatch { expected, found });
            }
        }

        Ok(())
    }

    pub fn rank(&self) -> usize {
        self.config.rank
    }

    pub fn user_embedding(&self, user: u32) -> Result<&[f64]> {
        if user as usize >= self.user_factors.num_rows() {
            return Err(WalsError::UnknownIndex { index: user });
        }
        Ok(self.user_factors.row(user as usize))
    }

    pub fn item_embedding(&self, item: u32) -> Result<&[f64]> {
        if item as usize >= self.item_factors.num_rows() {
            return Err(WalsError::UnknownIndex { index: item });
        }
        Ok(self.item_factors.row(item as usize))
    }

    pub fn predict(&self, user: u32, item: u32) -> Result<f64> {
        Ok(linalg::dot(self.user_embedding(user)?, self.item_embedding(item)?))
    }

    /// Projects new users against the trained item factors.
    pub fn user_projector(&self) -> Projector {
        Projector::new(&self.item_factors, self.config.lambda, self.config.unobserved_weight)
    }

    /// Projects new items against the trained user factors.
    pub fn item_projector(&self) -> Projector {
        Projector::new(&self.user_factors, self.config.lambda, self.config.unobserved_weight)
    }
}

/// A request for a user embedding. The `history` of (item index, rating) pairs is only consulted
/// if `key` was not part of training.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServingRequest {
    pub key: String,
    pub history: Option<Vec<(u32, f64)>>,
}

impl ServingRequest {

    pub fn known(key: &str) -> Self {
        ServingRequest { key: key.to_owned(), history: None }
    }

    pub fn with_history(key: &str, history: Vec<(u32, f64)>) -> Self {
        ServingRequest { key: key.to_owned(), history: Some(history) }
    }
}

/// Trained users get their row of U returned as is, everyone else is projected from their
/// history. Unknown users without a history fail with `UnknownKey`.
pub fn serve(model: &TrainedModel, users: &IdMapper, request: &ServingRequest) -> Result<Vec<f64>> {
    match users.index(&request.key) {
        Ok(user) => Ok(model.user_embedding(user)?.to_vec()),
        Err(unknown) => match request.history {
            Some(ref history) => model.user_projector().project(history),
            None => Err(unknown),
        },
    }
}
