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

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::convergence::StoppingPolicy;
use crate::errors::{Result, WalsError};

pub const DEFAULT_SEED: u64 = 42;

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_num_threads() -> usize {
    num_cpus::get()
}

/// Everything needed to train a model and to reproduce its projections later.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub num_users: usize,
    pub num_items: usize,
    pub rank: usize,
    /// L2 regularization λ
    pub lambda: f64,
    /// Weight w0 of all unobserved cells
    pub unobserved_weight: f64,
    pub stopping: StoppingPolicy,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_num_threads", skip_serializing)]
    pub num_threads: usize,
}

impl TrainingConfig {

    pub fn new(
        num_users: usize,
        num_items: usize,
        rank: usize,
        lambda: f64,
        unobserved_weight: f64,
        stopping: StoppingPolicy,
    ) -> Self {
        TrainingConfig {
            num_users,
            num_items,
            rank,
            lambda,
            unobserved_weight,
            stopping,
            seed: DEFAULT_SEED,
            num_threads: default_num_threads(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: TrainingConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rank == 0 {
            return Err(WalsError::InvalidConfig(String::from("rank must be at least 1")));
        }
        if !(self.lambda >= 0.0) || !self.lambda.is_finite() {
            return Err(WalsError::InvalidConfig(
                format!("lambda must be non-negative, found {}", self.lambda)));
        }
        if !(self.unobserved_weight >= 0.0) || !self.unobserved_weight.is_finite() {
            return Err(WalsError::InvalidConfig(
                format!("unobserved weight must be non-negative, found {}", self.unobserved_weight)));
        }
        if self.num_threads == 0 {
            return Err(WalsError::InvalidConfig(String::from("at least one thread is required")));
        }

        self.stopping.validate()
    }
}
