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

use rand::{Rng, SeedableRng, XorShiftRng};

use crate::errors::Result;
use crate::model::TrainedModel;
use crate::types::Interaction;

/// Randomly holds out roughly `test_fraction` of the interactions, returns (train, test). The
/// split only depends on `seed` and the input order.
pub fn holdout_split(
    interactions: &[Interaction],
    test_fraction: f64,
    seed: u32,
) -> (Vec<Interaction>, Vec<Interaction>) {

    let mut rng = XorShiftRng::from_seed([0x2545_f491, seed, 0x4f6c_dd1d, seed.rotate_left(16)]);

    let mut train = Vec::with_capacity(interactions.len());
    let mut test = Vec::new();

    for interaction in interactions {
        if rng.next_f64() < test_fraction {
            test.push(*interaction);
        } else {
            train.push(*interaction);
        }
    }

    (train, test)
}

/// Root mean squared error of u·v against the observed ratings, 0 for no interactions.
pub fn rmse(model: &TrainedModel, interactions: &[Interaction]) -> Result<f64> {

    if interactions.is_empty() {
        return Ok(0.0);
    }

    let mut squared_error = 0.0;

    for interaction in interactions {
        let prediction = model.predict(interaction.user, interaction.item)?;

        squared_error += (interaction.rating - prediction).powi(2);
    }

    Ok((squared_error / interactions.len() as f64).sqrt())
}
