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

use crate::errors::{Result, WalsError};

/// When to stop alternating sweeps. Both policies count full rounds (one row sweep followed by
/// one column sweep).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum StoppingPolicy {
    FixedRounds {
        rounds: usize,
    },
    /// Stops once the relative loss improvement between consecutive rounds drops below `epsilon`.
    /// Increases of the loss up to a relative `tolerance` count as numerical noise.
    RelativeImprovement {
        epsilon: f64,
        tolerance: f64,
        max_rounds: usize,
    },
}

impl StoppingPolicy {
    pub fn validate(&self) -> Result<()> {
        match *self {
            StoppingPolicy::FixedRounds { rounds } => {
                if rounds == 0 {
                    return Err(WalsError::InvalidConfig(
                        String::from("at least one round is required")));
                }
            },
            StoppingPolicy::RelativeImprovement { epsilon, tolerance, max_rounds } => {
                if !(epsilon > 0.0) || !epsilon.is_finite() {
                    return Err(WalsError::InvalidConfig(
                        format!("epsilon must be positive, found {}", epsilon)));
                }
                if !(tolerance >= 0.0) || !tolerance.is_finite() {
                    return Err(WalsError::InvalidConfig(
                        format!("tolerance must be non-negative, found {}", tolerance)));
                }
                if max_rounds == 0 {
                    return Err(WalsError::InvalidConfig(
                        String::from("at least one round is required")));
                }
            },
        }

        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Continue,
    Converged,
    /// The loss grew by more than the configured tolerance.
    Diverged,
    RoundsExhausted,
}

pub struct ConvergenceMonitor {
    policy: StoppingPolicy,
}

impl ConvergenceMonitor {

    pub fn new(policy: StoppingPolicy) -> Self {
        ConvergenceMonitor { policy }
    }

    /// Classifies the loss history, one value per completed round.
    pub fn status(&self, history: &[f64]) -> Status {
        if history.is_empty() {
            return Status::Continue;
        }

        match self.policy {
            StoppingPolicy::FixedRounds { rounds } => {
                if history.len() >= rounds {
                    Status::RoundsExhausted
                } else {
                    Status::Continue
                }
            },
            StoppingPolicy::RelativeImprovement { epsilon, tolerance, max_rounds } => {
                if history.len() >= 2 {
                    let previous = history[history.len() - 2];
                    let current = history[history.len() - 1];
                    let improvement = relative_improvement(previous, current);

                    if improvement < -tolerance {
                        return Status::Diverged;
                    }
                    if improvement < epsilon {
                        return Status::Converged;
                    }
                }

                if history.len() >= max_rounds {
                    Status::RoundsExhausted
                } else {
                    Status::Continue
                }
            },
        }
    }

    pub fn should_stop(&self, history: &[f64]) -> bool {
        self.status(history) != Status::Continue
    }
}

/// Relative decrease from `previous` to `current`, negative if the loss grew.
pub fn relative_improvement(previous: f64, current: f64) -> f64 {
    let scale = previous.abs().max(::std::f64::MIN_POSITIVE);
    (previous - current) / scale
}

/// Checks that losses never grow by more than a relative `tolerance` from one round to the next.
pub fn is_non_increasing(history: &[f64], tolerance: f64) -> bool {
    history.windows(2)
        .all(|pair| relative_improvement(pair[0], pair[1]) >= -tolerance)
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn fixed_rounds() {
        let monitor = ConvergenceMonitor::new(StoppingPolicy::FixedRounds { rounds: 3 });

        assert!(!monitor.should_stop(&[]));
        assert!(!monitor.should_stop(&[5.0, 4.0]));
        assert_eq!(monitor.status(&[5.0, 4.0, 3.9]), Status::RoundsExhausted);
    }

    #[test]
    fn relative_improvement_policy() {
        let monitor = ConvergenceMonitor::new(StoppingPolicy::RelativeImprovement {
            epsilon: 0.01,
            tolerance: 1e-6,
            max_rounds: 100,
        });

        assert_eq!(monitor.status(&[10.0]), Status::Continue);
        assert_eq!(monitor.status(&[10.0, 5.0]), Status::Continue);
        assert_eq!(monitor.status(&[10.0, 5.0, 4.99]), Status::Converged);
        assert_eq!(monitor.status(&[10.0, 5.0, 6.0]), Status::Diverged);
    }

    #[test]
    fn numerical_noise_is_not_divergence() {
        let monitor = ConvergenceMonitor::new(StoppingPolicy::RelativeImprovement {
            epsilon: 1e-4,
            tolerance: 1e-6,
            max_rounds: 100,
        });

        let history = [2.0, 1.0, 1.0 + 1e-9];
        assert_eq!(monitor.status(&history), Status::Converged);
        assert!(is_non_increasing(&history, 1e-6));
        assert!(!is_non_increasing(&[1.0, 1.1], 1e-6));
    }

    #[test]
    fn max_rounds_bounds_slow_convergence() {
        let monitor = ConvergenceMonitor::new(StoppingPolicy::RelativeImprovement {
            epsilon: 1e-3,
            tolerance: 0.0,
            max_rounds: 3,
        });

        assert_eq!(monitor.status(&[8.0, 4.0]), Status::Continue);
        assert_eq!(monitor.status(&[8.0, 4.0, 2.0]), Status::RoundsExhausted);
    }

    #[test]
    fn invalid_policies() {
        assert!(StoppingPolicy::FixedRounds { rounds: 0 }.validate().is_err());
        assert!(StoppingPolicy::RelativeImprovement { epsilon: 0.0, tolerance: 0.0, max_rounds: 5 }
            .validate().is_err());
        assert!(StoppingPolicy::RelativeImprovement { epsilon: 0.1, tolerance: -1.0, max_rounds: 5 }
            .validate().is_err());
        assert!(StoppingPolicy::FixedRounds { rounds: 20 }.validate().is_ok());
    }
}
