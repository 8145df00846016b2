//! Weighted alternating least squares (WALS) for implicit feedback. Users and items are embedded
//! into a shared low-rank space, unobserved cells take part in the objective with a uniform
//! weight w0 without ever being materialized.
extern crate csv;
extern crate fnv;
extern crate num_cpus;
extern crate rand;
extern crate scoped_pool;
extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate serde_json;
extern crate thiserror;
extern crate tracing;

use std::time::Instant;

use tracing::{info, warn};

pub mod als;
pub mod config;
pub mod convergence;
pub mod errors;
pub mod evaluation;
pub mod io;
mod linalg;
pub mod model;
pub mod projector;
pub mod sparse;
pub mod stats;
pub mod types;
pub mod utils;
mod usage_tests;

pub use als::{ALSEngine, SweepReport, SweepStep, WalsStep};
pub use config::TrainingConfig;
pub use convergence::{ConvergenceMonitor, Status, StoppingPolicy};
pub use errors::{Result, WalsError};
pub use model::{serve, ServingRequest, TrainedModel};
pub use projector::Projector;
pub use sparse::{Aggregation, SparseDataset, SparseDatasetBuilder};
pub use stats::{DataDictionary, IdMapper};
pub use types::{Axis, FactorMatrix, Interaction, SparseRow};

/// Result of a training run.
#[derive(Debug)]
pub struct Training {
    pub model: TrainedModel,
    /// Loss after each full round. Training ends with one more user sweep, so the returned model
    /// is described by `final_loss`, not by the last entry.
    pub loss_history: Vec<f64>,
    /// Loss of the returned factors
    pub final_loss: f64,
    pub status: Status,
}

pub fn train(
    config: &TrainingConfig,
    by_user: Vec<SparseRow>,
    by_item: Vec<SparseRow>,
) -> Result<Training> {
    let engine = ALSEngine::new(config.clone(), by_user, by_item)?;
    run_to_convergence(engine)
}

/// Same as `train`, but sweeps are computed by a custom `step`.
pub fn train_with_step<S: SweepStep>(
    config: &TrainingConfig,
    by_user: Vec<SparseRow>,
    by_item: Vec<SparseRow>,
    step: S,
) -> Result<Training> {
    let engine = ALSEngine::with_step(config.clone(), by_user, by_item, step)?;
    run_to_convergence(engine)
}

fn run_to_convergence<S: SweepStep>(mut engine: ALSEngine<S>) -> Result<Training> {

    let training_start = Instant::now();
    let monitor = ConvergenceMonitor::new(engine.config().stopping);

    info!(
        num_users = engine.config().num_users,
        num_items = engine.config().num_items,
        rank = engine.config().rank,
        lambda = engine.config().lambda,
        unobserved_weight = engine.config().unobserved_weight,
        "training started"
    );

    let mut loss_history: Vec<f64> = Vec::new();

    let status = loop {
        let round_start = Instant::now();

        engine.run_round();
        let loss = engine.compute_loss();
        loss_history.push(loss);

        info!(
            round = loss_history.len(),
            loss,
            millis = utils::to_millis(round_start.elapsed()),
            "round finished"
        );

        match monitor.status(&loss_history) {
            Status::Continue => continue,
            Status::Diverged => {
                warn!(round = loss_history.len(), loss, "loss increased beyond tolerance");
                break Status::Diverged;
            },
            status => break status,
        }
    };

    // Re-solve U against the final V, so projecting a trained user with its training
    // observations reproduces its row of U
    engine.run_sweep(Axis::Users);
    let final_loss = engine.compute_loss();

    info!(
        rounds = loss_history.len(),
        final_loss,
        status = ?status,
        millis = utils::to_millis(training_start.elapsed()),
        "training finished"
    );

    let config = engine.config().clone();
    let (user_factors, item_factors) = engine.into_factors();
    let model = TrainedModel::new(config, user_factors, item_factors)?;

    Ok(Training { model, loss_history, final_loss, status })
}
