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

#[cfg(test)]
mod tests {

    use std::sync::atomic::{AtomicUsize, Ordering};

    use scoped_pool::Pool;

    use super::super::{train, train_with_step};
    use crate::als::{SweepReport, SweepStep, WalsStep};
    use crate::config::TrainingConfig;
    use crate::convergence::{self, Status, StoppingPolicy};
    use crate::model::{serve, ServingRequest};
    use crate::sparse::{group_by_row, Aggregation, SparseDatasetBuilder};
    use crate::stats::DataDictionary;
    use crate::types::{Axis, FactorMatrix, Interaction, SparseRow};

    #[test]
    fn programmatic_usage() {

        /* Our input data comprises of observed engagement between users and items, already
           normalized to ratings in [0, 1]. The identifiers can be arbitrary strings. */
        let observations = vec![
            ("alice", "apple", 0.8),
            ("alice", "dog", 0.3),
            ("alice", "pony", 1.0),
            ("bob", "apple", 0.6),
            ("bob", "pony", 0.9),
            ("charles", "pony", 0.2),
            ("charles", "bike", 0.7),
            ("charles", "bike", 0.4),
        ];

        /* Internally, we use consecutive integer ids. The data dictionary assigns them in order of
           first occurrence, separately for users and items. */
        let mut data_dict = DataDictionary::new();
        let interactions: Vec<Interaction> = observations.iter()
            .map(|&(user, item, rating)| {
                let (user_index, item_index) = data_dict.observe(user, item);
                Interaction::new(user_index, item_index, rating)
            })
            .collect();

        /* Repeated observations of the same cell are aggregated before training, here we keep
           the strongest engagement. */
        let mut builder = SparseDatasetBuilder::new(
            data_dict.num_users(), data_dict.num_items(), Aggregation::Max);
        builder.extend(interactions).unwrap();
        let dataset = builder.build().unwrap();

        assert_eq!(dataset.num_interactions(), 7);

        let mut config = TrainingConfig::new(
            dataset.num_users,
            dataset.num_items,
            3,      // The dimensionality of the embeddings
            0.05,   // L2 regularization
            0.1,    // Weight of all unobserved cells
            StoppingPolicy::RelativeImprovement { epsilon: 1e-4, tolerance: 1e-9, max_rounds: 1000 },
        );
        config.num_threads = 2;

        let training = train(&config, dataset.by_user, dataset.by_item).unwrap();

        assert_eq!(training.status, Status::Converged);
        assert!(training.loss_history.len() < 1000);
        assert!(convergence::is_non_increasing(&training.loss_history, 1e-9));
        assert_eq!(training.model.user_factors.num_rows(), 3);
        assert_eq!(training.model.item_factors.num_rows(), 4);

        /* Trained users are served straight from the factors, new users are projected from
           their history against the trained item factors. */
        let alice = serve(&training.model, data_dict.users(), &ServingRequest::known("alice"))
            .unwrap();
        assert_eq!(alice.len(), 3);

        let pony = data_dict.items().index("pony").unwrap();
        let dave = ServingRequest::with_history("dave", vec![(pony, 1.0)]);
        let embedding = serve(&training.model, data_dict.users(), &dave).unwrap();
        assert_eq!(embedding.len(), 3);
    }

    fn example_interactions() -> Vec<Interaction> {
        vec![
            Interaction::new(0, 0, 0.2),
            Interaction::new(1, 1, 1.0),
            Interaction::new(2, 0, 0.4),
            Interaction::new(2, 2, 0.6),
        ]
    }

    fn example_config() -> TrainingConfig {
        let mut config = TrainingConfig::new(
            3, 3, 2, 0.01, 0.01, StoppingPolicy::FixedRounds { rounds: 20 });
        config.num_threads = 2;
        config
    }

    #[test]
    fn projection_reproduces_trained_users() {
        let interactions = example_interactions();
        let by_user = group_by_row(&interactions, Axis::Users).unwrap();
        let by_item = group_by_row(&interactions, Axis::Items).unwrap();

        let training = train(&example_config(), by_user.clone(), by_item).unwrap();

        assert_eq!(training.loss_history.len(), 20);
        assert_eq!(training.status, Status::RoundsExhausted);
        assert!(training.loss_history[19] <= training.loss_history[0]);
        assert!(training.final_loss <= training.loss_history[19] * (1.0 + 1e-9));

        let projector = training.model.user_projector();
        let u0 = projector.project(&[(0, 0.2)]).unwrap();
        for (projected, trained) in u0.iter().zip(training.model.user_factors.row(0)) {
            assert!((projected - trained).abs() < 1e-4);
        }

        for row in &by_user {
            let history: Vec<(u32, f64)> = row.entries().collect();
            let projected = projector.project(&history).unwrap();
            let trained = training.model.user_factors.row(row.key as usize);
            for (a, b) in projected.iter().zip(trained) {
                assert!((a - b).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn summed_ratings_above_one_can_be_projected() {
        let mut builder = SparseDatasetBuilder::new(2, 2, Aggregation::Sum);
        builder.extend(vec![
            Interaction::new(0, 0, 0.7),
            Interaction::new(0, 0, 0.6),
            Interaction::new(1, 1, 0.4),
        ]).unwrap();
        let dataset = builder.build().unwrap();
        let by_user = dataset.by_user.clone();

        let mut config = TrainingConfig::new(
            2, 2, 2, 0.01, 0.01, StoppingPolicy::FixedRounds { rounds: 5 });
        config.num_threads = 2;

        let training = train(&config, dataset.by_user, dataset.by_item).unwrap();
        let projector = training.model.user_projector();

        let history: Vec<(u32, f64)> = by_user[0].entries().collect();
        assert!(history[0].1 > 1.0);

        let projected = projector.project(&history).unwrap();
        for (a, b) in projected.iter().zip(training.model.user_factors.row(0)) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn training_is_reproducible_for_a_seed() {
        let interactions = example_interactions();

        let first = train(
            &example_config(),
            group_by_row(&interactions, Axis::Users).unwrap(),
            group_by_row(&interactions, Axis::Items).unwrap(),
        ).unwrap();

        let second = train(
            &example_config(),
            group_by_row(&interactions, Axis::Users).unwrap(),
            group_by_row(&interactions, Axis::Items).unwrap(),
        ).unwrap();

        assert_eq!(first.model, second.model);
        assert_eq!(first.loss_history, second.loss_history);
    }

    /// Delegates to the exact update and counts how often it was invoked.
    struct CountingStep {
        inner: WalsStep,
        sweeps: AtomicUsize,
    }

    impl SweepStep for CountingStep {
        fn sweep(
            &self,
            axis: Axis,
            rows: &[SparseRow],
            fixed: &FactorMatrix,
            target: &mut FactorMatrix,
            pool: &Pool,
        ) -> SweepReport {
            self.sweeps.fetch_add(1, Ordering::SeqCst);
            self.inner.sweep(axis, rows, fixed, target, pool)
        }
    }

    #[test]
    fn sweeps_can_be_swapped_out() {
        let interactions = example_interactions();
        let mut config = example_config();
        config.stopping = StoppingPolicy::FixedRounds { rounds: 4 };

        let step = CountingStep {
            inner: WalsStep::new(config.lambda, config.unobserved_weight),
            sweeps: AtomicUsize::new(0),
        };

        let training = train_with_step(
            &config,
            group_by_row(&interactions, Axis::Users).unwrap(),
            group_by_row(&interactions, Axis::Items).unwrap(),
            &step,
        ).unwrap();

        // two sweeps per round plus the final user sweep
        assert_eq!(step.sweeps.load(Ordering::SeqCst), 9);
        assert_eq!(training.loss_history.len(), 4);
    }
}
