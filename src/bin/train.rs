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

extern crate getopts;
extern crate tracing;
extern crate tracing_subscriber;
extern crate wals;

use std::env;
use std::error::Error;
use std::fs;
use std::path::Path;

use getopts::{Matches, Options};
use tracing::info;
use tracing_subscriber::EnvFilter;

use wals::evaluation;
use wals::io;
use wals::{Aggregation, DataDictionary, SparseDatasetBuilder, StoppingPolicy, TrainingConfig};

fn main() {

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("i", "inputfile", "Input file name (required). The input file must contain a \
        user, an item and a rating in [0, 1] per line, separated by tabs.", "PATH");
    opts.optopt("o", "outputdir", "Directory to write model.json, users.json and items.json to \
        (optional, defaults to the current directory).", "PATH");
    opts.optopt("c", "config", "JSON training configuration (optional). Dimensions are taken from \
        the input, command line options override the file.", "PATH");
    opts.optopt("k", "rank", "Dimensionality of the embeddings (optional, defaults to 10).",
        "NUMBER");
    opts.optopt("l", "lambda", "L2 regularization (optional, defaults to 0.01).", "NUMBER");
    opts.optopt("w", "unobserved-weight", "Weight of unobserved cells (optional, defaults to \
        0.01).", "NUMBER");
    opts.optopt("r", "rounds", "Number of rounds, or the maximum number of rounds if --epsilon is \
        given (optional, defaults to 20).", "NUMBER");
    opts.optopt("e", "epsilon", "Stop once the relative loss improvement drops below this value \
        (optional).", "NUMBER");
    opts.optopt("a", "aggregation", "How to combine repeated user/item pairs, 'max' or 'sum' \
        (optional, defaults to 'max').", "POLICY");
    opts.optopt("t", "test-fraction", "Fraction of interactions held out to report a test RMSE \
        (optional, defaults to 0).", "NUMBER");
    opts.optopt("n", "threads", "Number of threads (optional, defaults to the number of CPUs).",
        "NUMBER");
    opts.optflag("h", "help", "Print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(matches) => matches,
        Err(failure) => {
            let hint = failure.to_string();
            return print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    if matches.opt_present("h") {
        return print_usage_and_exit(&program, opts, None);
    }

    if !matches.opt_present("i") {
        return print_usage_and_exit(
            &program,
            opts,
            Some("Please specify an inputfile via --inputfile."),
        );
    }

    let settings = match Settings::from(&matches) {
        Ok(settings) => settings,
        Err(hint) => return print_usage_and_exit(&program, opts, Some(&hint)),
    };

    if let Err(failure) = train(&settings) {
        eprintln!("Training failed: {}", failure);
        std::process::exit(1);
    }
}

fn print_usage_and_exit(
    program: &str,
    opts: Options,
    hint: Option<&str>
) {

    if let Some(hint) = hint {
        eprintln!("\n{}\n", hint);
    }

    let brief = format!("Usage: {} [options]", program);
    eprint!("{}", opts.usage(&brief));

    if hint.is_some() {
        std::process::exit(1);
    }
}

struct Settings {
    interactions_path: String,
    output_dir: String,
    config: TrainingConfig,
    aggregation: Aggregation,
    test_fraction: f64,
}

impl Settings {

    fn from(matches: &Matches) -> Result<Settings, String> {

        let mut config = match matches.opt_str("c") {
            Some(path) => TrainingConfig::from_file(&path)
                .map_err(|failure| format!("Problem with config '{}': {}", path, failure))?,
            None => TrainingConfig::new(0, 0, 10, 0.01, 0.01,
                StoppingPolicy::FixedRounds { rounds: 20 }),
        };

        if let Some(rank) = parse(matches, "k")? {
            config.rank = rank;
        }
        if let Some(lambda) = parse(matches, "l")? {
            config.lambda = lambda;
        }
        if let Some(unobserved_weight) = parse(matches, "w")? {
            config.unobserved_weight = unobserved_weight;
        }
        if let Some(num_threads) = parse(matches, "n")? {
            config.num_threads = num_threads;
        }

        let rounds: Option<usize> = parse(matches, "r")?;
        let epsilon: Option<f64> = parse(matches, "e")?;

        config.stopping = match (epsilon, rounds, config.stopping) {
            (Some(epsilon), rounds, _) => StoppingPolicy::RelativeImprovement {
                epsilon,
                tolerance: 1e-9,
                max_rounds: rounds.unwrap_or(20),
            },
            (None, Some(rounds), _) => StoppingPolicy::FixedRounds { rounds },
            (None, None, stopping) => stopping,
        };

        let aggregation = match matches.opt_str("a").as_ref().map(|policy| policy.as_str()) {
            None | Some("max") => Aggregation::Max,
            Some("sum") => Aggregation::Sum,
            Some(other) => return Err(format!("Unknown aggregation '{}'", other)),
        };

        let test_fraction: f64 = parse(matches, "t")?.unwrap_or(0.0);

        Ok(Settings {
            interactions_path: matches.opt_str("i").unwrap_or_default(),
            output_dir: matches.opt_str("o").unwrap_or_else(|| String::from(".")),
            config,
            aggregation,
            test_fraction,
        })
    }
}

fn parse<T>(matches: &Matches, name: &str) -> Result<Option<T>, String>
    where T: std::str::FromStr, T::Err: std::fmt::Display {

    matches.opt_get(name)
        .map_err(|failure| format!("Problem with option '{}': {}", name, failure))
}

fn train(settings: &Settings) -> Result<(), Box<dyn Error>> {

    info!("Reading {} to map identifiers", settings.interactions_path);

    let mut reader = io::csv_reader(&settings.interactions_path)?;
    let mut data_dict = DataDictionary::new();
    let interactions = io::read_interactions(&mut reader, &mut data_dict)?;

    info!(
        "Found {} interactions between {} users and {} items.",
        data_dict.num_interactions(),
        data_dict.num_users(),
        data_dict.num_items(),
    );

    let (train_interactions, test_interactions) = if settings.test_fraction > 0.0 {
        evaluation::holdout_split(&interactions, settings.test_fraction, 17)
    } else {
        (interactions, Vec::new())
    };

    let mut builder = SparseDatasetBuilder::new(
        data_dict.num_users(), data_dict.num_items(), settings.aggregation);
    builder.extend(train_interactions)?;
    let dataset = builder.build()?;

    let mut config = settings.config.clone();
    config.num_users = dataset.num_users;
    config.num_items = dataset.num_items;

    let training = wals::train(&config, dataset.by_user, dataset.by_item)?;

    let train_rmse = evaluation::rmse(&training.model, &builder.interactions())?;
    info!("Train RMSE {:.5}", train_rmse);

    if !test_interactions.is_empty() {
        let test_rmse = evaluation::rmse(&training.model, &test_interactions)?;
        info!("Test RMSE {:.5} on {} held out interactions", test_rmse, test_interactions.len());
    }

    let output_dir = Path::new(&settings.output_dir);
    fs::create_dir_all(output_dir)?;

    info!("Writing model and dictionaries to {}", output_dir.display());
    io::write_model(&training.model, Some(&output_dir.join("model.json")))?;
    io::write_keys(data_dict.users(), &output_dir.join("users.json"))?;
    io::write_keys(data_dict.items(), &output_dir.join("items.json"))?;

    Ok(())
}
