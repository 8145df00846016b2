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
extern crate serde_json;
extern crate tracing;
extern crate tracing_subscriber;
extern crate wals;

use std::env;
use std::error::Error;
use std::path::Path;

use getopts::Options;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wals::io;
use wals::{serve, IdMapper, ServingRequest};

fn main() {

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("m", "modeldir", "Directory holding model.json, users.json and items.json as \
        written by wals-train (required).", "PATH");
    opts.optopt("u", "user", "Identifier of the user to embed (required).", "KEY");
    opts.optopt("H", "history", "Observed items of a user unknown to the model, as comma \
        separated item=rating pairs (optional).", "HISTORY");
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

    let (model_dir, user) = match (matches.opt_str("m"), matches.opt_str("u")) {
        (Some(model_dir), Some(user)) => (model_dir, user),
        _ => return print_usage_and_exit(
            &program,
            opts,
            Some("Please specify a model directory via --modeldir and a user via --user."),
        ),
    };

    if let Err(failure) = project(&model_dir, &user, matches.opt_str("H")) {
        eprintln!("Projection failed: {}", failure);
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

/// Parses `item=rating,item=rating` into item indices and ratings.
fn parse_history(history: &str, items: &IdMapper) -> Result<Vec<(u32, f64)>, Box<dyn Error>> {
    let mut observed = Vec::new();

    for pair in history.split(',').filter(|pair| !pair.trim().is_empty()) {
        let mut parts = pair.splitn(2, '=');
        let item = parts.next().unwrap_or("").trim();
        let rating: f64 = match parts.next() {
            Some(rating) => rating.trim().parse()?,
            None => return Err(format!("Missing rating for item '{}'", item).into()),
        };

        observed.push((items.index(item)?, rating));
    }

    Ok(observed)
}

fn project(model_dir: &str, user: &str, history: Option<String>) -> Result<(), Box<dyn Error>> {

    let model_dir = Path::new(model_dir);

    let model = io::read_model(&model_dir.join("model.json"))?;
    let users = io::read_keys(&model_dir.join("users.json"))?;
    let items = io::read_keys(&model_dir.join("items.json"))?;

    info!(rank = model.rank(), "loaded model from {}", model_dir.display());

    let request = match history {
        Some(history) => ServingRequest::with_history(user, parse_history(&history, &items)?),
        None => ServingRequest::known(user),
    };

    let embedding = serve(&model, &users, &request)?;
    println!("{}", serde_json::to_string(&embedding)?);

    Ok(())
}
