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
use std::io::{stdout, BufReader, BufWriter, Write};
use std::path::Path;

use crate::errors::{Result, WalsError};
use crate::model::TrainedModel;
use crate::stats::{DataDictionary, IdMapper};
use crate::types::Interaction;

/// Configures a CSV reader for our input format. We expect NO headers, and a user, item, rating
/// triple per line with tab separation.
pub fn interactions_reader<R: std::io::Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .from_reader(reader)
}

pub fn csv_reader(file: &str) -> Result<csv::Reader<File>> {
    Ok(interactions_reader(File::open(file)?))
}

/// Reads all triples, assigning indices to unseen users and items on the way.
pub fn read_interactions<R>(
    reader: &mut csv::Reader<R>,
    data_dict: &mut DataDictionary,
) -> Result<Vec<Interaction>>
    where R: std::io::Read {

    let mut interactions = Vec::new();

    for record in reader.deserialize() {
        let (user, item, rating): (String, String, f64) = record?;

        if !(rating >= 0.0 && rating <= 1.0) {
            return Err(WalsError::InvalidRating { rating });
        }

        let (user_index, item_index) = data_dict.observe(&user, &item);
        interactions.push(Interaction::new(user_index, item_index, rating));
    }

    Ok(interactions)
}

/// Output the trained model as JSON. If a `path` is supplied, we write to a file at the specified
/// path, otherwise, we output to stdout.
pub fn write_model(model: &TrainedModel, path: Option<&Path>) -> Result<()> {

    let mut out: Box<dyn Write> = match path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(stdout()),
    };

    serde_json::to_writer(&mut out, model)?;
    writeln!(out)?;
    out.flush()?;

    Ok(())
}

pub fn read_model(path: &Path) -> Result<TrainedModel> {
    let reader = BufReader::new(File::open(path)?);
    let model: TrainedModel = serde_json::from_reader(reader)?;
    model.validate()?;
    Ok(model)
}

/// Persists the raw keys of a mapper as a JSON array in index order.
pub fn write_keys(mapper: &IdMapper, path: &Path) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut out, mapper.keys())?;
    out.flush()?;
    Ok(())
}

pub fn read_keys(path: &Path) -> Result<IdMapper> {
    let reader = BufReader::new(File::open(path)?);
    let keys: Vec<String> = serde_json::from_reader(reader)?;
    IdMapper::from_keys(keys)
}

#[cfg(test)]
mod tests {

    use std::env;
    use std::fs;

    use super::*;
    use crate::config::TrainingConfig;
    use crate::convergence::StoppingPolicy;
    use crate::types::FactorMatrix;

    #[test]
    fn reads_tab_separated_triples() {
        let data = "alice\tapple\t0.5\nbob\tapple\t1.0\nalice\tpony\t0.25\n";
        let mut reader = interactions_reader(data.as_bytes());
        let mut data_dict = DataDictionary::new();

        let interactions = read_interactions(&mut reader, &mut data_dict).unwrap();

        assert_eq!(interactions, vec![
            Interaction::new(0, 0, 0.5),
            Interaction::new(1, 0, 1.0),
            Interaction::new(0, 1, 0.25),
        ]);
        assert_eq!(data_dict.num_users(), 2);
        assert_eq!(data_dict.num_items(), 2);
    }

    #[test]
    fn rejects_malformed_lines_and_ratings() {
        let mut data_dict = DataDictionary::new();

        let mut out_of_range = interactions_reader("alice\tapple\t3.5\n".as_bytes());
        assert!(read_interactions(&mut out_of_range, &mut data_dict).is_err());

        let mut not_a_number = interactions_reader("alice\tapple\tlots\n".as_bytes());
        assert!(read_interactions(&mut not_a_number, &mut data_dict).is_err());
    }

    #[test]
    fn model_and_keys_survive_the_file_system() {
        let directory = env::temp_dir().join(format!("wals-io-{}", std::process::id()));
        fs::create_dir_all(&directory).unwrap();

        let config = TrainingConfig::new(
            1, 2, 2, 0.1, 0.2, StoppingPolicy::FixedRounds { rounds: 3 });
        let model = TrainedModel::new(
            config,
            FactorMatrix::from_rows(vec![vec![0.1, 0.2]], 2).unwrap(),
            FactorMatrix::from_rows(vec![vec![0.3, 0.4], vec![0.5, 0.6]], 2).unwrap(),
        ).unwrap();

        let model_path = directory.join("model.json");
        write_model(&model, Some(&model_path)).unwrap();
        let restored = read_model(&model_path).unwrap();

        assert_eq!(restored.user_factors, model.user_factors);
        assert_eq!(restored.item_factors, model.item_factors);
        assert_eq!(restored.config.stopping, model.config.stopping);

        let mut mapper = IdMapper::new();
        mapper.assign("dog");
        mapper.assign("bike");

        let keys_path = directory.join("items.json");
        write_keys(&mapper, &keys_path).unwrap();
        let restored_mapper = read_keys(&keys_path).unwrap();

        assert_eq!(restored_mapper.index("bike").unwrap(), 1);

        fs::remove_dir_all(&directory).unwrap();
    }
}
