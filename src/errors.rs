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

use std::io;

use thiserror::Error;

use crate::types::Axis;

pub type Result<T> = std::result::Result<T, WalsError>;

#[derive(Debug, Error)]
pub enum WalsError {
    #[error("index {index} was never assigned")]
    UnknownIndex { index: u32 },

    #[error("key '{key}' was never assigned")]
    UnknownKey { key: String },

    #[error("key '{key}' appears more than once")]
    DuplicateKey { key: String },

    #[error("duplicate cell ({row}, {col}), interactions must be aggregated upstream")]
    DuplicateCell { row: u32, col: u32 },

    #[error("singular system while solving {axis} row {row}")]
    SingularSystem { axis: Axis, row: u32 },

    #[error("cannot project an empty observation set with lambda = 0 and w0 = 0")]
    EmptyObservationSet,

    #[error("cannot project {observations} observations, the system is underdetermined")]
    SingularProjection { observations: usize },

    #[error("cell ({user}, {item}) differs between the user and the item orientation")]
    TransposeMismatch { user: u32, item: u32 },

    #[error("index {index} out of bounds for dimension {dimension}")]
    IndexOutOfBounds { index: u32, dimension: usize },

    #[error("expected dimension {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("invalid rating {rating}")]
    InvalidRating { rating: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
