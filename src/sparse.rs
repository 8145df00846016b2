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

use fnv::FnvHashMap;

use crate::errors::{Result, WalsError};
use crate::types::{Axis, Interaction, SparseRow};

/// How repeated observations of the same (user, item) cell are combined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aggregation {
    Sum,
    Max,
    /// The caller guarantees unique cells, a repeated cell fails with `DuplicateCell`.
    Reject,
}

/// The interaction matrix in both orientations, the item-keyed rows are the transpose of the
/// user-keyed rows.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseDataset {
    pub num_users: usize,
    pub num_items: usize,
    pub by_user: Vec<SparseRow>,
    pub by_item: Vec<SparseRow>,
}

impl SparseDataset {
    pub fn num_interactions(&self) -> usize {
        self.by_user.iter().map(|row| row.len()).sum()
    }
}

/// Collects interactions, aggregates repeated cells and groups them into sparse rows.
pub struct SparseDatasetBuilder {
    num_users: usize,
    num_items: usize,
    aggregation: Aggregation,
    cells: FnvHashMap<(u32, u32), f64>,
}

impl SparseDatasetBuilder {

    pub fn new(num_users: usize, num_items: usize, aggregation: Aggregation) -> Self {
        SparseDatasetBuilder {
            num_users,
            num_items,
            aggregation,
            cells: FnvHashMap::with_capacity_and_hasher(num_users, Default::default()),
        }
    }

    pub fn add(&mut self, interaction: Interaction) -> Result<()> {

        check_bounds(interaction.user, self.num_users)?;
        check_bounds(interaction.item, self.num_items)?;

        if !(interaction.rating >= 0.0 && interaction.rating <= 1.0) {
            return Err(WalsError::InvalidRating { rating: interaction.rating });
        }

        let cell = (interaction.user, interaction.item);

        match self.cells.get_mut(&cell) {
            None => {
                self.cells.insert(cell, interaction.rating);
            },
            Some(rating) => match self.aggregation {
                Aggregation::Sum => *rating += interaction.rating,
                Aggregation::Max => *rating = rating.max(interaction.rating),
                Aggregation::Reject => {
                    return Err(WalsError::DuplicateCell { row: cell.0, col: cell.1 });
                },
            },
        }

        Ok(())
    }

    pub fn extend<I>(&mut self, interactions: I) -> Result<()>
        where I: IntoIterator<Item=Interaction> {

        for interaction in interactions {
            self.add(interaction)?;
        }

        Ok(())
    }

    /// Ratings aggregated with `Sum` may exceed 1.
    pub fn interactions(&self) -> Vec<Interaction> {
        self.cells.iter()
            .map(|(&(user, item), &rating)| Interaction::new(user, item, rating))
            .collect()
    }

    pub fn build(&self) -> Result<SparseDataset> {
        let interactions = self.interactions();

        Ok(SparseDataset {
            num_users: self.num_users,
            num_items: self.num_items,
            by_user: group_by_row(&interactions, Axis::Users)?,
            by_item: group_by_row(&interactions, Axis::Items)?,
        })
    }
}

fn check_bounds(index: u32, dimension: usize) -> Result<()> {
    if index as usize >= dimension {
        Err(WalsError::IndexOutOfBounds { index, dimension })
    } else {
        Ok(())
    }
}

/// Groups already deduplicated interactions into one `SparseRow` per non-empty row along `axis`.
/// Rows are ordered by key and column indices are sorted in ascending order.
pub fn group_by_row(interactions: &[Interaction], axis: Axis) -> Result<Vec<SparseRow>> {

    let mut cells: Vec<(u32, u32, f64)> = interactions.iter()
        .map(|interaction| {
            let (row, col) = interaction.cell(axis);
            (row, col, interaction.rating)
        })
        .collect();

    cells.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    let mut rows: Vec<SparseRow> = Vec::new();

    for (row, col, rating) in cells {
        match rows.last_mut() {
            Some(current) if current.key == row => {
                if current.indices.last() == Some(&col) {
                    return Err(WalsError::DuplicateCell { row, col });
                }
                current.indices.push(col);
                current.values.push(rating);
            },
            _ => rows.push(SparseRow { key: row, indices: vec![col], values: vec![rating] }),
        }
    }

    Ok(rows)
}

/// Reconstructs the interactions represented by rows grouped along `axis`.
pub fn ungroup(rows: &[SparseRow], axis: Axis) -> Vec<Interaction> {
    rows.iter()
        .flat_map(|row| row.entries().map(move |(col, rating)| match axis {
            Axis::Users => Interaction::new(row.key, col, rating),
            Axis::Items => Interaction::new(col, row.key, rating),
        }))
        .collect()
}

#[cfg(test)]
mod tests {

    use super::*;

    fn sorted(mut interactions: Vec<Interaction>) -> Vec<Interaction> {
        interactions.sort_by(|a, b| (a.user, a.item).cmp(&(b.user, b.item)));
        interactions
    }

    #[test]
    fn groups_by_both_axes() {
        let interactions = vec![
            Interaction::new(2, 0, 0.4),
            Interaction::new(0, 0, 0.2),
            Interaction::new(2, 2, 0.6),
            Interaction::new(1, 1, 1.0),
        ];

        let by_user = group_by_row(&interactions, Axis::Users).unwrap();
        assert_eq!(by_user.len(), 3);
        assert_eq!(by_user[2].key, 2);
        assert_eq!(by_user[2].indices, vec![0, 2]);
        assert_eq!(by_user[2].values, vec![0.4, 0.6]);

        let by_item = group_by_row(&interactions, Axis::Items).unwrap();
        assert_eq!(by_item.len(), 3);
        assert_eq!(by_item[0].key, 0);
        assert_eq!(by_item[0].indices, vec![0, 2]);
        assert_eq!(by_item[0].values, vec![0.2, 0.4]);
    }

    #[test]
    fn empty_rows_are_not_materialized() {
        let interactions = vec![Interaction::new(4, 1, 0.5)];
        let by_user = group_by_row(&interactions, Axis::Users).unwrap();

        assert_eq!(by_user.len(), 1);
        assert_eq!(by_user[0].key, 4);
    }

    #[test]
    fn duplicate_cells_are_rejected() {
        let interactions = vec![
            Interaction::new(0, 1, 0.5),
            Interaction::new(0, 1, 0.7),
        ];

        match group_by_row(&interactions, Axis::Items) {
            Err(WalsError::DuplicateCell { row, col }) => assert_eq!((row, col), (1, 0)),
            other => panic!("unexpected result {:?}", other),
        }

        let mut builder = SparseDatasetBuilder::new(1, 2, Aggregation::Reject);
        builder.add(interactions[0]).unwrap();
        assert!(builder.add(interactions[1]).is_err());
    }

    #[test]
    fn aggregation_policies() {
        let repeated = vec![
            Interaction::new(0, 0, 0.25),
            Interaction::new(0, 0, 0.5),
        ];

        let mut summing = SparseDatasetBuilder::new(1, 1, Aggregation::Sum);
        summing.extend(repeated.clone()).unwrap();
        assert_eq!(summing.interactions(), vec![Interaction::new(0, 0, 0.75)]);

        let mut maximizing = SparseDatasetBuilder::new(1, 1, Aggregation::Max);
        maximizing.extend(repeated).unwrap();
        assert_eq!(maximizing.interactions(), vec![Interaction::new(0, 0, 0.5)]);
    }

    #[test]
    fn out_of_range_input_is_rejected() {
        let mut builder = SparseDatasetBuilder::new(2, 2, Aggregation::Sum);

        assert!(builder.add(Interaction::new(2, 0, 0.5)).is_err());
        assert!(builder.add(Interaction::new(0, 5, 0.5)).is_err());
        assert!(builder.add(Interaction::new(0, 0, 1.5)).is_err());
        assert!(builder.add(Interaction::new(0, 0, -0.1)).is_err());
    }

    #[test]
    fn both_orientations_hold_the_same_cells() {
        let mut builder = SparseDatasetBuilder::new(4, 5, Aggregation::Max);

        for user in 0..4_u32 {
            for item in 0..5_u32 {
                if (user * 7 + item * 3) % 4 != 0 {
                    let rating = ((user + 1) * (item + 2)) as f64 / 30.0;
                    builder.add(Interaction::new(user, item, rating)).unwrap();
                }
            }
        }

        let dataset = builder.build().unwrap();

        let from_users = sorted(ungroup(&dataset.by_user, Axis::Users));
        let from_items = sorted(ungroup(&dataset.by_item, Axis::Items));

        assert_eq!(from_users, from_items);
        assert_eq!(from_users.len(), dataset.num_interactions());
    }
}
