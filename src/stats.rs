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

/// Bijective mapping between raw identifiers and dense, zero-based indices. Indices are handed out
/// in first-occurrence order and never renumbered.
#[derive(Clone, Debug, Default)]
pub struct IdMapper {
    indices: FnvHashMap<String, u32>,
    keys: Vec<String>,
}

impl IdMapper {

    pub fn new() -> Self {
        IdMapper {
            indices: FnvHashMap::with_capacity_and_hasher(100, Default::default()),
            keys: Vec::with_capacity(100),
        }
    }

    /// Rebuilds a mapper from keys listed in index order.
    pub fn from_keys(keys: Vec<String>) -> Result<Self> {
        let mut indices: FnvHashMap<String, u32> =
            FnvHashMap::with_capacity_and_hasher(keys.len(), Default::default());

        for (index, key) in keys.iter().enumerate() {
            if indices.insert(key.clone(), index as u32).is_some() {
                return Err(WalsError::DuplicateKey { key: key.clone() });
            }
        }

        Ok(IdMapper { indices, keys })
    }

    pub fn assign(&mut self, key: &str) -> u32 {
        if let Some(index) = self.indices.get(key) {
            return *index;
        }

        let index = self.keys.len() as u32;
        self.indices.insert(key.to_owned(), index);
        self.keys.push(key.to_owned());

        index
    }

    pub fn index(&self, key: &str) -> Result<u32> {
        self.indices.get(key)
            .cloned()
            .ok_or_else(|| WalsError::UnknownKey { key: key.to_owned() })
    }

    pub fn reverse(&self, index: u32) -> Result<&str> {
        self.keys.get(index as usize)
            .map(|key| key.as_str())
            .ok_or(WalsError::UnknownIndex { index })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

/// Independent mappers for the user and the item axis, plus basic statistics of the input.
#[derive(Clone, Debug, Default)]
pub struct DataDictionary {
    users: IdMapper,
    items: IdMapper,
    num_interactions: u64,
}

impl DataDictionary {

    pub fn new() -> Self {
        DataDictionary { users: IdMapper::new(), items: IdMapper::new(), num_interactions: 0 }
    }

    /// Assigns indices to the user and item of a raw interaction and returns them.
    pub fn observe(&mut self, user: &str, item: &str) -> (u32, u32) {
        self.num_interactions += 1;
        (self.users.assign(user), self.items.assign(item))
    }

    pub fn num_users(&self) -> usize {
        self.users.len()
    }

    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    pub fn num_interactions(&self) -> u64 {
        self.num_interactions
    }

    pub fn users(&self) -> &IdMapper {
        &self.users
    }

    pub fn items(&self) -> &IdMapper {
        &self.items
    }
}
