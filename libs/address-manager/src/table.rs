// Copyright 2025 Anapaya Systems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Registry of address pools.

use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use crate::pool::{Pool, SharedPool};

/// Maps pool identifiers to pools.
///
/// The table lock only guards insertion and removal of whole pools. Allocation
/// state is guarded by each pool's own lock, so requests against different
/// pools never wait on each other.
#[derive(Debug, Default)]
pub struct PoolTable {
    pools: RwLock<HashMap<String, SharedPool>>,
}

impl PoolTable {
    /// Creates an empty pool table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `pool` under `id`.
    ///
    /// An existing pool with the same id is replaced and returned.
    pub fn insert(&self, id: impl Into<String>, pool: Pool) -> Option<SharedPool> {
        let id = id.into();
        let replaced = self
            .pools
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), pool.into());
        if replaced.is_some() {
            tracing::debug!(pool=%id, "Replaced existing pool");
        }
        replaced
    }

    /// Returns a handle to the pool registered under `id`.
    pub fn get(&self, id: &str) -> Option<SharedPool> {
        self.pools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Removes the pool registered under `id` together with all its allocations.
    pub fn remove(&self, id: &str) -> Option<SharedPool> {
        self.pools
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.pools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.pools.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, net::IpAddr, str::FromStr, thread};

    use ipnet::IpNet;

    use super::*;

    fn pool(prefix: &str) -> Pool {
        Pool::new(IpNet::from_str(prefix).unwrap())
    }

    #[test]
    fn insert_get_remove() {
        let table = PoolTable::new();
        assert!(table.is_empty());

        assert!(table.insert("10.0.0.0/24", pool("10.0.0.0/24")).is_none());
        assert!(table.contains("10.0.0.0/24"));
        assert_eq!(table.len(), 1);

        let shared = table.get("10.0.0.0/24").expect("pool registered");
        assert_eq!(shared.lock().prefix(), IpNet::from_str("10.0.0.0/24").unwrap());

        assert!(table.remove("10.0.0.0/24").is_some());
        assert!(table.get("10.0.0.0/24").is_none());
        assert!(table.remove("10.0.0.0/24").is_none());
    }

    #[test]
    fn insert_replaces_existing_pool() {
        let table = PoolTable::new();
        table.insert("10.0.0.0/24", pool("10.0.0.0/24"));
        let first = table.get("10.0.0.0/24").unwrap();
        first.lock().allocate_next().unwrap();

        let replaced = table
            .insert("10.0.0.0/24", pool("10.0.0.0/24"))
            .expect("pool replaced");
        assert_eq!(replaced.lock().len(), 1);
        assert_eq!(first.lock().to_string(), replaced.lock().to_string());
        assert!(table.get("10.0.0.0/24").unwrap().lock().is_empty());
    }

    #[test]
    fn concurrent_allocations_never_collide() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 30;

        let table = PoolTable::new();
        table.insert("10.0.0.0/24", pool("10.0.0.0/24"));

        let results: Vec<IpAddr> = thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        (0..PER_THREAD)
                            .map(|_| {
                                let pool = table.get("10.0.0.0/24").unwrap();
                                pool.lock().allocate_next().expect("Failed to allocate")
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });

        let unique: HashSet<_> = results.iter().collect();
        assert_eq!(unique.len(), THREADS * PER_THREAD);
        assert_eq!(table.get("10.0.0.0/24").unwrap().lock().len(), THREADS * PER_THREAD);
    }
}
