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
//! Pre-registered gateway addresses.

use std::{
    collections::HashMap,
    net::IpAddr,
    sync::{PoisonError, RwLock},
};

/// Maps pool identifiers to a gateway address registered at pool creation.
///
/// A pool has at most one gateway. Looking it up does not consume it.
#[derive(Debug, Default)]
pub struct GatewayOverrideTable {
    gateways: RwLock<HashMap<String, IpAddr>>,
}

impl GatewayOverrideTable {
    /// Creates an empty gateway table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `gateway` for the pool `id`, returning the previous gateway.
    pub fn register(&self, id: impl Into<String>, gateway: IpAddr) -> Option<IpAddr> {
        self.gateways
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.into(), gateway)
    }

    /// The gateway registered for the pool `id`.
    pub fn get(&self, id: &str) -> Option<IpAddr> {
        self.gateways
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .copied()
    }

    pub fn remove(&self, id: &str) -> Option<IpAddr> {
        self.gateways
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    pub fn len(&self) -> usize {
        self.gateways
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
