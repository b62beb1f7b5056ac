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
//! Allocation state of a single address pool.

use std::{
    collections::BTreeSet,
    fmt,
    net::IpAddr,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use ipnet::IpNet;

use crate::allocator::{self, AllocatorError};

/// The allocated addresses of one CIDR.
///
/// Every address in the allocated set lies within the pool's prefix.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct Pool {
    prefix: IpNet,
    allocated: BTreeSet<IpAddr>,
}

impl Pool {
    /// Creates an empty pool for `prefix`.
    pub fn new(prefix: IpNet) -> Self {
        Self {
            prefix,
            allocated: BTreeSet::new(),
        }
    }

    /// The prefix the pool allocates from.
    pub fn prefix(&self) -> IpNet {
        self.prefix
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix.prefix_len()
    }

    pub fn is_ipv6(&self) -> bool {
        matches!(self.prefix, IpNet::V6(_))
    }

    /// Returns true if the prefix has at least one host bit, i.e. it contains
    /// more than a single address.
    pub fn has_host_bits(&self) -> bool {
        self.prefix.prefix_len() < self.prefix.max_prefix_len()
    }

    /// Reserves and returns the lowest free address.
    pub fn allocate_next(&mut self) -> Result<IpAddr, AllocatorError> {
        allocator::allocate_next(&self.prefix, &mut self.allocated)
    }

    /// Returns `address` to the pool.
    ///
    /// Returns `true` if the address was allocated.
    pub fn release(&mut self, address: &IpAddr) -> bool {
        self.allocated.remove(address)
    }

    pub fn is_allocated(&self, address: &IpAddr) -> bool {
        self.allocated.contains(address)
    }

    pub fn len(&self) -> usize {
        self.allocated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocated.is_empty()
    }

    /// Formats `address` in CIDR notation with the pool's prefix length.
    pub fn with_prefix_len(&self, address: IpAddr) -> String {
        format!("{address}/{}", self.prefix_len())
    }
}

impl fmt::Display for Pool {
    // Format the pool as prefix[allocated, allocated, ...]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.prefix)?;
        for (i, address) in self.allocated.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{address}")?;
        }
        write!(f, "]")
    }
}

/// A pool shared between concurrent requests.
///
/// All access goes through [SharedPool::lock], which makes a find-then-reserve
/// sequence on the pool atomic.
#[derive(Debug, Clone)]
pub struct SharedPool(Arc<Mutex<Pool>>);

impl SharedPool {
    pub fn new(pool: Pool) -> Self {
        Self(Arc::new(Mutex::new(pool)))
    }

    /// Locks the pool for exclusive access.
    ///
    /// A panic while holding the lock can not leave the pool inconsistent, so a
    /// poisoned lock is recovered.
    pub fn lock(&self) -> MutexGuard<'_, Pool> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl From<Pool> for SharedPool {
    fn from(pool: Pool) -> Self {
        Self::new(pool)
    }
}
