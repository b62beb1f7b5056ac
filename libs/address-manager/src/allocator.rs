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
//! Sequential free-address allocator.
//!
//! The allocator is stateless: the caller owns the set of allocated addresses
//! and the allocator only scans it. Addresses are walked in ascending order
//! starting at the network address of the prefix, so the lowest free address is
//! always handed out first.
//!
//! Network and broadcast addresses are not skipped. Callers that want to keep
//! the network address out of circulation reserve it themselves.

use std::{
    collections::BTreeSet,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
};

use ipnet::IpNet;
use thiserror::Error;

/// Address allocation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocatorError {
    /// All addresses of the prefix are allocated.
    #[error("no free address left in {0}")]
    Exhausted(IpNet),
}

/// Increments a big-endian byte sequence by one.
///
/// The carry propagates from the last byte towards the first one, exactly as
/// unsigned integer addition. Returns `true` if the sequence wrapped around to
/// all zeros.
pub fn increment(octets: &mut [u8]) -> bool {
    for octet in octets.iter_mut().rev() {
        let (next, carry) = octet.overflowing_add(1);
        *octet = next;
        if !carry {
            return false;
        }
    }
    true
}

/// Returns the address following `addr`, or `None` if `addr` is the highest
/// address of its family.
pub fn next_addr(addr: IpAddr) -> Option<IpAddr> {
    match addr {
        IpAddr::V4(addr) => step(addr.octets()).map(|octets| Ipv4Addr::from(octets).into()),
        IpAddr::V6(addr) => step(addr.octets()).map(|octets| Ipv6Addr::from(octets).into()),
    }
}

fn step<const N: usize>(mut octets: [u8; N]) -> Option<[u8; N]> {
    (!increment(&mut octets)).then_some(octets)
}

/// Reserves the lowest address of `prefix` that is not in `allocated`.
///
/// The returned address is inserted into `allocated` before returning, so two
/// consecutive calls never return the same address.
pub fn allocate_next(
    prefix: &IpNet,
    allocated: &mut BTreeSet<IpAddr>,
) -> Result<IpAddr, AllocatorError> {
    let mut candidate = Some(prefix.network());
    while let Some(addr) = candidate.filter(|addr| prefix.contains(addr)) {
        if allocated.insert(addr) {
            return Ok(addr);
        }
        candidate = next_addr(addr);
    }
    Err(AllocatorError::Exhausted(*prefix))
}
