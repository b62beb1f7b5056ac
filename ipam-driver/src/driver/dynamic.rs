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
//! Dynamic allocation policy.
//!
//! Pools are tracked per CIDR and addresses are handed out with the sequential
//! scan of [address_manager::allocator]. Creating an IPv4 pool reserves its
//! network address right away, so the first requested address (usually the
//! gateway) is the first host address.

use std::collections::HashMap;

use address_manager::{
    pool::{Pool, SharedPool},
    table::PoolTable,
};
use ipnet::IpNet;

use crate::{
    driver::{IpamDriver, IpamError, parse_address, parse_subnet},
    model::{
        CapabilitiesResponse, ReleaseAddressRequest, ReleasePoolRequest, RequestAddressRequest,
        RequestAddressResponse, RequestPoolRequest, RequestPoolResponse,
    },
    options::AddressIntent,
};

/// Driver allocating addresses sequentially from tracked pools.
#[derive(Debug, Default)]
pub struct DynamicDriver {
    pools: PoolTable,
}

impl DynamicDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pools registered with this driver.
    pub fn pools(&self) -> &PoolTable {
        &self.pools
    }

    /// Builds a new pool for `prefix`.
    ///
    /// The network address of an IPv4 prefix with host bits is allocated
    /// immediately. IPv6 and single-address pools start empty.
    fn new_pool(prefix: IpNet) -> Result<Pool, IpamError> {
        let mut pool = Pool::new(prefix);
        if !pool.is_ipv6() && pool.has_host_bits() {
            let reserved = pool.allocate_next()?;
            tracing::debug!(pool=%prefix, address=%reserved, "Reserved network address");
        }
        Ok(pool)
    }

    /// Serves an address request against an already resolved pool.
    pub(crate) fn address_from_pool(
        pool_id: &str,
        pool: &SharedPool,
        address: &str,
        options: &HashMap<String, String>,
    ) -> Result<RequestAddressResponse, IpamError> {
        if !address.is_empty() {
            let address = parse_address(address)?;
            return Ok(response(pool.lock().with_prefix_len(address)));
        }

        match AddressIntent::from_options(options) {
            AddressIntent::Gateway | AddressIntent::Serial => {
                let mut pool = pool.lock();
                let address = pool.allocate_next()?;
                tracing::info!(pool=%pool_id, %address, "Allocated address");
                Ok(response(pool.with_prefix_len(address)))
            }
            AddressIntent::Unspecified => Err(IpamError::invalid("address required")),
        }
    }
}

fn response(address: String) -> RequestAddressResponse {
    RequestAddressResponse {
        address,
        data: HashMap::new(),
    }
}

impl IpamDriver for DynamicDriver {
    fn get_capabilities(&self) -> CapabilitiesResponse {
        CapabilitiesResponse {
            requires_mac_address: false,
        }
    }

    fn request_pool(&self, request: RequestPoolRequest) -> Result<RequestPoolResponse, IpamError> {
        tracing::info!(pool=%request.pool, v6=request.v6, "Pool requested");

        let prefix = parse_subnet(&request.pool)?;
        let pool = Self::new_pool(prefix)?;
        self.pools.insert(request.pool.clone(), pool);

        Ok(RequestPoolResponse {
            pool_id: request.pool.clone(),
            pool: request.pool,
            data: HashMap::new(),
        })
    }

    fn release_pool(&self, request: ReleasePoolRequest) -> Result<(), IpamError> {
        match self.pools.remove(&request.pool_id) {
            Some(pool) => {
                tracing::info!(pool=%request.pool_id, allocations=%pool.lock(), "Released pool")
            }
            None => tracing::debug!(pool=%request.pool_id, "Release of unknown pool ignored"),
        }
        Ok(())
    }

    fn request_address(
        &self,
        request: RequestAddressRequest,
    ) -> Result<RequestAddressResponse, IpamError> {
        let pool = self
            .pools
            .get(&request.pool_id)
            .ok_or_else(|| IpamError::pool_not_found(&request.pool_id))?;

        Self::address_from_pool(&request.pool_id, &pool, &request.address, &request.options)
    }

    fn release_address(&self, request: ReleaseAddressRequest) -> Result<(), IpamError> {
        let Some(pool) = self.pools.get(&request.pool_id) else {
            tracing::debug!(pool=%request.pool_id, "Address release for unknown pool ignored");
            return Ok(());
        };
        let Ok(address) = parse_address(&request.address) else {
            tracing::debug!(pool=%request.pool_id, address=%request.address, "Release of malformed address ignored");
            return Ok(());
        };

        if pool.lock().release(&address) {
            tracing::info!(pool=%request.pool_id, %address, "Released address");
        }
        Ok(())
    }
}
