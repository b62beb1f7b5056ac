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
//! Static address policy.
//!
//! Nothing is tracked: pools are only validated and echoed back, and addresses
//! must be given explicitly by the caller. Returned addresses always carry the
//! fixed [STATIC_PREFIX_LEN], the pool's own mask is never consulted.

use std::collections::HashMap;

use crate::{
    driver::{IpamDriver, IpamError, parse_address, parse_subnet},
    model::{
        CapabilitiesResponse, ReleaseAddressRequest, ReleasePoolRequest, RequestAddressRequest,
        RequestAddressResponse, RequestPoolRequest, RequestPoolResponse,
    },
};

/// Prefix length appended to every returned address.
pub const STATIC_PREFIX_LEN: u8 = 24;

/// Driver that only hands out explicitly requested addresses.
#[derive(Debug, Default)]
pub struct StaticDriver;

impl StaticDriver {
    pub fn new() -> Self {
        Self
    }
}

impl IpamDriver for StaticDriver {
    fn get_capabilities(&self) -> CapabilitiesResponse {
        CapabilitiesResponse {
            requires_mac_address: false,
        }
    }

    fn request_pool(&self, request: RequestPoolRequest) -> Result<RequestPoolResponse, IpamError> {
        tracing::info!(pool=%request.pool, "Pool requested");
        parse_subnet(&request.pool)?;

        Ok(RequestPoolResponse {
            pool_id: request.pool.clone(),
            pool: request.pool,
            data: HashMap::new(),
        })
    }

    fn release_pool(&self, request: ReleasePoolRequest) -> Result<(), IpamError> {
        tracing::info!(pool=%request.pool_id, "Released pool");
        Ok(())
    }

    fn request_address(
        &self,
        request: RequestAddressRequest,
    ) -> Result<RequestAddressResponse, IpamError> {
        if request.address.is_empty() {
            return Err(IpamError::invalid("address required"));
        }
        let address = parse_address(&request.address)?;
        tracing::info!(pool=%request.pool_id, %address, "Assigned static address");

        Ok(RequestAddressResponse {
            address: format!("{address}/{STATIC_PREFIX_LEN}"),
            data: HashMap::new(),
        })
    }

    fn release_address(&self, request: ReleaseAddressRequest) -> Result<(), IpamError> {
        tracing::debug!(pool=%request.pool_id, address=%request.address, "Released static address");
        Ok(())
    }
}
