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
//! The IPAM driver interface and its policies.

use std::{fmt, net::IpAddr, sync::Arc};

use address_manager::allocator::AllocatorError;
use ipnet::IpNet;
use thiserror::Error;

use crate::model::{
    AddressSpacesResponse, CapabilitiesResponse, ReleaseAddressRequest, ReleasePoolRequest,
    RequestAddressRequest, RequestAddressResponse, RequestPoolRequest, RequestPoolResponse,
};

pub mod dual_stack;
pub mod dynamic;
pub mod static_address;

/// Name of the default local address space.
pub const LOCAL_ADDRESS_SPACE: &str = "local";
/// Name of the default global address space.
pub const GLOBAL_ADDRESS_SPACE: &str = "global";

/// Driver errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IpamError {
    /// A required field is missing or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The request refers to an unregistered pool or gateway.
    #[error("not found: {0}")]
    NotFound(String),
    /// The pool has no free address left.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(#[from] AllocatorError),
}

impl IpamError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        IpamError::InvalidArgument(msg.into())
    }

    pub(crate) fn pool_not_found(pool_id: &str) -> Self {
        IpamError::NotFound(format!("pool {pool_id} not registered"))
    }
}

/// The operations of an IPAM plugin.
///
/// Every operation is a fast in-memory computation and may be called
/// concurrently.
pub trait IpamDriver: fmt::Debug + Send + Sync {
    fn get_capabilities(&self) -> CapabilitiesResponse;

    fn get_default_address_spaces(&self) -> AddressSpacesResponse {
        AddressSpacesResponse {
            local_default_address_space: LOCAL_ADDRESS_SPACE.to_string(),
            global_default_address_space: GLOBAL_ADDRESS_SPACE.to_string(),
        }
    }

    /// Creates a pool. The pool id is the CIDR of the pool.
    fn request_pool(&self, request: RequestPoolRequest) -> Result<RequestPoolResponse, IpamError>;

    /// Removes a pool and all its allocations. Unknown pools are ignored.
    fn release_pool(&self, request: ReleasePoolRequest) -> Result<(), IpamError>;

    /// Hands out an address of a pool, in CIDR notation.
    fn request_address(
        &self,
        request: RequestAddressRequest,
    ) -> Result<RequestAddressResponse, IpamError>;

    /// Returns an address to its pool. Unknown pools and addresses are ignored.
    fn release_address(&self, request: ReleaseAddressRequest) -> Result<(), IpamError>;
}

/// The available driver policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DriverKind {
    /// Track pools and allocate addresses sequentially.
    #[default]
    Dynamic,
    /// Only hand out explicitly requested addresses, nothing is tracked.
    Static,
    /// Like `dynamic` for IPv4; IPv6 pools only answer with their registered gateway.
    DualStack,
}

impl DriverKind {
    /// Creates a fresh driver of this kind with empty state.
    pub fn build(self) -> Arc<dyn IpamDriver> {
        match self {
            DriverKind::Dynamic => Arc::new(dynamic::DynamicDriver::new()),
            DriverKind::Static => Arc::new(static_address::StaticDriver::new()),
            DriverKind::DualStack => Arc::new(dual_stack::DualStackDriver::new()),
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverKind::Dynamic => write!(f, "dynamic"),
            DriverKind::Static => write!(f, "static"),
            DriverKind::DualStack => write!(f, "dual-stack"),
        }
    }
}

/// Parses the CIDR of a pool.
pub(crate) fn parse_subnet(subnet: &str) -> Result<IpNet, IpamError> {
    if subnet.is_empty() {
        return Err(IpamError::invalid("subnet required"));
    }
    subnet
        .parse()
        .map_err(|e| IpamError::invalid(format!("invalid subnet {subnet}: {e}")))
}

/// Parses an address given either plain or in CIDR notation.
pub(crate) fn parse_address(address: &str) -> Result<IpAddr, IpamError> {
    let plain = address.split_once('/').map_or(address, |(addr, _)| addr);
    plain
        .parse()
        .map_err(|e| IpamError::invalid(format!("invalid address {address}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subnets() {
        assert_eq!(
            parse_subnet("10.0.0.0/24"),
            Ok("10.0.0.0/24".parse().unwrap())
        );
        assert_eq!(
            parse_subnet(""),
            Err(IpamError::InvalidArgument("subnet required".to_string()))
        );
        assert!(matches!(
            parse_subnet("10.0.0.0"),
            Err(IpamError::InvalidArgument(_))
        ));
    }

    #[test]
    fn parses_plain_and_cidr_addresses() {
        let expected: IpAddr = "10.0.0.7".parse().unwrap();
        assert_eq!(parse_address("10.0.0.7"), Ok(expected));
        assert_eq!(parse_address("10.0.0.7/24"), Ok(expected));
        assert!(matches!(
            parse_address("10.0.0"),
            Err(IpamError::InvalidArgument(_))
        ));
    }

    #[test]
    fn every_kind_reports_fixed_address_spaces() {
        for kind in [DriverKind::Dynamic, DriverKind::Static, DriverKind::DualStack] {
            let spaces = kind.build().get_default_address_spaces();
            assert_eq!(spaces.local_default_address_space, "local");
            assert_eq!(spaces.global_default_address_space, "global");
            assert!(!kind.build().get_capabilities().requires_mac_address);
        }
    }

    #[test]
    fn exhaustion_is_a_distinct_error() {
        let prefix: IpNet = "10.0.0.0/32".parse().unwrap();
        let err: IpamError = AllocatorError::Exhausted(prefix).into();
        assert_eq!(err.to_string(), "resource exhausted: no free address left in 10.0.0.0/32");
    }
}
