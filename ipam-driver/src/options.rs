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
//! Option keys understood by the driver.

use std::collections::HashMap;

/// Option carrying the type of a requested address.
pub const REQUEST_ADDRESS_TYPE: &str = "RequestAddressType";
/// Value of [REQUEST_ADDRESS_TYPE] when the network gateway is requested.
pub const GATEWAY_ADDRESS_TYPE: &str = "com.docker.network.gateway";
/// Option requesting the next free address of the pool, set to `true`.
pub const SERIAL_ALLOCATION: &str = "com.docker.network.ipam.serial";
/// IPv6 subnet of a dual-stack pool.
pub const V6_SUBNET: &str = "v6subnet";
/// IPv6 gateway of a dual-stack pool.
pub const V6_GATEWAY: &str = "v6gateway";

/// What a request without an explicit address asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressIntent {
    /// The address of the network gateway.
    Gateway,
    /// The next free address of the pool.
    Serial,
    /// Neither, the request can not be served without an address.
    Unspecified,
}

impl AddressIntent {
    /// Reads the intent from request options. Gateway requests take precedence.
    pub fn from_options(options: &HashMap<String, String>) -> Self {
        if option(options, REQUEST_ADDRESS_TYPE) == Some(GATEWAY_ADDRESS_TYPE) {
            AddressIntent::Gateway
        } else if option(options, SERIAL_ALLOCATION) == Some("true") {
            AddressIntent::Serial
        } else {
            AddressIntent::Unspecified
        }
    }
}

/// Returns the non-empty value of `key`.
pub fn option<'a>(options: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    options
        .get(key)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}
