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
//! Requests and responses of the IPAM plugin protocol.
//!
//! Field names follow the JSON encoding used by the Docker daemon. Fields the
//! daemon may omit or send as `null` fall back to their default.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Name of the plugin interface implemented by this driver.
pub const IPAM_DRIVER_INTERFACE: &str = "IpamDriver";

/// Handshake response of `Plugin.Activate`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ActivateResponse {
    /// Plugin interfaces implemented.
    pub implements: Vec<String>,
}

impl Default for ActivateResponse {
    fn default() -> Self {
        Self {
            implements: vec![IPAM_DRIVER_INTERFACE.to_string()],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CapabilitiesResponse {
    /// Whether the driver needs the MAC address of an endpoint to allocate its address.
    #[serde(rename = "RequiresMACAddress")]
    pub requires_mac_address: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct AddressSpacesResponse {
    pub local_default_address_space: String,
    pub global_default_address_space: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct RequestPoolRequest {
    /// Address space the pool belongs to.
    #[serde(default, deserialize_with = "null_as_default")]
    pub address_space: String,
    /// The CIDR of the pool.
    #[serde(default, deserialize_with = "null_as_default")]
    pub pool: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sub_pool: String,
    /// Driver options, see [crate::options].
    #[serde(default, deserialize_with = "null_as_default")]
    pub options: HashMap<String, String>,
    /// Whether an IPv6 pool is requested.
    #[serde(default, rename = "V6", deserialize_with = "null_as_default")]
    pub v6: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct RequestPoolResponse {
    /// Identifier of the created pool, equal to its CIDR.
    #[serde(rename = "PoolID")]
    pub pool_id: String,
    pub pool: String,
    pub data: HashMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ReleasePoolRequest {
    #[serde(rename = "PoolID", default, deserialize_with = "null_as_default")]
    pub pool_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct RequestAddressRequest {
    #[serde(rename = "PoolID", default, deserialize_with = "null_as_default")]
    pub pool_id: String,
    /// Explicitly requested address, empty if the driver should choose.
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    /// Driver options, see [crate::options].
    #[serde(default, deserialize_with = "null_as_default")]
    pub options: HashMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct RequestAddressResponse {
    /// The address in CIDR notation.
    pub address: String,
    pub data: HashMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ReleaseAddressRequest {
    #[serde(rename = "PoolID", default, deserialize_with = "null_as_default")]
    pub pool_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
}

/// Body of operations that only signal success.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct EmptyResponse {}

/// Body of a failed operation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    #[serde(rename = "Err")]
    pub err: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
