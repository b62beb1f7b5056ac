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
//! Dual-stack policy.
//!
//! IPv4 pools behave exactly as in [DynamicDriver]. IPv6 pools are created from
//! the `v6subnet` and `v6gateway` options and never allocate: the registered
//! gateway is the only address they hand out on their own.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use address_manager::{gateway::GatewayOverrideTable, pool::Pool};
use ipnet::IpNet;

use crate::{
    driver::{IpamDriver, IpamError, dynamic::DynamicDriver, parse_address, parse_subnet},
    model::{
        CapabilitiesResponse, ReleaseAddressRequest, ReleasePoolRequest, RequestAddressRequest,
        RequestAddressResponse, RequestPoolRequest, RequestPoolResponse,
    },
    options::{AddressIntent, V6_GATEWAY, V6_SUBNET, option},
};

/// Driver combining dynamic IPv4 pools with gateway-only IPv6 pools.
#[derive(Debug, Default)]
pub struct DualStackDriver {
    dynamic: DynamicDriver,
    gateways: GatewayOverrideTable,
    /// Held while pools and gateways are added or removed, so both tables
    /// always change together.
    lifecycle: Mutex<()>,
}

impl DualStackDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateways registered for IPv6 pools.
    pub fn gateways(&self) -> &GatewayOverrideTable {
        &self.gateways
    }

    /// The pools of both families.
    pub fn pools(&self) -> &address_manager::table::PoolTable {
        self.dynamic.pools()
    }

    fn lock_lifecycle(&self) -> MutexGuard<'_, ()> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn request_v6_pool(
        &self,
        options: &HashMap<String, String>,
    ) -> Result<RequestPoolResponse, IpamError> {
        let subnet = option(options, V6_SUBNET)
            .ok_or_else(|| IpamError::invalid(format!("{V6_SUBNET} option required")))?;
        let gateway = option(options, V6_GATEWAY)
            .ok_or_else(|| IpamError::invalid(format!("{V6_GATEWAY} option required")))?;

        let prefix = parse_subnet(subnet)?;
        if !matches!(prefix, IpNet::V6(_)) {
            return Err(IpamError::invalid(format!(
                "{V6_SUBNET} {subnet} is not an IPv6 subnet"
            )));
        }
        let gateway = parse_address(gateway)?;
        if !prefix.contains(&gateway) {
            return Err(IpamError::invalid(format!(
                "{V6_GATEWAY} {gateway} not in {prefix}"
            )));
        }

        let _lifecycle = self.lock_lifecycle();
        self.gateways.register(subnet, gateway);
        self.dynamic.pools().insert(subnet, Pool::new(prefix));
        tracing::info!(pool=%subnet, %gateway, "Registered IPv6 pool");

        Ok(RequestPoolResponse {
            pool_id: subnet.to_string(),
            pool: subnet.to_string(),
            data: HashMap::new(),
        })
    }
}

impl IpamDriver for DualStackDriver {
    fn get_capabilities(&self) -> CapabilitiesResponse {
        CapabilitiesResponse {
            requires_mac_address: false,
        }
    }

    fn request_pool(&self, request: RequestPoolRequest) -> Result<RequestPoolResponse, IpamError> {
        if request.v6 {
            tracing::info!(options=?request.options, "IPv6 pool requested");
            self.request_v6_pool(&request.options)
        } else {
            let _lifecycle = self.lock_lifecycle();
            let response = self.dynamic.request_pool(request)?;
            // An IPv4 pool replacing an IPv6 pool of the same id has no gateway.
            self.gateways.remove(&response.pool_id);
            Ok(response)
        }
    }

    fn release_pool(&self, request: ReleasePoolRequest) -> Result<(), IpamError> {
        let _lifecycle = self.lock_lifecycle();
        if self.gateways.remove(&request.pool_id).is_some() {
            tracing::debug!(pool=%request.pool_id, "Removed IPv6 gateway");
        }
        self.dynamic.release_pool(request)
    }

    fn request_address(
        &self,
        request: RequestAddressRequest,
    ) -> Result<RequestAddressResponse, IpamError> {
        let pool = self
            .dynamic
            .pools()
            .get(&request.pool_id)
            .ok_or_else(|| IpamError::pool_not_found(&request.pool_id))?;

        if !pool.lock().is_ipv6() {
            return DynamicDriver::address_from_pool(
                &request.pool_id,
                &pool,
                &request.address,
                &request.options,
            );
        }

        let address = if !request.address.is_empty() {
            parse_address(&request.address)?
        } else {
            match AddressIntent::from_options(&request.options) {
                AddressIntent::Gateway => self
                    .gateways
                    .get(&request.pool_id)
                    .ok_or_else(|| IpamError::pool_not_found(&request.pool_id))?,
                AddressIntent::Serial | AddressIntent::Unspecified => {
                    return Err(IpamError::invalid("IPv6 address required"));
                }
            }
        };
        tracing::info!(pool=%request.pool_id, %address, "Assigned IPv6 address");

        Ok(RequestAddressResponse {
            address: pool.lock().with_prefix_len(address),
            data: HashMap::new(),
        })
    }

    fn release_address(&self, request: ReleaseAddressRequest) -> Result<(), IpamError> {
        self.dynamic.release_address(request)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::options::{GATEWAY_ADDRESS_TYPE, REQUEST_ADDRESS_TYPE, SERIAL_ALLOCATION};

    const SUBNET: &str = "2001:db8:1::/64";
    const GATEWAY: &str = "2001:db8:1::1";

    fn v6_pool_request(subnet: &str, gateway: &str) -> RequestPoolRequest {
        RequestPoolRequest {
            v6: true,
            options: HashMap::from([
                (V6_SUBNET.to_string(), subnet.to_string()),
                (V6_GATEWAY.to_string(), gateway.to_string()),
            ]),
            ..Default::default()
        }
    }

    fn address_request(pool: &str, key: &str, value: &str) -> RequestAddressRequest {
        RequestAddressRequest {
            pool_id: pool.to_string(),
            options: HashMap::from([(key.to_string(), value.to_string())]),
            ..Default::default()
        }
    }

    fn gateway_request(pool: &str) -> RequestAddressRequest {
        address_request(pool, REQUEST_ADDRESS_TYPE, GATEWAY_ADDRESS_TYPE)
    }

    #[test]
    fn ipv6_pool_is_keyed_by_subnet() {
        let driver = DualStackDriver::new();
        let response = driver.request_pool(v6_pool_request(SUBNET, GATEWAY)).unwrap();

        assert_eq!(response.pool_id, SUBNET);
        assert_eq!(response.pool, SUBNET);
        assert!(driver.pools().contains(SUBNET));
        assert_eq!(driver.gateways().get(SUBNET), Some(GATEWAY.parse().unwrap()));
    }

    #[test]
    fn ipv6_pool_requires_both_options() {
        let driver = DualStackDriver::new();

        for request in [
            v6_pool_request("", GATEWAY),
            v6_pool_request(SUBNET, ""),
            RequestPoolRequest {
                v6: true,
                ..Default::default()
            },
        ] {
            let err = driver.request_pool(request).expect_err("must fail");
            assert!(matches!(err, IpamError::InvalidArgument(_)), "{err}");
        }
        assert!(driver.pools().is_empty());
        assert!(driver.gateways().is_empty());
    }

    #[test]
    fn ipv6_pool_rejects_malformed_options() {
        let driver = DualStackDriver::new();

        for request in [
            v6_pool_request("10.0.0.0/24", "10.0.0.1"),
            v6_pool_request(SUBNET, "2001:db8:2::1"),
            v6_pool_request(SUBNET, "not-an-address"),
        ] {
            let err = driver.request_pool(request).expect_err("must fail");
            assert!(matches!(err, IpamError::InvalidArgument(_)), "{err}");
        }
        assert!(driver.pools().is_empty());
        assert!(driver.gateways().is_empty());
    }

    #[test]
    fn gateway_is_returned_every_time() {
        let driver = DualStackDriver::new();
        driver.request_pool(v6_pool_request(SUBNET, GATEWAY)).unwrap();

        for _ in 0..3 {
            let response = driver.request_address(gateway_request(SUBNET)).unwrap();
            assert_eq!(response.address, format!("{GATEWAY}/64"));
        }
        assert!(driver.pools().get(SUBNET).unwrap().lock().is_empty());
    }

    #[test]
    fn ipv6_pools_never_scan() {
        let driver = DualStackDriver::new();
        driver.request_pool(v6_pool_request(SUBNET, GATEWAY)).unwrap();

        for request in [
            address_request(SUBNET, SERIAL_ALLOCATION, "true"),
            RequestAddressRequest {
                pool_id: SUBNET.to_string(),
                ..Default::default()
            },
        ] {
            assert_eq!(
                driver.request_address(request),
                Err(IpamError::InvalidArgument("IPv6 address required".to_string()))
            );
        }
    }

    #[test]
    fn explicit_ipv6_address_is_returned() {
        let driver = DualStackDriver::new();
        driver.request_pool(v6_pool_request(SUBNET, GATEWAY)).unwrap();

        let response = driver
            .request_address(RequestAddressRequest {
                pool_id: SUBNET.to_string(),
                address: "2001:db8:1::42".to_string(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(response.address, "2001:db8:1::42/64");
    }

    #[test]
    fn ipv6_pool_without_gateway_is_not_found() {
        let driver = DualStackDriver::new();
        // Registered through the IPv4 path, so no gateway is known.
        driver
            .request_pool(RequestPoolRequest {
                pool: SUBNET.to_string(),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(
            driver.request_address(gateway_request(SUBNET)),
            Err(IpamError::NotFound(format!("pool {SUBNET} not registered")))
        );
    }

    #[test]
    fn release_pool_drops_gateway() {
        let driver = DualStackDriver::new();
        driver.request_pool(v6_pool_request(SUBNET, GATEWAY)).unwrap();

        driver
            .release_pool(ReleasePoolRequest {
                pool_id: SUBNET.to_string(),
            })
            .unwrap();
        assert!(driver.gateways().is_empty());
        assert!(matches!(
            driver.request_address(gateway_request(SUBNET)),
            Err(IpamError::NotFound(_))
        ));
    }

    #[test]
    fn ipv4_pools_allocate_dynamically() {
        let driver = DualStackDriver::new();
        driver
            .request_pool(RequestPoolRequest {
                pool: "10.0.0.0/24".to_string(),
                ..Default::default()
            })
            .unwrap();

        let gw = driver.request_address(gateway_request("10.0.0.0/24")).unwrap();
        assert_eq!(gw.address, "10.0.0.1/24");
        let next = driver
            .request_address(address_request("10.0.0.0/24", SERIAL_ALLOCATION, "true"))
            .unwrap();
        assert_eq!(next.address, "10.0.0.2/24");

        driver
            .release_address(ReleaseAddressRequest {
                pool_id: "10.0.0.0/24".to_string(),
                address: "10.0.0.1".to_string(),
            })
            .unwrap();
        let reused = driver
            .request_address(address_request("10.0.0.0/24", SERIAL_ALLOCATION, "true"))
            .unwrap();
        assert_eq!(reused.address, "10.0.0.1/24");
    }

    #[test]
    fn concurrent_create_and_release_keep_tables_in_sync() {
        let driver = DualStackDriver::new();

        for _ in 0..2_000 {
            thread::scope(|s| {
                s.spawn(|| {
                    driver
                        .request_pool(v6_pool_request(SUBNET, GATEWAY))
                        .expect("pool created");
                });
                s.spawn(|| {
                    driver
                        .release_pool(ReleasePoolRequest {
                            pool_id: SUBNET.to_string(),
                        })
                        .expect("pool released");
                });
            });

            assert_eq!(
                driver.pools().contains(SUBNET),
                driver.gateways().get(SUBNET).is_some()
            );
            if driver.pools().contains(SUBNET) {
                let gw = driver.request_address(gateway_request(SUBNET)).unwrap();
                assert_eq!(gw.address, format!("{GATEWAY}/64"));
            }
        }
    }

    #[test]
    fn ipv4_pool_replacing_ipv6_pool_drops_gateway() {
        let driver = DualStackDriver::new();
        driver.request_pool(v6_pool_request(SUBNET, GATEWAY)).unwrap();

        driver
            .request_pool(RequestPoolRequest {
                pool: SUBNET.to_string(),
                ..Default::default()
            })
            .unwrap();
        assert!(driver.pools().contains(SUBNET));
        assert!(driver.gateways().get(SUBNET).is_none());
    }
}
