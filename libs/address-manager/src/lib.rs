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
//! # Address Manager
//!
//! Manage pools of IP addresses.
//!
//! A [pool::Pool] tracks the allocated addresses of a single CIDR. Pools are
//! kept in a [table::PoolTable], keyed by their CIDR string. Free addresses are
//! found by the sequential scan in [allocator], which works the same way for
//! IPv4 and IPv6.
//!
//! IPv6 networks whose gateway is known up front are served from a
//! [gateway::GatewayOverrideTable] instead of the allocator.

pub mod allocator;
pub mod gateway;
pub mod pool;
pub mod table;
