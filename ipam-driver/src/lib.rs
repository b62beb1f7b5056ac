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
//! # IPAM Driver
//!
//! A Docker remote IPAM plugin. Networks are backed by address pools that are
//! identified by their CIDR string.
//!
//! The [driver::IpamDriver] trait carries the six plugin operations. It is
//! implemented by three policies, selected at startup with
//! [driver::DriverKind]:
//!
//! * [driver::dynamic::DynamicDriver] hands out addresses with a sequential
//!   scan over each pool.
//! * [driver::static_address::StaticDriver] only echoes explicitly requested
//!   addresses.
//! * [driver::dual_stack::DualStackDriver] scans IPv4 pools and answers IPv6
//!   gateway requests from pre-registered gateways.
//!
//! [api] exposes a driver over the plugin HTTP protocol and [runtime] serves it
//! on a Unix socket.

pub mod api;
pub mod cli;
pub mod driver;
pub mod model;
pub mod options;
pub mod runtime;
