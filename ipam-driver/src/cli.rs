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

use std::path::PathBuf;

use clap::{Args, Parser};

use crate::{driver::DriverKind, runtime::DEFAULT_SOCKET_PATH};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Opts {
    /// Address allocation policy.
    #[arg(long, env = "IPAM_DRIVER", value_enum, default_value_t = DriverKind::Dynamic)]
    pub driver: DriverKind,

    /// Unix socket to serve the plugin API on.
    #[arg(long, env = "IPAM_SOCKET", default_value = DEFAULT_SOCKET_PATH)]
    pub socket: PathBuf,

    /// Logging options
    #[command(flatten)]
    pub logging: LoggingOptions,
}

#[derive(Debug, Args)]
pub struct LoggingOptions {
    /// Log plugin output to stderr.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub stderr: bool,

    /// Directory for the plugin log.
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}
