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

use anyhow::Context;
use clap::Parser;
use ipam_driver::{
    cli::Opts,
    runtime::{IpamRuntimeBuilder, cancel_on_signal},
};
use ipam_observability::setup_tracing;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();
    let _guards = setup_tracing(opts.logging.log_dir.as_ref(), opts.logging.stderr)
        .context("failed to set up logging")?;

    tracing::info!(driver=%opts.driver, socket=%opts.socket.display(), "Starting IPAM plugin");

    let cancellation_token = CancellationToken::new();
    cancel_on_signal(cancellation_token.clone()).context("failed to register signal handler")?;

    let runtime = IpamRuntimeBuilder::new()
        .with_driver_kind(opts.driver)
        .with_socket_path(&opts.socket)
        .start(cancellation_token)
        .await
        .context("failed to start IPAM plugin")?;

    runtime.join().await.context("IPAM plugin stopped with an error")?;
    tracing::info!("IPAM plugin stopped");
    Ok(())
}
