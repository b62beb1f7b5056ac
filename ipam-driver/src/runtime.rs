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
//! Plugin runtime serving a driver on a Unix socket.

use std::{
    io,
    os::unix::fs::FileTypeExt,
    path::{Path, PathBuf},
    sync::Arc,
};

use thiserror::Error;
use tokio::{
    net::UnixListener,
    signal::unix::{SignalKind, signal},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    api::build_plugin_api,
    driver::{DriverKind, IpamDriver},
};

/// Default socket path, discovered by the daemon through the plugin directory.
pub const DEFAULT_SOCKET_PATH: &str = "/run/docker/plugins/sdip.sock";

/// Runtime errors.
#[derive(Error, Debug)]
pub enum IpamRuntimeError {
    /// The plugin socket could not be bound.
    #[error("failed to bind plugin socket {path}: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

pub struct IpamRuntimeBuilder {
    driver: Option<Arc<dyn IpamDriver>>,
    driver_kind: DriverKind,
    socket_path: PathBuf,
}

impl Default for IpamRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl IpamRuntimeBuilder {
    /// Create a new runtime builder serving a dynamic driver on [DEFAULT_SOCKET_PATH].
    pub fn new() -> Self {
        Self {
            driver: None,
            driver_kind: DriverKind::default(),
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
        }
    }

    /// Serve a fresh driver of the given kind.
    pub fn with_driver_kind(mut self, kind: DriverKind) -> Self {
        self.driver_kind = kind;
        self
    }

    /// Serve an existing driver instance. Takes precedence over [Self::with_driver_kind].
    pub fn with_driver(mut self, driver: Arc<dyn IpamDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    /// Listen on `path` instead of [DEFAULT_SOCKET_PATH].
    pub fn with_socket_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.socket_path = path.as_ref().into();
        self
    }

    /// Bind the socket and start serving until `cancellation_token` is cancelled.
    pub async fn start(
        self,
        cancellation_token: CancellationToken,
    ) -> Result<IpamRuntime, IpamRuntimeError> {
        let driver = self.driver.unwrap_or_else(|| self.driver_kind.build());
        let socket_path = self.socket_path;

        if let Some(parent) = socket_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        remove_stale_socket(&socket_path).await?;

        let listener = UnixListener::bind(&socket_path).map_err(|source| {
            IpamRuntimeError::Bind {
                path: socket_path.clone(),
                source,
            }
        })?;
        tracing::info!(socket=%socket_path.display(), "Listening for plugin requests");

        let router = build_plugin_api(driver);
        let token = cancellation_token.clone();
        let path = socket_path.clone();
        let join_handle = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(token.cancelled_owned())
                .await;
            if let Err(e) = &result {
                tracing::error!(error=%e, "Plugin API server unexpectedly stopped");
            }
            tracing::info!("Shutting down plugin API server");
            remove_stale_socket(&path).await?;
            result
        });

        Ok(IpamRuntime {
            cancellation_token,
            join_handle,
            socket_path,
        })
    }
}

/// A running plugin.
pub struct IpamRuntime {
    cancellation_token: CancellationToken,
    join_handle: JoinHandle<io::Result<()>>,
    socket_path: PathBuf,
}

impl IpamRuntime {
    /// The socket the plugin listens on.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Wait for the server to stop.
    pub async fn join(self) -> io::Result<()> {
        self.join_handle.await.map_err(io::Error::other)?
    }

    /// Stop the server and wait for it.
    pub async fn stop_and_join(self) -> io::Result<()> {
        self.cancellation_token.cancel();
        self.join().await
    }
}

/// Removes a socket left behind at `path`. Any other kind of file is left in
/// place and reported as an error.
async fn remove_stale_socket(path: &Path) -> io::Result<()> {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if !metadata.file_type().is_socket() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} exists and is not a socket", path.display()),
        ));
    }
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Cancels `cancellation_token` upon receiving `SIGINT` or `SIGTERM`.
pub fn cancel_on_signal(cancellation_token: CancellationToken) -> io::Result<JoinHandle<()>> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => {
                tracing::debug!("Received SIGINT, cancelling token");
                cancellation_token.cancel();
            },
            _ = sigterm.recv() => {
                tracing::debug!("Received SIGTERM, cancelling token");
                cancellation_token.cancel();
            },
            _ = cancellation_token.cancelled() => {},
        }
    }))
}
