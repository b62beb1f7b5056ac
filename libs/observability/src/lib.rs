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
//! Logging for the IPAM plugin.

use std::{
    io::IsTerminal,
    path::Path,
    sync::{Arc, Mutex, PoisonError},
};

use http::Request;
use rand::{RngCore, SeedableRng, rng};
use rand_chacha::ChaChaRng;
use tower_http::{
    LatencyUnit,
    classify::{ServerErrorsAsFailures, SharedClassifier},
    trace::{DefaultOnFailure, DefaultOnResponse, MakeSpan, TraceLayer},
};
use tracing::Span;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt::time::UtcTime, prelude::*, util::TryInitError,
};

/// Environment variable to define the log level.
pub const LOG_LEVEL_ENV: &str = "RUST_LOG";

const DEFAULT_EXEC_NAME: &str = "ipam-driver";

/// Setup logging using the tracing library.
///
/// # Arguments
///
/// * `log_dir`: If provided, logs are written to a file that carries the name of the current
///   executable in this directory. The file always receives debug output.
/// * `log_to_stderr`: If true, logs are printed to stderr, filtered by [LOG_LEVEL_ENV].
///
/// The returned guards flush the non-blocking writers on drop and must be kept alive for as long
/// as the process logs.
pub fn setup_tracing<P: AsRef<Path>>(
    log_dir: Option<P>,
    log_to_stderr: bool,
) -> Result<Vec<WorkerGuard>, TryInitError> {
    let log_level =
        EnvFilter::try_from_env(LOG_LEVEL_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let mut guards = vec![];
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = vec![];

    if let Some(log_dir) = log_dir {
        let log_file =
            tracing_appender::rolling::never(log_dir.as_ref(), format!("{}.log", exec_name()));
        let (non_blocking_writer, file_guard) = tracing_appender::non_blocking(log_file);
        let file_logger = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(non_blocking_writer)
            .with_filter(tracing::level_filters::LevelFilter::DEBUG);
        layers.push(file_logger.boxed());
        guards.push(file_guard);
    }

    if log_to_stderr {
        let (non_blocking_writer, guard) = tracing_appender::non_blocking(std::io::stderr());
        let stderr_logger = tracing_subscriber::fmt::layer()
            // Enable colors if the stderr is a terminal.
            .with_ansi(std::io::stderr().is_terminal())
            .with_timer(UtcTime::rfc_3339())
            .with_writer(non_blocking_writer)
            .with_filter(log_level);
        layers.push(stderr_logger.boxed());
        guards.push(guard);
    }

    Registry::default().with(layers).try_init()?;

    tracing::debug!("Logging initialized!");
    Ok(guards)
}

/// Trace layer for plugin requests that logs at info level and uses random span ids.
pub fn info_trace_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, RandomSpans> {
    let lvl = tracing::Level::INFO;
    let latency_unit = LatencyUnit::Micros;

    TraceLayer::new_for_http()
        .make_span_with(RandomSpans::new(rng().next_u64()))
        .on_failure(
            DefaultOnFailure::new()
                .latency_unit(latency_unit)
                .level(lvl),
        )
        .on_response(
            DefaultOnResponse::new()
                .latency_unit(latency_unit)
                .level(lvl),
        )
}

/// Random span generator.
#[derive(Clone)]
pub struct RandomSpans {
    rng: Arc<Mutex<ChaChaRng>>,
}

impl RandomSpans {
    fn new(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(ChaChaRng::seed_from_u64(seed))),
        }
    }

    fn next_span_id(&self) -> String {
        let cur = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_u64();
        format!("{cur:016x}")
    }
}

impl<B> MakeSpan<B> for RandomSpans {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        tracing::span!(
            tracing::Level::INFO,
            "plugin_request",
            span_id = self.next_span_id(),
            method = %request.method(),
            uri = %request.uri(),
        )
    }
}

/// Name of the running executable, used as the log file name.
fn exec_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|path| {
            path.file_stem()
                .and_then(|name| name.to_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| DEFAULT_EXEC_NAME.to_string())
}
