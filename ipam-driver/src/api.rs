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
//! Plugin HTTP API.
//!
//! The Docker daemon posts JSON to `/Plugin.Activate` and `/IpamDriver.*`.
//! Bodies are decoded regardless of the content type, since the daemon sends
//! [PLUGIN_CONTENT_TYPE] rather than `application/json`.

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    routing::post,
};
use http::{StatusCode, header::CONTENT_TYPE};
use ipam_observability::info_trace_layer;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tower::ServiceBuilder;

use crate::{
    driver::{IpamDriver, IpamError},
    model::{
        ActivateResponse, AddressSpacesResponse, CapabilitiesResponse, EmptyResponse,
        ErrorResponse, ReleaseAddressRequest, ReleasePoolRequest, RequestAddressRequest,
        RequestAddressResponse, RequestPoolRequest, RequestPoolResponse,
    },
};

/// Content type of plugin protocol messages.
pub const PLUGIN_CONTENT_TYPE: &str = "application/vnd.docker.plugins.v1+json";

pub const ACTIVATE_PATH: &str = "/Plugin.Activate";
pub const GET_CAPABILITIES_PATH: &str = "/IpamDriver.GetCapabilities";
pub const GET_DEFAULT_ADDRESS_SPACES_PATH: &str = "/IpamDriver.GetDefaultAddressSpaces";
pub const REQUEST_POOL_PATH: &str = "/IpamDriver.RequestPool";
pub const RELEASE_POOL_PATH: &str = "/IpamDriver.ReleasePool";
pub const REQUEST_ADDRESS_PATH: &str = "/IpamDriver.RequestAddress";
pub const RELEASE_ADDRESS_PATH: &str = "/IpamDriver.ReleaseAddress";

type SharedDriver = Arc<dyn IpamDriver>;

/// Builds the plugin API router on top of `driver`.
pub fn build_plugin_api(driver: Arc<dyn IpamDriver>) -> Router {
    let logging_layer = ServiceBuilder::new().layer(info_trace_layer());

    Router::new()
        .route(ACTIVATE_PATH, post(activate))
        .route(GET_CAPABILITIES_PATH, post(get_capabilities))
        .route(
            GET_DEFAULT_ADDRESS_SPACES_PATH,
            post(get_default_address_spaces),
        )
        .route(REQUEST_POOL_PATH, post(request_pool))
        .route(RELEASE_POOL_PATH, post(release_pool))
        .route(REQUEST_ADDRESS_PATH, post(request_address))
        .route(RELEASE_ADDRESS_PATH, post(release_address))
        .with_state(driver)
        .layer(logging_layer)
}

/// Plugin API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request body is not a valid request.
    #[error("invalid request body: {0}")]
    InvalidBody(#[from] serde_json::Error),
    /// The driver rejected the request.
    #[error(transparent)]
    Driver(#[from] IpamError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Driver(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!(error=%self, "Plugin request failed");
        (
            status,
            PluginJson(ErrorResponse {
                err: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// JSON body with the plugin protocol content type.
#[derive(Debug)]
pub struct PluginJson<T>(pub T);

impl<T: Serialize> IntoResponse for PluginJson<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(body) => ([(CONTENT_TYPE, PLUGIN_CONTENT_TYPE)], body).into_response(),
            Err(e) => {
                tracing::error!(error=%e, "Failed to encode plugin response");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

fn decode<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    Ok(serde_json::from_slice(body)?)
}

async fn activate() -> PluginJson<ActivateResponse> {
    tracing::info!("Plugin activated");
    PluginJson(ActivateResponse::default())
}

async fn get_capabilities(State(driver): State<SharedDriver>) -> PluginJson<CapabilitiesResponse> {
    PluginJson(driver.get_capabilities())
}

async fn get_default_address_spaces(
    State(driver): State<SharedDriver>,
) -> PluginJson<AddressSpacesResponse> {
    PluginJson(driver.get_default_address_spaces())
}

async fn request_pool(
    State(driver): State<SharedDriver>,
    body: Bytes,
) -> Result<PluginJson<RequestPoolResponse>, ApiError> {
    let request: RequestPoolRequest = decode(&body)?;
    Ok(PluginJson(driver.request_pool(request)?))
}

async fn release_pool(
    State(driver): State<SharedDriver>,
    body: Bytes,
) -> Result<PluginJson<EmptyResponse>, ApiError> {
    let request: ReleasePoolRequest = decode(&body)?;
    driver.release_pool(request)?;
    Ok(PluginJson(EmptyResponse {}))
}

async fn request_address(
    State(driver): State<SharedDriver>,
    body: Bytes,
) -> Result<PluginJson<RequestAddressResponse>, ApiError> {
    let request: RequestAddressRequest = decode(&body)?;
    Ok(PluginJson(driver.request_address(request)?))
}

async fn release_address(
    State(driver): State<SharedDriver>,
    body: Bytes,
) -> Result<PluginJson<EmptyResponse>, ApiError> {
    let request: ReleaseAddressRequest = decode(&body)?;
    driver.release_address(request)?;
    Ok(PluginJson(EmptyResponse {}))
}
