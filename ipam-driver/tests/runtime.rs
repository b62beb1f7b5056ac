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

use ipam_driver::{driver::DriverKind, runtime::IpamRuntimeBuilder};
use test_log::test;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::UnixStream,
};
use tokio_util::sync::CancellationToken;

fn socket_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ipam-{}-{name}.sock", std::process::id()))
}

async fn raw_post(socket: &PathBuf, path: &str, body: &str) -> String {
    let mut stream = UnixStream::connect(socket).await.expect("connect to plugin");
    let request = format!(
        "POST {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/vnd.docker.plugins.v1+json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[test(tokio::test)]
async fn serves_plugin_api_on_unix_socket() {
    let socket = socket_path("serve");
    let runtime = IpamRuntimeBuilder::new()
        .with_driver_kind(DriverKind::Dynamic)
        .with_socket_path(&socket)
        .start(CancellationToken::new())
        .await
        .expect("starting plugin");
    assert_eq!(runtime.socket_path(), socket.as_path());

    let response = raw_post(&socket, "/Plugin.Activate", "").await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains(r#"{"Implements":["IpamDriver"]}"#), "{response}");

    let response = raw_post(
        &socket,
        "/IpamDriver.RequestPool",
        r#"{"AddressSpace":"local","Pool":"10.60.0.0/24","Options":{},"V6":false}"#,
    )
    .await;
    assert!(response.contains(r#""PoolID":"10.60.0.0/24""#), "{response}");

    let response = raw_post(
        &socket,
        "/IpamDriver.RequestAddress",
        r#"{"PoolID":"10.60.0.0/24","Address":"","Options":{"com.docker.network.ipam.serial":"true"}}"#,
    )
    .await;
    assert!(response.contains(r#"{"Address":"10.60.0.1/24","Data":{}}"#), "{response}");

    runtime.stop_and_join().await.expect("clean shutdown");
    assert!(!socket.exists(), "socket file removed on shutdown");
}

#[test(tokio::test)]
async fn replaces_stale_socket_file() {
    let socket = socket_path("stale");
    drop(std::os::unix::net::UnixListener::bind(&socket).unwrap());
    assert!(socket.exists(), "stale socket left behind");

    let token = CancellationToken::new();
    let runtime = IpamRuntimeBuilder::new()
        .with_socket_path(&socket)
        .start(token.clone())
        .await
        .expect("starting plugin over stale socket");

    let response = raw_post(&socket, "/IpamDriver.GetCapabilities", "").await;
    assert!(response.contains(r#"{"RequiresMACAddress":false}"#), "{response}");

    token.cancel();
    runtime.join().await.expect("clean shutdown");
}

#[test(tokio::test)]
async fn refuses_to_replace_regular_file() {
    let path = socket_path("regular");
    std::fs::write(&path, b"not a socket").unwrap();

    let result = IpamRuntimeBuilder::new()
        .with_socket_path(&path)
        .start(CancellationToken::new())
        .await;
    assert!(result.is_err(), "must not bind over a regular file");
    assert_eq!(std::fs::read(&path).unwrap(), b"not a socket");

    std::fs::remove_file(&path).unwrap();
}
