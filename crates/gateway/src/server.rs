// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP front end for clamd.
//!
//! - `POST /scan` (no query string): the request body is streamed to clamd and the answer is a
//!   JSON verdict `{success, error, message}`.
//! - anything else: the daemon version string.
//!
//! Both always answer `200`; failures are reported in the body. A scan that
//! takes longer than the keep-alive delay gets a single `\n` ahead of the
//! JSON document so idle proxies keep the response open.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use bytes::Bytes;
use futures_util::stream;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use cg_core::{ClamdClient, ScanOptions, Verdict};

use crate::error::{Error, Result};

/// Delay before the keep-alive newline is written on a pending scan.
pub const KEEPALIVE_AFTER: Duration = Duration::from_millis(5000);

/// Shared state handed to every request.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    client: ClamdClient,
    scan: ScanOptions,
    keepalive_after: Duration,
}

impl AppState {
    pub fn new(client: ClamdClient, scan: ScanOptions, keepalive_after: Duration) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                client,
                scan,
                keepalive_after,
            }),
        }
    }
}

/// Build the router; every path is handled by [`handle`].
pub fn router(state: AppState) -> Router {
    Router::new().fallback(handle).with_state(state)
}

/// Serve HTTP on `addr` until Ctrl-C.
pub async fn run(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| Error::Bind { addr, source })?;
    info!("Listening on: {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

/// Whether a request targets the scan endpoint.
///
/// `target` is the request path with its query; `/scan?x=1` is not a scan.
pub(crate) fn is_scan_request(method: &Method, target: &str) -> bool {
    method == Method::POST && target.eq_ignore_ascii_case("/scan")
}

async fn handle(State(state): State<AppState>, request: Request) -> Response {
    debug!("{} {}", request.method(), request.uri());
    let target = request
        .uri()
        .path_and_query()
        .map_or_else(|| request.uri().path(), |pq| pq.as_str());
    if is_scan_request(request.method(), target) {
        scan(state, request.into_body())
    } else {
        version(state).await
    }
}

/// Start the scan in its own task and stream its output as the body.
fn scan(state: AppState, body: Body) -> Response {
    let (tx, rx) = mpsc::channel::<Bytes>(2);

    tokio::spawn(async move {
        let verdict = scan_verdict(&state, body, &tx).await;
        match serde_json::to_vec(&verdict) {
            Ok(doc) => {
                if tx.send(Bytes::from(doc)).await.is_err() {
                    debug!("Client went away before the verdict was sent");
                }
            }
            Err(e) => warn!("Failed to serialize verdict: {}", e),
        }
    });

    let body = Body::from_stream(stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (Ok::<_, Infallible>(chunk), rx))
    }));

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

async fn scan_verdict(state: &AppState, body: Body, tx: &mpsc::Sender<Bytes>) -> Verdict {
    let inner = &state.inner;
    let mut scan = std::pin::pin!(inner.client.scan_stream(body.into_data_stream(), inner.scan));

    let result = tokio::select! {
        result = &mut scan => result,
        () = tokio::time::sleep(inner.keepalive_after) => {
            debug!("Scan still running, sending keep-alive");
            let _ = tx.send(Bytes::from_static(b"\n")).await;
            scan.await
        }
    };

    match result {
        Ok(verdict) => {
            info!("Scan clean: {}", verdict.message);
            verdict
        }
        Err(e) => {
            info!("Scan failed: {}", e);
            e.verdict()
        }
    }
}

async fn version(state: AppState) -> Response {
    let text = match state.inner.client.version().await {
        Ok(version) => version,
        Err(e) => {
            warn!("Version query failed: {}", e);
            e.to_string()
        }
    };
    (StatusCode::OK, text).into_response()
}
