// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scans through a running `clamgate` and a stand-in clamd.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::common::*;
use yare::parameterized;

#[test]
fn clean_upload_is_reported_clean() {
    let clamd = FakeClamd::start(Replies::default());
    let gateway = Gateway::start(clamd.port);

    let (status, body) = gateway.post("/scan", b"just some text".to_vec());

    assert_eq!(status, 200);
    let verdict = verdict(&body);
    assert_eq!(verdict["success"], true);
    assert_eq!(verdict["error"], false);
    assert_eq!(verdict["message"], "stream: OK");
    assert!(clamd.payloads().contains(&b"just some text".to_vec()));
}

#[test]
fn infected_upload_is_reported() {
    let clamd = FakeClamd::start(Replies {
        scan: b"stream: Win.Test.EICAR_HDB-1 FOUND\0",
        ..Replies::default()
    });
    let gateway = Gateway::start(clamd.port);

    let (status, body) = gateway.post("/scan", b"X5O!P%@AP[4\\PZX54(P^)7CC)7}".to_vec());

    assert_eq!(status, 200);
    let verdict = verdict(&body);
    assert_eq!(verdict["success"], false);
    assert_eq!(verdict["error"], true);
    assert_eq!(verdict["message"], "stream: Win.Test.EICAR_HDB-1 FOUND");
}

#[test]
fn large_upload_reaches_daemon_intact() {
    let clamd = FakeClamd::start(Replies::default());
    let gateway = Gateway::start(clamd.port);
    let upload: Vec<u8> = (0..2 * 1024 * 1024).map(|i| (i % 251) as u8).collect();

    let (_, body) = gateway.post("/scan", upload.clone());

    assert_eq!(verdict(&body)["success"], true);
    assert!(clamd.payloads().iter().any(|payload| *payload == upload));
}

#[test]
fn empty_upload_is_still_scanned() {
    let clamd = FakeClamd::start(Replies::default());
    let gateway = Gateway::start(clamd.port);

    let (_, body) = gateway.post("/scan", Vec::new());

    assert_eq!(verdict(&body)["success"], true);
    assert!(clamd.payloads().contains(&Vec::new()));
}

#[test]
fn unreachable_daemon_is_reported_in_body() {
    let gateway = Gateway::start(free_port());

    let (status, body) = gateway.post("/scan", b"data".to_vec());

    assert_eq!(status, 200);
    let verdict = verdict(&body);
    assert_eq!(verdict["success"], false);
    assert_eq!(verdict["error"], true);
    assert!(verdict["message"]
        .as_str()
        .unwrap()
        .starts_with("unable to connect to clamd"));
}

#[parameterized(
    root = { "/" },
    health = { "/health" },
    scan_path = { "/scan" },
)]
fn get_requests_return_version(path: &str) {
    let clamd = FakeClamd::start(Replies::default());
    let gateway = Gateway::start(clamd.port);

    let (status, body) = gateway.get(path);

    assert_eq!(status, 200);
    assert_eq!(body, "ClamAV 1.4.0/27400/Mon Oct 19 09:00:00 2026");
}

#[test]
fn version_failure_is_reported_in_body() {
    let gateway = Gateway::start(free_port());

    let (status, body) = gateway.get("/");

    assert_eq!(status, 200);
    assert!(body.starts_with("error executing command zVERSION"));
}

#[test]
fn startup_pings_daemon() {
    let clamd = FakeClamd::start(Replies::default());
    let _gateway = Gateway::start(clamd.port);

    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    while std::time::Instant::now() < deadline {
        if clamd.commands().iter().any(|c| c == "zPING\0") {
            return;
        }
        std::thread::sleep(std::time::Duration::from_millis(25));
    }
    panic!("clamgate never pinged clamd: {:?}", clamd.commands());
}

#[test]
fn environment_configures_ports() {
    let clamd = FakeClamd::start(Replies::default());
    let gateway = Gateway::start_with_env(clamd.port);

    let (_, body) = gateway.post("/SCAN", b"env configured".to_vec());

    assert_eq!(verdict(&body)["success"], true);
}
