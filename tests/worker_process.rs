// tests/worker_process.rs

//! End-to-end tests driving the worker binary over pipes

mod common;

use common::Worker;
use fs2::FileExt;
use nix::sys::signal::{Signal, kill};
use nix::unistd::{Pid, geteuid};
use std::fs::OpenOptions;
use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

#[test]
fn test_end_of_input_exits_cleanly() {
    let mut worker = Worker::spawn();
    assert_eq!(
        worker.request(r#"{"action":"whatinstalled","provides":"zlib"}"#),
        "zlib 0:1.2.11-31.el9 x86_64\n"
    );
    let status = worker.wait();
    assert_eq!(status.code(), Some(0));
}

#[test]
fn test_full_session() {
    let mut worker = Worker::spawn();
    let exchanges = [
        (r#"{"action":"whatavailable","provides":"zlib"}"#, "zlib 0:1.2.13-1.el9 x86_64"),
        (r#"{"action":"whatinstalled","provides":"doesnotexist"}"#, "doesnotexist nil nil"),
        (r#"{"action":"whatavailable","provides":"nginx >= 1:1.21"}"#, "nginx 1:1.22.0-2.el9 x86_64"),
        (r#"{"action":"versioncompare","versions":["1.2","1.10"]}"#, "-1"),
        (r#"{"action":"versioncompare","versions":[null,"1.10"]}"#, "0"),
        (r#"{"action":"installonlypkgs","package":"kernel"}"#, "True"),
        (r#"{"action":"installonlypkgs","package":"zlib"}"#, "False"),
        (r#"{"action":"close_rpmdb"}"#, "nil nil nil"),
        (r#"{"action":"whatinstalled","provides":"zlib","arch":"i686"}"#, "zlib 0:1.2.11-31.el9 i686"),
        (r#"{"action":"whatinstalled","provides":"zlib-1.2.11-31.el9.x86_64"}"#, "zlib 0:1.2.11-31.el9 x86_64"),
    ];
    for (request, expected) in exchanges {
        assert_eq!(worker.request(request).trim_end(), expected, "request {}", request);
    }
    assert!(worker.wait().success());
}

#[test]
fn test_identical_requests_identical_responses() {
    let mut worker = Worker::spawn();
    let request = r#"{"action":"whatavailable","provides":"webserver"}"#;
    let first = worker.request(request);
    assert!(!first.is_empty());
    assert_eq!(worker.request(request), first);
    assert_eq!(worker.request(request), first);
    assert!(worker.wait().success());
}

#[test]
fn test_repository_override_is_per_request() {
    let mut worker = Worker::spawn();
    let plain = r#"{"action":"whatavailable","provides":"htop"}"#;
    let enabled = r#"{"action":"whatavailable","provides":"htop","repos":[{"enable":"extra"}]}"#;

    assert_eq!(worker.request(plain), "htop nil nil\n");
    assert_eq!(worker.request(enabled), "htop 0:3.2.1-1.el9 x86_64\n");
    assert_eq!(worker.request(plain), "htop nil nil\n");
    assert!(worker.wait().success());
}

#[test]
fn test_json_output_flag() {
    let mut worker = Worker::spawn_with(|cmd| {
        cmd.arg("--json");
    });
    let line = worker.request(r#"{"action":"whatinstalled","provides":"zlib"}"#);
    let value: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(value["name"], "zlib");
    assert_eq!(value["version"], "1.2.11");
    assert_eq!(value["arch"], "x86_64");
    assert!(worker.wait().success());
}

#[test]
fn test_malformed_request_is_fatal() {
    let mut worker = Worker::spawn();
    assert_eq!(worker.request(r#"{"action":"close_rpmdb"}"#), "nil nil nil\n");
    worker.send("{not json");
    // No response, the worker exits instead
    assert_eq!(worker.read_line(), "");
    assert_eq!(worker.wait().code(), Some(1));
}

#[test]
fn test_unknown_action_is_fatal() {
    let mut worker = Worker::spawn();
    worker.send(r#"{"action":"frobnicate"}"#);
    assert_eq!(worker.read_line(), "");
    assert_eq!(worker.wait().code(), Some(1));
}

/// Deliver `signal` to an idle worker and check it shuts down with status 0
fn assert_signal_exits_cleanly(signal: Signal) {
    let mut worker = Worker::spawn();
    // A completed round trip means the signal thread is running
    assert_eq!(
        worker.request(r#"{"action":"whatinstalled","provides":"zlib"}"#),
        "zlib 0:1.2.11-31.el9 x86_64\n"
    );

    kill(Pid::from_raw(worker.pid()), signal).unwrap();
    let status = worker.child.wait().unwrap();
    assert_eq!(status.code(), Some(0), "exit status after {}", signal);
}

#[test]
fn test_hangup_exits_cleanly() {
    assert_signal_exits_cleanly(Signal::SIGHUP);
}

#[test]
fn test_terminate_while_idle() {
    assert_signal_exits_cleanly(Signal::SIGTERM);
}

#[test]
fn test_interrupt_exits_cleanly() {
    assert_signal_exits_cleanly(Signal::SIGINT);
}

#[test]
fn test_quit_exits_cleanly() {
    assert_signal_exits_cleanly(Signal::SIGQUIT);
}

#[test]
fn test_closed_output_exits_cleanly() {
    let (dir, listing) = common::write_listing();
    let mut child = common::worker_command(dir.path(), &listing).spawn().unwrap();
    // Nobody will read the response
    drop(child.stdout.take());

    let mut stdin = child.stdin.take().unwrap();
    writeln!(stdin, r#"{{"action":"versioncompare","versions":["1.2","1.10"]}}"#).unwrap();
    stdin.flush().unwrap();

    let status = child.wait().unwrap();
    assert_eq!(status.code(), Some(0));
}

#[test]
fn test_inherited_descriptors() {
    let mut worker = Worker::spawn_with(|cmd| {
        cmd.args(["0", "1"]);
    });
    assert_eq!(
        worker.request(r#"{"action":"installonlypkgs","package":"kernel-core"}"#),
        "True\n"
    );
    assert!(worker.wait().success());
}

#[test]
fn test_closed_descriptor_rejected() {
    let (dir, listing) = common::write_listing();
    let output = Command::new(common::worker_binary())
        .args(common::worker_args(dir.path(), &listing))
        .args(["57", "58"])
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_missing_snapshot_is_reported_on_first_query() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("no-such-listing");
    let cmd = common::worker_command(dir.path(), &missing);
    let mut worker = Worker::start(cmd, dir);

    // Version comparison never touches the index
    assert_eq!(
        worker.request(r#"{"action":"versioncompare","versions":["1","1"]}"#),
        "0\n"
    );
    worker.send(r#"{"action":"whatinstalled","provides":"zlib"}"#);
    assert_eq!(worker.read_line(), "");
    assert_eq!(worker.wait().code(), Some(1));
}

#[test]
fn test_orphaned_worker_exits() {
    let (dir, listing) = common::write_listing();

    // The shell starts the worker in the background and exits, leaving the
    // worker with a new parent
    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(r#"exec 3<&0; "$0" "$@" <&3 3<&- & sleep 1"#)
        .arg(common::worker_binary())
        .args(common::worker_args(dir.path(), &listing))
        .stderr(Stdio::null());
    let mut worker = Worker::start(cmd, dir);
    assert!(worker.child.wait().unwrap().success());
    thread::sleep(Duration::from_millis(200));

    // The pending request is still answered; the next parent check fails
    assert_eq!(
        worker.request(r#"{"action":"versioncompare","versions":["1.0","1.0"]}"#),
        "0\n"
    );
    assert_eq!(worker.read_line(), "");
}

#[test]
fn test_lock_timeout_exit_code() {
    // Only privileged workers lock the database
    if !geteuid().is_root() {
        return;
    }

    let mut worker = Worker::spawn_with(|cmd| {
        cmd.args(["--lock-timeout", "1"]);
    });
    let holder = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(worker.lock_path())
        .unwrap();
    holder.lock_exclusive().unwrap();

    worker.send(r#"{"action":"whatinstalled","provides":"zlib"}"#);
    assert_eq!(worker.read_line(), "");
    assert_eq!(worker.wait().code(), Some(200));
    holder.unlock().unwrap();
}
