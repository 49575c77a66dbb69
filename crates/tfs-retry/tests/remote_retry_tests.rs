//! Integration tests: retrying calls against a simulated remote server

use std::cell::Cell;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use tempfile::TempDir;
use tfs_retry::retry::{RetryExecutorBuilder, StatsObserver, TracingObserver};
use tfs_retry::{
    retry_while_with_policy, retry_with_policy, GitTfsError, NetworkError, RemoteError,
    RetryConfigLoader, RetryError, RetryPolicy, ServerError,
};

/// A server that fails a fixed number of times before answering
struct FlakyServer {
    failures_left: Cell<u32>,
    calls: Cell<u32>,
}

impl FlakyServer {
    fn new(failures: u32) -> Self {
        Self {
            failures_left: Cell::new(failures),
            calls: Cell::new(0),
        }
    }

    fn latest_changeset(&self) -> Result<u32, RemoteError> {
        self.calls.set(self.calls.get() + 1);
        if self.failures_left.get() > 0 {
            self.failures_left.set(self.failures_left.get() - 1);
            return Err(ServerError::new("TF400324: Team Foundation services are not available").into());
        }
        Ok(4711)
    }
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn with_captured_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, logs.contents())
}

#[test]
fn test_flaky_server_recovers() {
    let server = FlakyServer::new(2);
    let policy = RetryPolicy::new(Duration::from_millis(5), 5);

    let changeset = retry_with_policy(&policy, || server.latest_changeset()).unwrap();

    assert_eq!(changeset, 4711);
    assert_eq!(server.calls.get(), 3);
}

#[test]
fn test_exhaustion_blocks_for_every_attempt() {
    let server = FlakyServer::new(u32::MAX);
    let policy = RetryPolicy::new(Duration::from_millis(15), 3);

    let start = Instant::now();
    let err = retry_with_policy(&policy, || server.latest_changeset()).unwrap_err();
    let elapsed = start.elapsed();

    let failure = err.into_aggregate().expect("budget should be exhausted");
    assert_eq!(failure.len(), 3);
    assert_eq!(server.calls.get(), 3);
    // 3 x 15ms, the wait after the last attempt included
    assert!(elapsed >= Duration::from_millis(45), "elapsed {:?}", elapsed);
}

#[test]
fn test_unclassified_error_skips_waiting() {
    let policy = RetryPolicy::new(Duration::from_secs(30), 100);

    let start = Instant::now();
    let result: Result<(), RetryError<Box<dyn std::error::Error + Send + Sync>>> =
        RetryExecutorBuilder::new()
            .with_policy(policy)
            .build()
            .execute(|| Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied").into()));

    let err = result.unwrap_err().into_unclassified().unwrap();
    let io_err = err.downcast_ref::<io::Error>().expect("io error passes through");
    assert_eq!(io_err.kind(), io::ErrorKind::PermissionDenied);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_tracing_observer_emits_retry_lines() {
    let server = FlakyServer::new(1);
    let policy = RetryPolicy::new(Duration::ZERO, 3);

    let (result, logs) = with_captured_logs(|| retry_with_policy(&policy, || server.latest_changeset()));

    assert_eq!(result.unwrap(), 4711);
    assert!(logs.contains(
        "TF400324: Team Foundation services are not available: Retry #1/3 in 0 seconds."
    ));
    assert!(logs.contains("WARN"));
    assert!(logs.contains("error=TF400324: Team Foundation services are not available"));
    assert!(logs.contains("succeeded after retry"));
}

#[test]
fn test_tracing_observer_silent_on_unclassified_error() {
    let policy = RetryPolicy::new(Duration::ZERO, 3);
    let mut calls = 0;

    let (result, logs) = with_captured_logs(|| {
        retry_with_policy(&policy, || -> Result<(), RemoteError> {
            calls += 1;
            Err(anyhow::anyhow!("TF14045: The identity could not be found").into())
        })
    });

    let err = result.unwrap_err();
    assert!(err.is_unclassified());
    assert_eq!(err.attempts(), 1);
    assert_eq!(calls, 1);
    assert!(logs.is_empty(), "unexpected log output: {}", logs);
}

#[test]
fn test_tracing_observer_silent_on_first_success() {
    let server = FlakyServer::new(0);
    let policy = RetryPolicy::new(Duration::ZERO, 3);

    let (result, logs) = with_captured_logs(|| retry_with_policy(&policy, || server.latest_changeset()));

    assert_eq!(result.unwrap(), 4711);
    assert!(logs.is_empty(), "unexpected log output: {}", logs);
}

#[test]
fn test_retry_while_logs_and_exhausts() {
    let policy = RetryPolicy::new(Duration::ZERO, 2);

    let (result, logs) = with_captured_logs(|| retry_while_with_policy(&policy, || true));

    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "Action failed after 2 retries!");
    assert!(logs.contains("DoWhile: Retry #1/2 in 0 seconds."));
    assert!(logs.contains("DoWhile: Retry #2/2 in 0 seconds."));
    assert!(logs.contains("all retry attempts exhausted"));
}

#[test]
fn test_retry_while_waits_until_condition_clears() {
    let pending = Cell::new(2);
    let policy = RetryPolicy::new(Duration::from_millis(10), 5);

    let start = Instant::now();
    retry_while_with_policy(&policy, || {
        let busy = pending.get() > 0;
        if busy {
            pending.set(pending.get() - 1);
        }
        busy
    })
    .unwrap();

    assert!(start.elapsed() >= Duration::from_millis(20));
}

#[test]
fn test_shared_observer_across_calls() {
    let stats = Arc::new(StatsObserver::new());
    let executor = RetryExecutorBuilder::new()
        .with_policy(RetryPolicy::new(Duration::ZERO, 2))
        .with_observer(stats.clone())
        .build();

    let first: Result<(), RetryError<RemoteError>> =
        executor.execute(|| Err(NetworkError::new("connection reset").into()));
    let second: Result<(), RetryError<RemoteError>> =
        executor.execute(|| Err(GitTfsError::new("workspace busy").into()));

    assert_eq!(first.unwrap_err().attempts(), 2);
    assert_eq!(second.unwrap_err().attempts(), 2);
    assert_eq!(stats.failures(), 4);
    assert_eq!(stats.exhaustions(), 2);
}

#[test]
fn test_policy_from_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_dir = Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf()).unwrap();
    std::fs::write(
        config_dir.join("retry.yaml"),
        "operations:\n  checkin:\n    interval-ms: 0\n    max-attempts: 2\n",
    )
    .unwrap();

    let loader = RetryConfigLoader::with_dir(config_dir.clone());
    let config = loader.load_file(&loader.config_path()).unwrap();
    let policy = config.policy_for("checkin");

    let server = FlakyServer::new(5);
    let err = RetryExecutorBuilder::new()
        .with_policy(policy)
        .with_observer(TracingObserver::new("checkin"))
        .build()
        .execute(|| server.latest_changeset())
        .unwrap_err();

    assert_eq!(err.attempts(), 2);
    assert_eq!(server.calls.get(), 2);
}
