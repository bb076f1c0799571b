//! End-to-end tests for the dial session engine: counters, persistence,
//! control signals and resume continuation.

use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use tonescan_core::{BackendKind, DialResult, DialStatus, SessionMetadata, StorageKind, ToneType};
use tonescan_numbers::{CountryProfile, DialOrder, NumberSpace, PatternSpec};
use tonescan_session::{control_channel, prepare_resume, DialSession};
use tonescan_storage::{DryRunSink, ResultSink, SqliteSink, StorageError};
use tonescan_telephony::{BackendError, SimulatedBackend, TelephonyBackend};

/// Backend that replays a fixed script of outcomes.
struct ScriptedBackend {
    script: VecDeque<Result<DialResult, BackendError>>,
    connected: bool,
}

impl ScriptedBackend {
    fn new(script: Vec<Result<DialResult, BackendError>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            connected: false,
        }
    }
}

#[async_trait]
impl TelephonyBackend for ScriptedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Simulated
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn connect(&mut self) -> Result<(), BackendError> {
        self.connected = true;
        Ok(())
    }

    async fn dial(&mut self, phone_number: &str) -> Result<DialResult, BackendError> {
        match self.script.pop_front() {
            Some(Ok(mut result)) => {
                result.phone_number = phone_number.to_string();
                Ok(result)
            }
            Some(Err(err)) => Err(err),
            None => Ok(DialResult::new(
                phone_number,
                DialStatus::Busy,
                "Busy signal detected",
            )),
        }
    }

    async fn hangup(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), BackendError> {
        self.connected = false;
        Ok(())
    }
}

/// Sink whose result writes start failing after a set count; session
/// snapshots keep succeeding and the last one is retained.
struct FailingSink {
    fail_after: u64,
    results_written: u64,
    last_session: Option<SessionMetadata>,
}

impl FailingSink {
    fn new(fail_after: u64) -> Self {
        Self {
            fail_after,
            results_written: 0,
            last_session: None,
        }
    }
}

#[async_trait]
impl ResultSink for FailingSink {
    fn kind(&self) -> StorageKind {
        StorageKind::DryRun
    }

    async fn write_result(&mut self, _result: &DialResult) -> Result<(), StorageError> {
        if self.results_written >= self.fail_after {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.results_written += 1;
        Ok(())
    }

    async fn write_session(&mut self, session: &SessionMetadata) -> Result<(), StorageError> {
        self.last_session = Some(session.clone());
        Ok(())
    }

    async fn read_dialed_numbers(
        &self,
        _session_id: Option<&str>,
    ) -> Result<HashSet<String>, StorageError> {
        Ok(HashSet::new())
    }

    async fn flush(&mut self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StorageError> {
        Ok(())
    }
}

fn metadata(session_id: &str, pattern: &str) -> SessionMetadata {
    SessionMetadata::new(
        "simulated",
        "sqlite",
        pattern,
        "1",
        false,
        Some(session_id.to_string()),
    )
}

fn carrier() -> Result<DialResult, BackendError> {
    Ok(DialResult::new("", DialStatus::Carrier, "Modem carrier at 2400 bps")
        .with_tone(true, ToneType::Modem))
}

fn outcome(status: DialStatus) -> Result<DialResult, BackendError> {
    Ok(DialResult::new("", status, "scripted outcome"))
}

fn numbers(pattern: &str, count: usize) -> Vec<String> {
    let profile = CountryProfile::nanp();
    let spec = PatternSpec::compile(pattern, &profile).expect("compile pattern");
    NumberSpace::new(spec, DialOrder::Sequential)
        .iter()
        .take(count)
        .collect()
}

#[tokio::test]
async fn test_counters_and_persistence() {
    let mut backend = ScriptedBackend::new(vec![
        carrier(),
        outcome(DialStatus::Busy),
        outcome(DialStatus::Voice),
        outcome(DialStatus::NoAnswer),
    ]);
    backend.connect().await.expect("connect");
    let mut sink = SqliteSink::open_in_memory().await.expect("open sink");

    let (_handle, rx) = control_channel();
    let session = DialSession::new(metadata("run00001", "555234560"), numbers("555-234-560", 4), 0, rx);
    let report = session.run(&mut backend, &mut sink).await.expect("run");

    assert!(report.completed);
    assert_eq!(report.metadata.total_calls, 4);
    assert_eq!(report.metadata.successful_calls, 2);
    assert_eq!(report.metadata.modem_detections, 1);
    assert!(report.metadata.end_time.is_some());

    // The sink saw the same final snapshot
    let stored = sink
        .get_session("run00001")
        .await
        .expect("get session")
        .expect("session stored");
    assert_eq!(stored.total_calls, 4);
    assert_eq!(stored.successful_calls, 2);
    assert!(stored.end_time.is_some());

    let dialed = sink.read_dialed_numbers(None).await.expect("read dialed");
    assert_eq!(dialed.len(), 4);
    assert!(dialed.contains("5552345600"));
}

#[tokio::test]
async fn test_results_stamped_with_session_id() {
    let mut backend = ScriptedBackend::new(vec![carrier()]);
    backend.connect().await.expect("connect");
    let mut sink = SqliteSink::open_in_memory().await.expect("open sink");

    let (_handle, rx) = control_channel();
    let session = DialSession::new(metadata("stamp001", "555234560"), numbers("555-234-560", 1), 0, rx);
    session.run(&mut backend, &mut sink).await.expect("run");

    let results = sink.session_results("stamp001").await.expect("results");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].session_id, "stamp001");
    assert_eq!(results[0].status, DialStatus::Carrier);
}

#[tokio::test]
async fn test_cancel_before_first_dial() {
    let mut backend = ScriptedBackend::new(Vec::new());
    backend.connect().await.expect("connect");
    let mut sink = DryRunSink::new();

    let (handle, rx) = control_channel();
    handle.cancel();

    let session = DialSession::new(metadata("cancel01", "555234560"), numbers("555-234-560", 10), 0, rx);
    let report = session.run(&mut backend, &mut sink).await.expect("run");

    assert!(!report.completed);
    assert_eq!(report.metadata.total_calls, 0);
    assert!(report.metadata.end_time.is_some());
    assert_eq!(sink.results_written(), 0);
    // Initial snapshot plus finalization
    assert_eq!(sink.sessions_written(), 2);
}

#[tokio::test]
async fn test_pause_then_resume_completes() {
    let mut backend = SimulatedBackend::with_seed(11);
    backend.connect().await.expect("connect");
    let mut sink = DryRunSink::new();

    let (handle, rx) = control_channel();
    handle.pause();

    let session = DialSession::new(metadata("pause001", "555234560"), numbers("555-234-560", 5), 0, rx);
    let task = tokio::spawn(async move {
        let report = session.run(&mut backend, &mut sink).await.expect("run");
        (report, sink.results_written())
    });

    // Parked on the pause; unpark and let it finish
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    handle.resume();

    let (report, results_written) = task.await.expect("join");
    assert!(report.completed);
    assert_eq!(report.metadata.total_calls, 5);
    assert_eq!(results_written, 5);
}

#[tokio::test]
async fn test_fatal_backend_error_aborts_and_finalizes() {
    let mut backend = ScriptedBackend::new(vec![
        outcome(DialStatus::Busy),
        Err(BackendError::Transport("serial port gone".to_string())),
    ]);
    backend.connect().await.expect("connect");
    let mut sink = DryRunSink::new();

    let (_handle, rx) = control_channel();
    let session = DialSession::new(metadata("fatal001", "555234560"), numbers("555-234-560", 5), 0, rx);
    let err = session
        .run(&mut backend, &mut sink)
        .await
        .expect_err("fatal error");

    assert!(matches!(
        err,
        tonescan_session::SessionError::Backend(BackendError::Transport(_))
    ));
    // One good call recorded before the failure, and the session was closed
    assert_eq!(sink.results_written(), 1);
    assert_eq!(sink.sessions_written(), 3);
}

#[tokio::test]
async fn test_storage_failure_finalizes_session() {
    let mut backend = ScriptedBackend::new(Vec::new());
    backend.connect().await.expect("connect");
    let mut sink = FailingSink::new(1);

    let (_handle, rx) = control_channel();
    let session = DialSession::new(metadata("store001", "555234560"), numbers("555-234-560", 5), 0, rx);
    let err = session
        .run(&mut backend, &mut sink)
        .await
        .expect_err("storage failure");
    assert!(matches!(err, tonescan_session::SessionError::Storage(_)));

    // One result made it to storage; the closing snapshot still carries
    // the end time
    assert_eq!(sink.results_written, 1);
    let last = sink.last_session.expect("session snapshot written");
    assert!(last.end_time.is_some());
    assert_eq!(last.total_calls, 2);
}

#[tokio::test]
async fn test_resume_continues_prior_session() {
    let profile = CountryProfile::nanp();
    let mut sink = SqliteSink::open_in_memory().await.expect("open sink");

    // A prior run covered the first four numbers
    let space = numbers("555-234-560", 10);
    for number in &space[..4] {
        let result = DialResult::new(number, DialStatus::NoAnswer, "No answer after 5 rings")
            .stamped("prior001");
        sink.write_result(&result).await.expect("seed result");
    }

    let plan = prepare_resume(
        &sink,
        Some("prior001"),
        Some("555-234-560"),
        false,
        &profile,
        DialOrder::Sequential,
    )
    .await
    .expect("plan");

    assert_eq!(plan.session_id.as_deref(), Some("prior001"));
    assert_eq!(plan.already_dialed, 4);
    assert_eq!(plan.numbers, &space[4..]);

    // Finish the range under the continued id
    let mut backend = ScriptedBackend::new(Vec::new());
    backend.connect().await.expect("connect");
    let (_handle, rx) = control_channel();
    let meta = SessionMetadata::new(
        "simulated",
        "sqlite",
        plan.pattern.digits(),
        "1",
        false,
        plan.session_id.clone(),
    );
    let report = DialSession::new(meta, plan.numbers, 0, rx)
        .run(&mut backend, &mut sink)
        .await
        .expect("run");
    assert_eq!(report.metadata.session_id, "prior001");
    assert_eq!(report.metadata.total_calls, 6);

    // Nothing left on a second resume
    let done = prepare_resume(
        &sink,
        Some("prior001"),
        Some("555-234-560"),
        false,
        &profile,
        DialOrder::Sequential,
    )
    .await
    .expect("second plan");
    assert!(done.is_complete());
}

#[tokio::test]
async fn test_resume_infers_pattern_without_prefix() {
    let mut sink = SqliteSink::open_in_memory().await.expect("open sink");
    for number in ["5552345600", "5552345601", "5552345699"] {
        let result =
            DialResult::new(number, DialStatus::Busy, "Busy signal detected").stamped("infer001");
        sink.write_result(&result).await.expect("seed result");
    }

    let plan = prepare_resume(
        &sink,
        None,
        None,
        true,
        &CountryProfile::nanp(),
        DialOrder::Sequential,
    )
    .await
    .expect("plan");

    assert!(plan.session_id.is_none());
    assert_eq!(plan.pattern.digits(), "55523456");
    assert_eq!(plan.numbers.len(), 97);
}

#[tokio::test]
async fn test_simulated_run_end_to_end() {
    let mut backend = SimulatedBackend::with_seed(4242);
    backend.connect().await.expect("connect");
    let mut sink = SqliteSink::open_in_memory().await.expect("open sink");

    let (_handle, rx) = control_channel();
    let session = DialSession::new(
        metadata("sim00001", "55523456"),
        numbers("555-234-56", 50),
        0,
        rx,
    );
    let report = session.run(&mut backend, &mut sink).await.expect("run");

    assert!(report.completed);
    assert_eq!(report.metadata.total_calls, 50);
    assert!(report.metadata.successful_calls <= 50);
    assert_eq!(
        sink.read_dialed_numbers(Some("sim00001"))
            .await
            .expect("read")
            .len(),
        50
    );
}
