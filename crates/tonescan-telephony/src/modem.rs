//! Hayes AT-command modem backend.
//!
//! Drives a serial modem through an explicit state machine: initialize
//! with a fixed AT sequence, dial with `ATDT`, then classify the result
//! codes the modem reports until a terminal code or the dial timeout.
//! `RING` lines are counted but never terminate a dial.

use crate::backend::TelephonyBackend;
use crate::error::{BackendError, Result};
use crate::transport::{SerialTransport, TtyTransport};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tonescan_core::{BackendKind, DialResult, DialStatus, ModemConfig, ToneType};

/// Init commands that must each be acknowledged with `OK`.
const INIT_COMMANDS: [&str; 3] = ["ATZ", "ATE0", "ATQ0V1"];

/// Extended result codes. Best effort: older modems reject `ATX4` and
/// still dial fine without it.
const EXTENDED_RESULT_CODES: &str = "ATX4";

/// Protocol state of the modem line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemState {
    /// No channel, or channel released
    Idle,
    /// Init sequence in progress
    Initializing,
    /// Initialized, on-hook, ready to dial
    Ready,
    /// `ATDT` sent, waiting for a terminal result code
    Dialing,
    /// Remote carrier negotiated
    Connected,
    /// Remote line busy
    Busy,
    /// Remote answered and dropped, or never answered
    NoCarrier,
    /// Local line gave no dial tone
    NoDialTone,
    /// Voice answer detected
    Voice,
    /// Fax answer detected
    Fax,
    /// Modem reported an error result code
    Error,
    /// Escape-and-hangup in progress
    HangingUp,
}

impl fmt::Display for ModemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Dialing => "dialing",
            Self::Connected => "connected",
            Self::Busy => "busy",
            Self::NoCarrier => "no_carrier",
            Self::NoDialTone => "no_dial_tone",
            Self::Voice => "voice",
            Self::Fax => "fax",
            Self::Error => "error",
            Self::HangingUp => "hanging_up",
        };
        write!(f, "{s}")
    }
}

/// Telephony backend over a Hayes-compatible modem.
pub struct ModemBackend {
    config: ModemConfig,
    transport: Option<Box<dyn SerialTransport>>,
    state: ModemState,
}

impl ModemBackend {
    /// Create a backend that will open the configured serial port on
    /// `connect`.
    #[must_use]
    pub fn new(config: ModemConfig) -> Self {
        Self {
            config,
            transport: None,
            state: ModemState::Idle,
        }
    }

    /// Create a backend over an already-open transport. Used by tests to
    /// script modem responses.
    #[must_use]
    pub fn with_transport(config: ModemConfig, transport: Box<dyn SerialTransport>) -> Self {
        Self {
            config,
            transport: Some(transport),
            state: ModemState::Idle,
        }
    }

    /// Current protocol state.
    #[must_use]
    pub fn state(&self) -> ModemState {
        self.state
    }

    fn transport(&mut self) -> Result<&mut Box<dyn SerialTransport>> {
        self.transport.as_mut().ok_or(BackendError::NotConnected)
    }

    fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.config.command_timeout_secs)
    }

    fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.config.response_timeout_secs)
    }

    /// Send a command and wait for `OK` or `ERROR` within the command
    /// timeout. `Ok(false)` covers both a rejected command and silence.
    async fn command_ok(&mut self, command: &str) -> Result<bool> {
        let timeout = self.command_timeout();
        let deadline = Instant::now() + timeout;
        self.transport()?.write_line(command).await?;

        loop {
            let now = Instant::now();
            if now >= deadline {
                tracing::warn!("No response to {} within {:?}", command, timeout);
                return Ok(false);
            }
            let remaining = deadline - now;
            let Some(line) = self.transport()?.read_line(remaining).await? else {
                tracing::warn!("No response to {} within {:?}", command, timeout);
                return Ok(false);
            };
            if line.is_empty() {
                continue;
            }
            tracing::debug!("Modem response to {}: {}", command, line);
            let upper = line.to_uppercase();
            if upper.contains("OK") {
                return Ok(true);
            }
            if upper.contains("ERROR") {
                return Ok(false);
            }
        }
    }

    /// Classify a terminal result code, or `None` for lines that keep the
    /// dial in progress.
    fn classify(&self, line: &str, phone_number: &str, rings: u32) -> Option<(ModemState, DialResult)> {
        let upper = line.to_uppercase();

        if upper.contains("BUSY") {
            let message = if rings > 0 {
                format!("Busy after {rings} rings")
            } else {
                "Busy signal detected".to_string()
            };
            return Some((
                ModemState::Busy,
                DialResult::new(phone_number, DialStatus::Busy, message),
            ));
        }

        if upper.contains("NO CARRIER") {
            let message = if rings > 0 {
                format!("No carrier after {rings} rings")
            } else {
                "No carrier detected".to_string()
            };
            return Some((
                ModemState::NoCarrier,
                DialResult::new(phone_number, DialStatus::NoAnswer, message),
            ));
        }

        if upper.contains("NO DIAL") {
            return Some((
                ModemState::NoDialTone,
                DialResult::new(phone_number, DialStatus::Error, "No dial tone"),
            ));
        }

        if upper.contains("FAX") || upper.contains("+FCO") {
            return Some((
                ModemState::Fax,
                DialResult::new(phone_number, DialStatus::Fax, format!("Fax answer: {line}"))
                    .with_tone(true, ToneType::Fax),
            ));
        }

        if upper.contains("VOICE") {
            return Some((
                ModemState::Voice,
                DialResult::new(phone_number, DialStatus::Voice, "Voice detected")
                    .with_tone(false, ToneType::Voice),
            ));
        }

        if upper.contains("CONNECT") {
            return Some((
                ModemState::Connected,
                DialResult::new(phone_number, DialStatus::Carrier, describe_connect(line))
                    .with_tone(true, ToneType::Modem),
            ));
        }

        if upper.contains("ERROR") {
            return Some((
                ModemState::Error,
                DialResult::new(phone_number, DialStatus::Error, format!("Modem error: {line}")),
            ));
        }

        None
    }

    /// Escape to command mode and drop the line. Failures are logged, not
    /// propagated: an unacknowledged `ATH0` must not abort the session.
    async fn hangup_line(&mut self) {
        self.state = ModemState::HangingUp;

        // Hayes escape: guard silence, then +++ with no CR, then more guard
        tokio::time::sleep(Duration::from_millis(500)).await;
        if let Err(err) = async {
            self.transport()?.write_raw("+++").await?;
            Ok::<(), BackendError>(())
        }
        .await
        {
            tracing::warn!("Escape sequence failed: {}", err);
        }
        tokio::time::sleep(Duration::from_millis(1_000)).await;

        match self.command_ok("ATH0").await {
            Ok(true) => tracing::debug!("Modem on-hook"),
            Ok(false) => tracing::warn!("ATH0 not acknowledged"),
            Err(err) => tracing::warn!("Hangup failed: {}", err),
        }
    }
}

/// Human-readable carrier message from a `CONNECT` line.
///
/// `CONNECT 28800/ARQ/V34` reports speed and protocol; bare `CONNECT`
/// or an unparseable tail falls back to echoing the line.
fn describe_connect(line: &str) -> String {
    let mut parts = line.split_whitespace();
    let _connect = parts.next();
    if let Some(detail) = parts.next() {
        let (speed, protocol) = match detail.split_once('/') {
            Some((speed, protocol)) => (speed, Some(protocol)),
            None => (detail, None),
        };
        if speed.parse::<u32>().is_ok() {
            return match protocol {
                Some(protocol) => format!("Modem carrier at {speed} bps ({protocol})"),
                None => format!("Modem carrier at {speed} bps"),
            };
        }
    }
    format!("Carrier detected: {line}")
}

#[async_trait]
impl TelephonyBackend for ModemBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Modem
    }

    fn is_connected(&self) -> bool {
        self.transport.is_some() && self.state != ModemState::Idle
    }

    async fn connect(&mut self) -> Result<()> {
        if self.state != ModemState::Idle {
            return Err(BackendError::InvalidState {
                expected: "idle".to_string(),
                actual: self.state.to_string(),
            });
        }

        if self.transport.is_none() {
            let transport = TtyTransport::open(&self.config.port, self.config.baud_rate)?;
            self.transport = Some(Box::new(transport));
        }

        self.state = ModemState::Initializing;
        for command in INIT_COMMANDS {
            if !self.command_ok(command).await? {
                self.state = ModemState::Idle;
                return Err(BackendError::InitFailed {
                    command: command.to_string(),
                });
            }
        }
        if !self.command_ok(EXTENDED_RESULT_CODES).await? {
            tracing::warn!("Modem rejected {}, continuing without extended result codes", EXTENDED_RESULT_CODES);
        }

        self.state = ModemState::Ready;
        tracing::info!("Modem initialized on {}", self.config.port);
        Ok(())
    }

    async fn dial(&mut self, phone_number: &str) -> Result<DialResult> {
        if self.state != ModemState::Ready {
            return Err(BackendError::InvalidState {
                expected: "ready".to_string(),
                actual: self.state.to_string(),
            });
        }

        let digits: String = phone_number.chars().filter(char::is_ascii_digit).collect();
        tracing::info!("Dialing {}", phone_number);
        self.state = ModemState::Dialing;
        self.transport()?.write_line(&format!("ATDT{digits}")).await?;

        let deadline = Instant::now() + Duration::from_secs(self.config.dial_timeout_secs);
        let response_timeout = self.response_timeout();
        let mut rings: u32 = 0;

        let outcome = loop {
            let now = Instant::now();
            if now >= deadline {
                break None;
            }
            let wait = response_timeout.min(deadline - now);
            let Some(line) = self.transport()?.read_line(wait).await? else {
                continue;
            };
            if line.is_empty() {
                continue;
            }
            tracing::debug!("Modem: {}", line);

            if line.to_uppercase().contains("RING") {
                rings += 1;
                tracing::debug!("Ring {} for {}", rings, phone_number);
                continue;
            }
            if let Some(outcome) = self.classify(&line, phone_number, rings) {
                break Some(outcome);
            }
        };

        let result = match outcome {
            Some((state, result)) => {
                self.state = state;
                result
            }
            None if rings > 0 => DialResult::new(
                phone_number,
                DialStatus::Ringing,
                format!("No answer after {rings} rings"),
            ),
            None => DialResult::new(
                phone_number,
                DialStatus::Timeout,
                "Dial timeout - no answer",
            ),
        };

        self.hangup_line().await;
        self.state = ModemState::Ready;
        Ok(result)
    }

    async fn hangup(&mut self) -> Result<()> {
        if self.transport.is_none() {
            return Err(BackendError::NotConnected);
        }
        self.hangup_line().await;
        self.state = ModemState::Ready;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut transport) = self.transport.take() {
            transport.close().await?;
        }
        self.state = ModemState::Idle;
        tracing::info!("Modem backend disconnected");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Scripted transport: pops pre-loaded response lines and records
    /// everything written.
    struct ScriptedTransport {
        responses: VecDeque<String>,
        sent: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedTransport {
        fn new(responses: &[&str]) -> (Self, Arc<Mutex<Vec<String>>>) {
            let sent = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    responses: responses.iter().map(|s| (*s).to_string()).collect(),
                    sent: Arc::clone(&sent),
                },
                sent,
            )
        }
    }

    #[async_trait]
    impl SerialTransport for ScriptedTransport {
        async fn write_line(&mut self, line: &str) -> Result<()> {
            self.sent.lock().unwrap().push(line.to_string());
            Ok(())
        }

        async fn write_raw(&mut self, data: &str) -> Result<()> {
            self.sent.lock().unwrap().push(data.to_string());
            Ok(())
        }

        async fn read_line(&mut self, _timeout: Duration) -> Result<Option<String>> {
            match self.responses.pop_front() {
                Some(line) => Ok(Some(line)),
                None => {
                    // Empty script simulates a silent modem
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(None)
                }
            }
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn test_config() -> ModemConfig {
        ModemConfig {
            port: "/dev/null".to_string(),
            baud_rate: 57_600,
            command_timeout_secs: 1,
            response_timeout_secs: 1,
            dial_timeout_secs: 1,
        }
    }

    fn connected_backend(dial_script: &[&str]) -> (ModemBackend, Arc<Mutex<Vec<String>>>) {
        let mut script = vec!["OK", "OK", "OK", "OK"];
        script.extend_from_slice(dial_script);
        // Trailing OK acknowledges the post-dial ATH0
        script.push("OK");
        let (transport, sent) = ScriptedTransport::new(&script);
        (
            ModemBackend::with_transport(test_config(), Box::new(transport)),
            sent,
        )
    }

    #[tokio::test]
    async fn test_init_sequence() {
        let (mut backend, sent) = connected_backend(&[]);
        backend.connect().await.expect("connect");
        assert_eq!(backend.state(), ModemState::Ready);

        let sent = sent.lock().unwrap();
        assert_eq!(&sent[..4], &["ATZ", "ATE0", "ATQ0V1", "ATX4"]);
    }

    #[tokio::test]
    async fn test_init_failure_on_error() {
        let (transport, _) = ScriptedTransport::new(&["ERROR"]);
        let mut backend = ModemBackend::with_transport(test_config(), Box::new(transport));
        let err = backend.connect().await.expect_err("init must fail");
        assert!(matches!(err, BackendError::InitFailed { command } if command == "ATZ"));
        assert_eq!(backend.state(), ModemState::Idle);
    }

    #[tokio::test]
    async fn test_rings_then_no_carrier() {
        let (mut backend, sent) = connected_backend(&["RING", "RING", "NO CARRIER"]);
        backend.connect().await.expect("connect");

        let result = backend.dial("5552345678").await.expect("dial");
        assert_eq!(result.status, DialStatus::NoAnswer);
        assert!(result.message.contains("2 rings"));
        assert!(!result.success);
        assert_eq!(backend.state(), ModemState::Ready);

        let sent = sent.lock().unwrap();
        assert!(sent.contains(&"ATDT5552345678".to_string()));
    }

    #[tokio::test]
    async fn test_connect_with_speed_and_protocol() {
        let (mut backend, _) = connected_backend(&["CONNECT 28800/ARQ/V34"]);
        backend.connect().await.expect("connect");

        let result = backend.dial("5552345678").await.expect("dial");
        assert_eq!(result.status, DialStatus::Carrier);
        assert!(result.success);
        assert!(result.carrier_detected);
        assert_eq!(result.tone_type, Some(ToneType::Modem));
        assert_eq!(result.message, "Modem carrier at 28800 bps (ARQ/V34)");
    }

    #[tokio::test]
    async fn test_connect_speed_only() {
        let (mut backend, _) = connected_backend(&["CONNECT 2400"]);
        backend.connect().await.expect("connect");
        let result = backend.dial("5552345678").await.expect("dial");
        assert_eq!(result.message, "Modem carrier at 2400 bps");
    }

    #[tokio::test]
    async fn test_bare_connect_falls_back() {
        let (mut backend, _) = connected_backend(&["CONNECT"]);
        backend.connect().await.expect("connect");
        let result = backend.dial("5552345678").await.expect("dial");
        assert_eq!(result.status, DialStatus::Carrier);
        assert_eq!(result.message, "Carrier detected: CONNECT");
    }

    #[tokio::test]
    async fn test_busy_after_ring() {
        let (mut backend, _) = connected_backend(&["RING", "BUSY"]);
        backend.connect().await.expect("connect");
        let result = backend.dial("5552345678").await.expect("dial");
        assert_eq!(result.status, DialStatus::Busy);
        assert_eq!(result.message, "Busy after 1 rings");
    }

    #[tokio::test]
    async fn test_voice_answer() {
        let (mut backend, _) = connected_backend(&["RING", "VOICE"]);
        backend.connect().await.expect("connect");
        let result = backend.dial("5552345678").await.expect("dial");
        assert_eq!(result.status, DialStatus::Voice);
        assert!(result.success);
        assert!(!result.carrier_detected);
        assert_eq!(result.tone_type, Some(ToneType::Voice));
    }

    #[tokio::test]
    async fn test_fax_answer() {
        let (mut backend, _) = connected_backend(&["+FCO"]);
        backend.connect().await.expect("connect");
        let result = backend.dial("5552345678").await.expect("dial");
        assert_eq!(result.status, DialStatus::Fax);
        assert_eq!(result.tone_type, Some(ToneType::Fax));
    }

    #[tokio::test]
    async fn test_no_dial_tone() {
        let (mut backend, _) = connected_backend(&["NO DIALTONE"]);
        backend.connect().await.expect("connect");
        let result = backend.dial("5552345678").await.expect("dial");
        assert_eq!(result.status, DialStatus::Error);
        assert_eq!(result.message, "No dial tone");
    }

    #[tokio::test]
    async fn test_timeout_with_rings_is_ringing() {
        let (mut backend, _) = connected_backend(&["RING", "RING", "RING"]);
        backend.connect().await.expect("connect");
        let result = backend.dial("5552345678").await.expect("dial");
        assert_eq!(result.status, DialStatus::Ringing);
        assert_eq!(result.message, "No answer after 3 rings");
    }

    #[tokio::test]
    async fn test_silent_timeout() {
        let (mut backend, _) = connected_backend(&[]);
        backend.connect().await.expect("connect");
        let result = backend.dial("5552345678").await.expect("dial");
        assert_eq!(result.status, DialStatus::Timeout);
        assert_eq!(result.message, "Dial timeout - no answer");
    }

    #[tokio::test]
    async fn test_dial_requires_ready_state() {
        let (transport, _) = ScriptedTransport::new(&[]);
        let mut backend = ModemBackend::with_transport(test_config(), Box::new(transport));
        let err = backend.dial("5552345678").await.expect_err("not ready");
        assert!(matches!(err, BackendError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_dial_strips_formatting() {
        let (mut backend, sent) = connected_backend(&["BUSY"]);
        backend.connect().await.expect("connect");
        backend.dial("555-234-5678").await.expect("dial");
        let sent = sent.lock().unwrap();
        assert!(sent.contains(&"ATDT5552345678".to_string()));
    }

    #[test]
    fn test_describe_connect_unparseable() {
        assert_eq!(
            describe_connect("CONNECT FAST"),
            "Carrier detected: CONNECT FAST"
        );
    }
}
