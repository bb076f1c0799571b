//! The sequential dial loop.

use crate::control::ControlSignal;
use crate::error::Result;
use std::time::Duration;
use tokio::sync::watch;
use tonescan_core::{SessionMetadata, ToneType};
use tonescan_storage::ResultSink;
use tonescan_telephony::TelephonyBackend;

/// What a finished session looks like.
#[derive(Debug)]
pub struct SessionReport {
    /// Final metadata, end time stamped
    pub metadata: SessionMetadata,
    /// True when the number list was exhausted; false when canceled
    pub completed: bool,
}

/// One dialing run over a fixed list of candidates.
///
/// The loop is strictly sequential: dial, record, persist, delay, next.
/// Metadata is persisted before the first dial and re-persisted after
/// every call, so an interrupted run can be resumed from storage.
pub struct DialSession {
    metadata: SessionMetadata,
    numbers: Vec<String>,
    delay: Duration,
    control: watch::Receiver<ControlSignal>,
}

impl DialSession {
    /// Create a session over a candidate list.
    #[must_use]
    pub fn new(
        metadata: SessionMetadata,
        numbers: Vec<String>,
        delay_between_dials_ms: u64,
        control: watch::Receiver<ControlSignal>,
    ) -> Self {
        Self {
            metadata,
            numbers,
            delay: Duration::from_millis(delay_between_dials_ms),
            control,
        }
    }

    /// The session id results will be stamped with.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.metadata.session_id
    }

    /// Dial every candidate, recording each outcome.
    ///
    /// The backend must already be connected. Signals are honored at
    /// number boundaries: `Pause` parks the loop, `Cancel` finalizes and
    /// returns with `completed: false`.
    ///
    /// # Errors
    /// Fatal backend or storage failures abort the run; both paths make a
    /// best-effort attempt to persist the session end time first.
    pub async fn run(
        mut self,
        backend: &mut dyn TelephonyBackend,
        sink: &mut dyn ResultSink,
    ) -> Result<SessionReport> {
        tracing::info!(
            "Session {} starting: {} numbers via {} backend",
            self.metadata.session_id,
            self.numbers.len(),
            self.metadata.backend_kind
        );
        sink.write_session(&self.metadata).await?;

        let numbers = std::mem::take(&mut self.numbers);
        let total = numbers.len();
        let mut canceled = false;

        for (position, number) in numbers.iter().enumerate() {
            if self.wait_for_go().await == ControlSignal::Cancel {
                tracing::info!(
                    "Session {} canceled at {}/{}",
                    self.metadata.session_id,
                    position,
                    total
                );
                canceled = true;
                break;
            }

            let result = match backend.dial(number).await {
                Ok(result) => result.stamped(&self.metadata.session_id),
                Err(err) => {
                    tracing::error!("Fatal backend failure dialing {}: {}", number, err);
                    self.finish(sink).await;
                    return Err(err.into());
                }
            };

            let modem_detected =
                result.carrier_detected || result.tone_type == Some(ToneType::Modem);
            self.metadata.record_call(result.success, modem_detected);

            tracing::info!(
                "[{}/{}] {} -> {}: {}",
                position + 1,
                total,
                result.phone_number,
                result.status,
                result.message
            );
            if let Err(err) = sink.write_result(&result).await {
                tracing::error!("Failed to persist result for {}: {}", result.phone_number, err);
                self.finish(sink).await;
                return Err(err.into());
            }
            if let Err(err) = sink.write_session(&self.metadata).await {
                tracing::error!("Failed to persist session snapshot: {}", err);
                self.finish(sink).await;
                return Err(err.into());
            }

            if position + 1 < total && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        self.finish(sink).await;
        tracing::info!(
            "Session {} done: {} calls, {} successful, {} modem carriers",
            self.metadata.session_id,
            self.metadata.total_calls,
            self.metadata.successful_calls,
            self.metadata.modem_detections
        );
        Ok(SessionReport {
            metadata: self.metadata,
            completed: !canceled,
        })
    }

    /// Block until the signal allows progress. Returns `Run` to proceed
    /// or `Cancel` to stop; never returns `Pause`.
    async fn wait_for_go(&mut self) -> ControlSignal {
        loop {
            let signal = *self.control.borrow();
            match signal {
                ControlSignal::Run | ControlSignal::Cancel => return signal,
                ControlSignal::Pause => {
                    tracing::info!("Session {} paused", self.metadata.session_id);
                    if self.control.changed().await.is_err() {
                        // Controller gone while parked; nothing can resume us
                        return ControlSignal::Cancel;
                    }
                }
            }
        }
    }

    /// Stamp the end time and persist, swallowing storage failures so a
    /// fatal-error path still reports the original error.
    async fn finish(&mut self, sink: &mut dyn ResultSink) {
        self.metadata.finalize();
        if let Err(err) = sink.write_session(&self.metadata).await {
            tracing::warn!("Failed to persist session end: {}", err);
        }
        if let Err(err) = sink.flush().await {
            tracing::warn!("Failed to flush sink: {}", err);
        }
    }
}
