//! Simulated backend: weighted-random outcomes, no I/O.

use crate::backend::TelephonyBackend;
use crate::error::{BackendError, Result};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tonescan_core::{BackendKind, DialResult, DialStatus, ToneType};

/// Outcome distribution, roughly what a residential exchange sounds like.
const OUTCOME_WEIGHTS: [(DialStatus, f64); 6] = [
    (DialStatus::NoAnswer, 0.40),
    (DialStatus::Busy, 0.20),
    (DialStatus::Voice, 0.15),
    (DialStatus::Carrier, 0.10),
    (DialStatus::Error, 0.10),
    (DialStatus::Ringing, 0.05),
];

const ERROR_MESSAGES: [&str; 3] = ["Invalid number", "Number not in service", "Circuit busy"];

/// Telephony backend that fabricates outcomes. Useful for exercising the
/// session engine and storage without a phone line or an API account.
pub struct SimulatedBackend {
    rng: StdRng,
    connected: bool,
}

impl SimulatedBackend {
    /// Create a backend with entropy-seeded outcomes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            connected: false,
        }
    }

    /// Create a backend with a fixed seed for reproducible runs.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            connected: false,
        }
    }

    fn draw_status(&mut self) -> DialStatus {
        let roll: f64 = self.rng.gen();
        let mut cumulative = 0.0;
        for (status, weight) in OUTCOME_WEIGHTS {
            cumulative += weight;
            if roll < cumulative {
                return status;
            }
        }
        // Unreachable unless the weights stop summing to 1.0
        DialStatus::NoAnswer
    }

    fn fabricate(&mut self, phone_number: &str) -> DialResult {
        match self.draw_status() {
            DialStatus::NoAnswer => {
                let rings = self.rng.gen_range(4..=8);
                DialResult::new(
                    phone_number,
                    DialStatus::NoAnswer,
                    format!("No answer after {rings} rings"),
                )
            }
            DialStatus::Busy => {
                DialResult::new(phone_number, DialStatus::Busy, "Busy signal detected")
            }
            DialStatus::Voice => {
                DialResult::new(phone_number, DialStatus::Voice, "Voice answer detected")
                    .with_tone(false, ToneType::Voice)
            }
            DialStatus::Carrier => {
                let speed = [1200, 2400, 9600, 14_400, 28_800, 33_600]
                    [self.rng.gen_range(0..6)];
                DialResult::new(
                    phone_number,
                    DialStatus::Carrier,
                    format!("Modem carrier at {speed} bps"),
                )
                .with_tone(true, ToneType::Modem)
            }
            DialStatus::Error => {
                let message = ERROR_MESSAGES[self.rng.gen_range(0..ERROR_MESSAGES.len())];
                DialResult::new(phone_number, DialStatus::Error, message)
            }
            _ => DialResult::new(phone_number, DialStatus::Ringing, "Ringing, never answered"),
        }
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TelephonyBackend for SimulatedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Simulated
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn connect(&mut self) -> Result<()> {
        self.connected = true;
        tracing::info!("Simulated backend ready");
        Ok(())
    }

    async fn dial(&mut self, phone_number: &str) -> Result<DialResult> {
        if !self.connected {
            return Err(BackendError::NotConnected);
        }
        let result = self.fabricate(phone_number);
        tracing::debug!("Simulated {} for {}", result.status, phone_number);
        Ok(result)
    }

    async fn hangup(&mut self) -> Result<()> {
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_seeded_runs_are_reproducible() {
        let mut first = SimulatedBackend::with_seed(7);
        let mut second = SimulatedBackend::with_seed(7);
        first.connect().await.expect("connect");
        second.connect().await.expect("connect");

        for i in 0..50 {
            let number = format!("55523456{i:02}");
            let a = first.dial(&number).await.expect("dial");
            let b = second.dial(&number).await.expect("dial");
            assert_eq!(a.status, b.status);
            assert_eq!(a.message, b.message);
        }
    }

    #[tokio::test]
    async fn test_outcome_distribution_covers_all_statuses() {
        let mut backend = SimulatedBackend::with_seed(1234);
        backend.connect().await.expect("connect");

        let mut counts: HashMap<DialStatus, u32> = HashMap::new();
        for i in 0..2000 {
            let result = backend.dial(&format!("{:010}", 5_552_340_000u64 + i)).await.expect("dial");
            *counts.entry(result.status).or_default() += 1;
        }

        for (status, _) in OUTCOME_WEIGHTS {
            assert!(counts.contains_key(&status), "missing {status:?} in 2000 draws");
        }
        // No answer is the dominant outcome
        assert!(counts[&DialStatus::NoAnswer] > counts[&DialStatus::Carrier]);
    }

    #[tokio::test]
    async fn test_dial_requires_connect() {
        let mut backend = SimulatedBackend::with_seed(1);
        let err = backend.dial("5552345678").await.expect_err("not connected");
        assert!(matches!(err, BackendError::NotConnected));
    }

    #[tokio::test]
    async fn test_carrier_results_carry_tone() {
        let mut backend = SimulatedBackend::with_seed(99);
        backend.connect().await.expect("connect");
        for i in 0..500 {
            let result = backend.dial(&format!("{:010}", 5_552_340_000u64 + i)).await.expect("dial");
            if result.status == DialStatus::Carrier {
                assert!(result.carrier_detected);
                assert_eq!(result.tone_type, Some(ToneType::Modem));
            }
        }
    }
}
