//! The backend contract and factory.

use crate::cloud::{CloudVoiceBackend, RestVoiceApi};
use crate::error::Result;
use crate::modem::ModemBackend;
use crate::simulated::SimulatedBackend;
use async_trait::async_trait;
use tonescan_core::{AppConfig, BackendKind, DialResult};
use tonescan_numbers::CountryProfile;

/// A telephony channel that can place one call at a time.
///
/// Lifecycle: `connect` once, `dial` repeatedly, `disconnect` once.
/// `dial` returns a [`DialResult`] for every call outcome, including
/// busy signals and timeouts; `Err` is reserved for fatal conditions
/// that make further dialing pointless.
#[async_trait]
pub trait TelephonyBackend: Send {
    /// Which backend variant this is.
    fn kind(&self) -> BackendKind;

    /// Whether `connect` has succeeded and `disconnect` has not yet run.
    fn is_connected(&self) -> bool;

    /// Acquire the underlying channel (open the serial port and init the
    /// modem, verify API credentials, or nothing for simulation).
    async fn connect(&mut self) -> Result<()>;

    /// Place one call and classify its outcome. The line is on-hook again
    /// when this returns.
    async fn dial(&mut self, phone_number: &str) -> Result<DialResult>;

    /// Terminate any in-progress call.
    async fn hangup(&mut self) -> Result<()>;

    /// Release the channel.
    async fn disconnect(&mut self) -> Result<()>;
}

/// Construct a backend from configuration.
///
/// # Errors
/// [`crate::BackendError::Auth`] when the cloud backend is selected
/// without an auth token.
pub fn create_backend(
    kind: BackendKind,
    config: &AppConfig,
    profile: &CountryProfile,
) -> Result<Box<dyn TelephonyBackend>> {
    tracing::info!("Creating {} backend", kind);
    match kind {
        BackendKind::Modem => Ok(Box::new(ModemBackend::new(config.modem.clone()))),
        BackendKind::CloudVoice => {
            let api = RestVoiceApi::new(&config.cloud)?;
            Ok(Box::new(CloudVoiceBackend::new(
                api,
                config.cloud.clone(),
                profile.clone(),
            )))
        }
        BackendKind::Simulated => Ok(Box::new(SimulatedBackend::new())),
    }
}
