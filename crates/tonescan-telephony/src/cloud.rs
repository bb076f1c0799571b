//! Cloud voice-calling backend.
//!
//! Places calls through a Twilio-compatible REST API and classifies the
//! outcome by polling call status. Carrier detection over a voice API is
//! a heuristic: an answered call that ends within a few seconds looks
//! like a modem handshake dropping a call with nobody speaking. It
//! misclassifies short human answers and is documented as approximate.

use crate::backend::TelephonyBackend;
use crate::error::{BackendError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tonescan_core::{BackendKind, CloudConfig, DialResult, DialStatus, ToneType};
use tonescan_numbers::CountryProfile;

/// Completed calls shorter than this are classified as modem carriers.
const CARRIER_MAX_DURATION_SECS: f64 = 3.0;

/// Instructions used when the config names no instructions URL. Plays a
/// short prompt and hangs up, which keeps answered-call durations honest.
const DEFAULT_INSTRUCTIONS_URL: &str = "http://demo.twilio.com/docs/voice.xml";

/// Terminal status of a placed call, as reported by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CallStatus {
    /// Provider status string (`queued`, `ringing`, `in-progress`,
    /// `completed`, `busy`, `no-answer`, `failed`, `canceled`)
    pub status: String,
    /// Call duration in seconds, present once the call completed
    pub duration_secs: Option<f64>,
}

impl CallStatus {
    fn is_terminal(&self) -> bool {
        matches!(
            self.status.as_str(),
            "completed" | "busy" | "no-answer" | "failed" | "canceled"
        )
    }
}

/// Provider API surface the cloud backend needs.
#[async_trait]
pub trait VoiceApi: Send + Sync {
    /// Verify credentials; returns the account's display name.
    async fn verify_account(&self) -> Result<String>;

    /// Place a call and return the provider's call id.
    async fn place_call(&self, from: &str, to: &str, instructions_url: &str) -> Result<String>;

    /// Fetch the current status of a call.
    async fn poll_status(&self, call_id: &str) -> Result<CallStatus>;

    /// Terminate an in-progress call.
    async fn end_call(&self, call_id: &str) -> Result<()>;
}

#[derive(Deserialize)]
struct AccountResponse {
    friendly_name: String,
}

#[derive(Deserialize)]
struct CallResponse {
    sid: String,
}

#[derive(Deserialize)]
struct CallStatusResponse {
    status: String,
    duration: Option<String>,
}

/// [`VoiceApi`] over a Twilio-shaped REST endpoint.
#[derive(Debug)]
pub struct RestVoiceApi {
    client: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
}

impl RestVoiceApi {
    /// Build an API client from cloud settings.
    ///
    /// # Errors
    /// [`BackendError::Auth`] when no auth token is configured.
    pub fn new(config: &CloudConfig) -> Result<Self> {
        let auth_token = config
            .auth_token
            .clone()
            .ok_or_else(|| BackendError::Auth("no auth token configured".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            account_sid: config.account_sid.clone(),
            auth_token,
        })
    }

    fn account_url(&self, suffix: &str) -> String {
        format!(
            "{}/Accounts/{}{suffix}",
            self.base_url, self.account_sid
        )
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(BackendError::Auth(message));
        }
        Err(BackendError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl VoiceApi for RestVoiceApi {
    async fn verify_account(&self) -> Result<String> {
        let response = self
            .client
            .get(self.account_url(".json"))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await?;
        let account: AccountResponse = Self::check(response).await?.json().await?;
        Ok(account.friendly_name)
    }

    async fn place_call(&self, from: &str, to: &str, instructions_url: &str) -> Result<String> {
        let response = self
            .client
            .post(self.account_url("/Calls.json"))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", from), ("Url", instructions_url)])
            .send()
            .await?;
        let call: CallResponse = Self::check(response).await?.json().await?;
        Ok(call.sid)
    }

    async fn poll_status(&self, call_id: &str) -> Result<CallStatus> {
        let response = self
            .client
            .get(self.account_url(&format!("/Calls/{call_id}.json")))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await?;
        let status: CallStatusResponse = Self::check(response).await?.json().await?;
        Ok(CallStatus {
            status: status.status,
            duration_secs: status.duration.and_then(|d| d.parse().ok()),
        })
    }

    async fn end_call(&self, call_id: &str) -> Result<()> {
        let response = self
            .client
            .post(self.account_url(&format!("/Calls/{call_id}.json")))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("Status", "completed")])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

/// Telephony backend over a [`VoiceApi`] provider.
pub struct CloudVoiceBackend<A: VoiceApi> {
    api: A,
    config: CloudConfig,
    profile: CountryProfile,
    connected: bool,
    current_call: Option<String>,
}

impl<A: VoiceApi> CloudVoiceBackend<A> {
    /// Create a backend over a provider API.
    #[must_use]
    pub fn new(api: A, config: CloudConfig, profile: CountryProfile) -> Self {
        Self {
            api,
            config,
            profile,
            connected: false,
            current_call: None,
        }
    }

    /// Normalize a number to E.164 under the configured country profile.
    /// A bare domestic number gets the profile's calling code prefixed.
    fn to_e164(&self, phone_number: &str) -> String {
        let digits = CountryProfile::normalize(phone_number);
        self.profile
            .format_e164(self.profile.domestic_digits(&digits))
    }

    fn classify_terminal(&self, phone_number: &str, status: &CallStatus) -> DialResult {
        match status.status.as_str() {
            "completed" => {
                let duration = status.duration_secs.unwrap_or(0.0);
                if duration < CARRIER_MAX_DURATION_SECS {
                    DialResult::new(
                        phone_number,
                        DialStatus::Carrier,
                        format!("Possible modem carrier (short call: {duration:.1}s)"),
                    )
                    .with_tone(true, ToneType::Modem)
                } else {
                    DialResult::new(
                        phone_number,
                        DialStatus::Voice,
                        format!("Call answered, duration {duration:.0}s"),
                    )
                    .with_tone(false, ToneType::Voice)
                }
            }
            "busy" => DialResult::new(phone_number, DialStatus::Busy, "Busy signal"),
            "no-answer" => DialResult::new(phone_number, DialStatus::NoAnswer, "No answer"),
            other => DialResult::new(
                phone_number,
                DialStatus::Error,
                format!("Call {other}"),
            ),
        }
    }
}

#[async_trait]
impl<A: VoiceApi> TelephonyBackend for CloudVoiceBackend<A> {
    fn kind(&self) -> BackendKind {
        BackendKind::CloudVoice
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn connect(&mut self) -> Result<()> {
        let friendly_name = self.api.verify_account().await?;
        tracing::info!("Voice API account verified: {}", friendly_name);
        self.connected = true;
        Ok(())
    }

    async fn dial(&mut self, phone_number: &str) -> Result<DialResult> {
        if !self.connected {
            return Err(BackendError::NotConnected);
        }

        let to = self.to_e164(phone_number);
        let instructions_url = self
            .config
            .instructions_url
            .as_deref()
            .unwrap_or(DEFAULT_INSTRUCTIONS_URL);

        tracing::info!("Placing call to {}", to);
        let call_id = self
            .api
            .place_call(&self.config.from_number, &to, instructions_url)
            .await?;
        self.current_call = Some(call_id.clone());

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        for _ in 0..self.config.max_polls {
            let status = self.api.poll_status(&call_id).await?;
            if status.is_terminal() {
                self.current_call = None;
                tracing::debug!("Call {} ended: {}", call_id, status.status);
                return Ok(self.classify_terminal(phone_number, &status));
            }
            tokio::time::sleep(poll_interval).await;
        }

        // Poll ceiling: end the call so the line frees up, then report
        if let Err(err) = self.api.end_call(&call_id).await {
            tracing::warn!("Failed to end call {}: {}", call_id, err);
        }
        self.current_call = None;
        Ok(DialResult::new(
            phone_number,
            DialStatus::Timeout,
            format!("No terminal status after {} polls", self.config.max_polls),
        ))
    }

    async fn hangup(&mut self) -> Result<()> {
        if let Some(call_id) = self.current_call.take() {
            self.api.end_call(&call_id).await?;
        }
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.hangup().await?;
        self.connected = false;
        Ok(())
    }
}
