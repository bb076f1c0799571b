//! Partial dial patterns with eager pre-validation.

use crate::error::{Result, ValidationError};
use crate::profile::CountryProfile;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated partial phone number used to enumerate a range.
///
/// Compilation fails fast: a pattern that is too short or breaks the
/// profile's prefix rules is rejected here, before any generation is
/// attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSpec {
    digits: String,
    profile: CountryProfile,
}

impl PatternSpec {
    /// Compile a raw pattern against a country profile.
    ///
    /// The raw input may carry formatting (`"555-234-56"`); it is
    /// normalized and the calling code stripped before validation.
    ///
    /// # Errors
    /// - [`ValidationError::NonDigit`] for non-numeric input
    /// - [`ValidationError::PatternTooShort`] below the profile's minimum
    ///   prefix (the full area code for NANP plans)
    /// - [`ValidationError::TooLong`] beyond the profile's maximum length
    /// - NANP sub-rule errors on the prefix digits that are present
    pub fn compile(raw: &str, profile: &CountryProfile) -> Result<Self> {
        if raw
            .chars()
            .any(|c| !c.is_ascii_digit() && !"+-() .".contains(c))
        {
            return Err(ValidationError::NonDigit {
                input: raw.to_string(),
            });
        }

        let normalized = CountryProfile::normalize(raw);
        let digits = profile.domestic_digits(&normalized).to_string();

        let min = profile.min_pattern_length();
        if digits.len() < min {
            return Err(ValidationError::PatternTooShort {
                got: digits.len(),
                min,
            });
        }
        if digits.len() > profile.max_length {
            return Err(ValidationError::TooLong {
                got: digits.len(),
                max: profile.max_length,
            });
        }

        if profile.nanp_rules {
            // Check the sub-rules only as far as the prefix reaches
            profile.validate_nanp_rules(&digits, false)?;
        }

        tracing::debug!(
            "Compiled pattern '{}' ({} fixed digits, {} free)",
            digits,
            digits.len(),
            profile.min_length.saturating_sub(digits.len())
        );

        Ok(Self {
            digits,
            profile: profile.clone(),
        })
    }

    /// The fixed prefix digits.
    #[must_use]
    pub fn digits(&self) -> &str {
        &self.digits
    }

    /// The profile this pattern was compiled against.
    #[must_use]
    pub fn profile(&self) -> &CountryProfile {
        &self.profile
    }

    /// Target length of generated numbers.
    ///
    /// Fixed-length plans use their exact length; variable-length plans
    /// complete to the minimum length (the smallest enumerable space).
    #[must_use]
    pub fn target_length(&self) -> usize {
        self.profile.min_length.max(self.digits.len())
    }

    /// Number of free digits to enumerate.
    #[must_use]
    pub fn free_digits(&self) -> usize {
        self.target_length() - self.digits.len()
    }
}

impl fmt::Display for PatternSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.digits)
    }
}
