//! Per-country number validation and formatting rules.
//!
//! A [`CountryProfile`] is static leaf data loaded once per run: the
//! calling code, the domestic digit-length bounds, and (for NANP-style
//! plans) the area/exchange sub-rules.

use crate::error::{Result, ValidationError};
use serde::{Deserialize, Serialize};

/// Validation and formatting rules for one calling code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryProfile {
    /// International calling code, without the `+`
    pub calling_code: String,
    /// Minimum domestic digit count
    pub min_length: usize,
    /// Maximum domestic digit count (equal to `min_length` for fixed plans)
    pub max_length: usize,
    /// Whether NANP area/exchange sub-rules apply
    pub nanp_rules: bool,
    /// Human-readable description of the plan
    pub description: String,
}

impl CountryProfile {
    /// USA/Canada NANP: exactly 10 digits, NXX-NXX-XXXX.
    #[must_use]
    pub fn nanp() -> Self {
        Self {
            calling_code: "1".to_string(),
            min_length: 10,
            max_length: 10,
            nanp_rules: true,
            description: "USA/Canada NANP: NXX-NXX-XXXX (N=2-9, X=0-9)".to_string(),
        }
    }

    /// United Kingdom: 10 digits after the calling code.
    #[must_use]
    pub fn uk() -> Self {
        Self {
            calling_code: "44".to_string(),
            min_length: 10,
            max_length: 10,
            nanp_rules: false,
            description: "UK: 10 digits after country code".to_string(),
        }
    }

    /// Germany: 10-11 digits after the calling code.
    #[must_use]
    pub fn germany() -> Self {
        Self {
            calling_code: "49".to_string(),
            min_length: 10,
            max_length: 11,
            nanp_rules: false,
            description: "Germany: 10-11 digits after country code".to_string(),
        }
    }

    /// Look up the profile for a calling code.
    ///
    /// Unknown calling codes fall back to a permissive 10-15 digit profile
    /// with a warning; validation then only checks length bounds.
    #[must_use]
    pub fn for_calling_code(calling_code: &str) -> Self {
        match calling_code {
            "1" => Self::nanp(),
            "44" => Self::uk(),
            "49" => Self::germany(),
            other => {
                tracing::warn!(
                    "Unknown calling code '{}', using permissive length-only profile",
                    other
                );
                Self {
                    calling_code: other.to_string(),
                    min_length: 10,
                    max_length: 15,
                    nanp_rules: false,
                    description: format!("Country code {other}"),
                }
            }
        }
    }

    /// Minimum digits a dial pattern must carry before generation.
    ///
    /// NANP patterns need a full area code; variable-length plans accept a
    /// single digit.
    #[must_use]
    pub fn min_pattern_length(&self) -> usize {
        if self.nanp_rules {
            3
        } else {
            1
        }
    }

    /// Strip formatting characters, leaving only digits.
    ///
    /// A leading `+` is dropped along with everything non-numeric, so
    /// `"+1 (555) 234-5678"` becomes `"15552345678"`.
    #[must_use]
    pub fn normalize(raw: &str) -> String {
        raw.chars().filter(char::is_ascii_digit).collect()
    }

    /// Strip this profile's calling code from normalized digits.
    ///
    /// For NANP the leading `1` is only treated as a calling code when the
    /// number is 11 digits, so area codes are never mistaken for it. Other
    /// profiles strip the code whenever the digits start with it.
    #[must_use]
    pub fn domestic_digits<'a>(&self, digits: &'a str) -> &'a str {
        let code = self.calling_code.as_str();
        let has_code = if self.nanp_rules {
            digits.len() == code.len() + self.max_length && digits.starts_with(code)
        } else {
            digits.starts_with(code) && digits.len() > self.max_length
        };

        if has_code {
            &digits[code.len()..]
        } else {
            digits
        }
    }

    /// Validate a full phone number against this profile.
    ///
    /// The input may carry formatting; it is normalized and the calling
    /// code is stripped before the checks run.
    pub fn validate(&self, phone_number: &str) -> Result<()> {
        if phone_number
            .chars()
            .any(|c| !c.is_ascii_digit() && !"+-() .".contains(c))
        {
            return Err(ValidationError::NonDigit {
                input: phone_number.to_string(),
            });
        }

        let normalized = Self::normalize(phone_number);
        let digits = self.domestic_digits(&normalized);

        if digits.len() < self.min_length {
            return Err(ValidationError::TooShort {
                got: digits.len(),
                min: self.min_length,
            });
        }
        if digits.len() > self.max_length {
            return Err(ValidationError::TooLong {
                got: digits.len(),
                max: self.max_length,
            });
        }

        if self.nanp_rules {
            self.validate_nanp_rules(digits, true)?;
        }

        Ok(())
    }

    /// Area/exchange checks shared by full numbers and patterns.
    ///
    /// `require_exchange` controls whether a missing exchange digit is an
    /// error (full numbers) or simply unchecked (short patterns).
    pub(crate) fn validate_nanp_rules(&self, digits: &str, require_exchange: bool) -> Result<()> {
        let area_code = &digits[0..3.min(digits.len())];

        if !area_code.starts_with(|c| ('2'..='9').contains(&c)) {
            return Err(ValidationError::BadAreaCode {
                area_code: area_code.to_string(),
            });
        }
        if area_code.len() == 3 && &area_code[1..3] == "11" {
            return Err(ValidationError::N11AreaCode {
                area_code: area_code.to_string(),
            });
        }

        if digits.len() >= 4 {
            let exchange_first = &digits[3..4];
            if !exchange_first.starts_with(|c| ('2'..='9').contains(&c)) {
                return Err(ValidationError::BadExchange {
                    exchange: digits[3..6.min(digits.len())].to_string(),
                });
            }
        } else if require_exchange {
            return Err(ValidationError::TooShort {
                got: digits.len(),
                min: self.min_length,
            });
        }

        Ok(())
    }

    /// Format domestic digits for display.
    ///
    /// NANP numbers render as `AAA-EEE-SSSS`; other plans are left as a
    /// plain digit run.
    #[must_use]
    pub fn format_domestic(&self, digits: &str) -> String {
        if self.nanp_rules && digits.len() == 10 {
            format!("{}-{}-{}", &digits[0..3], &digits[3..6], &digits[6..10])
        } else {
            digits.to_string()
        }
    }

    /// Format domestic digits in E.164 form, e.g. `+15552345678`.
    #[must_use]
    pub fn format_e164(&self, digits: &str) -> String {
        format!("+{}{}", self.calling_code, digits)
    }
}
