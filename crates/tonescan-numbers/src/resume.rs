//! Resume support: pattern inference and remaining-set computation.
//!
//! A resumed run re-derives its work set from the numbers a prior run
//! already dialed: the longest common digit prefix recovers the original
//! pattern, and the number space minus the dialed set is what remains.
//! Inference never guesses: an ambiguous set is an error that requires
//! an explicit prefix from the caller.

use crate::error::ResumeError;
use crate::pattern::PatternSpec;
use crate::profile::CountryProfile;
use crate::space::{DialOrder, NumberSpace};
use std::collections::HashSet;

/// Infer the dial pattern from a set of previously dialed numbers.
///
/// Computes the longest common digit prefix across the set. Because the
/// set is unordered, the prefix of its lexicographic minimum and maximum
/// equals the prefix of the whole set.
///
/// # Errors
/// - [`ResumeError::NoDialedNumbers`] for an empty set
/// - [`ResumeError::NoCommonPrefix`] when the numbers share no prefix, or
///   when the set normalizes to a single number (formatting variants of
///   one number cannot pin down the range that was being scanned)
pub fn infer_pattern(dialed: &HashSet<String>) -> Result<String, ResumeError> {
    if dialed.is_empty() {
        return Err(ResumeError::NoDialedNumbers);
    }

    // Formatting variants of the same number collapse to one entry here
    let normalized: HashSet<String> = dialed
        .iter()
        .map(|n| CountryProfile::normalize(n))
        .collect();

    if normalized.len() == 1 {
        return Err(ResumeError::NoCommonPrefix {
            reason: "a single dialed number does not determine a range".to_string(),
        });
    }

    let first = normalized
        .iter()
        .min()
        .ok_or(ResumeError::NoDialedNumbers)?;
    let last = normalized
        .iter()
        .max()
        .ok_or(ResumeError::NoDialedNumbers)?;

    let prefix: String = first
        .chars()
        .zip(last.chars())
        .take_while(|(a, b)| a == b)
        .map(|(a, _)| a)
        .collect();

    if prefix.is_empty() {
        return Err(ResumeError::NoCommonPrefix {
            reason: "dialed numbers share no leading digits".to_string(),
        });
    }

    tracing::info!(
        "Inferred pattern '{}' from {} dialed numbers",
        prefix,
        normalized.len()
    );
    Ok(prefix)
}

/// The remaining work set of an interrupted run.
///
/// Derived at startup, never persisted: `remaining = space(pattern) −
/// already dialed`, preserving the configured order over the remaining
/// elements only.
#[derive(Debug)]
pub struct ResumeIndex {
    pattern: PatternSpec,
    remaining: Vec<String>,
    already_dialed: usize,
}

impl ResumeIndex {
    /// Build the remaining set for a pattern.
    ///
    /// When `explicit_prefix` is `None` the pattern is inferred from the
    /// dialed set; an explicit prefix overrides inference entirely.
    ///
    /// # Errors
    /// Inference errors as [`infer_pattern`]; pattern compilation errors
    /// when the prefix (inferred or explicit) fails profile validation.
    pub fn build(
        dialed: &HashSet<String>,
        explicit_prefix: Option<&str>,
        profile: &CountryProfile,
        order: DialOrder,
    ) -> Result<Self, ResumeError> {
        let inferred = explicit_prefix.is_none();
        let prefix = match explicit_prefix {
            Some(prefix) => prefix.to_string(),
            None => infer_pattern(dialed)?,
        };

        let pattern = PatternSpec::compile(&prefix, profile)?;
        if inferred && pattern.free_digits() == 0 {
            // Happens on mixed-length sets whose shorter member is a
            // prefix of the longer one; only an explicit prefix can say
            // which range was meant
            return Err(ResumeError::NoCommonPrefix {
                reason: "inferred pattern is a complete number, not a range".to_string(),
            });
        }
        let space = NumberSpace::new(pattern.clone(), order);

        let dialed_digits: HashSet<String> = dialed
            .iter()
            .map(|n| CountryProfile::normalize(n))
            .collect();

        let remaining: Vec<String> = space
            .iter()
            .filter(|candidate| !dialed_digits.contains(candidate))
            .collect();

        tracing::info!(
            "Resume for '{}': {} already dialed, {} remaining",
            pattern,
            dialed.len(),
            remaining.len()
        );

        Ok(Self {
            pattern,
            remaining,
            already_dialed: dialed.len(),
        })
    }

    /// The pattern the remaining set was derived from.
    #[must_use]
    pub fn pattern(&self) -> &PatternSpec {
        &self.pattern
    }

    /// Numbers still to be dialed, in configured order.
    #[must_use]
    pub fn remaining(&self) -> &[String] {
        &self.remaining
    }

    /// How many numbers the prior run already dialed.
    #[must_use]
    pub fn already_dialed(&self) -> usize {
        self.already_dialed
    }

    /// Whether the prior run covered the whole space.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Consume the index, yielding the remaining numbers in order.
    #[must_use]
    pub fn into_remaining(self) -> Vec<String> {
        self.remaining
    }
}
