//! Lazy enumeration of a pattern's candidate numbers.

use crate::pattern::PatternSpec;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tonescan_core::SessionConfig;

/// Order in which candidates are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialOrder {
    /// Lexicographic suffix order, index 0 upward
    Sequential,
    /// Fisher-Yates permutation of the suffix indices under a fixed seed.
    /// The same seed always produces the same order, which resumed
    /// sessions rely on.
    Shuffled {
        /// RNG seed for the permutation
        seed: u64,
    },
}

impl DialOrder {
    /// Derive the dial order from session settings.
    ///
    /// A randomized session without a configured seed gets a fresh random
    /// one; the chosen seed is logged so the run can be reproduced.
    #[must_use]
    pub fn from_session_config(config: &SessionConfig) -> Self {
        if config.randomize {
            let seed = config.shuffle_seed.unwrap_or_else(rand::random);
            tracing::info!("Shuffled dial order, seed {}", seed);
            Self::Shuffled { seed }
        } else {
            Self::Sequential
        }
    }
}

/// The candidate space of a compiled pattern.
///
/// Generation is a pure function of (pattern, profile, order, seed): the
/// iterator completes the free digits in the configured order and yields
/// only candidates that satisfy the profile's validation predicate.
/// Invalid completions are skipped, never emitted.
#[derive(Debug, Clone)]
pub struct NumberSpace {
    pattern: PatternSpec,
    order: DialOrder,
}

impl NumberSpace {
    /// Create the candidate space for a pattern.
    #[must_use]
    pub fn new(pattern: PatternSpec, order: DialOrder) -> Self {
        Self { pattern, order }
    }

    /// The pattern this space enumerates.
    #[must_use]
    pub fn pattern(&self) -> &PatternSpec {
        &self.pattern
    }

    /// The configured dial order.
    #[must_use]
    pub fn order(&self) -> DialOrder {
        self.order
    }

    /// Size of the raw suffix space, before validation filtering.
    #[must_use]
    pub fn suffix_count(&self) -> u64 {
        10u64.pow(self.pattern.free_digits() as u32)
    }

    /// Iterate the valid candidates in the configured order.
    #[must_use]
    pub fn iter(&self) -> NumberSpaceIter {
        let total = self.suffix_count();
        let indices = match self.order {
            DialOrder::Sequential => Indices::Sequential(0..total),
            DialOrder::Shuffled { seed } => {
                // The permutation is materialized (indices only, not the
                // candidate strings); sequential order stays fully lazy.
                let mut indices: Vec<u64> = (0..total).collect();
                let mut rng = StdRng::seed_from_u64(seed);
                indices.shuffle(&mut rng);
                Indices::Shuffled(indices.into_iter())
            }
        };

        NumberSpaceIter {
            pattern: self.pattern.clone(),
            indices,
        }
    }
}

impl IntoIterator for &NumberSpace {
    type Item = String;
    type IntoIter = NumberSpaceIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

enum Indices {
    Sequential(std::ops::Range<u64>),
    Shuffled(std::vec::IntoIter<u64>),
}

impl Iterator for Indices {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        match self {
            Self::Sequential(range) => range.next(),
            Self::Shuffled(iter) => iter.next(),
        }
    }
}

/// Iterator over a space's valid candidates.
pub struct NumberSpaceIter {
    pattern: PatternSpec,
    indices: Indices,
}

impl Iterator for NumberSpaceIter {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let width = self.pattern.free_digits();
        loop {
            let index = self.indices.next()?;
            let candidate = if width == 0 {
                self.pattern.digits().to_string()
            } else {
                format!("{}{index:0width$}", self.pattern.digits())
            };

            match self.pattern.profile().validate(&candidate) {
                Ok(()) => return Some(candidate),
                Err(err) => {
                    tracing::trace!("Skipping invalid completion {}: {}", candidate, err);
                }
            }
        }
    }
}
