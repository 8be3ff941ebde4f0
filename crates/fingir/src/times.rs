//! Repetition bounds for sequence steps.
//!
//! A [`Times`] is the `[min, max]` repetition window declared for one step.
//! Its `Display` rendering is the exact wording used in failure messages,
//! e.g. "exactly 1 times" or "at least 2 times".

use serde::{Deserialize, Serialize};
use std::fmt;

/// Repetition bound for one declared step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Times {
    min: u64,
    max: Option<u64>,
}

impl Times {
    /// Exactly once, the default bound for a step declared without one
    #[must_use]
    pub fn once() -> Self {
        Self::exactly(1)
    }

    /// Exactly `n` matches
    #[must_use]
    pub fn exactly(n: u64) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    /// `n` or more matches
    #[must_use]
    pub fn at_least(n: u64) -> Self {
        Self { min: n, max: None }
    }

    /// One or more matches
    #[must_use]
    pub fn at_least_once() -> Self {
        Self::at_least(1)
    }

    /// Up to `n` matches, including zero
    #[must_use]
    pub fn at_most(n: u64) -> Self {
        Self {
            min: 0,
            max: Some(n),
        }
    }

    /// Zero or one match
    #[must_use]
    pub fn at_most_once() -> Self {
        Self::at_most(1)
    }

    /// Between `min` and `max` matches, inclusive
    ///
    /// # Panics
    ///
    /// Panics if `min > max`; an inverted window is a programming error.
    #[must_use]
    pub fn between(min: u64, max: u64) -> Self {
        assert!(min <= max, "Times::between requires min <= max");
        Self {
            min,
            max: Some(max),
        }
    }

    /// No matches at all
    #[must_use]
    pub fn never() -> Self {
        Self::exactly(0)
    }

    /// The "optional" sentinel: any number of matches, including zero
    #[must_use]
    pub fn any() -> Self {
        Self { min: 0, max: None }
    }

    /// Lower bound
    #[must_use]
    pub fn min(&self) -> u64 {
        self.min
    }

    /// Upper bound, `None` meaning unbounded
    #[must_use]
    pub fn max(&self) -> Option<u64> {
        self.max
    }

    /// Whether `count` falls inside the window
    #[must_use]
    pub fn allows(&self, count: u64) -> bool {
        count >= self.min && self.within_max(count)
    }

    /// Whether the lower bound is met
    #[must_use]
    pub fn is_met(&self, count: u64) -> bool {
        count >= self.min
    }

    /// Whether `count` does not exceed the upper bound
    #[must_use]
    pub fn within_max(&self, count: u64) -> bool {
        self.max.map_or(true, |m| count <= m)
    }

    /// The same window with its upper bound removed
    ///
    /// Used when verifying lifetime totals on cyclical scripts, where laps
    /// multiply counts past any per-lap maximum.
    #[must_use]
    pub fn min_only(&self) -> Self {
        Self {
            min: self.min,
            max: None,
        }
    }
}

impl Default for Times {
    fn default() -> Self {
        Self::once()
    }
}

impl fmt::Display for Times {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (0, Some(0)) => write!(f, "never"),
            (min, Some(max)) if min == max => write!(f, "exactly {min} times"),
            (0, None) => write!(f, "any number of times"),
            (min, None) => write!(f, "at least {min} times"),
            (0, Some(max)) => write!(f, "at most {max} times"),
            (min, Some(max)) => write!(f, "between {min} and {max} times"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_exactly_once() {
        assert_eq!(Times::default(), Times::exactly(1));
    }

    #[test]
    fn test_allows_window() {
        let t = Times::between(2, 4);
        assert!(!t.allows(1));
        assert!(t.allows(2));
        assert!(t.allows(4));
        assert!(!t.allows(5));
    }

    #[test]
    fn test_at_least_is_unbounded() {
        let t = Times::at_least(2);
        assert!(!t.allows(1));
        assert!(t.allows(1_000_000));
        assert!(t.within_max(u64::MAX));
    }

    #[test]
    fn test_optional_sentinel_allows_anything() {
        let t = Times::any();
        assert!(t.allows(0));
        assert!(t.allows(42));
        assert!(t.is_met(0));
    }

    #[test]
    fn test_display_wording() {
        assert_eq!(Times::once().to_string(), "exactly 1 times");
        assert_eq!(Times::exactly(3).to_string(), "exactly 3 times");
        assert_eq!(Times::at_least(2).to_string(), "at least 2 times");
        assert_eq!(Times::at_most(1).to_string(), "at most 1 times");
        assert_eq!(Times::between(1, 2).to_string(), "between 1 and 2 times");
        assert_eq!(Times::never().to_string(), "never");
        assert_eq!(Times::any().to_string(), "any number of times");
    }

    #[test]
    fn test_min_only_drops_the_ceiling() {
        let t = Times::exactly(2).min_only();
        assert!(t.allows(2));
        assert!(t.allows(9));
        assert!(!t.allows(1));
    }

    #[test]
    #[should_panic(expected = "min <= max")]
    fn test_inverted_between_panics() {
        let _ = Times::between(3, 1);
    }
}
