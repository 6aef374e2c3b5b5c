//! Aggregate versions for optimistic concurrency control.

use serde::{Deserialize, Serialize};

/// Version number for an aggregate.
///
/// Versions start at 0 for an aggregate that has never been saved and
/// increment by 1 on every successful save.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the initial version (0) for an unsaved aggregate.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the first persisted version (1).
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_ordering() {
        let v1 = Version::new(1);
        let v2 = Version::new(2);
        assert!(v1 < v2);
        assert_eq!(v1.next(), v2);
    }

    #[test]
    fn test_initial_and_first() {
        assert_eq!(Version::initial().as_i64(), 0);
        assert_eq!(Version::first().as_i64(), 1);
        assert_eq!(Version::initial().next(), Version::first());
    }

    #[test]
    fn test_default_is_initial() {
        assert_eq!(Version::default(), Version::initial());
    }
}
