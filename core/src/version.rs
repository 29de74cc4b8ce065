//! Version values and field lifecycle resolution.
//!
//! A [`Version`] is a dot-separated sequence of numeric components
//! (`"0.1"`, `"1.0.0"`). Versions are totally ordered and normalized so
//! that trailing zero components do not matter: `0.1 == 0.1.0`.
//!
//! A [`VersionSpec`] attaches optional `added` / `deprecated` /
//! `deleted` thresholds to a field; [`VersionSpec::resolve`] maps the
//! spec and an instance's bound version to a [`LifecycleState`].
//!
//! # Examples
//!
//! ```
//! use cfgmodel_core::{LifecycleState, Version, VersionSpec};
//!
//! let spec = VersionSpec {
//!     deprecated: Some("0.1".parse().unwrap()),
//!     deleted: Some("0.3".parse().unwrap()),
//!     ..Default::default()
//! };
//!
//! let at = |v: &str| spec.resolve(&v.parse::<Version>().unwrap());
//! assert_eq!(at("0.0"), LifecycleState::Active);
//! assert_eq!(at("0.1"), LifecycleState::Deprecated);
//! assert_eq!(at("0.3"), LifecycleState::Deleted);
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Ordered version value with numeric dot-separated components.
///
/// Comparison is componentwise; the representation is normalized by
/// stripping trailing zero components, so `"1.0"` and `"1.0.0"` parse
/// to equal values.
///
/// # Examples
///
/// ```
/// use cfgmodel_core::Version;
///
/// let a: Version = "0.1".parse().unwrap();
/// let b: Version = "0.10".parse().unwrap();
/// assert!(a < b);
/// assert_eq!(a, "0.1.0".parse().unwrap());
/// assert_eq!(b.to_string(), "0.10");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(Vec<u64>);

impl Version {
    /// Builds a version from raw components.
    ///
    /// Trailing zero components are stripped; an all-zero or empty
    /// component list yields the minimum version `0`.
    pub fn new(components: Vec<u64>) -> Self {
        let mut components = components;
        while components.len() > 1 && components.last() == Some(&0) {
            components.pop();
        }
        if components.is_empty() {
            components.push(0);
        }
        Version(components)
    }

    /// The minimum version, `0`. Default bound for unversioned schemas.
    pub fn min() -> Self {
        Version(vec![0])
    }

    /// Raw numeric components after normalization.
    pub fn components(&self) -> &[u64] {
        &self.0
    }
}

impl FromStr for Version {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ConfigError::InvalidVersion(s.to_string()));
        }
        let components = s
            .trim()
            .split('.')
            .map(|part| {
                part.parse::<u64>()
                    .map_err(|_| ConfigError::InvalidVersion(s.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Version::new(components))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .0
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(".");
        write!(f, "{rendered}")
    }
}

/// Lifecycle state of one field in one instance.
///
/// Resolved once per field at construction time from the field's
/// [`VersionSpec`] and the instance's bound version, never recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Present and fully usable.
    Active,
    /// `added` is later than the bound version; hidden from the
    /// instance's public field set.
    NotYetAdded,
    /// Usable, but every read emits a warning.
    Deprecated,
    /// `deleted` is at or before the bound version; hidden from the
    /// instance's public field set and reads fail.
    Deleted,
}

/// Optional version thresholds attached to a field.
///
/// Absent `added` behaves as the minimum version; absent `deprecated`
/// or `deleted` never trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionSpec {
    /// Version the field first appears in.
    pub added: Option<Version>,
    /// Version the field starts warning on access.
    pub deprecated: Option<Version>,
    /// Version the field stops existing in.
    pub deleted: Option<Version>,
}

impl VersionSpec {
    /// Returns `true` if no threshold is set.
    pub fn is_empty(&self) -> bool {
        self.added.is_none() && self.deprecated.is_none() && self.deleted.is_none()
    }

    /// Resolves the lifecycle state at a bound version.
    ///
    /// Deletion takes precedence over deprecation when both thresholds
    /// have passed.
    pub fn resolve(&self, bound: &Version) -> LifecycleState {
        if let Some(added) = &self.added {
            if added > bound {
                return LifecycleState::NotYetAdded;
            }
        }
        if let Some(deleted) = &self.deleted {
            if deleted <= bound {
                return LifecycleState::Deleted;
            }
        }
        if let Some(deprecated) = &self.deprecated {
            if deprecated <= bound {
                return LifecycleState::Deprecated;
            }
        }
        LifecycleState::Active
    }
}
