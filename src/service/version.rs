//! Version and version-range expressions
//!
//! Versions are one to three dot-separated numbers (`1`, `1.2`, `1.2.3`);
//! missing components are zero. Ranges use interval notation such as
//! `[1.0.0,2.0.0)` or `(1.0,INFINITY)`. A bare version `v` means
//! `[v,INFINITY)` and an empty expression accepts every version.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Open upper bound keyword
pub const INFINITY: &str = "INFINITY";

// == Version Error ==
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("invalid version string '{0}'")]
    InvalidVersion(String),

    #[error("invalid version range expression '{0}'")]
    InvalidRange(String),

    #[error("version range '{0}' contains no versions")]
    EmptyRange(String),
}

// == Version ==
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionError::InvalidVersion(s.to_string());
        let trimmed = s.trim();

        let mut parts = [0u64; 3];
        let mut count = 0;
        for component in trimmed.split('.') {
            if count == 3
                || component.is_empty()
                || !component.bytes().all(|b| b.is_ascii_digit())
            {
                return Err(invalid());
            }
            parts[count] = component.parse().map_err(|_| invalid())?;
            count += 1;
        }

        Ok(Version::new(parts[0], parts[1], parts[2]))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

// == Version Range ==
/// A contiguous interval of versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    start: Version,
    start_inclusive: bool,
    /// `None` is an open upper bound
    end: Option<Version>,
    end_inclusive: bool,
}

impl VersionRange {
    /// Every version.
    pub fn any() -> Self {
        Self::at_least(Version::default())
    }

    /// `[version,INFINITY)`
    pub fn at_least(version: Version) -> Self {
        Self {
            start: version,
            start_inclusive: true,
            end: None,
            end_inclusive: false,
        }
    }

    /// Parses a range expression, a bare version, or the empty string.
    pub fn parse(expression: &str) -> Result<Self, VersionError> {
        let expr = expression.trim();
        if expr.is_empty() {
            return Ok(Self::any());
        }

        let start_inclusive = match expr.as_bytes()[0] {
            b'[' => true,
            b'(' => false,
            _ => return Ok(Self::at_least(expr.parse()?)),
        };

        let invalid = || VersionError::InvalidRange(expression.to_string());
        let end_inclusive = match expr.as_bytes()[expr.len() - 1] {
            b']' if expr.len() > 1 => true,
            b')' if expr.len() > 1 => false,
            _ => return Err(invalid()),
        };

        let (low, high) = expr[1..expr.len() - 1]
            .split_once(',')
            .ok_or_else(invalid)?;
        let start: Version = low.parse().map_err(|_| invalid())?;
        let high = high.trim();
        let end = if high.eq_ignore_ascii_case(INFINITY) {
            None
        } else {
            Some(high.parse::<Version>().map_err(|_| invalid())?)
        };

        let range = Self {
            start,
            start_inclusive,
            end,
            end_inclusive: end.is_some() && end_inclusive,
        };
        if range.is_empty() {
            return Err(VersionError::EmptyRange(expression.to_string()));
        }
        Ok(range)
    }

    fn is_empty(&self) -> bool {
        match self.end {
            None => false,
            Some(end) if self.start == end => !(self.start_inclusive && self.end_inclusive),
            Some(end) => self.start > end,
        }
    }

    // == Containment ==
    pub fn contains(&self, version: &Version) -> bool {
        let above_start = if self.start_inclusive {
            *version >= self.start
        } else {
            *version > self.start
        };
        let below_end = match self.end {
            None => true,
            Some(end) if self.end_inclusive => *version <= end,
            Some(end) => *version < end,
        };
        above_start && below_end
    }

    /// Parses `version` and tests containment.
    pub fn contains_str(&self, version: &str) -> Result<bool, VersionError> {
        Ok(self.contains(&version.parse()?))
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Normalized interval form, e.g. `[1.0.0,INFINITY)`.
impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = if self.start_inclusive { '[' } else { '(' };
        match self.end {
            None => write!(f, "{}{},{})", open, self.start, INFINITY),
            Some(end) => {
                let close = if self.end_inclusive { ']' } else { ')' };
                write!(f, "{}{},{}{}", open, self.start, end, close)
            }
        }
    }
}
