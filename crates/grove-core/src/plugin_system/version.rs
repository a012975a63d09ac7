use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use semver::{Version, VersionReq};

/// Error type for version parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    #[error("Invalid version format: '{0}'")]
    InvalidFormat(String),
    #[error("Version parse error: {0}")]
    ParseError(String),
}

/// Compare two version strings segment by segment.
///
/// Numeric segments compare numerically (`"1.10" > "1.9"`), missing trailing
/// segments count as zero (`"2.0" == "2.0.0"`) and a qualified version sorts
/// before its release (`"1.0-RC1" < "1.0"`).
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (a_base, a_qualifier) = split_qualifier(a.trim());
    let (b_base, b_qualifier) = split_qualifier(b.trim());

    let a_segments: Vec<&str> = a_base.split('.').collect();
    let b_segments: Vec<&str> = b_base.split('.').collect();
    let len = a_segments.len().max(b_segments.len());

    for i in 0..len {
        let left = a_segments.get(i).copied().unwrap_or("0");
        let right = b_segments.get(i).copied().unwrap_or("0");
        let ordering = match (left.parse::<u64>(), right.parse::<u64>()) {
            (Ok(l), Ok(r)) => l.cmp(&r),
            // A named segment (e.g. "RC1") is older than any number
            (Ok(_), Err(_)) => Ordering::Greater,
            (Err(_), Ok(_)) => Ordering::Less,
            (Err(_), Err(_)) => left.cmp(right),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    match (a_qualifier, b_qualifier) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(l), Some(r)) => l.cmp(r),
    }
}

fn split_qualifier(version: &str) -> (&str, Option<&str>) {
    match version.split_once('-') {
        Some((base, qualifier)) => (base, Some(qualifier)),
        None => (version, None),
    }
}

/// Best-effort conversion of a plugin version string into a semver
/// [`Version`], padding missing minor/patch segments.
pub fn to_semver(version: &str) -> Option<Version> {
    let version = version.trim();
    if let Ok(v) = Version::parse(version) {
        return Some(v);
    }
    let (base, qualifier) = split_qualifier(version);
    let mut segments: Vec<&str> = base.split('.').collect();
    if segments.len() > 3 || segments.iter().any(|s| s.parse::<u64>().is_err()) {
        return None;
    }
    while segments.len() < 3 {
        segments.push("0");
    }
    let padded = match qualifier {
        Some(q) => format!("{}-{}", segments.join("."), q),
        None => segments.join("."),
    };
    Version::parse(&padded).ok()
}

/// Version requirement attached to a dependency declaration.
///
/// Accepted forms:
/// - `*` or empty: any version
/// - `X`: exactly `X` (segment-wise)
/// - `X > *`: `X` or later
/// - `X > Y`: between `X` and `Y`, inclusive
/// - semver requirement syntax (`^1.2`, `>=1.0, <2.0`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VersionRequirement {
    #[default]
    Any,
    Exact(String),
    Range { min: String, max: Option<String> },
    Semver(VersionReq),
}

impl VersionRequirement {
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let input = input.trim();
        if input.is_empty() || input == "*" {
            return Ok(VersionRequirement::Any);
        }

        let semver_syntax = input.starts_with(['^', '~', '=', '<', '>']) || input.contains(',');
        if semver_syntax {
            return VersionReq::parse(input)
                .map(VersionRequirement::Semver)
                .map_err(|e| VersionError::ParseError(e.to_string()));
        }

        if let Some((min, max)) = input.split_once('>') {
            let min = min.trim();
            let max = max.trim();
            if min.is_empty() || min == "*" {
                return Err(VersionError::InvalidFormat(input.to_string()));
            }
            let max = if max.is_empty() || max == "*" {
                None
            } else {
                Some(max.to_string())
            };
            return Ok(VersionRequirement::Range {
                min: min.to_string(),
                max,
            });
        }

        Ok(VersionRequirement::Exact(input.to_string()))
    }

    pub fn is_satisfied_by(&self, version: &str) -> bool {
        match self {
            VersionRequirement::Any => true,
            VersionRequirement::Exact(required) => compare_versions(version, required) == Ordering::Equal,
            VersionRequirement::Range { min, max } => {
                let above_min = compare_versions(version, min) != Ordering::Less;
                let below_max = max
                    .as_deref()
                    .map(|max| compare_versions(version, max) != Ordering::Greater)
                    .unwrap_or(true);
                above_min && below_max
            }
            VersionRequirement::Semver(req) => to_semver(version)
                .map(|v| req.matches(&v))
                .unwrap_or(false),
        }
    }
}

impl FromStr for VersionRequirement {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionRequirement::parse(s)
    }
}

impl fmt::Display for VersionRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionRequirement::Any => write!(f, "*"),
            VersionRequirement::Exact(v) => write!(f, "{}", v),
            VersionRequirement::Range { min, max: None } => write!(f, "{} > *", min),
            VersionRequirement::Range { min, max: Some(max) } => write!(f, "{} > {}", min, max),
            VersionRequirement::Semver(req) => write!(f, "{}", req),
        }
    }
}

/// Whether `version` satisfies the `required` requirement string.
/// Unparseable requirements never match.
pub fn is_valid_version(version: &str, required: &str) -> bool {
    match VersionRequirement::parse(required) {
        Ok(req) => req.is_satisfied_by(version),
        Err(e) => {
            log::debug!("Ignoring unparseable version requirement '{}': {}", required, e);
            false
        }
    }
}
