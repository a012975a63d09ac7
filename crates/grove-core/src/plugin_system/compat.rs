use std::cmp::Ordering;

use crate::plugin_system::descriptor::PluginDescriptor;
use crate::plugin_system::version::{compare_versions, VersionRequirement};

/// Outcome of a framework-version compatibility check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compatibility {
    Compatible,
    /// No usable range was declared, so nothing was checked
    Skipped,
    Incompatible { reason: String },
}

impl Compatibility {
    pub fn is_compatible(&self) -> bool {
        !matches!(self, Compatibility::Incompatible { .. })
    }
}

/// Advisory check of a plugin's declared framework range against the host.
/// Never blocks registration; incompatibilities are logged.
#[derive(Debug, Clone, Default)]
pub struct CompatibilityChecker {
    host_version: Option<String>,
}

impl CompatibilityChecker {
    pub fn new(host_version: Option<String>) -> Self {
        Self { host_version }
    }

    pub fn host_version(&self) -> Option<&str> {
        self.host_version.as_deref()
    }

    /// Check one declared range
    pub fn check_range(&self, declared: Option<&str>) -> Compatibility {
        let declared = match declared.map(str::trim) {
            Some(range) if !range.is_empty() && !range.contains('@') && !range.contains("${") => range,
            _ => return Compatibility::Skipped,
        };
        let host = match self.host_version.as_deref() {
            Some(host) => host,
            None => return Compatibility::Skipped,
        };

        let requirement = match VersionRequirement::parse(declared) {
            Ok(VersionRequirement::Any) | Err(_) => {
                return Compatibility::Incompatible {
                    reason: format!("framework version range '{}' is not in the expected format", declared),
                }
            }
            Ok(requirement) => requirement,
        };

        match &requirement {
            VersionRequirement::Exact(required) if compare_versions(host, required) != Ordering::Equal => {
                Compatibility::Incompatible {
                    reason: format!("requires framework version {} but host is {}", required, host),
                }
            }
            VersionRequirement::Range { min, .. } if compare_versions(min, host) == Ordering::Greater => {
                Compatibility::Incompatible {
                    reason: format!("requires framework version {} or later but host is {}", min, host),
                }
            }
            VersionRequirement::Range { max: Some(max), .. } if compare_versions(max, host) == Ordering::Less => {
                Compatibility::Incompatible {
                    reason: format!("supports framework versions up to {} but host is {}", max, host),
                }
            }
            VersionRequirement::Semver(req) if !requirement.is_satisfied_by(host) => Compatibility::Incompatible {
                reason: format!("requires framework version {} but host is {}", req, host),
            },
            _ => Compatibility::Compatible,
        }
    }

    /// Check a descriptor and log a warning when it is incompatible
    pub fn check(&self, descriptor: &PluginDescriptor) -> Compatibility {
        let result = self.check_range(descriptor.framework_version.as_deref());
        if let Compatibility::Incompatible { reason } = &result {
            log::warn!(
                "Plugin {} declares framework version range [{}] but host version is [{}]: {}. Loading anyway.",
                descriptor,
                descriptor.framework_version.as_deref().unwrap_or("*"),
                self.host_version.as_deref().unwrap_or("unknown"),
                reason
            );
        }
        result
    }
}
