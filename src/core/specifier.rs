//! Dependency specifier classification.
//!
//! A declared platform or plugin may carry a specifier string: a version
//! range (`^7.0.0`, `1.x`), a git URL, a tarball or directory path, or
//! nothing at all. Classification decides what string the fetcher gets.

use semver::VersionReq;

/// Prefix joining a platform name to its distributable package.
pub const PLATFORM_PACKAGE_PREFIX: &str = "cordova-";

/// What a specifier string turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Specifier {
    /// No specifier; install by bare name.
    Bare,
    /// A parseable version range. Install source is `name@range`.
    Range(String),
    /// Anything else (git URL, tarball, local path, dist-tag). The raw
    /// string is the install source, verbatim.
    Location(String),
}

impl Specifier {
    /// Classify a possibly-absent specifier string.
    ///
    /// Never fails: a string that does not parse as a range is a location.
    pub fn classify(spec: Option<&str>) -> Self {
        let Some(raw) = spec else {
            return Self::Bare;
        };
        let raw = raw.trim();
        if raw.is_empty() {
            return Self::Bare;
        }
        if is_version_range(raw) {
            Self::Range(raw.to_string())
        } else {
            Self::Location(raw.to_string())
        }
    }

    /// Synthesize the string handed to the dependency fetcher for `name`.
    pub fn install_source(&self, name: &str) -> String {
        match self {
            Self::Bare => name.to_string(),
            Self::Range(range) => format!("{name}@{range}"),
            Self::Location(location) => location.clone(),
        }
    }
}

/// npm's loose-range grammar also allows `||` unions and hyphen ranges,
/// which `semver`'s parser rejects. Rewrite each alternative just enough to
/// decide membership; the raw string is what the fetcher gets either way.
fn is_version_range(raw: &str) -> bool {
    raw.split("||").all(|alt| {
        let alt = alt.trim();
        if alt.is_empty() {
            return false;
        }
        match alt.split_once(" - ") {
            Some((lo, hi)) => {
                VersionReq::parse(&format!(">={}, <={}", lo.trim(), hi.trim())).is_ok()
            }
            None => VersionReq::parse(alt).is_ok(),
        }
    })
}

/// Distributable package name for a platform, e.g. `ios` -> `cordova-ios`.
pub fn platform_package(name: &str) -> String {
    format!("{PLATFORM_PACKAGE_PREFIX}{name}")
}

/// One-call helper: classify `spec` and synthesize the install source.
pub fn install_source(name: &str, spec: Option<&str>) -> String {
    Specifier::classify(spec).install_source(name)
}
