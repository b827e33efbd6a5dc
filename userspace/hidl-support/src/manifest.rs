// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: HAL manifests declaring the transport of each versioned package
//! OWNERS: @runtime
//! PUBLIC API: Transport, Version, Manifest, HalManifest, ManifestHal, ManifestError,
//!             ParseTransportError, ParseVersionError
//! DEPENDS_ON: serde, toml, std::fs
//! INVARIANTS: A manifest never declares `Transport::Empty`; lookups match exact versions
//!
//! File format:
//!
//! ```toml
//! [[hal]]
//! name = "android.hidl.manager"
//! transport = "hwbinder"
//! versions = ["1.0"]
//! ```

use core::fmt;
use core::str::FromStr;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// How calls to an interface are dispatched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Transport {
    /// No declaration; the caller applies its default.
    #[default]
    Empty,
    /// Cross-process, kernel-mediated binder transactions.
    Hwbinder,
    /// Same-process function calls into a loaded implementation.
    Passthrough,
}

impl Transport {
    /// Manifest spelling of the transport.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "",
            Self::Hwbinder => "hwbinder",
            Self::Passthrough => "passthrough",
        }
    }

    /// Returns `true` for the "no declaration" sentinel.
    pub const fn is_empty(self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text that is not a declarable transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transport {0:?}")]
pub struct ParseTransportError(String);

impl FromStr for Transport {
    type Err = ParseTransportError;

    /// Accepts the declarable transports only; `Empty` is never spelled in a manifest.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hwbinder" => Ok(Self::Hwbinder),
            "passthrough" => Ok(Self::Passthrough),
            _ => Err(ParseTransportError(s.to_string())),
        }
    }
}

/// Package version `major.minor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Major version; incompatible changes bump it.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
}

impl Version {
    /// Creates a version from its parts.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Text that is not a `major.minor` version.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid version {0:?}")]
pub struct ParseVersionError(String);

impl FromStr for Version {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseVersionError(s.to_string());
        let (major, minor) = s.split_once('.').ok_or_else(invalid)?;
        let digits = |part: &str| -> Result<u32, ParseVersionError> {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse().map_err(|_| invalid())
        };
        Ok(Self { major: digits(major)?, minor: digits(minor)? })
    }
}

/// Narrow view of a manifest used by transport selection.
pub trait Manifest {
    /// Transport declared for `package` at `version`, or [`Transport::Empty`].
    fn get_transport(&self, package: &str, version: Version) -> Transport;
}

/// Errors raised while loading a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The file could not be read.
    #[error("failed to read manifest {path}: {source}")]
    Read {
        /// Manifest location.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for the manifest schema.
    #[error("failed to parse manifest {path}: {source}")]
    Parse {
        /// Manifest location.
        path: PathBuf,
        /// Underlying TOML failure.
        #[source]
        source: toml::de::Error,
    },
    /// In-memory text is not valid TOML for the manifest schema.
    #[error("failed to parse manifest: {0}")]
    Syntax(#[from] toml::de::Error),
    /// A HAL lists a version that is not `major.minor`.
    #[error("hal {hal}: invalid version {value:?}")]
    InvalidVersion {
        /// HAL package name.
        hal: String,
        /// Offending text.
        value: String,
    },
    /// A HAL declares an unknown transport.
    #[error("hal {hal}: invalid transport {value:?}")]
    InvalidTransport {
        /// HAL package name.
        hal: String,
        /// Offending text.
        value: String,
    },
}

/// One `[[hal]]` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestHal {
    /// Package name, e.g. `android.hidl.manager`.
    pub name: String,
    /// Declared transport.
    pub transport: Transport,
    /// Versions served under that transport.
    pub versions: Vec<Version>,
}

impl ManifestHal {
    /// Creates an entry.
    pub fn new(name: impl Into<String>, transport: Transport, versions: Vec<Version>) -> Self {
        Self { name: name.into(), transport, versions }
    }

    fn serves(&self, package: &str, version: Version) -> bool {
        self.name == package && self.versions.contains(&version)
    }
}

/// Declarative list of HALs a side (framework or device) provides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HalManifest {
    hals: Vec<ManifestHal>,
}

impl HalManifest {
    /// Creates an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads and parses the manifest at `path`.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let data = fs::read_to_string(path)
            .map_err(|source| ManifestError::Read { path: path.to_path_buf(), source })?;
        let raw: RawManifest = toml::from_str(&data)
            .map_err(|source| ManifestError::Parse { path: path.to_path_buf(), source })?;
        Self::from_raw(raw)
    }

    /// Parses manifest text.
    pub fn from_toml_str(data: &str) -> Result<Self, ManifestError> {
        let raw: RawManifest = toml::from_str(data)?;
        Self::from_raw(raw)
    }

    /// Appends an entry; earlier entries win on lookup.
    pub fn add_hal(&mut self, hal: ManifestHal) {
        self.hals.push(hal);
    }

    /// Entries in declaration order.
    pub fn hals(&self) -> &[ManifestHal] {
        &self.hals
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.hals.len()
    }

    /// Returns `true` when no HAL is declared.
    pub fn is_empty(&self) -> bool {
        self.hals.is_empty()
    }

    fn from_raw(raw: RawManifest) -> Result<Self, ManifestError> {
        let mut manifest = Self::new();
        for hal in raw.hal {
            let transport = hal.transport.parse().map_err(|_| ManifestError::InvalidTransport {
                hal: hal.name.clone(),
                value: hal.transport.clone(),
            })?;
            let versions = hal
                .versions
                .iter()
                .map(|value| {
                    value.parse().map_err(|_| ManifestError::InvalidVersion {
                        hal: hal.name.clone(),
                        value: value.clone(),
                    })
                })
                .collect::<Result<Vec<Version>, _>>()?;
            manifest.add_hal(ManifestHal { name: hal.name, transport, versions });
        }
        Ok(manifest)
    }
}

impl Manifest for HalManifest {
    fn get_transport(&self, package: &str, version: Version) -> Transport {
        self.hals
            .iter()
            .find(|hal| hal.serves(package, version))
            .map(|hal| hal.transport)
            .unwrap_or(Transport::Empty)
    }
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default)]
    hal: Vec<RawHal>,
}

#[derive(Debug, Deserialize)]
struct RawHal {
    name: String,
    transport: String,
    #[serde(default)]
    versions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[[hal]]
name = "android.hidl.manager"
transport = "hwbinder"
versions = ["1.0"]

[[hal]]
name = "android.hidl.memory"
transport = "passthrough"
versions = ["1.0", "1.1"]
"#;

    #[test]
    fn parses_and_looks_up_exact_versions() {
        let manifest = HalManifest::from_toml_str(SAMPLE).unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(
            manifest.get_transport("android.hidl.manager", Version::new(1, 0)),
            Transport::Hwbinder
        );
        assert_eq!(
            manifest.get_transport("android.hidl.memory", Version::new(1, 1)),
            Transport::Passthrough
        );
        assert_eq!(
            manifest.get_transport("android.hidl.manager", Version::new(1, 1)),
            Transport::Empty
        );
        assert_eq!(
            manifest.get_transport("android.hidl.allocator", Version::new(1, 0)),
            Transport::Empty
        );
    }

    #[test]
    fn first_matching_entry_wins() {
        let mut manifest = HalManifest::new();
        manifest.add_hal(ManifestHal::new("a.b", Transport::Passthrough, vec![Version::new(1, 0)]));
        manifest.add_hal(ManifestHal::new("a.b", Transport::Hwbinder, vec![Version::new(1, 0)]));
        assert_eq!(manifest.get_transport("a.b", Version::new(1, 0)), Transport::Passthrough);
    }

    #[test]
    fn empty_document_is_valid() {
        let manifest = HalManifest::from_toml_str("").unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn rejects_bad_entries() {
        let err = HalManifest::from_toml_str(
            "[[hal]]\nname = \"a.b\"\ntransport = \"carrier-pigeon\"\nversions = [\"1.0\"]\n",
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::InvalidTransport { ref value, .. } if value == "carrier-pigeon"));

        let err = HalManifest::from_toml_str(
            "[[hal]]\nname = \"a.b\"\ntransport = \"hwbinder\"\nversions = [\"1\"]\n",
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::InvalidVersion { ref value, .. } if value == "1"));

        let err = HalManifest::from_toml_str("[[hal]]\nname = 3\n").unwrap_err();
        assert!(matches!(err, ManifestError::Syntax(_)));
    }

    #[test]
    fn load_reports_path_on_failure() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not = [valid").unwrap();
        let err = HalManifest::load(file.path()).unwrap_err();
        assert!(matches!(err, ManifestError::Parse { ref path, .. } if path == file.path()));

        let missing = file.path().with_extension("absent");
        assert!(matches!(HalManifest::load(&missing), Err(ManifestError::Read { .. })));
    }

    #[test]
    fn version_and_transport_text() {
        assert_eq!("2.13".parse::<Version>(), Ok(Version::new(2, 13)));
        assert!("2".parse::<Version>().is_err());
        assert!("2.x".parse::<Version>().is_err());
        assert!("+1.0".parse::<Version>().is_err());
        assert!(".1".parse::<Version>().is_err());
        assert_eq!(Version::new(3, 4).to_string(), "3.4");
        assert_eq!("hwbinder".parse::<Transport>(), Ok(Transport::Hwbinder));
        assert!("".parse::<Transport>().is_err());
        assert_eq!(Transport::Passthrough.to_string(), "passthrough");
        assert!(Transport::default().is_empty());
    }
}
