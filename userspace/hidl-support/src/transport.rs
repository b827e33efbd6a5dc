// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Transport selection for named HIDL interfaces
//! OWNERS: @runtime
//! PUBLIC API: get_transport(name), TransportResolver, lookup, Decision, LookupError
//! DEPENDS_ON: fqname (parsing), manifest (lookup), vintf (manifest sources), log
//! INVARIANTS:
//!   - Packages under `android.hidl` consult the framework manifest, all others the device manifest
//!   - Every failure yields `Transport::Empty`; only the log record tells them apart
//!   - Severities: debug on success, warn for manifest misses, error for bad names
//!
//! [`TransportResolver::resolve`] is the side-effect-free core; [`TransportResolver::get_transport`]
//! adds the diagnostics and collapses errors to `Transport::Empty`.

use log::{debug, log, Level};
use thiserror::Error;

use crate::fqname::FqName;
use crate::manifest::{Manifest, Transport, Version};
use crate::vintf::{ManifestKind, ManifestSource, VintfObject};
use crate::LOG_TAG;

/// Package prefix served by the framework manifest.
pub const FRAMEWORK_PACKAGE_ROOT: &str = "android.hidl";

/// Why no transport could be determined.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The input is not a fully-qualified name.
    #[error("getTransport: {0} is not a valid fully-qualified name.")]
    InvalidName(String),
    /// The name carries no `@major.minor`.
    #[error("getTransport: {0} does not specify a version. Using default transport.")]
    MissingVersion(String),
    /// The selected manifest does not exist.
    #[error(
        "getTransportFromManifest: No {kind} manifest defined, using default transport for \
         {name}"
    )]
    MissingManifest {
        /// Manifest that was consulted.
        kind: ManifestKind,
        /// Rendered interface name.
        name: String,
    },
    /// The selected manifest has no entry for the package and version.
    #[error(
        "getTransportFromManifest: Cannot find entry {name} in {kind} manifest, using \
         default transport."
    )]
    MissingEntry {
        /// Manifest that was consulted.
        kind: ManifestKind,
        /// Rendered interface name.
        name: String,
    },
}

impl LookupError {
    /// Severity at which this outcome is reported.
    pub fn level(&self) -> Level {
        match self {
            Self::InvalidName(_) | Self::MissingVersion(_) => Level::Error,
            Self::MissingManifest { .. } | Self::MissingEntry { .. } => Level::Warn,
        }
    }
}

/// Successful transport selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Parsed interface name.
    pub fq_name: FqName,
    /// Manifest the transport came from.
    pub manifest: ManifestKind,
    /// Declared transport; never `Transport::Empty`.
    pub transport: Transport,
}

/// Manifest consulted for `fq_name`.
pub fn manifest_kind_for(fq_name: &FqName) -> ManifestKind {
    if fq_name.in_package(FRAMEWORK_PACKAGE_ROOT) {
        ManifestKind::Framework
    } else {
        ManifestKind::Device
    }
}

/// Looks `fq_name` up in `manifest`, labelled `kind` for diagnostics.
pub fn lookup(
    fq_name: &FqName,
    kind: ManifestKind,
    manifest: Option<&dyn Manifest>,
) -> Result<Transport, LookupError> {
    let Some(manifest) = manifest else {
        return Err(LookupError::MissingManifest { kind, name: fq_name.to_string() });
    };
    let version: Version =
        fq_name.version().ok_or_else(|| LookupError::MissingVersion(fq_name.to_string()))?;
    match manifest.get_transport(fq_name.package(), version) {
        Transport::Empty => Err(LookupError::MissingEntry { kind, name: fq_name.to_string() }),
        transport => Ok(transport),
    }
}

/// Picks transports against the manifests of a [`ManifestSource`].
#[derive(Debug, Clone)]
pub struct TransportResolver<S> {
    source: S,
}

impl<S: ManifestSource> TransportResolver<S> {
    /// Creates a resolver over `source`.
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Manifest source in use.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Determines the transport for `name` without logging.
    pub fn resolve(&self, name: &str) -> Result<Decision, LookupError> {
        let fq_name = FqName::parse(name).map_err(|_| LookupError::InvalidName(name.to_string()))?;
        if !fq_name.has_version() {
            return Err(LookupError::MissingVersion(fq_name.to_string()));
        }
        let kind = manifest_kind_for(&fq_name);
        let manifest = self.source.manifest(kind);
        let transport = lookup(&fq_name, kind, manifest.as_deref().map(|m| m as &dyn Manifest))?;
        Ok(Decision { fq_name, manifest: kind, transport })
    }

    /// Transport for `name`, or [`Transport::Empty`] after logging why none applies.
    pub fn get_transport(&self, name: &str) -> Transport {
        match self.resolve(name) {
            Ok(decision) => {
                debug!(
                    target: LOG_TAG,
                    "getTransportFromManifest: {} declares transport method {} in {} manifest",
                    decision.fq_name,
                    decision.transport,
                    decision.manifest
                );
                decision.transport
            }
            Err(err) => {
                log!(target: LOG_TAG, err.level(), "{err}");
                Transport::Empty
            }
        }
    }
}

/// Transport for `name` according to the process-wide manifests.
pub fn get_transport(name: &str) -> Transport {
    TransportResolver::new(VintfObject::global()).get_transport(name)
}
