// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Process-scoped access to the framework and device manifests
//! OWNERS: @runtime
//! PUBLIC API: ManifestKind, ManifestHandle, ManifestSource, ManifestSet, VintfConfig, VintfObject
//! DEPENDS_ON: once_cell (lazy load), log
//! INVARIANTS: Each manifest file is read at most once per VintfObject; an absent or
//!             malformed file is reported as no manifest
//!
//! Resolution code only sees [`ManifestSource`], so tests inject a [`ManifestSet`] while
//! production callers go through [`VintfObject::global`].

use core::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};
use once_cell::sync::{Lazy, OnceCell};

use crate::manifest::{HalManifest, Manifest, ManifestError};
use crate::LOG_TAG;

/// Shared reference to a loaded manifest.
pub type ManifestHandle = Arc<dyn Manifest + Send + Sync>;

/// Which side of the system a manifest describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestKind {
    /// HALs shipped with the system image.
    Framework,
    /// HALs shipped by the device vendor.
    Device,
}

impl ManifestKind {
    /// Label used in diagnostics.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Framework => "framework",
            Self::Device => "device",
        }
    }
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Supplier of the manifests consulted by transport selection. Either may be absent.
pub trait ManifestSource {
    /// Manifest of the system image.
    fn framework_manifest(&self) -> Option<ManifestHandle>;

    /// Manifest of the vendor image.
    fn device_manifest(&self) -> Option<ManifestHandle>;

    /// Manifest for `kind`.
    fn manifest(&self, kind: ManifestKind) -> Option<ManifestHandle> {
        match kind {
            ManifestKind::Framework => self.framework_manifest(),
            ManifestKind::Device => self.device_manifest(),
        }
    }
}

impl<T: ManifestSource + ?Sized> ManifestSource for &T {
    fn framework_manifest(&self) -> Option<ManifestHandle> {
        (**self).framework_manifest()
    }

    fn device_manifest(&self) -> Option<ManifestHandle> {
        (**self).device_manifest()
    }
}

impl<T: ManifestSource + ?Sized> ManifestSource for Arc<T> {
    fn framework_manifest(&self) -> Option<ManifestHandle> {
        (**self).framework_manifest()
    }

    fn device_manifest(&self) -> Option<ManifestHandle> {
        (**self).device_manifest()
    }
}

/// Fixed, in-memory pair of manifests.
#[derive(Clone, Default)]
pub struct ManifestSet {
    framework: Option<ManifestHandle>,
    device: Option<ManifestHandle>,
}

impl ManifestSet {
    /// Creates a set with neither manifest present.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the framework manifest.
    pub fn with_framework(mut self, manifest: impl Manifest + Send + Sync + 'static) -> Self {
        self.framework = Some(Arc::new(manifest));
        self
    }

    /// Installs the device manifest.
    pub fn with_device(mut self, manifest: impl Manifest + Send + Sync + 'static) -> Self {
        self.device = Some(Arc::new(manifest));
        self
    }
}

impl ManifestSource for ManifestSet {
    fn framework_manifest(&self) -> Option<ManifestHandle> {
        self.framework.clone()
    }

    fn device_manifest(&self) -> Option<ManifestHandle> {
        self.device.clone()
    }
}

impl fmt::Debug for ManifestSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManifestSet")
            .field("framework", &self.framework.is_some())
            .field("device", &self.device.is_some())
            .finish()
    }
}

/// Default framework manifest location.
pub const DEFAULT_FRAMEWORK_MANIFEST: &str = "/system/etc/vintf/manifest.toml";
/// Default device manifest location.
pub const DEFAULT_DEVICE_MANIFEST: &str = "/vendor/etc/vintf/manifest.toml";

/// Environment variable overriding the framework manifest path.
pub const FRAMEWORK_MANIFEST_ENV: &str = "HIDL_FRAMEWORK_MANIFEST";
/// Environment variable overriding the device manifest path.
pub const DEVICE_MANIFEST_ENV: &str = "HIDL_DEVICE_MANIFEST";

/// Where [`VintfObject`] finds its manifests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VintfConfig {
    /// Path of the framework manifest.
    pub framework_manifest: PathBuf,
    /// Path of the device manifest.
    pub device_manifest: PathBuf,
}

impl Default for VintfConfig {
    fn default() -> Self {
        Self {
            framework_manifest: PathBuf::from(DEFAULT_FRAMEWORK_MANIFEST),
            device_manifest: PathBuf::from(DEFAULT_DEVICE_MANIFEST),
        }
    }
}

impl VintfConfig {
    /// Defaults overridden by `HIDL_FRAMEWORK_MANIFEST` / `HIDL_DEVICE_MANIFEST`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(path) = std::env::var_os(FRAMEWORK_MANIFEST_ENV) {
            config.framework_manifest = PathBuf::from(path);
        }
        if let Some(path) = std::env::var_os(DEVICE_MANIFEST_ENV) {
            config.device_manifest = PathBuf::from(path);
        }
        config
    }

    /// Path configured for `kind`.
    pub fn path(&self, kind: ManifestKind) -> &Path {
        match kind {
            ManifestKind::Framework => &self.framework_manifest,
            ManifestKind::Device => &self.device_manifest,
        }
    }
}

/// Manifest source backed by files on disk, loaded lazily and cached.
pub struct VintfObject {
    config: VintfConfig,
    framework: OnceCell<Option<ManifestHandle>>,
    device: OnceCell<Option<ManifestHandle>>,
}

static GLOBAL: Lazy<VintfObject> = Lazy::new(|| VintfObject::new(VintfConfig::from_env()));

impl VintfObject {
    /// Creates an object reading from the paths in `config`.
    pub fn new(config: VintfConfig) -> Self {
        Self { config, framework: OnceCell::new(), device: OnceCell::new() }
    }

    /// Process-wide instance configured from the environment on first use.
    pub fn global() -> &'static VintfObject {
        &GLOBAL
    }

    /// Paths this object reads from.
    pub fn config(&self) -> &VintfConfig {
        &self.config
    }

    fn cached(&self, kind: ManifestKind) -> Option<ManifestHandle> {
        let cell = match kind {
            ManifestKind::Framework => &self.framework,
            ManifestKind::Device => &self.device,
        };
        cell.get_or_init(|| load(kind, self.config.path(kind))).clone()
    }
}

impl ManifestSource for VintfObject {
    fn framework_manifest(&self) -> Option<ManifestHandle> {
        self.cached(ManifestKind::Framework)
    }

    fn device_manifest(&self) -> Option<ManifestHandle> {
        self.cached(ManifestKind::Device)
    }
}

impl fmt::Debug for VintfObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VintfObject").field("config", &self.config).finish()
    }
}

fn load(kind: ManifestKind, path: &Path) -> Option<ManifestHandle> {
    match HalManifest::load(path) {
        Ok(manifest) => {
            debug!(
                target: LOG_TAG,
                "loaded {kind} manifest from {} ({} hals)",
                path.display(),
                manifest.len()
            );
            Some(Arc::new(manifest))
        }
        Err(ManifestError::Read { source, .. }) if source.kind() == ErrorKind::NotFound => None,
        Err(err) => {
            warn!(target: LOG_TAG, "ignoring {kind} manifest: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{ManifestHal, Transport, Version};
    use crate::test_log;
    use std::fs;
    use tempfile::TempDir;

    const MANAGER: &str =
        "[[hal]]\nname = \"android.hidl.manager\"\ntransport = \"hwbinder\"\nversions = [\"1.0\"]\n";

    fn config_in(dir: &TempDir) -> VintfConfig {
        VintfConfig {
            framework_manifest: dir.path().join("framework.toml"),
            device_manifest: dir.path().join("device.toml"),
        }
    }

    #[test]
    fn labels() {
        assert_eq!(ManifestKind::Framework.to_string(), "framework");
        assert_eq!(ManifestKind::Device.label(), "device");
    }

    #[test]
    fn manifest_set_serves_what_was_installed() {
        let mut device = HalManifest::new();
        device.add_hal(ManifestHal::new("vendor.x", Transport::Passthrough, vec![Version::new(1, 0)]));
        let set = ManifestSet::new().with_device(device);
        assert!(set.framework_manifest().is_none());
        let handle = set.manifest(ManifestKind::Device).expect("device manifest");
        assert_eq!(handle.get_transport("vendor.x", Version::new(1, 0)), Transport::Passthrough);
    }

    #[test]
    fn loads_files_once_and_caches() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        fs::write(&config.framework_manifest, MANAGER).unwrap();
        let vintf = VintfObject::new(config.clone());

        let first = vintf.framework_manifest().expect("framework manifest");
        // Later edits are not observed: the first load is cached.
        fs::remove_file(&config.framework_manifest).unwrap();
        let second = vintf.framework_manifest().expect("still cached");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            second.get_transport("android.hidl.manager", Version::new(1, 0)),
            Transport::Hwbinder
        );
    }

    #[test]
    fn missing_file_is_absent_without_warning() {
        let dir = TempDir::new().unwrap();
        let capture = test_log::capture();
        let vintf = VintfObject::new(config_in(&dir));
        assert!(vintf.device_manifest().is_none());
        assert!(capture.records().is_empty());
    }

    #[test]
    fn malformed_file_is_absent_with_warning() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        fs::write(&config.device_manifest, "[[hal]]\nname = 1\n").unwrap();
        let capture = test_log::capture();
        let vintf = VintfObject::new(config);
        assert!(vintf.device_manifest().is_none());
        assert!(capture.contains(log::Level::Warn, "ignoring device manifest"));
    }

    #[test]
    fn config_paths_by_kind() {
        let config = VintfConfig::default();
        assert_eq!(config.path(ManifestKind::Framework), Path::new(DEFAULT_FRAMEWORK_MANIFEST));
        assert_eq!(config.path(ManifestKind::Device), Path::new(DEFAULT_DEVICE_MANIFEST));
    }
}
