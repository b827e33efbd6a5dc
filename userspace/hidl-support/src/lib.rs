// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: HIDL support layer shared by generated interface stubs
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable (HidlString/HidlHandle layout is a wire contract)
//!
//! PUBLIC API:
//!   - HidlString: owned-or-borrowed NUL-terminated byte string
//!   - HidlHandle: owned-or-borrowed native handle record
//!   - FqName: `package@major.minor::Interface` names
//!   - HalManifest / Manifest / ManifestSource / VintfObject: manifest access
//!   - get_transport / TransportResolver: per-interface transport selection
//!
//! DEPENDENCIES:
//!   - native-handle: record clone/close/delete primitives
//!   - libc: C allocator backing owned string buffers
//!   - log: diagnostics under the `HidlSupport` target
//!   - serde + toml: manifest files
//!   - once_cell: process-scoped manifest cache
//!
//! INVARIANTS:
//!   - Owned buffers and records have exactly one responsible value
//!   - Borrowed storage is never mutated or released
//!   - Size overflow, clone failure and allocation failure abort the process

#![deny(clippy::all, missing_docs)]

/// Log target used for every record emitted by this crate.
pub const LOG_TAG: &str = "HidlSupport";

/// Logs at error severity and panics; `panic = "abort"` makes this terminate the process.
macro_rules! fatal {
    ($($arg:tt)+) => {{
        log::error!(target: $crate::LOG_TAG, $($arg)+);
        panic!($($arg)+)
    }};
}

pub mod cli;
mod fqname;
mod handle;
mod manifest;
mod pointer;
mod string;
mod transport;
mod vintf;

#[cfg(test)]
mod test_log;

pub use cli::{execute, help, run};
pub use fqname::{FqName, FqNameError};
pub use handle::HidlHandle;
pub use manifest::{
    HalManifest, Manifest, ManifestError, ManifestHal, ParseTransportError, ParseVersionError,
    Transport, Version,
};
pub use native_handle::NativeHandle;
pub use string::{empty_sentinel, HidlString, Ownership};
pub use transport::{
    get_transport, lookup, manifest_kind_for, Decision, LookupError, TransportResolver,
    FRAMEWORK_PACKAGE_ROOT,
};
pub use vintf::{
    ManifestHandle, ManifestKind, ManifestSet, ManifestSource, VintfConfig, VintfObject,
    DEFAULT_DEVICE_MANIFEST, DEFAULT_FRAMEWORK_MANIFEST, DEVICE_MANIFEST_ENV,
    FRAMEWORK_MANIFEST_ENV,
};
