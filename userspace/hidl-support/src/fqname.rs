// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Fully-qualified HIDL names: `package@major.minor::Interface`.
//!
//! Accepted forms are `pkg@M.m::Name`, `@M.m::Name`, `pkg@M.m`, `pkg::Name` and a bare
//! (possibly dotted) `Name`. Components follow identifier rules.

use core::fmt;
use core::str::FromStr;

use thiserror::Error;

use crate::manifest::Version;

/// Reasons a string is not a fully-qualified name.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FqNameError {
    /// The input was empty.
    #[error("empty name")]
    Empty,
    /// A package or name component is not an identifier.
    #[error("invalid component {0:?}")]
    Component(String),
    /// The `@major.minor` part is malformed.
    #[error("invalid version {0:?}")]
    Version(String),
    /// The input has a shape none of the accepted forms match.
    #[error("malformed name {0:?}")]
    Malformed(String),
}

/// Parsed fully-qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FqName {
    package: String,
    version: Option<Version>,
    name: String,
}

impl FqName {
    /// Parses `input` into its package, version and name parts.
    pub fn parse(input: &str) -> Result<Self, FqNameError> {
        if input.is_empty() {
            return Err(FqNameError::Empty);
        }
        let Some((head, name)) = input.split_once("::") else {
            return Self::parse_unqualified(input);
        };
        validate_path(name)?;
        let (package, version) = match head.split_once('@') {
            Some((package, version)) => (package, Some(parse_version(version)?)),
            None if head.is_empty() => return Err(FqNameError::Malformed(input.to_string())),
            None => (head, None),
        };
        if !package.is_empty() {
            validate_path(package)?;
        }
        Ok(Self { package: package.to_string(), version, name: name.to_string() })
    }

    /// Handles inputs without `::`: either `pkg@M.m` or a bare name.
    fn parse_unqualified(input: &str) -> Result<Self, FqNameError> {
        match input.split_once('@') {
            Some(("", _)) => Err(FqNameError::Malformed(input.to_string())),
            Some((package, version)) => {
                validate_path(package)?;
                Ok(Self {
                    package: package.to_string(),
                    version: Some(parse_version(version)?),
                    name: String::new(),
                })
            }
            None => {
                validate_path(input)?;
                Ok(Self { package: String::new(), version: None, name: input.to_string() })
            }
        }
    }

    /// Package part, empty when the name was given without one.
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Interface or type name, empty for `pkg@M.m`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Package version, if one was given.
    pub fn version(&self) -> Option<Version> {
        self.version
    }

    /// Returns `true` when `@major.minor` was present.
    pub fn has_version(&self) -> bool {
        self.version.is_some()
    }

    /// Major package version, if present.
    pub fn package_major_version(&self) -> Option<u32> {
        self.version.map(|v| v.major)
    }

    /// Minor package version, if present.
    pub fn package_minor_version(&self) -> Option<u32> {
        self.version.map(|v| v.minor)
    }

    /// Renders `pkg@M.m` (or just the package when unversioned).
    pub fn package_and_version(&self) -> String {
        match self.version {
            Some(version) => format!("{}@{}", self.package, version),
            None => self.package.clone(),
        }
    }

    /// Returns `true` if `prefix` names this package or one of its ancestors,
    /// matching whole dot-separated components.
    pub fn in_package(&self, prefix: &str) -> bool {
        let mut ours = self.package.split('.');
        prefix.split('.').all(|component| ours.next() == Some(component))
    }
}

impl FromStr for FqName {
    type Err = FqNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FqName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.package)?;
        if let Some(version) = self.version {
            write!(f, "@{version}")?;
        }
        if !self.name.is_empty() {
            if !self.package.is_empty() || self.version.is_some() {
                f.write_str("::")?;
            }
            f.write_str(&self.name)?;
        }
        Ok(())
    }
}

fn parse_version(text: &str) -> Result<Version, FqNameError> {
    text.parse().map_err(|_| FqNameError::Version(text.to_string()))
}

fn validate_path(path: &str) -> Result<(), FqNameError> {
    path.split('.').try_for_each(|component| {
        if is_identifier(component) {
            Ok(())
        } else {
            Err(FqNameError::Component(component.to_string()))
        }
    })
}

fn is_identifier(component: &str) -> bool {
    let mut chars = component.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
