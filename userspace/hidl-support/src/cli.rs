// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! User-facing CLI helpers for the `hidl-transport` tool.

use std::path::PathBuf;

use crate::manifest::Transport;
use crate::transport::TransportResolver;
use crate::vintf::{VintfConfig, VintfObject};

/// Returns the CLI usage string for the transport query tool.
pub fn help() -> &'static str {
    "hidl-transport reports the transport declared for HIDL interfaces. \
     Usage: hidl-transport [--framework PATH] [--device PATH] NAME... | --help"
}

/// Executes the CLI using provided arguments.
pub fn execute(args: &[&str]) -> String {
    if args.iter().any(|arg| *arg == "--help") {
        return help().to_string();
    }
    let mut config = VintfConfig::from_env();
    let mut names = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let slot = match *arg {
            "--framework" => &mut config.framework_manifest,
            "--device" => &mut config.device_manifest,
            name => {
                names.push(name);
                continue;
            }
        };
        match iter.next() {
            Some(path) => *slot = PathBuf::from(path),
            None => return format!("missing path after {arg}\n{}", help()),
        }
    }
    if names.is_empty() {
        return help().to_string();
    }

    let resolver = TransportResolver::new(VintfObject::new(config));
    names
        .into_iter()
        .map(|name| match resolver.get_transport(name) {
            Transport::Empty => format!("{name}: default"),
            transport => format!("{name}: {transport}"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses `std::env::args` and prints the execution result.
pub fn run() {
    let owned: Vec<String> = std::env::args().skip(1).collect();
    let refs: Vec<&str> = owned.iter().map(|s| s.as_str()).collect();
    println!("{}", execute(&refs));
}

#[cfg(test)]
mod tests {
    use super::{execute, help};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn help_contains_name() {
        assert!(help().contains("hidl-transport"));
        assert_eq!(execute(&["--help"]), help());
        assert_eq!(execute(&[]), help());
    }

    #[test]
    fn missing_path_is_reported() {
        assert!(execute(&["--device"]).starts_with("missing path after --device"));
    }

    #[test]
    fn reports_one_line_per_name() {
        let dir = TempDir::new().unwrap();
        let framework = dir.path().join("framework.toml");
        fs::write(
            &framework,
            "[[hal]]\nname = \"android.hidl.manager\"\ntransport = \"hwbinder\"\nversions = [\"1.0\"]\n",
        )
        .unwrap();
        let device = dir.path().join("device.toml");
        let framework = framework.to_str().unwrap();
        let device = device.to_str().unwrap();

        let out = execute(&[
            "--framework",
            framework,
            "--device",
            device,
            "android.hidl.manager@1.0::IServiceManager",
            "vendor.acme.foo@2.1::IFoo",
        ]);
        assert_eq!(
            out,
            "android.hidl.manager@1.0::IServiceManager: hwbinder\nvendor.acme.foo@2.1::IFoo: default"
        );
    }
}
