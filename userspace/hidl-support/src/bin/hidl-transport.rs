// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Binary entrypoint: print the transport of each named interface.

fn main() {
    env_logger::init();
    hidl_support::run();
}
