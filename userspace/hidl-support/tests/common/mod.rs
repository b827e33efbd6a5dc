// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared helpers for integration tests: per-thread log capture and manifest fixtures.

#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::sync::Once;

use log::{Level, LevelFilter, Log, Metadata, Record};

thread_local! {
    static RECORDS: RefCell<Vec<(Level, String, String)>> = const { RefCell::new(Vec::new()) };
}

struct ThreadLogger;

impl Log for ThreadLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        RECORDS.with(|records| {
            records.borrow_mut().push((
                record.level(),
                record.target().to_string(),
                record.args().to_string(),
            ));
        });
    }

    fn flush(&self) {}
}

static LOGGER: ThreadLogger = ThreadLogger;
static INSTALL: Once = Once::new();

/// Clears this thread's log buffer, installing the logger on first use.
pub fn capture_logs() {
    INSTALL.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    });
    RECORDS.with(|records| records.borrow_mut().clear());
}

/// `(level, target, message)` for every record since [`capture_logs`].
pub fn logged() -> Vec<(Level, String, String)> {
    RECORDS.with(|records| records.borrow().clone())
}

/// Writes a manifest declaring `(name, transport, "M.m M.m ...")` entries.
pub fn write_manifest(path: &Path, hals: &[(&str, &str, &str)]) {
    let mut text = String::new();
    for (name, transport, versions) in hals {
        let versions: Vec<String> =
            versions.split_whitespace().map(|v| format!("\"{v}\"")).collect();
        text.push_str(&format!(
            "[[hal]]\nname = \"{name}\"\ntransport = \"{transport}\"\nversions = [{}]\n\n",
            versions.join(", ")
        ));
    }
    fs::write(path, text).expect("write manifest");
}
