// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-thread log capture for asserting severities in unit tests.

use std::cell::RefCell;
use std::sync::Once;

use log::{Level, LevelFilter, Log, Metadata, Record};

thread_local! {
    static RECORDS: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
}

struct ThreadLogger;

impl Log for ThreadLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        RECORDS.with(|records| {
            records.borrow_mut().push((record.level(), record.args().to_string()));
        });
    }

    fn flush(&self) {}
}

static LOGGER: ThreadLogger = ThreadLogger;
static INSTALL: Once = Once::new();

/// Records emitted on the current thread since [`capture`] was called.
pub(crate) struct Capture(());

/// Installs the capturing logger (once per process) and clears this thread's buffer.
pub(crate) fn capture() -> Capture {
    INSTALL.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    });
    RECORDS.with(|records| records.borrow_mut().clear());
    Capture(())
}

impl Capture {
    pub(crate) fn records(&self) -> Vec<(Level, String)> {
        RECORDS.with(|records| records.borrow().clone())
    }

    /// `true` if a record at exactly `level` contains `needle`.
    pub(crate) fn contains(&self, level: Level, needle: &str) -> bool {
        self.records().iter().any(|(l, message)| *l == level && message.contains(needle))
    }

    pub(crate) fn levels(&self) -> Vec<Level> {
        self.records().into_iter().map(|(level, _)| level).collect()
    }
}
