// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The injected log sink used by kernels to report lifecycle events.
//!
//! The runtime never persists logs itself. Kernels hand [`LogRecord`]s to the
//! [`LogSink`] stored in the session [`Context`](crate::Context); the default
//! [`FacadeSink`] forwards them to the `log` facade so whatever logger the
//! binary installed picks them up.

use std::error::Error;

/// Severity of a [`LogRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Very verbose diagnostics.
    Trace,
    /// Diagnostics useful while developing.
    Debug,
    /// Normal operational messages.
    Info,
    /// Something unexpected that the runtime recovered from.
    Warn,
    /// A failure that was contained.
    Error,
    /// A failure that terminated a kernel.
    Fatal,
}

/// A single leveled log message, optionally carrying the error that caused it.
#[derive(Debug, Clone, Copy)]
pub struct LogRecord<'a> {
    /// Severity.
    pub level: LogLevel,
    /// Subsystem that emitted the record, e.g. `strata::kernel::game`.
    pub target: &'a str,
    /// Human readable message.
    pub message: &'a str,
    /// The error being reported, if any.
    pub error: Option<&'a (dyn Error + 'static)>,
}

/// Destination for runtime log records.
pub trait LogSink: Send + Sync {
    /// Handles one record. Must not block for long; it is called from kernel threads.
    fn log(&self, record: &LogRecord<'_>);
}

/// Forwards records to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct FacadeSink;

impl LogSink for FacadeSink {
    fn log(&self, record: &LogRecord<'_>) {
        let (level, prefix) = match record.level {
            LogLevel::Trace => (log::Level::Trace, ""),
            LogLevel::Debug => (log::Level::Debug, ""),
            LogLevel::Info => (log::Level::Info, ""),
            LogLevel::Warn => (log::Level::Warn, ""),
            LogLevel::Error => (log::Level::Error, ""),
            LogLevel::Fatal => (log::Level::Error, "FATAL: "),
        };

        match record.error {
            Some(error) => log::log!(
                target: record.target,
                level,
                "{prefix}{}: {error:#}",
                record.message
            ),
            None => log::log!(target: record.target, level, "{prefix}{}", record.message),
        }
    }
}

/// Convenience helpers so call sites read like the `log` macros.
pub trait LogSinkExt: LogSink {
    /// Emits an info record.
    fn info(&self, target: &str, message: &str) {
        self.log(&LogRecord {
            level: LogLevel::Info,
            target,
            message,
            error: None,
        });
    }

    /// Emits a warning record.
    fn warn(&self, target: &str, message: &str) {
        self.log(&LogRecord {
            level: LogLevel::Warn,
            target,
            message,
            error: None,
        });
    }

    /// Emits an error record with its cause.
    fn error(&self, target: &str, message: &str, error: &(dyn Error + 'static)) {
        self.log(&LogRecord {
            level: LogLevel::Error,
            target,
            message,
            error: Some(error),
        });
    }

    /// Emits a fatal record with its cause.
    fn fatal(&self, target: &str, message: &str, error: &(dyn Error + 'static)) {
        self.log(&LogRecord {
            level: LogLevel::Fatal,
            target,
            message,
            error: Some(error),
        });
    }
}

impl<S: LogSink + ?Sized> LogSinkExt for S {}
