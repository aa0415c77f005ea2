// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! Log channel fanout (spec.md §3, §9 item 5).
//!
//! The original daemon keeps four independent log streams: general,
//! error, access, and the underlying BEEP engine's own debug log. Each
//! channel gets its own `tracing` target so a subscriber can route them
//! to distinct files (or, across a fork, distinct pipe fds) without the
//! caller threading file handles through every log call site.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// One of the four log streams a turbulence process writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogChannel {
    General,
    Error,
    Access,
    Driver,
}

impl LogChannel {
    /// The `tracing` target string routed calls on this channel carry.
    pub const fn target(self) -> &'static str {
        match self {
            LogChannel::General => "tbc::general",
            LogChannel::Error => "tbc::error",
            LogChannel::Access => "tbc::access",
            LogChannel::Driver => "tbc::driver",
        }
    }

    pub const fn file_stem(self) -> &'static str {
        match self {
            LogChannel::General => "general",
            LogChannel::Error => "error",
            LogChannel::Access => "access",
            LogChannel::Driver => "vortex",
        }
    }

    pub const ALL: [LogChannel; 4] = [
        LogChannel::General,
        LogChannel::Error,
        LogChannel::Access,
        LogChannel::Driver,
    ];
}

/// Owns the non-blocking writer guards for every channel. Dropping a
/// `LogManager` flushes and closes its appenders, so the daemon keeps one
/// alive for the lifetime of `main` (and each forked child builds its
/// own after `turbulence_module_notify(TBC_INIT_HANDLER)`-equivalent
/// re-init, mirroring `original_source/src/turbulence-process.c`).
pub struct LogManager {
    _guards: Vec<WorkerGuard>,
    log_dir: PathBuf,
}

impl LogManager {
    /// Install a subscriber that fans every channel out to
    /// `<log_dir>/<stem>.log` via a non-blocking appender. Returns the
    /// manager holding the guards; it must be kept alive for logs to
    /// flush.
    pub fn init(log_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let log_dir = log_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&log_dir)?;

        let mut guards = Vec::with_capacity(LogChannel::ALL.len());
        let mut layers = Vec::new();

        for channel in LogChannel::ALL {
            let appender = tracing_appender::rolling::never(&log_dir, format!("{}.log", channel.file_stem()));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            guards.push(guard);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_filter(tracing_subscriber::filter::filter_fn(move |meta| {
                    meta.target() == channel.target()
                }));
            layers.push(layer);
        }

        use tracing_subscriber::layer::SubscriberExt;
        use tracing_subscriber::util::SubscriberInitExt;

        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(layers)
            .try_init();

        Ok(Self {
            _guards: guards,
            log_dir,
        })
    }

    /// Directory the four `*.log` files live under, for a forked child
    /// to hand its inherited pipe write-ends a matching path on disk.
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

/// Emit at the given channel's target. Thin macros kept here (rather
/// than at each call site) so channel routing stays a one-word change.
#[macro_export]
macro_rules! log_general {
    ($lvl:ident, $($arg:tt)+) => {
        tracing::$lvl!(target: $crate::logging::LogChannel::General.target(), $($arg)+)
    };
}

#[macro_export]
macro_rules! log_error {
    ($lvl:ident, $($arg:tt)+) => {
        tracing::$lvl!(target: $crate::logging::LogChannel::Error.target(), $($arg)+)
    };
}

#[macro_export]
macro_rules! log_access {
    ($lvl:ident, $($arg:tt)+) => {
        tracing::$lvl!(target: $crate::logging::LogChannel::Access.target(), $($arg)+)
    };
}

#[macro_export]
macro_rules! log_driver {
    ($lvl:ident, $($arg:tt)+) => {
        tracing::$lvl!(target: $crate::logging::LogChannel::Driver.target(), $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_channel_has_a_distinct_target_and_stem() {
        let targets: std::collections::HashSet<_> =
            LogChannel::ALL.iter().map(|c| c.target()).collect();
        assert_eq!(targets.len(), LogChannel::ALL.len());

        let stems: std::collections::HashSet<_> =
            LogChannel::ALL.iter().map(|c| c.file_stem()).collect();
        assert_eq!(stems.len(), LogChannel::ALL.len());
    }

    #[test]
    fn init_creates_the_log_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("logs");
        let _manager = LogManager::init(&target).expect("init succeeds");
        assert!(target.is_dir());
    }
}
