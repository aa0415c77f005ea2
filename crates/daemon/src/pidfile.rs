// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! PID file: written and exclusively locked for the process lifetime
//! (spec.md §4.2 `<global-settings>` `pid-file`), so a second
//! `turbulened` against the same config fails fast instead of racing
//! the first one's listeners.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tbc_core::error::TurbulenceError;

pub struct PidFile {
    path: PathBuf,
    file: File,
}

impl PidFile {
    /// Create (or reuse) the file at `path`, take an exclusive
    /// advisory lock, and write the current process's pid into it.
    /// The lock is held for the lifetime of the returned `PidFile`;
    /// a second process pointed at the same path gets
    /// `TurbulenceError::ConfigInvalid` instead of silently double-running.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, TurbulenceError> {
        let path = path.into();
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(TurbulenceError::Io)?;

        file.try_lock_exclusive().map_err(|_| {
            TurbulenceError::ConfigInvalid(format!(
                "pid file '{}' is locked by another running instance",
                path.display()
            ))
        })?;

        file.set_len(0).map_err(TurbulenceError::Io)?;
        writeln!(file, "{}", std::process::id()).map_err(TurbulenceError::Io)?;
        file.sync_all().map_err(TurbulenceError::Io)?;

        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        let _ = std::fs::remove_file(&self.path);
    }
}
