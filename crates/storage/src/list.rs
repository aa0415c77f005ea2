// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! One newline-delimited flat file, guarded by the `db_list_mutex`
//! lock named in spec.md §5's lock order (`... > data_mutex >
//! db_list_mutex`).

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::Mutex;
use tbc_core::error::TurbulenceError;

struct Contents {
    entries: Vec<String>,
    mtime: Option<SystemTime>,
}

/// An append-only list of strings backed by a flat file. Safe for
/// concurrent use from multiple threads in this process; an
/// `mtime` check on each access picks up edits made by another
/// process (e.g. an administrator hand-editing the file) before the
/// next operation touches it.
pub struct ListStore {
    path: PathBuf,
    state: Mutex<Contents>,
}

impl ListStore {
    /// Open (without requiring it to already exist) the list file at
    /// `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, TurbulenceError> {
        let path = path.into();
        let (entries, mtime) = read_file(&path)?;
        Ok(Self {
            path,
            state: Mutex::new(Contents { entries, mtime }),
        })
    }

    /// Reload from disk if the file's mtime has moved since we last
    /// read it. Returns whether a reload happened.
    fn reload_if_stale(&self, state: &mut Contents) -> Result<bool, TurbulenceError> {
        let current_mtime = file_mtime(&self.path)?;
        if current_mtime == state.mtime {
            return Ok(false);
        }
        let (entries, mtime) = read_file(&self.path)?;
        state.entries = entries;
        state.mtime = mtime;
        Ok(true)
    }

    pub fn contains(&self, value: &str) -> Result<bool, TurbulenceError> {
        let mut state = self.state.lock();
        self.reload_if_stale(&mut state)?;
        Ok(state.entries.iter().any(|e| e == value))
    }

    /// Append `value` if not already present. Returns `false` without
    /// touching the file if it was already there.
    pub fn add(&self, value: &str) -> Result<bool, TurbulenceError> {
        let mut state = self.state.lock();
        self.reload_if_stale(&mut state)?;
        if state.entries.iter().any(|e| e == value) {
            return Ok(false);
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(TurbulenceError::Io)?;
        writeln!(file, "{value}").map_err(TurbulenceError::Io)?;
        state.entries.push(value.to_string());
        state.mtime = file_mtime(&self.path)?;
        Ok(true)
    }

    /// Remove every occurrence of `value`, rewriting the whole file.
    /// Returns whether anything was removed.
    pub fn remove(&self, value: &str) -> Result<bool, TurbulenceError> {
        let mut state = self.state.lock();
        self.reload_if_stale(&mut state)?;
        let before = state.entries.len();
        state.entries.retain(|e| e != value);
        if state.entries.len() == before {
            return Ok(false);
        }
        write_all(&self.path, &state.entries)?;
        state.mtime = file_mtime(&self.path)?;
        Ok(true)
    }

    /// Snapshot of every entry, in file order, reloading first if the
    /// file changed underneath us.
    pub fn iter(&self) -> Result<Vec<String>, TurbulenceError> {
        let mut state = self.state.lock();
        self.reload_if_stale(&mut state)?;
        Ok(state.entries.clone())
    }

    pub fn len(&self) -> Result<usize, TurbulenceError> {
        Ok(self.iter()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, TurbulenceError> {
        Ok(self.len()? == 0)
    }
}

fn file_mtime(path: &Path) -> Result<Option<SystemTime>, TurbulenceError> {
    match std::fs::metadata(path) {
        Ok(meta) => Ok(Some(meta.modified().map_err(TurbulenceError::Io)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(TurbulenceError::Io(e)),
    }
}

fn read_file(path: &Path) -> Result<(Vec<String>, Option<SystemTime>), TurbulenceError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((Vec::new(), None)),
        Err(e) => return Err(TurbulenceError::Io(e)),
    };
    let reader = BufReader::new(file);
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(TurbulenceError::Io)?;
        if !line.is_empty() {
            entries.push(line);
        }
    }
    Ok((entries, file_mtime(path)?))
}

fn write_all(path: &Path, entries: &[String]) -> Result<(), TurbulenceError> {
    let mut file = File::create(path).map_err(TurbulenceError::Io)?;
    for entry in entries {
        writeln!(file, "{entry}").map_err(TurbulenceError::Io)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "list_tests.rs"]
mod tests;
