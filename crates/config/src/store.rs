// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! Live, hot-reloadable configuration handle (spec.md §4.2, §8 scenario 5).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tbc_core::error::TurbulenceError;

use crate::doc::ConfigDoc;
use crate::parse::parse_document;

/// Owns the current `ConfigDoc` behind an `ArcSwap`. `reload` parses a
/// fresh document and swaps it in atomically; existing `Arc<ConfigDoc>`
/// clones held by in-flight connections (or already handed to a forked
/// child) keep observing the old tree, so a SIGHUP reload never mutates
/// state a child has already captured.
pub struct ConfigStore {
    path: PathBuf,
    current: ArcSwap<ConfigDoc>,
}

impl ConfigStore {
    /// Load `path` for the first time.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, TurbulenceError> {
        let path = path.into();
        let doc = Self::read_and_parse(&path)?;
        Ok(Self {
            path,
            current: ArcSwap::from_pointee(doc),
        })
    }

    /// An `Arc` snapshot of the current document. Cheap, lock-free.
    pub fn snapshot(&self) -> Arc<ConfigDoc> {
        self.current.load_full()
    }

    /// Re-read and re-parse the file at `self.path`, replacing the live
    /// document on success. On parse failure the previous document is
    /// left in place and the error is returned for the caller to log
    /// (spec.md §4.5 phase 3: reload must not tear down a working
    /// configuration).
    pub fn reload(&self) -> Result<(), TurbulenceError> {
        let doc = Self::read_and_parse(&self.path)?;
        self.current.store(Arc::new(doc));
        Ok(())
    }

    fn read_and_parse(path: &Path) -> Result<ConfigDoc, TurbulenceError> {
        let xml = std::fs::read_to_string(path)?;
        parse_document(&xml)
    }
}
