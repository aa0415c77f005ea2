// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! Per-connection typed attribute bag (spec.md §6.2).

use std::collections::HashMap;

/// A small string-keyed, string-valued bag. `connmark`/`preconnmark`
/// checks and tuning-profile aliases (spec.md §4.6.2, §4.6.3) are all
/// plain presence/equality checks against this bag, so it stays
/// untyped rather than growing a variant per caller.
#[derive(Debug, Clone, Default)]
pub struct ConnAttrs {
    values: HashMap<String, String>,
}

impl ConnAttrs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let mut attrs = ConnAttrs::new();
        attrs.set("tls-fication:status", "1");
        assert_eq!(attrs.get("tls-fication:status"), Some("1"));
        assert!(attrs.has("tls-fication:status"));
        assert!(!attrs.has("other"));
    }
}
