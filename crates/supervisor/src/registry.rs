// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! The supervisor's child table, guarded by the single
//! `child_process_mutex` the lock order in spec.md §5 names explicitly.

use std::collections::HashMap;
use std::sync::Arc;

use nix::unistd::Pid;
use parking_lot::Mutex;
use tbc_core::ppath::PathId;

use crate::child::Child;

/// Lives under `Context::child_process_mutex` (spec.md §5 lock order:
/// `exit_mutex > modules_mutex > child_process_mutex > ...`). Callers
/// above this crate are responsible for taking locks in that order;
/// this type only protects its own table.
#[derive(Default)]
pub struct ChildRegistry {
    children: Mutex<HashMap<Pid, Arc<Child>>>,
}

impl ChildRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, child: Arc<Child>) {
        self.children.lock().insert(child.pid, child);
    }

    pub fn remove(&self, pid: Pid) -> Option<Arc<Child>> {
        self.children.lock().remove(&pid)
    }

    pub fn get(&self, pid: Pid) -> Option<Arc<Child>> {
        self.children.lock().get(&pid).cloned()
    }

    pub fn len(&self) -> usize {
        self.children.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.lock().is_empty()
    }

    /// Reuse lookup for `separate + reuse` paths (spec.md §4.7.4):
    /// find a live child already bound to `(def_id, server_name)`.
    pub fn find_reusable(&self, def_id: PathId, server_name: Option<&str>) -> Option<Arc<Child>> {
        self.children
            .lock()
            .values()
            .find(|c| c.matches_reuse(def_id, server_name))
            .cloned()
    }

    /// Snapshot of every pid currently tracked, for reaping sweeps.
    pub fn all_pids(&self) -> Vec<Pid> {
        self.children.lock().keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::net::UnixStream;
    use std::path::PathBuf;

    fn child(pid: i32, def_id: PathId, server_name: Option<&str>, reuse: bool) -> Arc<Child> {
        let (a, _b) = UnixStream::pair().expect("pair");
        Arc::new(Child::new(
            Pid::from_raw(pid),
            def_id,
            server_name.map(str::to_string),
            PathBuf::new(),
            a,
            reuse,
        ))
    }

    #[test]
    fn insert_then_get_then_remove() {
        let reg = ChildRegistry::new();
        let c = child(100, 1, None, false);
        reg.insert(c.clone());
        assert_eq!(reg.len(), 1);
        assert!(reg.get(Pid::from_raw(100)).is_some());
        assert!(reg.remove(Pid::from_raw(100)).is_some());
        assert!(reg.is_empty());
    }

    #[test]
    fn find_reusable_matches_def_and_server_name() {
        let reg = ChildRegistry::new();
        reg.insert(child(200, 3, Some("core-admin"), true));
        assert!(reg.find_reusable(3, Some("core-admin")).is_some());
        assert!(reg.find_reusable(3, Some("other")).is_none());
        assert!(reg.find_reusable(4, Some("core-admin")).is_none());
    }

    #[test]
    fn non_reuse_children_are_never_returned() {
        let reg = ChildRegistry::new();
        reg.insert(child(300, 3, Some("core-admin"), false));
        assert!(reg.find_reusable(3, Some("core-admin")).is_none());
    }
}
