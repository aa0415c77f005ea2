// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! Debug-only lock-order checker (spec.md §5 lock order: `exit_mutex >
//! modules_mutex > child_process_mutex > data_mutex > db_list_mutex`).
//! Compiled to no-ops outside `debug_assertions` builds; the intent is
//! to catch an order violation in tests and dev runs, not to pay for
//! checking it in release.

use std::cell::RefCell;

/// Acquisition rank. A thread may only acquire a rank strictly greater
/// than whatever it currently holds — i.e. in the order listed in
/// spec.md §5, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LockRank {
    Exit = 0,
    Modules = 1,
    ChildProcess = 2,
    Data = 3,
    DbList = 4,
}

thread_local! {
    static HELD: RefCell<Vec<LockRank>> = const { RefCell::new(Vec::new()) };
}

/// Record that the current thread is about to acquire `rank`. Panics
/// if a rank that must come later in the order is already held.
#[track_caller]
pub fn acquire(rank: LockRank) {
    if !cfg!(debug_assertions) {
        return;
    }
    HELD.with(|held| {
        let top = held.borrow().last().copied();
        if let Some(top) = top {
            assert!(
                rank > top,
                "lock order violation: attempted to acquire {rank:?} while holding {top:?}"
            );
        }
        held.borrow_mut().push(rank);
    });
}

/// Record that `rank` has been released. Must nest strictly LIFO with
/// [`acquire`].
#[track_caller]
pub fn release(rank: LockRank) {
    if !cfg!(debug_assertions) {
        return;
    }
    HELD.with(|held| {
        let popped = held.borrow_mut().pop();
        assert_eq!(popped, Some(rank), "lock released out of LIFO order");
    });
}

/// RAII wrapper: acquire on construction, release on drop. Intended to
/// sit alongside (not replace) the real mutex guard, e.g.:
/// `let _order = LockOrderGuard::new(LockRank::ChildProcess); let g = child_process_mutex.lock();`
pub struct LockOrderGuard(LockRank);

impl LockOrderGuard {
    #[track_caller]
    pub fn new(rank: LockRank) -> Self {
        acquire(rank);
        Self(rank)
    }
}

impl Drop for LockOrderGuard {
    fn drop(&mut self) {
        release(self.0);
    }
}

#[cfg(test)]
#[path = "lockorder_tests.rs"]
mod tests;
