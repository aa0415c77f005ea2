// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! Privilege transitions (spec.md §4.6.5): `change_root` then
//! `change_user_id`, called exactly once per child, before
//! `ppath_selected` is broadcast (§5 ordering (iii)).

use std::path::Path;

use nix::unistd::{chroot, getuid, setgid, setuid, Gid, Uid};
use tbc_core::error::TurbulenceError;

/// `chroot` only if the current real UID is 0 and `path` is set
/// (spec.md §4.6.5).
pub fn change_root(path: Option<&Path>) -> Result<(), TurbulenceError> {
    let Some(path) = path else {
        return Ok(());
    };
    if !getuid().is_root() {
        return Ok(());
    }
    chroot(path).map_err(|e| {
        TurbulenceError::ChildSpawnFailed {
            path_name: path.display().to_string(),
            reason: format!("chroot failed: {e}"),
        }
    })?;
    std::env::set_current_dir("/").map_err(TurbulenceError::Io)
}

/// Set GID then UID, in that order, when provided. GID-without-UID is
/// rejected at config-load (`PPathDef::validate`), not here.
pub fn change_user_id(user_id: Option<u32>, group_id: Option<u32>) -> Result<(), TurbulenceError> {
    if let Some(gid) = group_id {
        setgid(Gid::from_raw(gid)).map_err(|e| TurbulenceError::ChildSpawnFailed {
            path_name: String::new(),
            reason: format!("setgid({gid}) failed: {e}"),
        })?;
    }
    if let Some(uid) = user_id {
        setuid(Uid::from_raw(uid)).map_err(|e| TurbulenceError::ChildSpawnFailed {
            path_name: String::new(),
            reason: format!("setuid({uid}) failed: {e}"),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_root_is_a_no_op_without_a_path() {
        assert!(change_root(None).is_ok());
    }

    #[test]
    fn change_root_is_a_no_op_when_not_root() {
        if getuid().is_root() {
            return;
        }
        assert!(change_root(Some(Path::new("/tmp"))).is_ok());
    }

    #[test]
    fn change_user_id_is_a_no_op_with_nothing_set() {
        assert!(change_user_id(None, None).is_ok());
    }
}
