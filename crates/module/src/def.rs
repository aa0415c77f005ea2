// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! The module ABI (spec.md §6.3): a `#[repr(C)]` struct of `extern "C"`
//! function pointers, exported by every dynamically loaded module under
//! the symbol name `module_def`.
//!
//! `ctx` is an opaque daemon handle passed back uninterpreted; modules
//! never see the layout of `tbc-daemon`'s orchestrator. `ppath_selected`
//! takes the numeric ids rather than raw struct pointers so the ABI
//! doesn't have to also freeze `PPathDef`'s layout — only the id spaces
//! (`PathId`, `ConnId`) need to stay stable across crate versions.

use std::os::raw::{c_char, c_void};

/// `init`/`reload`/`ppath_selected` return this: C's "success boolean".
pub type ModuleBool = i32;

pub const MODULE_OK: ModuleBool = 1;
pub const MODULE_FAIL: ModuleBool = 0;

/// The stable C ABI every module shared object exports one instance of,
/// under the symbol `module_def` (spec.md §6.3).
#[repr(C)]
pub struct ModuleDef {
    pub name: *const c_char,
    pub description: *const c_char,
    pub init: extern "C" fn(ctx: *mut c_void) -> ModuleBool,
    pub close: extern "C" fn(ctx: *mut c_void),
    pub reload: extern "C" fn(ctx: *mut c_void) -> ModuleBool,
    pub unload: Option<extern "C" fn(ctx: *mut c_void)>,
    pub ppath_selected: Option<
        extern "C" fn(ctx: *mut c_void, ppath_def_id: u32, conn_id: u64) -> ModuleBool,
    >,
}

// SAFETY: a `ModuleDef` is a table of function pointers and two
// `*const c_char` string pointers into the loaded library's static
// data; neither mutates, so sharing the reference across threads is
// sound as long as the library itself stays mapped (enforced by
// `LoadedModule` keeping `libloading::Library` alive alongside it).
unsafe impl Send for ModuleDef {}
unsafe impl Sync for ModuleDef {}

impl ModuleDef {
    /// Read `name` as a UTF-8 string. Returns `"<invalid-utf8>"` rather
    /// than panicking if the module misbehaves.
    pub fn name_str(&self) -> std::borrow::Cow<'_, str> {
        unsafe { c_str_or_invalid(self.name) }
    }

    pub fn description_str(&self) -> std::borrow::Cow<'_, str> {
        unsafe { c_str_or_invalid(self.description) }
    }
}

/// # Safety
/// `ptr` must be either null or a valid, NUL-terminated C string with a
/// lifetime at least as long as the returned borrow.
unsafe fn c_str_or_invalid<'a>(ptr: *const c_char) -> std::borrow::Cow<'a, str> {
    if ptr.is_null() {
        return std::borrow::Cow::Borrowed("<unnamed>");
    }
    match std::ffi::CStr::from_ptr(ptr).to_str() {
        Ok(s) => std::borrow::Cow::Borrowed(s),
        Err(_) => std::borrow::Cow::Borrowed("<invalid-utf8>"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn noop_init(_ctx: *mut c_void) -> ModuleBool {
        MODULE_OK
    }
    extern "C" fn noop_close(_ctx: *mut c_void) {}
    extern "C" fn noop_reload(_ctx: *mut c_void) -> ModuleBool {
        MODULE_OK
    }

    #[test]
    fn null_name_reports_unnamed() {
        let def = ModuleDef {
            name: std::ptr::null(),
            description: std::ptr::null(),
            init: noop_init,
            close: noop_close,
            reload: noop_reload,
            unload: None,
            ppath_selected: None,
        };
        assert_eq!(def.name_str(), "<unnamed>");
    }

    #[test]
    fn valid_name_is_read_through() {
        let name = std::ffi::CString::new("demo-module").expect("no interior nul");
        let def = ModuleDef {
            name: name.as_ptr(),
            description: std::ptr::null(),
            init: noop_init,
            close: noop_close,
            reload: noop_reload,
            unload: None,
            ppath_selected: None,
        };
        assert_eq!(def.name_str(), "demo-module");
    }
}
