// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! Module host (spec.md §4.5): discovery, the register/init lifecycle,
//! SIGHUP reload, and ordered shutdown.

use std::os::raw::c_void;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};
use tbc_core::error::TurbulenceError;
use tracing::{error, info};

use crate::def::{ModuleDef, MODULE_FAIL, MODULE_OK};

/// A module successfully loaded and registered. Keeps the `Library`
/// alive for as long as `def` (a raw pointer into the library's static
/// data) is in use.
pub struct LoadedModule {
    path: PathBuf,
    _library: Library,
    def: *const ModuleDef,
}

// SAFETY: `def` points into `_library`'s mapped data, which this struct
// keeps alive; `ModuleDef` itself is `Send + Sync` (see def.rs).
unsafe impl Send for LoadedModule {}
unsafe impl Sync for LoadedModule {}

impl LoadedModule {
    pub fn name(&self) -> String {
        self.def().name_str().into_owned()
    }

    fn def(&self) -> &ModuleDef {
        // SAFETY: `def` was obtained from a live `Symbol` at load time
        // and `_library` outlives every access through `self`.
        unsafe { &*self.def }
    }
}

/// Outcome of loading one module, used by `clean_start` policy.
pub enum RegisterOutcome {
    Registered(LoadedModule),
    InitFailed { path: PathBuf, reason: String },
    LoadFailed { path: PathBuf, reason: String },
}

/// Owns every registered module in registration order, and the opaque
/// daemon context pointer handed to each ABI call.
pub struct ModuleHost {
    ctx: *mut c_void,
    modules: Vec<LoadedModule>,
}

// SAFETY: `ctx` is treated as an opaque token by every module; the host
// never dereferences it, only forwards it across the FFI boundary.
unsafe impl Send for ModuleHost {}

impl ModuleHost {
    /// `ctx` is passed uninterpreted to every module call; it typically
    /// points at (a stable address inside) the daemon's orchestrator.
    pub fn new(ctx: *mut c_void) -> Self {
        Self {
            ctx,
            modules: Vec::new(),
        }
    }

    /// Load and register one module file. Per spec.md §4.5 phase 1: on
    /// `init` failure the module is ejected; the caller decides whether
    /// that aborts the process (`clean_start`) based on the returned
    /// outcome.
    pub fn register(&mut self, path: impl AsRef<Path>) -> RegisterOutcome {
        let path = path.as_ref().to_path_buf();
        let library = match unsafe { Library::new(&path) } {
            Ok(lib) => lib,
            Err(e) => {
                return RegisterOutcome::LoadFailed {
                    path,
                    reason: e.to_string(),
                }
            }
        };

        let def_ptr: *const ModuleDef = unsafe {
            match library.get::<Symbol<*const ModuleDef>>(b"module_def\0") {
                Ok(sym) => **sym,
                Err(e) => {
                    return RegisterOutcome::LoadFailed {
                        path,
                        reason: format!("missing module_def symbol: {e}"),
                    }
                }
            }
        };

        let loaded = LoadedModule {
            path: path.clone(),
            _library: library,
            def: def_ptr,
        };

        let init = loaded.def().init;
        let ctx = self.ctx;
        let ok = call_guarded(&loaded.path, "init", || init(ctx));
        match ok {
            Some(MODULE_OK) => {
                info!(module = %loaded.name(), path = %path.display(), "module registered");
                RegisterOutcome::Registered(loaded)
            }
            _ => RegisterOutcome::InitFailed {
                path,
                reason: format!("{} init() returned failure", loaded.name()),
            },
        }
    }

    pub fn adopt(&mut self, module: LoadedModule) {
        self.modules.push(module);
    }

    /// Notify every registered module that a connection's profile path
    /// has been selected, after privilege drop (spec.md §4.5 phase 2).
    /// Returns `false` if any module with `close-conn-on-failure` should
    /// cause the connection to be torn down; the caller supplies that
    /// policy per module externally, this just reports per-module
    /// outcomes.
    pub fn notify_ppath_selected(&self, ppath_def_id: u32, conn_id: u64) -> Vec<(String, bool)> {
        let ctx = self.ctx;
        self.modules
            .iter()
            .filter_map(|m| {
                let def = m.def();
                def.ppath_selected.map(|f| {
                    let ok = call_guarded(&m.path, "ppath_selected", || {
                        f(ctx, ppath_def_id, conn_id)
                    });
                    (m.name(), ok == Some(MODULE_OK))
                })
            })
            .collect()
    }

    /// Reload every module (spec.md §4.5 phase 3). Idempotent; the
    /// orchestrator is responsible for serializing concurrent reloads
    /// (only one in flight).
    pub fn reload_all(&self) -> Result<(), TurbulenceError> {
        let ctx = self.ctx;
        let mut failures = Vec::new();
        for m in &self.modules {
            let def = m.def();
            let ok = call_guarded(&m.path, "reload", || (def.reload)(ctx));
            if ok != Some(MODULE_OK) {
                failures.push(m.name());
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(TurbulenceError::ModuleInitFailed {
                name: failures.join(", "),
                reason: "reload() returned failure".to_string(),
            })
        }
    }

    /// Close every module in reverse registration order, then unload
    /// (spec.md §4.5 phase 4). Consumes the host: nothing may call into
    /// a module again afterward.
    pub fn shutdown(mut self) {
        let ctx = self.ctx;
        while let Some(m) = self.modules.pop() {
            let def = m.def();
            let _ = call_guarded(&m.path, "close", || {
                (def.close)(ctx);
                MODULE_OK
            });
            if let Some(unload) = def.unload {
                let _ = call_guarded(&m.path, "unload", || {
                    unload(ctx);
                    MODULE_OK
                });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Call `f`, catching any unwind that escapes the FFI boundary and
/// converting it to a logged failure rather than propagating the panic
/// (spec.md DESIGN NOTES, "Exceptions across the module boundary").
fn call_guarded<F: FnOnce() -> i32>(path: &Path, phase: &str, f: F) -> Option<i32> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(rc) => Some(rc),
        Err(_) => {
            error!(module = %path.display(), phase, "module panicked across FFI boundary");
            Some(MODULE_FAIL)
        }
    }
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
