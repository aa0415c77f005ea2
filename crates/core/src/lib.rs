// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! tbc-core: shared data model for the turbulence BEEP application server.
//!
//! This crate has no dependency on a running BEEP stack: it holds the
//! expression matcher, the profile-path document types, the crate-wide
//! error type, and the log fanout plumbing shared by the daemon and its
//! children.

pub mod error;
pub mod expr;
pub mod id;
pub mod lockorder;
pub mod logging;
pub mod ppath;

pub use error::TurbulenceError;
pub use expr::Expr;
pub use id::ConnId;
pub use ppath::{PPath, PPathDef, PPathItem, PPathItemKind};
