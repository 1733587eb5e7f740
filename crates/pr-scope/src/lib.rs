// SPDX-License-Identifier: MIT OR Apache-2.0
//! pr-scope
//!
//! Per-prediction context and metrics ([`Scope`], [`ScopeRegistry`]), and
//! explicit pid-tagged stdio capture ([`LineRouter`]) in place of
//! process-wide write-hook monkey-patching.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod capture;
mod line_router;
mod scope;

pub use capture::{TaggedWriter, PREDICTOR_LOG_TARGET};
pub use line_router::{write_tagged, LineRouter, MAX_LINE_BYTES, TRUNCATED_MARKER};
pub use scope::{Scope, ScopeRegistry};
