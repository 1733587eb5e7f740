// SPDX-License-Identifier: MIT OR Apache-2.0
//! pr-schema
//!
//! Builds the immutable [`PredictorInfo`] a predictor is described by:
//! input fields with their constraints ([`InputField`], [`Constraints`]),
//! the declared return shape ([`OutputType`], [`OutputKind`]), and the
//! [`PredictorBuilder`] that assembles and validates them in place of
//! runtime signature introspection.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod input_field;
mod output;
mod predictor_info;

pub use builder::{InputDecl, PredictorBuilder};
pub use input_field::{Constraints, InputField};
pub use output::{OutputKind, OutputType};
pub use predictor_info::PredictorInfo;
