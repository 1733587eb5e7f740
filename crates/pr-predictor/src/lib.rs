// SPDX-License-Identifier: MIT OR Apache-2.0
//! pr-predictor
//!
//! Uniform invocation of a user predictor across its four possible call
//! shapes ([`PredictCallable`]), input validation against a
//! [`pr_schema::PredictorInfo`] ([`PredictorAdapter::check_input`]), and
//! cooperative cancellation ([`CancellationToken`]).

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod adapter;
mod callable;
mod cancellation;

pub use adapter::{resolve_weights_source, PredictorAdapter, PredictorImpl, WeightsSource};
pub use callable::{PredictCallable, PredictItem};
pub use cancellation::CancellationToken;
