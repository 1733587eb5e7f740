// SPDX-License-Identifier: MIT OR Apache-2.0
//! The `PredictCallable` sum type: a uniform invocation surface over the
//! four predictor shapes.

use futures_core::stream::BoxStream;
use pr_error::RunnerError;

/// One item produced by a predictor call, normalized by the caller against
/// the declared `OutputType` before use.
pub type PredictItem = Result<serde_json::Value, RunnerError>;

/// What a predictor's `predict` entry point returns, uniformly across its
/// four possible shapes.
///
/// The file-runner loop dispatches on this without caring which shape the
/// user wrote: `Single` variants resolve once, `Stream` variants yield any
/// number of items before completing.
pub enum PredictCallable {
    /// A synchronous call that already produced its single result.
    Single(PredictItem),
    /// An asynchronous call that resolves to a single result.
    AsyncSingle(futures::future::BoxFuture<'static, PredictItem>),
    /// A synchronous generator: items already collected into an iterator.
    SyncStream(Box<dyn Iterator<Item = PredictItem> + Send>),
    /// An asynchronous generator.
    AsyncStream(BoxStream<'static, PredictItem>),
}

impl PredictCallable {
    /// Whether this call form yields incrementally rather than resolving
    /// once.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::SyncStream(_) | Self::AsyncStream(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[test]
    fn single_is_not_streaming() {
        let c = PredictCallable::Single(Ok(serde_json::json!("x")));
        assert!(!c.is_streaming());
    }

    #[test]
    fn sync_stream_is_streaming() {
        let c = PredictCallable::SyncStream(Box::new(std::iter::once(Ok(serde_json::json!(1)))));
        assert!(c.is_streaming());
    }

    #[test]
    fn async_stream_is_streaming() {
        let s = stream::iter(vec![Ok(serde_json::json!(1))]);
        let c = PredictCallable::AsyncStream(Box::pin(s));
        assert!(c.is_streaming());
    }
}
