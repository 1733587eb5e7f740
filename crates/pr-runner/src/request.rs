// SPDX-License-Identifier: MIT OR Apache-2.0
//! `request-<pid>.json` body, per spec §6.

use serde::Deserialize;
use std::collections::BTreeMap;

/// A prediction request read from `request-<pid>.json`.
///
/// The request's identity is the `pid` extracted from its filename, not a
/// field of the body itself — see [`crate::workdir::parse_request_filename`].
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionRequest {
    /// Raw (un-normalized) input values, keyed by declared field name.
    pub input: serde_json::Map<String, serde_json::Value>,
    /// Context forwarded into the prediction's [`pr_scope::Scope`].
    /// Known keys of interest: `procedure_source_url`,
    /// `replicate_api_token`; unrecognized keys are preserved but unacted
    /// on.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// When set, the runner emits an intermediate response file at every
    /// epoch instead of only the terminal one (spec §4.6). Actual HTTP
    /// delivery to this URL is an external collaborator's job.
    #[serde(default)]
    pub webhook: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_minimal_request() {
        let req: PredictionRequest = serde_json::from_value(serde_json::json!({
            "input": {"s": "bar"}
        }))
        .unwrap();
        assert_eq!(req.input.get("s"), Some(&serde_json::json!("bar")));
        assert!(req.context.is_empty());
        assert!(req.webhook.is_none());
    }

    #[test]
    fn deserializes_context_and_webhook() {
        let req: PredictionRequest = serde_json::from_value(serde_json::json!({
            "input": {},
            "context": {"replicate_api_token": "tok"},
            "webhook": "http://api"
        }))
        .unwrap();
        assert_eq!(req.context.get("replicate_api_token"), Some(&"tok".to_string()));
        assert_eq!(req.webhook.as_deref(), Some("http://api"));
    }
}
