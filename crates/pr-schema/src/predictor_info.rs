// SPDX-License-Identifier: MIT OR Apache-2.0
//! The immutable descriptor built once at startup and shared by every
//! prediction afterward.

use crate::input_field::InputField;
use crate::output::OutputType;
use indexmap::IndexMap;

/// `(module_ref, symbol_ref, inputs, output)` — built once during startup
/// and never mutated afterward.
#[derive(Debug, Clone)]
pub struct PredictorInfo {
    /// The configured module name (`config.json`'s `module_name`).
    pub module_ref: String,
    /// The configured predictor symbol (`config.json`'s `predictor_name`).
    pub symbol_ref: String,
    /// Declared input fields, insertion-ordered by declared position.
    pub inputs: IndexMap<String, InputField>,
    /// The predictor's declared return shape.
    pub output: OutputType,
}

impl PredictorInfo {
    /// Look up an input field by name.
    #[must_use]
    pub fn input(&self, name: &str) -> Option<&InputField> {
        self.inputs.get(name)
    }

    /// Input fields in declared order.
    pub fn ordered_inputs(&self) -> impl Iterator<Item = &InputField> {
        self.inputs.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input_field::Constraints;
    use crate::output::OutputKind;
    use pr_value::{FieldType, PrimitiveType};

    fn field(name: &str, order: usize) -> InputField {
        InputField {
            name: name.to_string(),
            order,
            field_type: FieldType::required(PrimitiveType::String),
            default: None,
            constraints: Constraints::default(),
        }
    }

    #[test]
    fn ordered_inputs_preserves_insertion_order() {
        let mut inputs = IndexMap::new();
        inputs.insert("b".to_string(), field("b", 1));
        inputs.insert("a".to_string(), field("a", 0));
        let info = PredictorInfo {
            module_ref: "m".into(),
            symbol_ref: "Predictor".into(),
            inputs,
            output: OutputType::scalar(OutputKind::Single, PrimitiveType::String).unwrap(),
        };
        let names: Vec<_> = info.ordered_inputs().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn input_lookup() {
        let mut inputs = IndexMap::new();
        inputs.insert("a".to_string(), field("a", 0));
        let info = PredictorInfo {
            module_ref: "m".into(),
            symbol_ref: "Predictor".into(),
            inputs,
            output: OutputType::scalar(OutputKind::Single, PrimitiveType::String).unwrap(),
        };
        assert!(info.input("a").is_some());
        assert!(info.input("missing").is_none());
    }
}
