// SPDX-License-Identifier: MIT OR Apache-2.0
//! Declarative predictor registration.
//!
//! Rust has no runtime annotation reflection, so this replaces the
//! signature-walking introspector with the registration-API alternative
//! named in the original design notes: predictor authors describe their
//! input fields and output shape explicitly, and the builder performs the
//! same validation and `PredictorInfo` assembly the introspector would
//! have derived from annotations.

use crate::input_field::{Constraints, InputField};
use crate::output::OutputType;
use crate::predictor_info::PredictorInfo;
use indexmap::IndexMap;
use pr_error::{ErrorCode, RunnerError};
use pr_value::{CoderRegistry, FieldType};

/// One input field declaration as supplied to [`PredictorBuilder::input`],
/// before order assignment and cross-field validation.
pub struct InputDecl {
    /// The field's name, unique within the predictor.
    pub name: String,
    /// The field's primitive + cardinality.
    pub field_type: FieldType,
    /// The raw declared default, if any. `Some(Value::Null)` against a
    /// non-optional `field_type` is rejected (see
    /// [`PredictorBuilder::build`]).
    pub default: Option<serde_json::Value>,
    /// Constraint attributes.
    pub constraints: Constraints,
}

/// Builds an immutable [`PredictorInfo`] from explicit field declarations.
///
/// Declaration order is preserved as each field's `order`; [`Self::build`]
/// accumulates every validation error instead of failing on the first.
pub struct PredictorBuilder {
    module_ref: String,
    symbol_ref: String,
    inputs: Vec<InputDecl>,
    output: Option<OutputType>,
}

impl PredictorBuilder {
    /// Start building a predictor descriptor for the given module/symbol
    /// reference (as read from `config.json`).
    #[must_use]
    pub fn new(module_ref: impl Into<String>, symbol_ref: impl Into<String>) -> Self {
        Self { module_ref: module_ref.into(), symbol_ref: symbol_ref.into(), inputs: Vec::new(), output: None }
    }

    /// Declare the next input field, in call order.
    #[must_use]
    pub fn input(mut self, decl: InputDecl) -> Self {
        self.inputs.push(decl);
        self
    }

    /// Declare the predictor's output shape.
    #[must_use]
    pub fn output(mut self, output: OutputType) -> Self {
        self.output = Some(output);
        self
    }

    /// Validate every declaration and assemble the immutable
    /// [`PredictorInfo`]. Returns every accumulated validation failure
    /// rather than stopping at the first: duplicate names, the
    /// required-type-with-null-default ambiguity, and each field's own
    /// constraint/type-compatibility and default-satisfies-constraints
    /// checks (delegated to [`InputField::validate`]).
    pub fn build(self, registry: &CoderRegistry) -> Result<PredictorInfo, Vec<RunnerError>> {
        let mut errors = Vec::new();
        let mut inputs = IndexMap::new();

        for (order, decl) in self.inputs.into_iter().enumerate() {
            if inputs.contains_key(&decl.name) {
                errors.push(
                    RunnerError::new(
                        ErrorCode::PredictorShapeInvalid,
                        format!("duplicate input field name '{}'", decl.name),
                    )
                    .with_context("field_name", decl.name.clone()),
                );
                continue;
            }
            if !decl.field_type.repetition.allows_null() && decl.default == Some(serde_json::Value::Null)
            {
                errors.push(
                    RunnerError::new(
                        ErrorCode::PredictorShapeInvalid,
                        format!(
                            "field '{}' is not OPTIONAL but declares an explicit null default",
                            decl.name
                        ),
                    )
                    .with_context("field_name", decl.name.clone()),
                );
                continue;
            }
            let field = InputField {
                name: decl.name.clone(),
                order,
                field_type: decl.field_type,
                default: decl.default,
                constraints: decl.constraints,
            };
            errors.extend(field.validate(registry));
            inputs.insert(field.name.clone(), field);
        }

        let output = self.output.unwrap_or_else(|| {
            errors.push(RunnerError::new(ErrorCode::PredictorShapeInvalid, "no output type declared"));
            OutputType::object(Vec::new())
        });

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(PredictorInfo { module_ref: self.module_ref, symbol_ref: self.symbol_ref, inputs, output })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputKind;
    use pr_value::PrimitiveType;

    fn reg() -> CoderRegistry {
        CoderRegistry::new()
    }

    #[test]
    fn minimal_predictor_builds() {
        let info = PredictorBuilder::new("m", "Predictor")
            .input(InputDecl {
                name: "s".into(),
                field_type: FieldType::required(PrimitiveType::String),
                default: None,
                constraints: Constraints::default(),
            })
            .output(OutputType::scalar(OutputKind::Single, PrimitiveType::String).unwrap())
            .build(&reg())
            .unwrap();
        assert_eq!(info.inputs.len(), 1);
        assert_eq!(info.inputs["s"].order, 0);
    }

    #[test]
    fn duplicate_names_rejected() {
        let decl = || InputDecl {
            name: "s".into(),
            field_type: FieldType::required(PrimitiveType::String),
            default: None,
            constraints: Constraints::default(),
        };
        let errs = PredictorBuilder::new("m", "Predictor")
            .input(decl())
            .input(decl())
            .output(OutputType::scalar(OutputKind::Single, PrimitiveType::String).unwrap())
            .build(&reg())
            .unwrap_err();
        assert_eq!(errs.len(), 1);
    }

    #[test]
    fn required_field_with_null_default_rejected() {
        let errs = PredictorBuilder::new("m", "Predictor")
            .input(InputDecl {
                name: "s".into(),
                field_type: FieldType::required(PrimitiveType::String),
                default: Some(serde_json::Value::Null),
                constraints: Constraints::default(),
            })
            .output(OutputType::scalar(OutputKind::Single, PrimitiveType::String).unwrap())
            .build(&reg())
            .unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, ErrorCode::PredictorShapeInvalid);
    }

    #[test]
    fn optional_field_with_null_default_is_fine() {
        let info = PredictorBuilder::new("m", "Predictor")
            .input(InputDecl {
                name: "s".into(),
                field_type: FieldType::optional(PrimitiveType::String),
                default: Some(serde_json::Value::Null),
                constraints: Constraints::default(),
            })
            .output(OutputType::scalar(OutputKind::Single, PrimitiveType::String).unwrap())
            .build(&reg())
            .unwrap();
        assert!(info.input("s").is_some());
    }

    #[test]
    fn invalid_constraint_combo_surfaces() {
        let errs = PredictorBuilder::new("m", "Predictor")
            .input(InputDecl {
                name: "count".into(),
                field_type: FieldType::required(PrimitiveType::Integer),
                default: Some(serde_json::json!(150)),
                constraints: Constraints { ge: Some(0.0), le: Some(100.0), ..Default::default() },
            })
            .output(OutputType::scalar(OutputKind::Single, PrimitiveType::String).unwrap())
            .build(&reg())
            .unwrap_err();
        assert_eq!(errs.len(), 1);
    }

    #[test]
    fn missing_output_is_rejected() {
        let errs = PredictorBuilder::new("m", "Predictor").build(&reg()).unwrap_err();
        assert_eq!(errs.len(), 1);
    }
}
