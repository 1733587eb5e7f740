// SPDX-License-Identifier: MIT OR Apache-2.0
//! Declared input fields and the constraints attached to them.

use pr_error::{ErrorCode, RunnerError};
use pr_value::{CanonicalValue, FieldType, PrimitiveType};

/// The constraint attributes an [`InputField`] may carry.
///
/// `ge`/`le` require a numeric primitive; `min_length`/`max_length`/`regex`
/// require `STRING`; `choices` requires `INTEGER` or `STRING`, needs at
/// least two entries, and is mutually exclusive with the numeric and
/// length constraints.
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    /// Human-readable description surfaced in the schema.
    pub description: Option<String>,
    /// Inclusive lower bound for numeric fields.
    pub ge: Option<f64>,
    /// Inclusive upper bound for numeric fields.
    pub le: Option<f64>,
    /// Minimum string length.
    pub min_length: Option<usize>,
    /// Maximum string length.
    pub max_length: Option<usize>,
    /// A regular expression the string value must fully match.
    pub regex: Option<String>,
    /// A closed set of admissible values (rendered as a named enum).
    pub choices: Option<Vec<serde_json::Value>>,
    /// Marks the field as deprecated in the schema without removing it.
    pub deprecated: bool,
}

impl Constraints {
    /// Validate this set of constraints against the primitive it's attached
    /// to, per spec §3's `InputField` invariants. Accumulates every
    /// violation instead of stopping at the first.
    pub fn validate_against(&self, primitive: &PrimitiveType) -> Vec<RunnerError> {
        let mut errors = Vec::new();
        let is_numeric = matches!(primitive, PrimitiveType::Integer | PrimitiveType::Float);
        let is_string = matches!(primitive, PrimitiveType::String);

        if (self.ge.is_some() || self.le.is_some()) && !is_numeric {
            errors.push(constraint_error("ge/le require a numeric field type"));
        }
        if (self.min_length.is_some() || self.max_length.is_some() || self.regex.is_some())
            && !is_string
        {
            errors.push(constraint_error("min_length/max_length/regex require a string field type"));
        }
        if let Some(choices) = &self.choices {
            let choices_ok = matches!(primitive, PrimitiveType::Integer | PrimitiveType::String);
            if !choices_ok {
                errors.push(constraint_error("choices requires an integer or string field type"));
            }
            if choices.len() < 2 {
                errors.push(constraint_error("choices must declare at least two values"));
            }
            if self.ge.is_some() || self.le.is_some() {
                errors.push(constraint_error("choices is mutually exclusive with ge/le"));
            }
            if self.min_length.is_some() || self.max_length.is_some() {
                errors.push(constraint_error(
                    "choices is mutually exclusive with min_length/max_length",
                ));
            }
        }
        errors
    }

    /// Check a normalized value against this constraint set, descending
    /// into `Repeated` lists element-wise and skipping `Null` (the
    /// optional-and-absent case).
    pub fn check(&self, name: &str, value: &CanonicalValue) -> Result<(), RunnerError> {
        match value {
            CanonicalValue::Null => Ok(()),
            CanonicalValue::List(items) => {
                for item in items {
                    self.check(name, item)?;
                }
                Ok(())
            }
            other => self.check_scalar(name, other),
        }
    }

    fn check_scalar(&self, name: &str, value: &CanonicalValue) -> Result<(), RunnerError> {
        let numeric = match value {
            CanonicalValue::Integer(i) => Some(*i as f64),
            CanonicalValue::Float(f) => Some(*f),
            _ => None,
        };
        if let Some(n) = numeric {
            if let Some(ge) = self.ge {
                if n < ge {
                    return Err(violation(name, &format!("fails constraint >= {ge}")));
                }
            }
            if let Some(le) = self.le {
                if n > le {
                    return Err(violation(name, &format!("fails constraint <= {le}")));
                }
            }
        }
        if let CanonicalValue::String(s) = value {
            if let Some(min) = self.min_length {
                if s.len() < min {
                    return Err(violation(name, &format!("fails constraint min_length {min}")));
                }
            }
            if let Some(max) = self.max_length {
                if s.len() > max {
                    return Err(violation(name, &format!("fails constraint max_length {max}")));
                }
            }
            if let Some(pattern) = &self.regex {
                let re = regex::Regex::new(pattern).map_err(|e| {
                    RunnerError::new(ErrorCode::ConstraintInvalid, format!("invalid regex: {e}"))
                })?;
                if !re.is_match(s) {
                    return Err(violation(name, &format!("fails constraint regex {pattern}")));
                }
            }
        }
        if let Some(choices) = &self.choices {
            let as_json = canonical_to_loose_json(value);
            if !choices.contains(&as_json) {
                return Err(violation(name, "fails constraint choices"));
            }
        }
        Ok(())
    }
}

fn canonical_to_loose_json(value: &CanonicalValue) -> serde_json::Value {
    match value {
        CanonicalValue::String(s) => serde_json::Value::String(s.clone()),
        CanonicalValue::Integer(i) => serde_json::json!(i),
        CanonicalValue::Float(f) => serde_json::json!(f),
        CanonicalValue::Bool(b) => serde_json::Value::Bool(*b),
        _ => serde_json::Value::Null,
    }
}

fn constraint_error(message: &str) -> RunnerError {
    RunnerError::new(ErrorCode::ConstraintInvalid, message)
}

fn violation(name: &str, reason: &str) -> RunnerError {
    RunnerError::new(ErrorCode::FieldConstraintViolation, format!("{name} {reason}"))
        .with_context("field_name", name)
}

/// An immutable declared input parameter.
#[derive(Debug, Clone)]
pub struct InputField {
    /// Unique name within the predictor.
    pub name: String,
    /// Zero-based declared position, preserved in the schema's `x-order`.
    pub order: usize,
    /// The field's primitive + cardinality.
    pub field_type: FieldType,
    /// The raw (un-normalized) default, if any.
    pub default: Option<serde_json::Value>,
    /// Constraint attributes.
    pub constraints: Constraints,
}

impl InputField {
    /// Validate this field's invariants: constraint/type compatibility,
    /// and (if a default is given) that the normalized default satisfies
    /// every constraint.
    pub fn validate(&self, registry: &pr_value::CoderRegistry) -> Vec<RunnerError> {
        let mut errors = self.constraints.validate_against(&self.field_type.primitive);
        if let Some(default) = &self.default {
            match self.field_type.normalize(default, registry) {
                Ok(normalized) => {
                    if let Err(e) = self.constraints.check(&self.name, &normalized) {
                        errors.push(e);
                    }
                }
                Err(e) => errors.push(e),
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pr_value::Repetition;

    fn reg() -> pr_value::CoderRegistry {
        pr_value::CoderRegistry::new()
    }

    #[test]
    fn ge_le_reject_non_numeric() {
        let c = Constraints { ge: Some(0.0), ..Default::default() };
        let errs = c.validate_against(&PrimitiveType::String);
        assert_eq!(errs.len(), 1);
    }

    #[test]
    fn choices_requires_two_and_excludes_ge() {
        let c = Constraints {
            choices: Some(vec![serde_json::json!("a")]),
            ge: Some(0.0),
            ..Default::default()
        };
        let errs = c.validate_against(&PrimitiveType::String);
        assert!(errs.len() >= 2);
    }

    #[test]
    fn numeric_bounds_check() {
        let c = Constraints { ge: Some(0.0), le: Some(100.0), ..Default::default() };
        let ok = c.check("count", &CanonicalValue::Integer(50));
        assert!(ok.is_ok());
        let err = c.check("count", &CanonicalValue::Integer(150)).unwrap_err();
        assert!(err.message.contains("count fails constraint <= 100"));
    }

    #[test]
    fn regex_check() {
        let c = Constraints { regex: Some("^[a-z]+$".into()), ..Default::default() };
        assert!(c.check("s", &CanonicalValue::String("abc".into())).is_ok());
        assert!(c.check("s", &CanonicalValue::String("ABC".into())).is_err());
    }

    #[test]
    fn choices_check() {
        let c = Constraints {
            choices: Some(vec![serde_json::json!("a"), serde_json::json!("b")]),
            ..Default::default()
        };
        assert!(c.check("s", &CanonicalValue::String("a".into())).is_ok());
        assert!(c.check("s", &CanonicalValue::String("c".into())).is_err());
    }

    #[test]
    fn repeated_constraint_checks_each_element() {
        let c = Constraints { ge: Some(0.0), ..Default::default() };
        let list = CanonicalValue::List(vec![CanonicalValue::Integer(1), CanonicalValue::Integer(-1)]);
        assert!(c.check("xs", &list).is_err());
    }

    #[test]
    fn field_validate_checks_default_against_constraints() {
        let field = InputField {
            name: "count".into(),
            order: 0,
            field_type: FieldType::required(PrimitiveType::Integer),
            default: Some(serde_json::json!(150)),
            constraints: Constraints { ge: Some(0.0), le: Some(100.0), ..Default::default() },
        };
        let errs = field.validate(&reg());
        assert_eq!(errs.len(), 1);
    }

    #[test]
    fn optional_null_default_is_fine() {
        let field = InputField {
            name: "note".into(),
            order: 0,
            field_type: FieldType::optional(PrimitiveType::String),
            default: Some(serde_json::Value::Null),
            constraints: Constraints::default(),
        };
        assert!(field.validate(&reg()).is_empty());
    }

    #[test]
    fn repetition_is_reexported_for_callers() {
        let _ = Repetition::Required;
    }
}
