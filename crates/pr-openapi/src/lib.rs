// SPDX-License-Identifier: MIT OR Apache-2.0
//! pr-openapi
//!
//! Emits the fixed OpenAPI 3.0 document a [`pr_schema::PredictorInfo`]
//! describes: root, health-check, predictions, and cancel paths, plus
//! `Input`/`Output` components and one named enum component per
//! `choices`-constrained field.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod postprocess;

use pr_schema::{InputField, OutputKind, OutputType, PredictorInfo};
use pr_value::{FieldType, PrimitiveType};
use serde_json::{json, Map, Value};

/// Emit the full OpenAPI 3.0 document for `info`.
///
/// The result is deterministic for a given `PredictorInfo`: field iteration
/// follows declared order and no nondeterministic collection is consulted,
/// so callers may rely on byte-identical output for equal inputs.
#[must_use]
pub fn emit(info: &PredictorInfo) -> Value {
    let mut enums = Map::new();
    let input_schema = object_schema_for_inputs(info, &mut enums);
    let output_schema = schema_for_output(&info.output, &mut enums, "Output");

    let mut components = Map::new();
    components.insert("Input".to_string(), input_schema);
    components.insert("Output".to_string(), output_schema);
    for (name, schema) in enums {
        components.insert(name, schema);
    }

    let mut doc = json!({
        "openapi": "3.0.2",
        "info": {"title": "Cog", "version": "0.1.0"},
        "paths": {
            "/": {
                "get": {
                    "summary": "Root",
                    "operationId": "root__get",
                    "responses": {"200": {"description": "Successful Response"}}
                }
            },
            "/health-check": {
                "get": {
                    "summary": "Healthcheck",
                    "operationId": "healthcheck_health_check_get",
                    "responses": {"200": {"description": "Successful Response"}}
                }
            },
            "/predictions": {
                "post": {
                    "summary": "Predict",
                    "operationId": "predict_predictions_post",
                    "requestBody": {
                        "content": {
                            "application/json": {
                                "schema": {"$ref": "#/components/schemas/PredictionRequest"}
                            }
                        }
                    },
                    "responses": {
                        "200": {
                            "description": "Successful Response",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/PredictionResponse"}
                                }
                            }
                        }
                    }
                }
            },
            "/predictions/{id}/cancel": {
                "post": {
                    "summary": "Cancel",
                    "operationId": "cancel_predictions__id__cancel_post",
                    "parameters": [{
                        "name": "id",
                        "in": "path",
                        "required": true,
                        "schema": {"type": "string"}
                    }],
                    "responses": {"200": {"description": "Successful Response"}}
                }
            }
        },
        "components": {"schemas": Value::Object(components)}
    });

    postprocess::strip_redundant_titles(&mut doc);
    postprocess::collapse_nullable_any_of(&mut doc);
    doc
}

fn object_schema_for_inputs(info: &PredictorInfo, enums: &mut Map<String, Value>) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in info.ordered_inputs() {
        properties.insert(field.name.clone(), schema_for_input_field(field, enums));
        if !field.field_type.repetition.allows_null() && field.default.is_none() {
            required.push(Value::String(field.name.clone()));
        }
    }
    let mut schema = json!({
        "title": "Input",
        "type": "object",
        "properties": Value::Object(properties),
    });
    if !required.is_empty() {
        schema["required"] = Value::Array(required);
    }
    schema
}

fn schema_for_input_field(field: &InputField, enums: &mut Map<String, Value>) -> Value {
    let mut schema = if let Some(choices) = &field.constraints.choices {
        let enum_name = enum_component_name(&field.name);
        enums.insert(enum_name.clone(), enum_schema(&field.field_type.primitive, choices));
        json!({"allOf": [{"$ref": format!("#/components/schemas/{enum_name}")}]})
    } else {
        field.field_type.json_type()
    };
    annotate_field(&mut schema, field);
    schema
}

fn annotate_field(schema: &mut Value, field: &InputField) {
    let obj = schema.as_object_mut().expect("schema fragments are always JSON objects");
    obj.insert("x-order".to_string(), json!(field.order));
    if let Some(description) = &field.constraints.description {
        obj.insert("description".to_string(), json!(description));
    }
    if let Some(default) = &field.default {
        obj.insert("default".to_string(), default.clone());
    }
    if field.field_type.repetition.allows_null() {
        obj.insert("nullable".to_string(), json!(true));
    }
    if let Some(ge) = field.constraints.ge {
        obj.insert("minimum".to_string(), json!(ge));
    }
    if let Some(le) = field.constraints.le {
        obj.insert("maximum".to_string(), json!(le));
    }
    if let Some(min_length) = field.constraints.min_length {
        obj.insert("minLength".to_string(), json!(min_length));
    }
    if let Some(max_length) = field.constraints.max_length {
        obj.insert("maxLength".to_string(), json!(max_length));
    }
    if let Some(pattern) = &field.constraints.regex {
        obj.insert("pattern".to_string(), json!(pattern));
    }
    if field.constraints.deprecated {
        obj.insert("deprecated".to_string(), json!(true));
    }
}

fn enum_schema(primitive: &PrimitiveType, choices: &[Value]) -> Value {
    json!({
        "title": "choices",
        "enum": choices,
        "type": primitive_json_type_name(primitive),
    })
}

fn primitive_json_type_name(primitive: &PrimitiveType) -> &'static str {
    match primitive {
        PrimitiveType::Integer => "integer",
        _ => "string",
    }
}

fn enum_component_name(field_name: &str) -> String {
    field_name
        .split(|c: char| c == '_' || c == '-')
        .filter(|s| !s.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn schema_for_output(output: &OutputType, enums: &mut Map<String, Value>, title: &str) -> Value {
    match output {
        OutputType::Scalar { kind, element } => {
            let mut item = element.json_type();
            item.as_object_mut()
                .expect("primitive json_type is always an object")
                .insert("title".to_string(), json!(format!("{title}Item")));
            match kind {
                OutputKind::Single => {
                    let mut schema = item;
                    schema["title"] = json!(title);
                    schema
                }
                OutputKind::List | OutputKind::Iterator | OutputKind::ConcatIterator => {
                    json!({"title": title, "type": "array", "items": item})
                }
            }
        }
        OutputType::Object { fields } => {
            let mut properties = Map::new();
            let mut required = Vec::new();
            for (name, field_type) in fields {
                let _ = enums;
                properties.insert(name.clone(), schema_for_field_type(field_type));
                if !field_type.repetition.allows_null() {
                    required.push(Value::String(name.clone()));
                }
            }
            let mut schema = json!({
                "title": title,
                "type": "object",
                "properties": Value::Object(properties),
            });
            if !required.is_empty() {
                schema["required"] = Value::Array(required);
            }
            schema
        }
    }
}

fn schema_for_field_type(field_type: &FieldType) -> Value {
    let mut schema = field_type.json_type();
    if field_type.repetition.allows_null() {
        schema.as_object_mut().expect("json_type is always an object").insert(
            "nullable".to_string(),
            json!(true),
        );
    }
    schema
}
