//! Language-neutral schema descriptions and the validator that checks model
//! output against them.
//!
//! A [`Schema`] is plain data: a named record with an ordered list of fields.
//! It can be built in code, loaded from JSON, rendered to a strict JSON Schema
//! for the completion service, and used to validate whatever the service sends
//! back. Validation never mutates the value it inspects.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// A named record type with an ordered list of fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(flatten)]
    pub ty: FieldType,
    /// Guidance text forwarded to the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    String,
    Number,
    Integer,
    Enum { values: Vec<String> },
    List { items: Box<FieldType> },
    Record { schema: Schema },
}

impl FieldType {
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldType::Enum {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn list(items: FieldType) -> Self {
        FieldType::List {
            items: Box::new(items),
        }
    }

    pub fn record(schema: Schema) -> Self {
        FieldType::Record { schema }
    }

    fn label(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Enum { .. } => "enum string",
            FieldType::List { .. } => "array",
            FieldType::Record { .. } => "object",
        }
    }

    fn to_json_schema(&self) -> Value {
        match self {
            FieldType::String => json!({ "type": "string" }),
            FieldType::Number => json!({ "type": "number" }),
            FieldType::Integer => json!({ "type": "integer" }),
            FieldType::Enum { values } => json!({ "type": "string", "enum": values }),
            FieldType::List { items } => json!({
                "type": "array",
                "items": items.to_json_schema(),
            }),
            FieldType::Record { schema } => schema.to_json_schema(),
        }
    }

    fn validate(&self, value: &Value, path: &str) -> Result<(), ValidationError> {
        match (self, value) {
            (FieldType::String, Value::String(_)) => Ok(()),
            (FieldType::Number, Value::Number(_)) => Ok(()),
            (FieldType::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(()),
            (FieldType::Enum { values }, Value::String(s)) => {
                if values.iter().any(|allowed| allowed == s) {
                    Ok(())
                } else {
                    Err(ValidationError::new(
                        path,
                        ViolationKind::NotInEnum {
                            value: s.clone(),
                            allowed: values.clone(),
                        },
                    ))
                }
            }
            (FieldType::List { items }, Value::Array(elements)) => {
                for (index, element) in elements.iter().enumerate() {
                    items.validate(element, &format!("{path}[{index}]"))?;
                }
                Ok(())
            }
            (FieldType::Record { schema }, Value::Object(map)) => schema.validate_object(map, path),
            (expected, found) => Err(ValidationError::new(
                path,
                ViolationKind::TypeMismatch {
                    expected: expected.label(),
                    found: json_type_name(found),
                },
            )),
        }
    }

    fn check_definition(&self, path: &str) -> Result<(), String> {
        match self {
            FieldType::Enum { values } if values.is_empty() => {
                Err(format!("{path} is an enum with no values"))
            }
            FieldType::List { items } => items.check_definition(&format!("{path}[]")),
            FieldType::Record { schema } => schema.check_fields(path),
            _ => Ok(()),
        }
    }

    /// Builds a value that satisfies this type; used by the mock provider.
    pub(crate) fn placeholder(&self) -> Value {
        match self {
            FieldType::String => Value::String("Mock value".to_string()),
            FieldType::Number => json!(42.0),
            FieldType::Integer => json!(42),
            FieldType::Enum { values } => values
                .first()
                .map(|v| Value::String(v.clone()))
                .unwrap_or(Value::Null),
            FieldType::List { .. } => Value::Array(vec![]),
            FieldType::Record { schema } => schema.placeholder(),
        }
    }
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push(Field {
            name: name.into(),
            ty,
            description: None,
        });
        self
    }

    /// Adds a field carrying guidance text for the model.
    pub fn described_field(
        mut self,
        name: impl Into<String>,
        ty: FieldType,
        description: impl Into<String>,
    ) -> Self {
        self.fields.push(Field {
            name: name.into(),
            ty,
            description: Some(description.into()),
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Renders the schema as a strict JSON Schema object: every field is
    /// required and no additional properties are allowed.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            let mut property = field.ty.to_json_schema();
            if let (Some(description), Value::Object(obj)) = (&field.description, &mut property) {
                obj.insert("description".into(), Value::String(description.clone()));
            }
            properties.insert(field.name.clone(), property);
        }

        let required: Vec<&str> = self.fields.iter().map(|f| f.name.as_str()).collect();

        let mut schema = json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        });
        if let (Some(description), Value::Object(obj)) = (&self.description, &mut schema) {
            obj.insert("description".into(), Value::String(description.clone()));
        }
        schema
    }

    /// Checks `value` against the schema and reports the first violated
    /// constraint, walking fields in declaration order.
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        match value {
            Value::Object(map) => self.validate_object(map, "$"),
            other => Err(ValidationError::new(
                "$",
                ViolationKind::TypeMismatch {
                    expected: "object",
                    found: json_type_name(other),
                },
            )),
        }
    }

    fn validate_object(&self, map: &Map<String, Value>, path: &str) -> Result<(), ValidationError> {
        for field in &self.fields {
            let field_path = format!("{path}.{}", field.name);
            match map.get(&field.name) {
                Some(value) => field.ty.validate(value, &field_path)?,
                None => return Err(ValidationError::new(field_path, ViolationKind::MissingField)),
            }
        }
        Ok(())
    }

    /// Checks that the schema is one the completion service accepts: a name
    /// of at most 64 ASCII letters, digits, `_` or `-`, and at every level a
    /// non-empty field list with unique names and no empty enums.
    pub fn check_definition(&self) -> Result<(), String> {
        let name_ok = !self.name.is_empty()
            && self.name.len() <= 64
            && self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !name_ok {
            return Err(format!(
                "schema name '{}' must be 1-64 characters of [a-zA-Z0-9_-]",
                self.name
            ));
        }
        self.check_fields(&self.name)
    }

    fn check_fields(&self, path: &str) -> Result<(), String> {
        if self.fields.is_empty() {
            return Err(format!("{path} declares no fields"));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(format!("{path} has a field with an empty name"));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(format!("{path} declares field '{}' more than once", field.name));
            }
            field.ty.check_definition(&format!("{path}.{}", field.name))?;
        }
        Ok(())
    }

    pub(crate) fn placeholder(&self) -> Value {
        let object: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.ty.placeholder()))
            .collect();
        Value::Object(object)
    }
}

/// The first constraint a value failed, with a JSONPath-like location.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{path}: {kind}")]
pub struct ValidationError {
    pub path: String,
    pub kind: ViolationKind,
}

impl ValidationError {
    fn new(path: impl Into<String>, kind: ViolationKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViolationKind {
    MissingField,
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    NotInEnum {
        value: String,
        allowed: Vec<String>,
    },
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::MissingField => write!(f, "required field is missing"),
            ViolationKind::TypeMismatch { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            ViolationKind::NotInEnum { value, allowed } => {
                write!(f, "'{value}' is not one of [{}]", allowed.join(", "))
            }
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
