//! Tool input schemas and coercion of raw `Action Input` text.

use serde_json::{Map, Value};

use crate::base::{error::AgentError, types::Res};

/// One declared argument of a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub description: String,
    pub required: bool,
    pub default: Option<Value>,
}

impl FieldSpec {
    /// A field the model must always supply.
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
            default: None,
        }
    }

    /// A field that may be omitted, filled with `default` when it is.
    pub fn optional(name: impl Into<String>, description: impl Into<String>, default: Option<Value>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: false,
            default,
        }
    }
}

/// Structural description of what a tool expects as input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSchema {
    fields: Vec<FieldSpec>,
}

impl InputSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// A schema with one required text field, which receives the raw input verbatim.
    pub fn single(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(vec![FieldSpec::required(name, description)])
    }

    /// Coerce the raw `Action Input` into this schema.
    ///
    /// Single-field schemas take the text as-is. Multi-field schemas require a JSON object;
    /// missing optional fields get their defaults, missing required fields are a violation.
    pub fn coerce(&self, tool: &str, raw: &str) -> Result<ToolInput, AgentError> {
        let violation = |message: String| AgentError::SchemaViolation { tool: tool.to_string(), message };

        match self.fields.as_slice() {
            [] => Ok(ToolInput::default()),
            [field] => {
                if field.required && raw.is_empty() {
                    return Err(violation(format!("`{}` is required", field.name)));
                }

                let mut map = Map::new();
                map.insert(field.name.clone(), Value::String(raw.to_string()));

                Ok(ToolInput(map))
            }
            fields => {
                let value = serde_json::from_str::<Value>(raw).map_err(|e| violation(format!("expected a JSON object with fields [{}]: {e}", self.field_names().join(", "))))?;

                let Value::Object(mut map) = value else {
                    return Err(violation(format!("expected a JSON object with fields [{}]", self.field_names().join(", "))));
                };

                for field in fields {
                    let present = map.get(&field.name).is_some_and(|v| !v.is_null());
                    if present {
                        continue;
                    }

                    if let Some(default) = &field.default {
                        map.insert(field.name.clone(), default.clone());
                    } else if field.required {
                        return Err(violation(format!("missing required field `{}`", field.name)));
                    }
                }

                Ok(ToolInput(map))
            }
        }
    }

    /// Render the arguments for the prompt catalogue.
    pub fn describe(&self) -> String {
        let args = self
            .fields
            .iter()
            .map(|f| {
                let qualifier = match (&f.default, f.required) {
                    (_, true) => "required".to_string(),
                    (Some(default), false) => format!("default {default}"),
                    (None, false) => "optional".to_string(),
                };
                format!("\"{}\" ({qualifier}): {}", f.name, f.description)
            })
            .collect::<Vec<_>>();

        format!("{{{}}}", args.join(", "))
    }

    fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

/// Coerced tool arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolInput(Map<String, Value>);

impl ToolInput {
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// The field as text; numbers and booleans are rendered, null counts as absent.
    pub fn string(&self, name: &str) -> Option<String> {
        match self.0.get(name)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// The field as text, or an error naming the missing field.
    pub fn require_string(&self, name: &str) -> Res<String> {
        self.string(name).ok_or_else(|| anyhow::anyhow!("missing required argument `{name}`"))
    }

    /// The field as a flag; accepts JSON booleans and `"true"`/`"false"` strings.
    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.0.get(name)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}
