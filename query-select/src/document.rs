//! Typed query documents and the transforms used to batch them.
//!
//! Documents hold a single query operation. The transforms never mutate
//! their input; each returns a new document:
//!
//! - [`Document::field_alias`] aliases the single top-level field
//! - [`Document::map_input_vars`] renames input variables and their references
//! - [`Document::merge_fields`] concatenates two operations into one
//!
//! Together they turn a single-entity lookup such as
//!
//! ```text
//! query ($id: ID!) { user(id: $id) { id name } }
//! ```
//!
//! into a batched lookup:
//!
//! ```text
//! query ($id0: ID!, $id1: ID!) {
//!   data0: user(id: $id0) { id name }
//!   data1: user(id: $id1) { id name }
//! }
//! ```

use std::collections::HashMap;
use std::fmt;

use serde_json::Value as JsonValue;

use crate::error::{Result, SelectError};

/// A declared operation variable, e.g. `$id: ID!`.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDefinition {
    pub name: String,
    pub type_: String,
}

/// An argument value: either a variable reference or an inline literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Variable(String),
    Literal(JsonValue),
}

/// A field selection, optionally aliased, with arguments and sub-selections.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub alias: Option<String>,
    pub name: String,
    pub arguments: Vec<(String, Value)>,
    pub selections: Vec<Field>,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            alias: None,
            name: name.into(),
            arguments: Vec::new(),
            selections: Vec::new(),
        }
    }

    /// Pass a variable as an argument: `name: $variable`.
    pub fn arg_var(mut self, name: impl Into<String>, variable: impl Into<String>) -> Self {
        self.arguments
            .push((name.into(), Value::Variable(variable.into())));
        self
    }

    /// Pass an inline literal as an argument.
    pub fn arg(mut self, name: impl Into<String>, value: JsonValue) -> Self {
        self.arguments.push((name.into(), Value::Literal(value)));
        self
    }

    /// Select a nested field.
    pub fn field(mut self, field: Field) -> Self {
        self.selections.push(field);
        self
    }

    /// Select several scalar sub-fields by name.
    pub fn scalars<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selections
            .extend(names.into_iter().map(Field::new));
        self
    }

    /// The key this field's result appears under in a response.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A single query operation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub name: Option<String>,
    pub variables: Vec<VariableDefinition>,
    pub selections: Vec<Field>,
}

impl Document {
    /// Start an anonymous query.
    pub fn query() -> Self {
        Self::default()
    }

    /// Start a named query.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Declare an operation variable.
    pub fn variable(mut self, name: impl Into<String>, type_: impl Into<String>) -> Self {
        self.variables.push(VariableDefinition {
            name: name.into(),
            type_: type_.into(),
        });
        self
    }

    /// Add a top-level field.
    pub fn field(mut self, field: Field) -> Self {
        self.selections.push(field);
        self
    }

    /// Whether the operation declares a variable with this name.
    pub fn declares(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v.name == name)
    }

    fn single_field(&self) -> Result<&Field> {
        match self.selections.as_slice() {
            [field] => Ok(field),
            fields => Err(SelectError::invalid_document(format!(
                "found {} fields, but expected 1",
                fields.len()
            ))),
        }
    }

    /// Return a copy whose single top-level field is aliased to `alias`.
    pub fn field_alias(&self, alias: &str) -> Result<Document> {
        let field = self.single_field()?;
        Ok(Document {
            selections: vec![Field {
                alias: Some(alias.to_string()),
                ..field.clone()
            }],
            ..self.clone()
        })
    }

    /// Return a copy with input variables renamed per `renames`.
    ///
    /// Both the variable definitions and every variable reference in
    /// top-level field arguments are renamed. Names absent from the map
    /// are left alone.
    pub fn map_input_vars(&self, renames: &HashMap<String, String>) -> Document {
        let rename = |name: &String| renames.get(name).unwrap_or(name).clone();
        Document {
            variables: self
                .variables
                .iter()
                .map(|v| VariableDefinition {
                    name: rename(&v.name),
                    type_: v.type_.clone(),
                })
                .collect(),
            selections: self
                .selections
                .iter()
                .map(|field| Field {
                    arguments: field
                        .arguments
                        .iter()
                        .map(|(arg, value)| {
                            let value = match value {
                                Value::Variable(name) => Value::Variable(rename(name)),
                                literal => literal.clone(),
                            };
                            (arg.clone(), value)
                        })
                        .collect(),
                    ..field.clone()
                })
                .collect(),
            name: self.name.clone(),
        }
    }

    /// Merge `other` into a copy of this document.
    ///
    /// Variable definitions and top-level selections are concatenated;
    /// the operation name of `self` is kept.
    pub fn merge_fields(&self, other: &Document) -> Document {
        let mut merged = self.clone();
        merged.variables.extend(other.variables.iter().cloned());
        merged.selections.extend(other.selections.iter().cloned());
        merged
    }
}

fn write_value(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Variable(name) => write!(f, "${name}"),
        Value::Literal(json) => write_literal(f, json),
    }
}

/// Literals render as GraphQL input values: object keys are unquoted.
fn write_literal(f: &mut fmt::Formatter<'_>, json: &JsonValue) -> fmt::Result {
    match json {
        JsonValue::Object(map) => {
            f.write_str("{")?;
            for (i, (key, value)) in map.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{key}: ")?;
                write_literal(f, value)?;
            }
            f.write_str("}")
        }
        JsonValue::Array(items) => {
            f.write_str("[")?;
            for (i, value) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_literal(f, value)?;
            }
            f.write_str("]")
        }
        other => write!(f, "{other}"),
    }
}

fn write_selections(f: &mut fmt::Formatter<'_>, fields: &[Field]) -> fmt::Result {
    f.write_str("{ ")?;
    for field in fields {
        fmt::Display::fmt(field, f)?;
        f.write_str(" ")?;
    }
    f.write_str("}")
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(alias) = &self.alias {
            write!(f, "{alias}: ")?;
        }
        f.write_str(&self.name)?;
        if !self.arguments.is_empty() {
            f.write_str("(")?;
            for (i, (name, value)) in self.arguments.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{name}: ")?;
                write_value(f, value)?;
            }
            f.write_str(")")?;
        }
        if !self.selections.is_empty() {
            f.write_str(" ")?;
            write_selections(f, &self.selections)?;
        }
        Ok(())
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("query")?;
        if let Some(name) = &self.name {
            write!(f, " {name}")?;
        }
        if !self.variables.is_empty() {
            f.write_str("(")?;
            for (i, var) in self.variables.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "${}: {}", var.name, var.type_)?;
            }
            f.write_str(")")?;
        }
        f.write_str(" ")?;
        write_selections(f, &self.selections)
    }
}
