//! Entity descriptors: the declarative configuration behind each field.
//!
//! One generic field implementation serves every entity kind. What differs
//! between a user picker and a schedule picker is data: which queries to
//! run, how to turn a node into an option, and which variables to send.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::client::JsonObject;
use crate::document::Document;
use crate::error::{Result, SelectError};
use crate::types::SelectOption;

/// Name of the identifier variable a value query must declare.
pub const ID_VARIABLE: &str = "id";

/// Maps one raw node from a response to an option.
pub type NodeMapper = Arc<dyn Fn(&Value) -> SelectOption + Send + Sync>;

/// Derives extra query variables from the host's context props.
pub type ExtraVariablesFn = Arc<dyn Fn(&JsonObject) -> JsonObject + Send + Sync>;

/// Map `{id, name, isFavorite}` to `{value: id, label: name, isFavorite}`.
pub fn default_node_mapper(node: &Value) -> SelectOption {
    let text = |key: &str| {
        node.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let is_favorite = node
        .get("isFavorite")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    SelectOption::new(text("id"), text("name")).favorite(is_favorite)
}

/// How to search for and resolve one kind of referenced entity.
#[derive(Clone)]
pub struct EntityDescriptor {
    name: String,
    search_query: Document,
    value_query: Option<Document>,
    map_node: NodeMapper,
    static_variables: JsonObject,
    default_variables: Option<JsonObject>,
    extra_variables: Option<ExtraVariablesFn>,
}

impl EntityDescriptor {
    /// Start describing an entity searched by `search_query`.
    pub fn builder(name: impl Into<String>, search_query: Document) -> EntityDescriptorBuilder {
        EntityDescriptorBuilder {
            descriptor: EntityDescriptor {
                name: name.into(),
                search_query,
                value_query: None,
                map_node: Arc::new(default_node_mapper),
                static_variables: JsonObject::new(),
                default_variables: None,
                extra_variables: None,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn search_query(&self) -> &Document {
        &self.search_query
    }

    pub fn value_query(&self) -> Option<&Document> {
        self.value_query.as_ref()
    }

    pub fn map_node(&self, node: &Value) -> SelectOption {
        (self.map_node)(node)
    }

    pub fn static_variables(&self) -> &JsonObject {
        &self.static_variables
    }

    pub fn default_variables(&self) -> Option<&JsonObject> {
        self.default_variables.as_ref()
    }

    /// Extra variables for the given host context; empty without a hook.
    pub fn extra_variables(&self, context: &JsonObject) -> JsonObject {
        self.extra_variables
            .as_ref()
            .map(|f| f(context))
            .unwrap_or_default()
    }
}

impl fmt::Debug for EntityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("name", &self.name)
            .field("search_query", &self.search_query.to_string())
            .field(
                "value_query",
                &self.value_query.as_ref().map(ToString::to_string),
            )
            .field("static_variables", &self.static_variables)
            .field("default_variables", &self.default_variables)
            .field("extra_variables", &self.extra_variables.is_some())
            .finish()
    }
}

/// Builder for [`EntityDescriptor`]. Created by [`EntityDescriptor::builder`].
pub struct EntityDescriptorBuilder {
    descriptor: EntityDescriptor,
}

impl EntityDescriptorBuilder {
    /// Look up a single entity by `$id`. Without one, ids are their own labels.
    pub fn value_query(mut self, query: Document) -> Self {
        self.descriptor.value_query = Some(query);
        self
    }

    pub fn map_node(mut self, f: impl Fn(&Value) -> SelectOption + Send + Sync + 'static) -> Self {
        self.descriptor.map_node = Arc::new(f);
        self
    }

    /// Variables sent with every search.
    pub fn static_variables(mut self, vars: JsonObject) -> Self {
        self.descriptor.static_variables = vars;
        self
    }

    /// Variables that replace the search text when nothing has been typed,
    /// e.g. to list favorites up front.
    pub fn default_variables(mut self, vars: JsonObject) -> Self {
        self.descriptor.default_variables = Some(vars);
        self
    }

    pub fn extra_variables(
        mut self,
        f: impl Fn(&JsonObject) -> JsonObject + Send + Sync + 'static,
    ) -> Self {
        self.descriptor.extra_variables = Some(Arc::new(f));
        self
    }

    /// Validate query shapes and finish.
    pub fn build(self) -> Result<EntityDescriptor> {
        let d = self.descriptor;
        let invalid = |reason: String| SelectError::InvalidDescriptor {
            entity: d.name.clone(),
            reason,
        };

        if d.search_query.selections.len() != 1 {
            return Err(invalid(format!(
                "search query must select exactly one field, found {}",
                d.search_query.selections.len()
            )));
        }
        if let Some(value_query) = &d.value_query {
            if value_query.selections.len() != 1 {
                return Err(invalid(format!(
                    "value query must select exactly one field, found {}",
                    value_query.selections.len()
                )));
            }
            if !value_query.declares(ID_VARIABLE) {
                return Err(invalid(format!(
                    "value query must declare ${ID_VARIABLE}"
                )));
            }
        }
        Ok(d)
    }
}
