//! Option search: the candidate list for the current search text.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::client::{FetchPolicy, JsonObject, QueryClient, QueryRequest};
use crate::config::SelectConfig;
use crate::descriptor::EntityDescriptor;
use crate::document::Document;
use crate::error::Result;
use crate::types::SelectOption;
use crate::variables::{self, merge_into};

/// Response key the search query's single field is aliased to.
pub const SEARCH_ALIAS: &str = "data";

/// Options from one search, or the error that replaced them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome {
    pub options: Vec<SelectOption>,
    pub error: Option<String>,
}

impl SearchOutcome {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            options: Vec::new(),
            error: Some(message.into()),
        }
    }
}

/// Plans and runs search queries for one entity.
pub struct OptionSearcher {
    descriptor: Arc<EntityDescriptor>,
    document: Arc<Document>,
    page_size: u32,
}

impl OptionSearcher {
    pub fn new(descriptor: Arc<EntityDescriptor>, config: &SelectConfig) -> Result<Self> {
        let document = Arc::new(descriptor.search_query().field_alias(SEARCH_ALIAS)?);
        Ok(Self {
            descriptor,
            document,
            page_size: config.page_size,
        })
    }

    pub fn has_default_variables(&self) -> bool {
        self.descriptor.default_variables().is_some()
    }

    /// The request for `search`, or `None` when the search should be skipped.
    ///
    /// `omit` lists identifiers that must not come back as candidates.
    pub fn plan(&self, search: &str, omit: &[String], context: &JsonObject) -> Option<QueryRequest> {
        let defaults = self.descriptor.default_variables();
        if search.is_empty() && defaults.is_none() {
            return None;
        }

        let mut vars = self.descriptor.static_variables().clone();
        merge_into(&mut vars, &self.descriptor.extra_variables(context));

        let mut paging = JsonObject::new();
        paging.insert("first".into(), Value::from(self.page_size));
        paging.insert(
            "omit".into(),
            Value::Array(omit.iter().cloned().map(Value::String).collect()),
        );
        merge_into(&mut vars, &variables::input(paging));

        match defaults {
            Some(defaults) if search.is_empty() => merge_into(&mut vars, defaults),
            _ => {
                let mut text = JsonObject::new();
                text.insert("search".into(), Value::String(search.to_string()));
                merge_into(&mut vars, &variables::input(text));
            }
        }

        Some(QueryRequest {
            document: self.document.clone(),
            variables: vars,
            fetch_policy: FetchPolicy::NetworkOnly,
        })
    }

    /// Run a planned search. Errors are reported in the outcome, not raised.
    pub async fn search(&self, client: &dyn QueryClient, request: QueryRequest) -> SearchOutcome {
        debug!(entity = self.descriptor.name(), "searching options");
        let response = match client.execute(request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(entity = self.descriptor.name(), %err, "option search failed");
                return SearchOutcome::failed(err.to_string());
            }
        };
        if let Some(message) = response.error_message() {
            warn!(entity = self.descriptor.name(), %message, "option search returned errors");
            return SearchOutcome::failed(message);
        }

        let options: Vec<SelectOption> = response
            .data
            .get(SEARCH_ALIAS)
            .and_then(|data| data.get("nodes"))
            .and_then(Value::as_array)
            .map(|nodes| nodes.iter().map(|n| self.descriptor.map_node(n)).collect())
            .unwrap_or_default();
        SearchOutcome {
            options,
            error: None,
        }
    }
}
