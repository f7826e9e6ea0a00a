//! Value resolution: labels for already-selected identifiers.
//!
//! However many identifiers are selected, resolution costs one request.
//! The entity's value query is aliased once per identifier (`data0: ... ($id0)`,
//! `data1: ... ($id1)`, ...) and merged into a single batched document. Building
//! that document is not free, so each batch size is built once per field and
//! reused.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::{FetchPolicy, JsonObject, QueryClient, QueryRequest, QueryResponse};
use crate::config::SelectConfig;
use crate::descriptor::{EntityDescriptor, ID_VARIABLE};
use crate::document::Document;
use crate::error::{Result, SelectError};
use crate::types::{Resolved, ResolvedValue, SelectOption, SelectionValue};

/// Response alias for slot `index` of a batch.
pub fn data_alias(index: usize) -> String {
    format!("data{index}")
}

/// Variable name for slot `index` of a batch.
pub fn id_variable(index: usize) -> String {
    format!("{ID_VARIABLE}{index}")
}

/// State of one identifier within a batch response.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// The entity arrived.
    Ready(SelectOption),
    /// Nothing for this slot yet.
    Pending,
    /// The lookup for this slot failed.
    Failed(String),
    /// The lookup succeeded but the entity does not exist.
    NotFound,
}

/// Outcome of one batched value lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBatch {
    pub ids: Vec<String>,
    pub slots: Vec<Slot>,
}

impl ResolvedBatch {
    /// Every slot failed with the same message.
    pub fn failed(ids: Vec<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let slots = ids.iter().map(|_| Slot::Failed(message.clone())).collect();
        Self { ids, slots }
    }

    pub fn slot(&self, id: &str) -> Option<&Slot> {
        self.ids
            .iter()
            .position(|v| v == id)
            .and_then(|i| self.slots.get(i))
    }
}

/// What it takes to resolve a selection value.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionPlan {
    /// Nothing is selected.
    Empty,
    /// No lookup needed; ids describe themselves.
    Immediate(ResolvedValue),
    /// One batched lookup for these ids, in order.
    Fetch(Vec<String>),
}

/// Resolves selected identifiers into display options for one field.
pub struct ValueResolver {
    descriptor: Arc<EntityDescriptor>,
    documents: DashMap<usize, Arc<Document>>,
    loading_label: String,
}

impl ValueResolver {
    pub fn new(descriptor: Arc<EntityDescriptor>, config: &SelectConfig) -> Self {
        Self {
            descriptor,
            documents: DashMap::new(),
            loading_label: config.loading_label.clone(),
        }
    }

    pub fn plan(&self, value: &SelectionValue) -> ResolutionPlan {
        if value.is_empty() {
            return ResolutionPlan::Empty;
        }
        if self.descriptor.value_query().is_none() {
            return ResolutionPlan::Immediate(self.resolve(value, None));
        }
        ResolutionPlan::Fetch(value.ids().to_vec())
    }

    /// The batched document for `size` identifiers, built on first use.
    pub fn batch_document(&self, size: usize) -> Result<Arc<Document>> {
        if let Some(doc) = self.documents.get(&size) {
            return Ok(doc.value().clone());
        }
        let doc = Arc::new(self.build_batch_document(size)?);
        debug!(entity = self.descriptor.name(), size, "built batched value query");
        Ok(self.documents.entry(size).or_insert(doc).value().clone())
    }

    /// Number of distinct batch sizes built so far.
    pub fn cached_documents(&self) -> usize {
        self.documents.len()
    }

    fn build_batch_document(&self, size: usize) -> Result<Document> {
        let value_query =
            self.descriptor
                .value_query()
                .ok_or_else(|| SelectError::InvalidDescriptor {
                    entity: self.descriptor.name().to_string(),
                    reason: "no value query configured".to_string(),
                })?;

        let mut batched: Option<Document> = None;
        for index in 0..size {
            let renames = HashMap::from([(ID_VARIABLE.to_string(), id_variable(index))]);
            let part = value_query
                .field_alias(&data_alias(index))?
                .map_input_vars(&renames);
            batched = Some(match batched {
                None => part,
                Some(doc) => doc.merge_fields(&part),
            });
        }
        batched.ok_or_else(|| SelectError::invalid_document("cannot batch zero lookups"))
    }

    /// The single request resolving `ids`.
    pub fn batch_request(&self, ids: &[String]) -> Result<QueryRequest> {
        let document = self.batch_document(ids.len())?;
        let variables: JsonObject = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id_variable(i), Value::String(id.clone())))
            .collect();
        Ok(QueryRequest {
            document,
            variables,
            fetch_policy: FetchPolicy::CacheFirst,
        })
    }

    /// Issue one lookup for `ids`. Failures come back as failed slots.
    pub async fn fetch(&self, client: &dyn QueryClient, ids: Vec<String>) -> ResolvedBatch {
        let request = match self.batch_request(&ids) {
            Ok(request) => request,
            Err(err) => return ResolvedBatch::failed(ids, err.to_string()),
        };
        debug!(
            entity = self.descriptor.name(),
            batch = ids.len(),
            "resolving selected values"
        );
        match client.execute(request).await {
            Ok(response) => self.read_batch(ids, &response),
            Err(err) => {
                warn!(entity = self.descriptor.name(), %err, "value lookup failed");
                ResolvedBatch::failed(ids, err.to_string())
            }
        }
    }

    fn read_batch(&self, ids: Vec<String>, response: &QueryResponse) -> ResolvedBatch {
        let slots = (0..ids.len())
            .map(|index| {
                let key = data_alias(index);
                let error = response
                    .errors
                    .iter()
                    .find(|e| e.root_key() == Some(key.as_str()));
                match (response.data.get(&key), error) {
                    (Some(node), _) if !node.is_null() => Slot::Ready(self.descriptor.map_node(node)),
                    (_, Some(error)) => Slot::Failed(error.message.clone()),
                    (Some(_), None) => Slot::NotFound,
                    (None, None) => Slot::Pending,
                }
            })
            .collect();
        ResolvedBatch { ids, slots }
    }

    /// Display options for `value`, shaped like `value`.
    ///
    /// Without a value query every id is its own label. Otherwise each id
    /// takes its slot from `batch`; ids with no data yet get a loading
    /// placeholder so known labels stay visible while late ones arrive.
    pub fn resolve(&self, value: &SelectionValue, batch: Option<&ResolvedBatch>) -> ResolvedValue {
        let self_describing = self.descriptor.value_query().is_none();
        let to_option = |id: &String| {
            if self_describing {
                return SelectOption::bare(id.as_str());
            }
            match batch.and_then(|b| b.slot(id)) {
                Some(Slot::Ready(opt)) => opt.clone(),
                Some(Slot::NotFound) => SelectOption::bare(id.as_str()),
                Some(Slot::Failed(message)) => {
                    SelectOption::new(id.as_str(), format!("Error: {message}"))
                }
                Some(Slot::Pending) | None => {
                    SelectOption::new(id.as_str(), self.loading_label.as_str())
                }
            }
        };
        match value {
            SelectionValue::Single(id) => Resolved::Single(id.as_ref().map(to_option)),
            SelectionValue::Multi(ids) => Resolved::Multi(ids.iter().map(to_option).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ResponseError;
    use crate::document::Field;
    use crate::testing::MockClient;
    use serde_json::json;

    fn users_query() -> Document {
        Document::query().variable("input", "UserSearchOptions").field(
            Field::new("users")
                .arg_var("input", "input")
                .field(Field::new("nodes").scalars(["id", "name"])),
        )
    }

    fn user_query() -> Document {
        Document::named("UserValue")
            .variable("id", "ID!")
            .field(Field::new("user").arg_var("id", "id").scalars(["id", "name"]))
    }

    fn resolver(with_value_query: bool) -> ValueResolver {
        let mut builder = EntityDescriptor::builder("user", users_query());
        if with_value_query {
            builder = builder.value_query(user_query());
        }
        ValueResolver::new(Arc::new(builder.build().unwrap()), &SelectConfig::default())
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn batch_document_aliases_each_slot() {
        let doc = resolver(true).batch_document(2).unwrap();
        assert_eq!(
            doc.to_string(),
            "query UserValue($id0: ID!, $id1: ID!) { data0: user(id: $id0) { id name } data1: user(id: $id1) { id name } }"
        );
    }

    #[test]
    fn batch_document_is_memoized_per_size() {
        let r = resolver(true);
        let a = r.batch_document(3).unwrap();
        let b = r.batch_document(3).unwrap();
        let c = r.batch_document(1).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(r.cached_documents(), 2);
    }

    #[test]
    fn resolvers_do_not_share_documents() {
        let a = resolver(true).batch_document(2).unwrap();
        let b = resolver(true).batch_document(2).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a, b);
    }

    #[test]
    fn batch_request_variables_follow_order() {
        let request = resolver(true).batch_request(&ids(&["a", "b"])).unwrap();
        assert_eq!(request.variables.get("id0"), Some(&json!("a")));
        assert_eq!(request.variables.get("id1"), Some(&json!("b")));
        assert_eq!(request.fetch_policy, FetchPolicy::CacheFirst);
    }

    #[test]
    fn plan_empty_and_self_describing() {
        let r = resolver(false);
        assert_eq!(r.plan(&SelectionValue::Single(None)), ResolutionPlan::Empty);
        assert_eq!(r.plan(&SelectionValue::multi(Vec::<String>::new())), ResolutionPlan::Empty);
        assert_eq!(
            r.plan(&SelectionValue::multi(["k1", "k2"])),
            ResolutionPlan::Immediate(Resolved::Multi(vec![
                SelectOption::bare("k1"),
                SelectOption::bare("k2"),
            ]))
        );
        assert_eq!(
            resolver(true).plan(&SelectionValue::single("a")),
            ResolutionPlan::Fetch(ids(&["a"]))
        );
    }

    #[tokio::test]
    async fn fetch_issues_one_request_for_many_ids() {
        let client = MockClient::new(|_| {
            Ok(QueryResponse {
                data: serde_json::from_value(json!({
                    "data0": {"id": "a", "name": "Ada"},
                    "data1": {"id": "b", "name": "Bob"},
                    "data2": {"id": "c", "name": "Cy"},
                }))
                .unwrap(),
                errors: vec![],
            })
        });
        let r = resolver(true);
        let batch = r.fetch(&client, ids(&["a", "b", "c"])).await;

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].document.selections.len(), 3);
        assert_eq!(batch.slots[1], Slot::Ready(SelectOption::new("b", "Bob")));
    }

    #[tokio::test]
    async fn partial_batch_keeps_known_labels() {
        let client = MockClient::new(|_| {
            Ok(QueryResponse {
                data: serde_json::from_value(json!({
                    "data0": {"id": "a", "name": "Ada"},
                    "data2": {"id": "c", "name": "Cy"},
                }))
                .unwrap(),
                errors: vec![],
            })
        });
        let r = resolver(true);
        let value = SelectionValue::multi(["a", "b", "c"]);
        let batch = r.fetch(&client, value.ids().to_vec()).await;
        let labels = r.resolve(&value, Some(&batch)).map(|opt| opt.label);
        assert_eq!(
            labels,
            Resolved::Multi(vec!["Ada".into(), "Loading…".into(), "Cy".into()])
        );
    }

    #[tokio::test]
    async fn slot_errors_stay_local() {
        let client = MockClient::new(|_| {
            Ok(QueryResponse {
                data: serde_json::from_value(json!({
                    "data0": {"id": "a", "name": "Ada"},
                    "data1": null,
                    "data2": null,
                }))
                .unwrap(),
                errors: vec![ResponseError::at("forbidden", "data1")],
            })
        });
        let r = resolver(true);
        let value = SelectionValue::multi(["a", "b", "c"]);
        let batch = r.fetch(&client, value.ids().to_vec()).await;
        assert_eq!(batch.slots[1], Slot::Failed("forbidden".into()));
        assert_eq!(batch.slots[2], Slot::NotFound);

        let labels = r.resolve(&value, Some(&batch)).map(|opt| opt.label);
        assert_eq!(
            labels,
            Resolved::Multi(vec!["Ada".into(), "Error: forbidden".into(), "c".into()])
        );
    }

    #[tokio::test]
    async fn transport_failure_fails_every_slot() {
        let client = MockClient::new(|_| Err(SelectError::Transport("offline".into())));
        let batch = resolver(true).fetch(&client, ids(&["a", "b"])).await;
        assert!(batch
            .slots
            .iter()
            .all(|s| matches!(s, Slot::Failed(m) if m.contains("offline"))));
    }

    #[test]
    fn resolve_mirrors_single_shape() {
        let r = resolver(true);
        assert_eq!(r.resolve(&SelectionValue::Single(None), None), Resolved::Single(None));
        assert_eq!(
            r.resolve(&SelectionValue::single("a"), None),
            Resolved::Single(Some(SelectOption::new("a", "Loading…")))
        );
    }
}
