//! Shared fixtures for selection field integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use query_select::{
    Document, EntityDescriptor, FetchPolicy, Field, JsonObject, QueryClient, QueryRequest,
    QueryResponse, Result, SelectField, SelectView, SelectionValue,
};
use serde_json::{json, Value};

type Responder = Box<dyn Fn(&QueryRequest) -> (Duration, Result<QueryResponse>) + Send + Sync>;

/// A query client that answers from a script, optionally after a delay,
/// and records every request it receives.
pub struct ScriptedClient {
    requests: Mutex<Vec<QueryRequest>>,
    responder: Responder,
}

impl ScriptedClient {
    pub fn new(
        responder: impl Fn(&QueryRequest) -> (Duration, Result<QueryResponse>) + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        })
    }

    /// Answers searches with `users` and lookups from the same list, instantly.
    pub fn directory(users: &'static [(&'static str, &'static str)]) -> Arc<Self> {
        Self::new(move |request| (Duration::ZERO, Ok(directory_response(users, request))))
    }

    pub fn requests(&self) -> Vec<QueryRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn searches(&self) -> Vec<QueryRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.fetch_policy == FetchPolicy::NetworkOnly)
            .collect()
    }

    pub fn lookups(&self) -> Vec<QueryRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.fetch_policy == FetchPolicy::CacheFirst)
            .collect()
    }
}

#[async_trait]
impl QueryClient for ScriptedClient {
    async fn execute(&self, request: QueryRequest) -> Result<QueryResponse> {
        let (delay, response) = (self.responder)(&request);
        self.requests.lock().unwrap().push(request);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        response
    }
}

pub fn object(value: Value) -> JsonObject {
    serde_json::from_value(value).unwrap()
}

pub fn node(id: &str, name: &str) -> Value {
    json!({"id": id, "name": name, "isFavorite": false})
}

pub fn search_response(nodes: Vec<Value>) -> QueryResponse {
    QueryResponse {
        data: object(json!({"data": {"nodes": nodes}})),
        errors: vec![],
    }
}

/// The `input.search` variable of a search request.
pub fn search_text(request: &QueryRequest) -> Option<String> {
    request
        .variables
        .get("input")
        .and_then(|input| input.get("search"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn directory_response(users: &[(&str, &str)], request: &QueryRequest) -> QueryResponse {
    if request.fetch_policy == FetchPolicy::NetworkOnly {
        let text = search_text(request).unwrap_or_default();
        let nodes = users
            .iter()
            .filter(|(_, name)| name.to_lowercase().contains(&text.to_lowercase()))
            .map(|(id, name)| node(id, name))
            .collect();
        return search_response(nodes);
    }
    let mut data = JsonObject::new();
    for (key, id) in &request.variables {
        let index = key.trim_start_matches("id");
        let found = users
            .iter()
            .find(|(uid, _)| Some(*uid) == id.as_str())
            .map(|(uid, name)| node(uid, name))
            .unwrap_or(Value::Null);
        data.insert(format!("data{index}"), found);
    }
    QueryResponse { data, errors: vec![] }
}

pub fn users_search() -> Document {
    Document::query().variable("input", "UserSearchOptions").field(
        Field::new("users")
            .arg_var("input", "input")
            .field(Field::new("nodes").scalars(["id", "name", "isFavorite"])),
    )
}

pub fn user_value() -> Document {
    Document::named("UserValue")
        .variable("id", "ID!")
        .field(Field::new("user").arg_var("id", "id").scalars(["id", "name"]))
}

pub fn users(favorites_first: bool) -> EntityDescriptor {
    let mut builder = EntityDescriptor::builder("user", users_search()).value_query(user_value());
    if favorites_first {
        builder = builder.default_variables(object(json!({"input": {"favoritesFirst": true}})));
    }
    builder.build().unwrap()
}

/// Wait (in virtual time) until the field publishes a view matching `pred`.
pub async fn until(field: &SelectField, mut pred: impl FnMut(&SelectView) -> bool) -> SelectView {
    let mut rx = field.subscribe();
    let view = tokio::time::timeout(Duration::from_secs(30), rx.wait_for(|v| pred(v)))
        .await
        .expect("view condition not reached")
        .expect("field closed");
    (*view).clone()
}

/// Wait until nothing is typed-but-unsearched and no search is outstanding.
pub async fn settled(field: &SelectField) -> SelectView {
    until(field, |v| !v.is_loading).await
}

pub fn labels(view: &SelectView) -> Vec<String> {
    view.value.as_slice().iter().map(|o| o.label.clone()).collect()
}

pub fn option_values(view: &SelectView) -> Vec<String> {
    view.options.iter().map(|o| o.value.clone()).collect()
}

/// Collects every value handed to `on_change`.
pub fn recorder<T: Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(T) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (seen, move |value| sink.lock().unwrap().push(value))
}

pub fn single(id: &str) -> SelectionValue {
    SelectionValue::single(id)
}
