//! In-memory query client for unit tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::client::{QueryClient, QueryRequest, QueryResponse};
use crate::error::Result;

type Responder = Box<dyn Fn(&QueryRequest) -> Result<QueryResponse> + Send + Sync>;

/// Records every request and answers with a fixed function.
pub struct MockClient {
    requests: Mutex<Vec<QueryRequest>>,
    responder: Responder,
}

impl MockClient {
    pub fn new(
        responder: impl Fn(&QueryRequest) -> Result<QueryResponse> + Send + Sync + 'static,
    ) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        }
    }

    pub fn requests(&self) -> Vec<QueryRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryClient for MockClient {
    async fn execute(&self, request: QueryRequest) -> Result<QueryResponse> {
        let response = (self.responder)(&request);
        self.requests.lock().unwrap().push(request);
        response
    }
}
