//! In-memory transport for tests
//!
//! Routes requests by URL prefix to closures (longest prefix wins) and
//! records every call so tests can assert on endpoint usage and call counts.

use crate::errors::FlowError;
use crate::rpc::transport::Transport;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Head,
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RecordedCall {
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

type Handler = Box<dyn Fn(&RecordedCall) -> Result<Value, FlowError> + Send + Sync>;

struct Route {
    prefix: String,
    handler: Handler,
}

#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<RecordedCall>>,
    dead: Mutex<HashSet<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer GET/POST requests whose URL starts with `prefix`
    pub fn route<F>(&self, prefix: &str, handler: F)
    where
        F: Fn(&RecordedCall) -> Result<Value, FlowError> + Send + Sync + 'static,
    {
        self.routes.lock().unwrap().push(Route {
            prefix: prefix.to_string(),
            handler: Box::new(handler),
        });
    }

    /// Make probes against `url` fail
    pub fn fail_probe(&self, url: &str) {
        self.dead.lock().unwrap().insert(url.to_string());
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Non-probe calls whose URL starts with `prefix`
    pub fn calls_to(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method != Method::Head && c.url.starts_with(prefix))
            .count()
    }

    pub fn probe_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == Method::Head)
            .count()
    }

    fn dispatch(&self, call: RecordedCall) -> Result<Value, FlowError> {
        self.calls.lock().unwrap().push(call.clone());

        let routes = self.routes.lock().unwrap();
        let route = routes
            .iter()
            .filter(|r| call.url.starts_with(&r.prefix))
            .max_by_key(|r| r.prefix.len());

        match route {
            Some(route) => (route.handler)(&call),
            None => Err(FlowError::network(&call.url, "no route")),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get_json(&self, url: &str, query: &[(String, String)]) -> Result<Value, FlowError> {
        self.dispatch(RecordedCall {
            method: Method::Get,
            url: url.to_string(),
            query: query.to_vec(),
            body: None,
        })
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, FlowError> {
        self.dispatch(RecordedCall {
            method: Method::Post,
            url: url.to_string(),
            query: Vec::new(),
            body: Some(body.clone()),
        })
    }

    async fn probe(&self, url: &str, _timeout: Duration) -> Result<(), FlowError> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: Method::Head,
            url: url.to_string(),
            query: Vec::new(),
            body: None,
        });

        if self.dead.lock().unwrap().contains(url) {
            return Err(FlowError::network(url, "connection refused"));
        }
        Ok(())
    }
}
