//! Scripted in-memory [`Transport`] for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use strato_proto::ApiErrorBody;

use super::{ApiRequest, ApiResponse, Method, RequestBody, Transport};
use crate::error::CliError;

/// A request observed by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// HTTP method.
    pub method: Method,
    /// Request path.
    pub path: String,
    /// Query parameters.
    pub query: Vec<(String, String)>,
    /// JSON body, if one was sent.
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Default)]
struct MockState {
    routes: HashMap<(Method, String), VecDeque<Result<ApiResponse, String>>>,
    calls: Vec<RecordedCall>,
}

/// Scripted in-memory transport.
///
/// Responses are queued per method and path. Each call pops the next
/// response; the last one stays and answers every further call. Paths with
/// nothing queued answer 404. Clones share state, so a test can keep a
/// handle while the client owns another.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create an empty mock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response with the given status and JSON body.
    pub fn respond<T: Serialize + ?Sized>(&self, method: Method, path: &str, status: u16, body: &T) {
        let response = ApiResponse::json(status, body).map_err(|e| e.to_string());
        self.push(method, path, response);
    }

    /// Queue a 200 response with a JSON body.
    pub fn ok<T: Serialize + ?Sized>(&self, method: Method, path: &str, body: &T) {
        self.respond(method, path, 200, body);
    }

    /// Queue a transport failure.
    pub fn fail(&self, method: Method, path: &str, message: &str) {
        self.push(method, path, Err(message.to_string()));
    }

    fn push(&self, method: Method, path: &str, response: Result<ApiResponse, String>) {
        self.state
            .lock()
            .routes
            .entry((method, path.to_string()))
            .or_default()
            .push_back(response);
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    /// Number of calls made to `method path`.
    #[must_use]
    pub fn count(&self, method: Method, path: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }

    /// Position of the first call to `method path` in the call log.
    #[must_use]
    pub fn position(&self, method: Method, path: &str) -> Option<usize> {
        self.state
            .lock()
            .calls
            .iter()
            .position(|c| c.method == method && c.path == path)
    }
}

impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, CliError> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall {
            method: request.method,
            path: request.path.clone(),
            query: request.query.clone(),
            body: match &request.body {
                RequestBody::Json(value) => Some(value.clone()),
                _ => None,
            },
        });

        let key = (request.method, request.path.clone());
        let next = match state.routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        drop(state);

        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(CliError::Transport(message)),
            None => ApiResponse::json(
                404,
                &ApiErrorBody {
                    code: "NotFound".into(),
                    message: format!("no route for {} {}", request.method, request.path),
                    data: None,
                },
            ),
        }
    }
}
