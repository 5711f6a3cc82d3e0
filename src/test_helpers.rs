//! Shared fixtures and collaborator mocks for unit tests.

use crate::session::UserIdentity;

/// Identity with only an id.
#[must_use]
pub fn user(id: &str) -> UserIdentity {
    UserIdentity { id: id.to_owned(), email: None, metadata: serde_json::Value::Null }
}

#[cfg(feature = "native")]
pub use native::*;

#[cfg(feature = "native")]
mod native {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::body::Body;
    use axum::extract::{Query, State};
    use axum::http::{HeaderMap, Method, StatusCode, Uri};
    use axum::response::Response;
    use serde_json::{Value, json};
    use tokio::sync::{Notify, broadcast, mpsc, oneshot};

    use crate::backend::{
        ChangeEvent, ChannelSpec, Filter, IdentityProvider, RealtimeClient, SelectQuery, Subscription,
        SubscriptionHandle, TableClient,
    };
    use crate::error::BackendError;
    use crate::session::{AuthEvent, UserIdentity};

    // =========================================================================
    // HTTP MOCK BACKEND
    // =========================================================================

    /// One request as seen by [`MockHttp`].
    #[derive(Clone, Debug)]
    pub struct RecordedRequest {
        pub method: Method,
        pub path: String,
        pub query: Vec<(String, String)>,
        pub headers: HeaderMap,
        pub body: String,
    }

    impl RecordedRequest {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers.get(name).and_then(|v| v.to_str().ok())
        }

        pub fn query_value(&self, key: &str) -> Option<&str> {
            self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
        }

        pub fn json(&self) -> Value {
            serde_json::from_str(&self.body).expect("request body should be JSON")
        }
    }

    #[derive(Clone, Debug)]
    pub struct CannedResponse {
        pub status: StatusCode,
        pub headers: Vec<(&'static str, String)>,
        pub body: String,
    }

    impl CannedResponse {
        pub fn json(status: StatusCode, body: &Value) -> Self {
            Self { status, headers: vec![("content-type", "application/json".into())], body: body.to_string() }
        }

        #[must_use]
        pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
            self.headers.push((name, value.into()));
            self
        }
    }

    #[derive(Default)]
    struct MockHttpState {
        requests: Mutex<Vec<RecordedRequest>>,
        responses: Mutex<VecDeque<CannedResponse>>,
    }

    /// axum server on an ephemeral port that records every request and
    /// answers from a queue of canned responses (`200 []` once drained).
    pub struct MockHttp {
        pub base_url: String,
        state: Arc<MockHttpState>,
    }

    impl MockHttp {
        pub async fn start() -> Self {
            let state = Arc::new(MockHttpState::default());
            let app = Router::new().fallback(record).with_state(state.clone());
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind mock http");
            let addr = listener.local_addr().expect("mock http addr");
            tokio::spawn(async move {
                let _ = axum::serve(listener, app).await;
            });
            Self { base_url: format!("http://{addr}"), state }
        }

        pub fn respond(&self, response: CannedResponse) {
            self.state.responses.lock().expect("mock mutex should lock").push_back(response);
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.state.requests.lock().expect("mock mutex should lock").clone()
        }
    }

    async fn record(
        State(state): State<Arc<MockHttpState>>,
        method: Method,
        uri: Uri,
        Query(query): Query<Vec<(String, String)>>,
        headers: HeaderMap,
        body: String,
    ) -> Response {
        state.requests.lock().expect("mock mutex should lock").push(RecordedRequest {
            method,
            path: uri.path().to_owned(),
            query,
            headers,
            body,
        });
        let canned = state
            .responses
            .lock()
            .expect("mock mutex should lock")
            .pop_front()
            .unwrap_or_else(|| CannedResponse::json(StatusCode::OK, &json!([])));
        let mut builder = axum::http::Response::builder().status(canned.status);
        for (name, value) in canned.headers {
            builder = builder.header(name, value);
        }
        builder.body(Body::from(canned.body)).expect("mock response should build")
    }

    // =========================================================================
    // TABLE CLIENT MOCK
    // =========================================================================

    #[derive(Clone, Debug, PartialEq)]
    pub enum TableCall {
        Select(SelectQuery),
        Insert { table: String, row: Value },
        Delete { table: String, filters: Vec<Filter> },
        Count { table: String, filters: Vec<Filter> },
    }

    /// Records calls and answers from a queue. Once the queue is empty:
    /// select returns no rows, insert echoes the row, delete succeeds and
    /// count returns zero.
    #[derive(Default)]
    pub struct MockTables {
        calls: Mutex<Vec<TableCall>>,
        responses: Mutex<VecDeque<Result<Value, BackendError>>>,
        hold: Mutex<Option<Arc<Notify>>>,
    }

    impl MockTables {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(&self, response: Result<Value, BackendError>) {
            self.responses.lock().expect("mock mutex should lock").push_back(response);
        }

        /// Make every subsequent call wait for one `notify_one` on the
        /// returned gate before answering.
        pub fn hold(&self) -> Arc<Notify> {
            let gate = Arc::new(Notify::new());
            *self.hold.lock().expect("mock mutex should lock") = Some(gate.clone());
            gate
        }

        pub fn calls(&self) -> Vec<TableCall> {
            self.calls.lock().expect("mock mutex should lock").clone()
        }

        async fn answer(&self, call: TableCall) -> Option<Result<Value, BackendError>> {
            self.calls.lock().expect("mock mutex should lock").push(call);
            let gate = self.hold.lock().expect("mock mutex should lock").clone();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            self.responses.lock().expect("mock mutex should lock").pop_front()
        }
    }

    fn rows(value: Value) -> Result<Vec<Value>, BackendError> {
        match value {
            Value::Array(rows) => Ok(rows),
            other => Err(BackendError::Decode(format!("mock expected array, got {other}"))),
        }
    }

    #[async_trait::async_trait]
    impl TableClient for MockTables {
        async fn select(&self, query: &SelectQuery) -> Result<Vec<Value>, BackendError> {
            match self.answer(TableCall::Select(query.clone())).await {
                Some(response) => rows(response?),
                None => Ok(Vec::new()),
            }
        }

        async fn insert(&self, table: &str, row: Value) -> Result<Vec<Value>, BackendError> {
            match self.answer(TableCall::Insert { table: table.to_owned(), row: row.clone() }).await {
                Some(response) => rows(response?),
                None => Ok(vec![row]),
            }
        }

        async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), BackendError> {
            match self.answer(TableCall::Delete { table: table.to_owned(), filters: filters.to_vec() }).await {
                Some(response) => response.map(|_| ()),
                None => Ok(()),
            }
        }

        async fn count(&self, table: &str, filters: &[Filter]) -> Result<u64, BackendError> {
            match self.answer(TableCall::Count { table: table.to_owned(), filters: filters.to_vec() }).await {
                Some(response) => {
                    response?.as_u64().ok_or_else(|| BackendError::Decode("mock count is not a number".into()))
                }
                None => Ok(0),
            }
        }
    }

    // =========================================================================
    // REALTIME MOCK
    // =========================================================================

    struct OpenChannel {
        spec: ChannelSpec,
        events: mpsc::UnboundedSender<ChangeEvent>,
        closed: oneshot::Receiver<()>,
    }

    /// Hands out in-memory subscriptions. Tests push events into the most
    /// recent one and check whether each was closed.
    #[derive(Default)]
    pub struct MockRealtime {
        channels: Mutex<Vec<OpenChannel>>,
        fail_next: Mutex<Option<BackendError>>,
    }

    impl MockRealtime {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_next(&self, error: BackendError) {
            *self.fail_next.lock().expect("mock mutex should lock") = Some(error);
        }

        pub fn subscribed(&self) -> Vec<ChannelSpec> {
            self.channels.lock().expect("mock mutex should lock").iter().map(|c| c.spec.clone()).collect()
        }

        /// Deliver `event` on the newest subscription. Returns `false` if its
        /// receiver is gone.
        pub fn emit(&self, event: ChangeEvent) -> bool {
            let channels = self.channels.lock().expect("mock mutex should lock");
            channels.last().is_some_and(|c| c.events.send(event).is_ok())
        }

        /// Whether subscription `index` (in subscribe order) has been closed.
        pub fn is_closed(&self, index: usize) -> bool {
            let mut channels = self.channels.lock().expect("mock mutex should lock");
            channels.get_mut(index).is_some_and(|c| c.closed.try_recv().is_ok())
        }
    }

    #[async_trait::async_trait]
    impl RealtimeClient for MockRealtime {
        async fn subscribe(&self, spec: ChannelSpec) -> Result<Subscription, BackendError> {
            if let Some(error) = self.fail_next.lock().expect("mock mutex should lock").take() {
                return Err(error);
            }
            let (events_tx, events_rx) = mpsc::unbounded_channel();
            let (close_tx, close_rx) = oneshot::channel();
            let handle = SubscriptionHandle::new(spec.name.clone(), close_tx);
            self.channels.lock().expect("mock mutex should lock").push(OpenChannel {
                spec,
                events: events_tx,
                closed: close_rx,
            });
            Ok(Subscription { events: events_rx, handle })
        }
    }

    // =========================================================================
    // IDENTITY MOCK
    // =========================================================================

    pub struct MockIdentity {
        current: Mutex<Result<Option<UserIdentity>, BackendError>>,
        events: broadcast::Sender<AuthEvent>,
    }

    impl MockIdentity {
        pub fn new(current: Result<Option<UserIdentity>, BackendError>) -> Self {
            let (events, _) = broadcast::channel(16);
            Self { current: Mutex::new(current), events }
        }

        pub fn emit(&self, event: AuthEvent) {
            let _ = self.events.send(event);
        }
    }

    #[async_trait::async_trait]
    impl IdentityProvider for MockIdentity {
        async fn current_user(&self) -> Result<Option<UserIdentity>, BackendError> {
            self.current.lock().expect("mock mutex should lock").clone()
        }

        fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
            self.events.subscribe()
        }
    }
}
