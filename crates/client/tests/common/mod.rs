#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use sitekit_auth::{InMemoryStore, SessionEvent, SessionManager, TokenPair};
use sitekit_client::{ApiClient, HttpRequest, HttpResponse, HttpTransport, Method, TransportError};
use sitekit_core::{ClientConfig, StorageKeys};

pub const BASE_URL: &str = "https://api.test";

pub enum Reply {
    Json(u16, Value),
    Text(u16, &'static str),
    Empty(u16),
    NetworkDown,
}

/// Transport that replays scripted replies per `(method, path)` and records
/// every request it sees. An exhausted route answers 404.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    calls: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on(&self, method: Method, path: &str, reply: Reply) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<HttpRequest> {
        let url = format!("{BASE_URL}{path}");
        self.calls().into_iter().filter(|c| c.url == url).collect()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.lock().unwrap().push(request.clone());
        let path = request
            .url
            .strip_prefix(BASE_URL)
            .unwrap_or(&request.url)
            .to_string();
        let reply = self
            .routes
            .lock()
            .unwrap()
            .get_mut(&(request.method, path))
            .and_then(VecDeque::pop_front);

        match reply {
            Some(Reply::Json(status, body)) => Ok(HttpResponse::new(status, body.to_string())),
            Some(Reply::Text(status, body)) => Ok(HttpResponse::new(status, body)),
            Some(Reply::Empty(status)) => Ok(HttpResponse::new(status, "")),
            Some(Reply::NetworkDown) => Err(TransportError("connection refused".into())),
            None => Ok(HttpResponse::new(404, r#"{"message":"no such route"}"#)),
        }
    }
}

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub session: Arc<SessionManager>,
    pub transport: Arc<MockTransport>,
    pub api: Arc<ApiClient>,
}

impl Harness {
    pub fn new() -> Self {
        let store = InMemoryStore::arc();
        let session = Arc::new(SessionManager::new(store.clone(), StorageKeys::default()));
        let transport = MockTransport::new();
        let config = ClientConfig::new(BASE_URL).unwrap();
        let api = Arc::new(ApiClient::new(config, transport.clone(), session.clone()));
        Self {
            store,
            session,
            transport,
            api,
        }
    }

    pub fn signed_in(access: &str, refresh: &str) -> Self {
        let harness = Self::new();
        harness
            .session
            .set_tokens(&TokenPair::new(access, refresh).unwrap());
        harness
    }

    /// Collect every event of `event_type` published from now on.
    pub fn record(&self, event_type: &'static str) -> Arc<Mutex<Vec<SessionEvent>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        // Dropping the handle leaves the handler registered.
        let _ = self.session.subscribe(event_type, move |event| {
            sink.lock().unwrap().push(event.clone());
        });
        seen
    }
}

pub fn bearer(request: &HttpRequest) -> Option<&str> {
    request.header_value("authorization")
}
