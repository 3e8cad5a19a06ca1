//! Transport Layer
//!
//! Abstracts the HTTP round trip for testability. Provides:
//! - Transport trait: send one request, return status and body
//! - MockTransport: scripted responses for unit and integration tests
//! - HttpTransport: blocking reqwest client for production use, with mutual TLS

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::Identity;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use super::tls::TlsIdentity;

/// Characters left unescaped in query components.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outgoing request
///
/// The query is kept apart from the URL so that cursors can be replaced on
/// every poll attempt without re-parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    /// URL without query string
    pub url: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// Set a query parameter, replacing any previous value
    pub fn set_query(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.query.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.query.push((key.to_string(), value)),
        }
    }

    pub fn query(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a header, replacing any previous value (names are case-insensitive)
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name.to_string(), value)),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// URL including the encoded query string
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(k, v)| {
                format!(
                    "{}={}",
                    utf8_percent_encode(k, QUERY_VALUE),
                    utf8_percent_encode(v, QUERY_VALUE)
                )
            })
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.url, query)
    }
}

/// Response status and body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// True for 2xx statuses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Transport trait for request execution
pub trait Transport: Send + Sync {
    /// Send a request, presenting `identity` as the client TLS identity
    fn execute(
        &self,
        request: &HttpRequest,
        identity: &TlsIdentity,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError>;
}

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The request could not be set up locally (client identity, URL, headers)
    #[error("Invalid client setup: {0}")]
    Client(String),
}

impl TransportError {
    /// Whether another attempt may succeed
    pub fn is_transient(&self) -> bool {
        !matches!(self, TransportError::Client(_))
    }
}

/// Mock transport for testing
///
/// Responses are served in the order they were pushed. Once the queue is
/// drained the fallback response is repeated, if one is set. Every request
/// is recorded for later inspection.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    fallback: Mutex<Option<HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response
    pub fn push(&self, status: u16, body: impl Into<Vec<u8>>) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(HttpResponse::new(status, body)));
        self
    }

    /// Queue a JSON response
    pub fn push_json(&self, status: u16, body: &serde_json::Value) -> &Self {
        self.push(status, body.to_string())
    }

    /// Queue a transport failure
    pub fn push_error(&self, error: TransportError) -> &Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    /// Response served whenever the queue is empty
    pub fn respond_always(&self, status: u16, body: impl Into<Vec<u8>>) -> &Self {
        *self.fallback.lock().unwrap() = Some(HttpResponse::new(status, body));
        self
    }

    /// All requests executed so far
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Transport for MockTransport {
    fn execute(
        &self,
        request: &HttpRequest,
        _identity: &TlsIdentity,
        _timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(scripted) = self.responses.lock().unwrap().pop_front() {
            return scripted;
        }
        match self.fallback.lock().unwrap().as_ref() {
            Some(response) => Ok(response.clone()),
            None => Err(TransportError::ConnectionFailed(format!(
                "no scripted response for {} {}",
                request.method,
                request.full_url()
            ))),
        }
    }
}

/// reqwest-backed transport for production use
///
/// One client is built per distinct TLS identity and reused for every
/// request presenting that identity.
#[derive(Default)]
pub struct HttpTransport {
    clients: Mutex<HashMap<Option<String>, Client>>,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self, identity: &TlsIdentity) -> Result<Client, TransportError> {
        let key = identity.fingerprint();
        let mut clients = self
            .clients
            .lock()
            .map_err(|_| TransportError::Client("client cache poisoned".to_string()))?;
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let mut builder = Client::builder();
        if let Some(pem) = identity.pem_bundle() {
            let identity = Identity::from_pem(&pem)
                .map_err(|e| TransportError::Client(format!("invalid client certificate: {}", e)))?;
            builder = builder.identity(identity);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Client(format!("failed to build HTTP client: {}", e)))?;
        clients.insert(key, client.clone());
        Ok(client)
    }
}

fn request_error(error: reqwest::Error, timeout: Duration) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(timeout)
    } else if error.is_builder() {
        TransportError::Client(error.to_string())
    } else if error.is_connect() {
        TransportError::ConnectionFailed(error.to_string())
    } else {
        TransportError::Protocol(error.to_string())
    }
}

impl Transport for HttpTransport {
    fn execute(
        &self,
        request: &HttpRequest,
        identity: &TlsIdentity,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let client = self.client(identity)?;
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = client.request(method, request.full_url()).timeout(timeout);
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().map_err(|e| request_error(e, timeout))?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(|e| request_error(e, timeout))?;
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}
