//! HTTP plumbing shared by both Roads operations.
//!
//! # Design
//! Requests and responses are described as plain data so the client can
//! build and parse them without touching the network. The round-trip itself
//! is delegated to an [`HttpTransport`]; [`UreqTransport`] is the blocking
//! default, and tests swap in stubs that record what was sent.

use std::fmt;
use std::time::Duration;

use url::form_urlencoded;

use crate::error::TransportError;

/// Ordered query parameters that may repeat a key.
///
/// Values of one key keep their insertion order; `encode` sorts keys so the
/// resulting string is stable regardless of the order keys were added in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every value of `key` with `value`.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.pairs.retain(|(k, _)| k != key);
        self.pairs.push((key.to_string(), value.into()));
    }

    /// Appends another value for `key`.
    pub fn add(&mut self, key: &str, value: impl Into<String>) {
        self.pairs.push((key.to_string(), value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// URL-encodes the parameters, sorted by key.
    pub fn encode(&self) -> String {
        let mut sorted: Vec<&(String, String)> = self.pairs.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (k, v) in sorted {
            serializer.append_pair(k, v);
        }
        serializer.finish()
    }

    /// Parses an encoded query string, keeping pair order.
    pub fn parse(query: &str) -> Self {
        Self {
            pairs: form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        }
    }
}

/// An HTTP GET described as plain data.
///
/// `query` is the final, already signed query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub base_url: String,
    pub path: String,
    pub query: String,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn url(&self) -> String {
        if self.query.is_empty() {
            format!("{}{}", self.base_url, self.path)
        } else {
            format!("{}{}?{}", self.base_url, self.path, self.query)
        }
    }

    /// Decodes `query` back into parameters.
    pub fn query_params(&self) -> QueryParams {
        QueryParams::parse(&self.query)
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes one blocking HTTP round-trip.
///
/// Implementations return non-2xx responses as data; only failures to
/// complete the exchange are errors.
pub trait HttpTransport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Blocking transport backed by `ureq`.
pub struct UreqTransport {
    agent: ureq::Agent,
    user_agent: String,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport")
            .field("agent", &"<ureq::Agent>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl UreqTransport {
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> Self {
        let user_agent = user_agent.into();
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .user_agent(user_agent.as_str())
            .build()
            .new_agent();
        Self { agent, user_agent }
    }
}

impl HttpTransport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.agent.get(&request.url());
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        let mut response = builder.call()?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.body_mut().read_to_string()?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
