//! HTTP exchange with the engine.
//!
//! Façades only see [`HttpClient`]. [`SocketTransport`] is the implementation
//! used against a real engine: one hyper HTTP/1.1 connection per request,
//! with the whole body collected before returning, so log and pull bodies are
//! always fully buffered.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{CONNECTION, CONTENT_LENGTH, HOST, USER_AGENT};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, trace, warn};

use crate::config::Endpoint;
use crate::decode::Fields;
use crate::error::{Error, Result};
use crate::types::Filters;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
    Put,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
            Method::Put => "PUT",
        }
    }

    fn to_hyper(self) -> hyper::Method {
        match self {
            Method::Get => hyper::Method::GET,
            Method::Post => hyper::Method::POST,
            Method::Delete => hyper::Method::DELETE,
            Method::Put => hyper::Method::PUT,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// Path and query, e.g. `/v1.43/containers/json?all=true`.
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_string(body)?);
        Ok(self.header("Content-Type", "application/json"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
    /// The engine's `message` for error statuses, empty otherwise.
    pub error_message: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        let error_message = if status >= 400 {
            error_message(&body)
        } else {
            String::new()
        };
        Self {
            status,
            body,
            error_message,
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as JSON. An empty or malformed body reads as `null`, which
    /// every mapper turns into a zero value or an empty batch.
    pub fn json(&self) -> Value {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Value::Null;
        }
        serde_json::from_slice(&self.body).unwrap_or_else(|e| {
            warn!(status = self.status, error = %e, "response body is not valid JSON");
            Value::Null
        })
    }
}

// Engine errors look like `{"message": "No such container: web"}`.
fn error_message(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|doc| Fields::new(&doc).opt_string("message"))
        .unwrap_or_else(|| text.trim().to_string())
}

/// Capability to execute one HTTP request against the engine.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Returns the engine's response whatever its status. Errors mean no
    /// response was obtained.
    async fn execute(&self, request: Request) -> Result<Response>;
}

pub struct SocketTransport {
    endpoint: Endpoint,
}

impl SocketTransport {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    fn build(&self, request: &Request) -> Result<hyper::Request<Full<Bytes>>> {
        let body = request.body.clone().unwrap_or_default();
        let mut builder = hyper::Request::builder()
            .method(request.method.to_hyper())
            .uri(request.url.as_str())
            .header(HOST, self.endpoint.host_header())
            .header(USER_AGENT, concat!("dockhand/", env!("CARGO_PKG_VERSION")))
            .header(CONNECTION, "close");
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if request.body.is_some() || request.method != Method::Get {
            builder = builder.header(CONTENT_LENGTH, body.len());
        }
        builder
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| Error::Transport(format!("invalid request: {e}")))
    }
}

#[async_trait]
impl HttpClient for SocketTransport {
    async fn execute(&self, request: Request) -> Result<Response> {
        debug!("{} {} via {}", request.method, request.url, self.endpoint);
        let outgoing = self.build(&request)?;

        let response = match &self.endpoint {
            #[cfg(unix)]
            Endpoint::Unix(path) => {
                let stream = tokio::net::UnixStream::connect(path)
                    .await
                    .map_err(|e| connect_error(&self.endpoint, e))?;
                exchange(stream, outgoing).await?
            }
            #[cfg(not(unix))]
            Endpoint::Unix(_) => {
                return Err(Error::Transport(
                    "unix sockets are not available on this platform".to_string(),
                ));
            }
            Endpoint::Tcp { host, port } => {
                let stream = TcpStream::connect((host.as_str(), *port))
                    .await
                    .map_err(|e| connect_error(&self.endpoint, e))?;
                exchange(stream, outgoing).await?
            }
        };

        trace!(status = response.status, bytes = response.body.len(), "response received");
        Ok(response)
    }
}

fn connect_error(endpoint: &Endpoint, e: std::io::Error) -> Error {
    Error::Transport(format!("cannot connect to {endpoint}: {e}"))
}

async fn exchange<S>(stream: S, request: hyper::Request<Full<Bytes>>) -> Result<Response>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .map_err(|e| Error::Transport(format!("HTTP handshake failed: {e}")))?;
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!("Engine connection closed: {}", e);
        }
    });

    let response = sender
        .send_request(request)
        .await
        .map_err(|e| Error::Transport(format!("failed to send request: {e}")))?;
    let status = response.status().as_u16();
    let body = response
        .into_body()
        .collect()
        .await
        .map_err(|e| Error::Transport(format!("failed to read response: {e}")))?
        .to_bytes();

    Ok(Response::new(status, body.to_vec()))
}

/// Builder for the query part of a request URL.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, key: &str, value: impl ToString) -> Self {
        self.pairs.push((key.to_string(), value.to_string()));
        self
    }

    /// Adds the pair only when `condition` holds.
    pub fn push_if(self, condition: bool, key: &str, value: impl ToString) -> Self {
        if condition { self.push(key, value) } else { self }
    }

    pub fn push_nonempty(self, key: &str, value: &str) -> Self {
        self.push_if(!value.is_empty(), key, value)
    }

    /// JSON-encoded `filters` parameter, omitted when there are none.
    pub fn filters(self, filters: &Filters) -> Self {
        if filters.is_empty() {
            return self;
        }
        match serde_json::to_string(filters) {
            Ok(encoded) => self.push("filters", encoded),
            Err(_) => self,
        }
    }

    /// `path` followed by the encoded query, if any.
    pub fn build(&self, path: &str) -> String {
        if self.pairs.is_empty() {
            return path.to_string();
        }
        let query = self
            .pairs
            .iter()
            .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{path}?{query}")
    }
}

/// Encodes a name used in a path. Image references keep their `/` and `:`
/// separators, which the engine routes on.
pub fn encode_path(name: &str) -> String {
    name.split('/')
        .map(|part| {
            part.split(':')
                .map(|piece| urlencoding::encode(piece).into_owned())
                .collect::<Vec<_>>()
                .join(":")
        })
        .collect::<Vec<_>>()
        .join("/")
}
