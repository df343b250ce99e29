//! Outgoing request construction.
//!
//! Requests are plain text: `METHOD path HTTP/1.1`, one `Name: value` line
//! per header, an empty line and the body.

use std::fmt;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::types::HeaderMap;

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const APPLICATION_JSON: &str = "application/json";

/// Bytes left untouched by JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Body of an outgoing request.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Encoded as `key=value&...`; only the values are percent-encoded.
    Form(Vec<(String, String)>),
    Json(serde_json::Value),
}

impl RequestBody {
    fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            Self::Empty => Ok(Vec::new()),
            Self::Form(pairs) => Ok(encode_form(pairs).into_bytes()),
            Self::Json(value) => serde_json::to_vec(value),
        }
    }
}

/// Join `pairs` into an `application/x-www-form-urlencoded` body.
///
/// Keys are written as given; values are percent-encoded.
pub fn encode_form(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{key}={}", utf8_percent_encode(value, URI_COMPONENT)))
        .collect::<Vec<_>>()
        .join("&")
}

/// An HTTP/1.1 request to be sent by [`crate::client`].
///
/// ```rust
/// use chunkwire::HttpRequest;
///
/// let request = HttpRequest::new("127.0.0.1")
///     .method("POST")
///     .header("Foo", "bar")
///     .form("name", "hello world");
///
/// let text = String::from_utf8(request.to_bytes().unwrap()).unwrap();
/// assert!(text.starts_with("POST / HTTP/1.1\r\n"));
/// assert!(text.ends_with("\r\n\r\nname=hello%20world"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: String,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl HttpRequest {
    /// A `GET /` request to `host` on port 80.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            host: host.into(),
            port: 80,
            path: "/".to_string(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set a header, replacing an earlier value for the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Append a form field. Replaces a JSON body.
    pub fn form(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let pair = (key.into(), value.into());
        match &mut self.body {
            RequestBody::Form(pairs) => pairs.push(pair),
            body => *body = RequestBody::Form(vec![pair]),
        }
        self
    }

    /// Use `value` as a JSON body and set `Content-Type: application/json`.
    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = RequestBody::Json(value);
        self.headers.insert("Content-Type", APPLICATION_JSON);
        self
    }

    /// `host:port`, suitable for `TcpStream::connect`.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Headers as they go on the wire.
    ///
    /// `Host` is added first when missing, `Content-Type` defaults to
    /// form encoding, and `Content-Length` always matches `body_len`.
    pub fn wire_headers(&self, body_len: usize) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if self.headers.get_ignore_case("host").is_none() {
            headers.insert("Host", self.host.as_str());
        }
        for header in &self.headers {
            headers.insert(header.name.as_str(), header.value.as_str());
        }
        if headers.get_ignore_case("content-type").is_none() {
            headers.insert("Content-Type", FORM_URLENCODED);
        }
        headers.insert("Content-Length", body_len.to_string());
        headers
    }

    /// Serialize the request.
    ///
    /// # Errors
    ///
    /// Fails only if a JSON body cannot be serialized.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        let body = self.body.encode()?;
        let headers = self.wire_headers(body.len());

        let mut out = Vec::with_capacity(64 + headers.len() * 32 + body.len());
        out.extend_from_slice(format!("{} {} HTTP/1.1\r\n", self.method, self.path).as_bytes());
        for header in &headers {
            out.extend_from_slice(format!("{}: {}\r\n", header.name, header.value).as_bytes());
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&body);
        Ok(out)
    }
}

impl fmt::Display for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes().map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&bytes))
    }
}
