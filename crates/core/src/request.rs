//! Request and response snapshots as seen by the worker.

use bytes::Bytes;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::Error;
use crate::cache::hash::compute_request_key;

/// Fetch mode of an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level or frame navigation.
    Navigate,
    SameOrigin,
    #[default]
    NoCors,
    Cors,
}

impl FromStr for RequestMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "navigate" => Ok(Self::Navigate),
            "same-origin" => Ok(Self::SameOrigin),
            "no-cors" => Ok(Self::NoCors),
            "cors" => Ok(Self::Cors),
            other => Err(Error::InvalidInput(format!("unknown request mode: {other}"))),
        }
    }
}

/// Destination hint of an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Image,
    Style,
    Script,
    Font,
    /// No destination (fetch/XHR).
    #[default]
    Empty,
    /// Any other platform destination (audio, manifest, ...).
    Other(String),
}

impl Destination {
    /// Parse a destination hint; the empty string maps to [`Destination::Empty`].
    pub fn parse(hint: &str) -> Self {
        match hint.to_ascii_lowercase().as_str() {
            "" => Self::Empty,
            "document" => Self::Document,
            "image" => Self::Image,
            "style" => Self::Style,
            "script" => Self::Script,
            "font" => Self::Font,
            other => Self::Other(other.to_string()),
        }
    }
}

/// An intercepted request.
///
/// The URL is expected to be normalized already (see [`crate::url::normalize`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: Url,
    pub mode: RequestMode,
    pub destination: Destination,
}

impl Request {
    /// A GET request with no destination hint.
    pub fn get(url: Url) -> Self {
        Self { method: "GET".into(), url, mode: RequestMode::default(), destination: Destination::default() }
    }

    /// A GET navigation request.
    pub fn navigate(url: Url) -> Self {
        Self { mode: RequestMode::Navigate, destination: Destination::Document, ..Self::get(url) }
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.to_ascii_uppercase();
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// Identity used as the cache key.
    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.method, &self.url)
    }
}

/// Request identity: method plus normalized URL, hashed for storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct RequestKey {
    pub hash: String,
    pub method: String,
    pub url: String,
}

impl RequestKey {
    pub fn new(method: &str, url: &Url) -> Self {
        let method = method.to_ascii_uppercase();
        let url = url.as_str().to_string();
        Self { hash: compute_request_key(&method, &url), method, url }
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A response snapshot: status, headers and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, status_text: default_status_text(status).into(), headers: Vec::new(), body: body.into() }
    }

    /// Synthetic empty 404 served when nothing else is available.
    pub fn not_found() -> Self {
        Self::new(404, Bytes::new())
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    /// 2xx status, as required by `Cache.addAll`.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Partial content cannot be stored.
    pub fn is_cacheable(&self) -> bool {
        self.status != 206
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

fn default_status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        206 => "Partial Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("navigate".parse::<RequestMode>().unwrap(), RequestMode::Navigate);
        assert_eq!("NO-CORS".parse::<RequestMode>().unwrap(), RequestMode::NoCors);
        assert!("websocket".parse::<RequestMode>().is_err());
    }

    #[test]
    fn test_destination_parse() {
        assert_eq!(Destination::parse(""), Destination::Empty);
        assert_eq!(Destination::parse("Image"), Destination::Image);
        assert_eq!(Destination::parse("manifest"), Destination::Other("manifest".into()));
    }

    #[test]
    fn test_key_includes_method() {
        let u = url("https://folio.example/index.html");
        let get = Request::get(u.clone()).key();
        let head = Request::get(u).with_method("head").key();
        assert_ne!(get.hash, head.hash);
        assert_eq!(head.method, "HEAD");
    }

    #[test]
    fn test_key_display() {
        let key = Request::get(url("https://folio.example/")).key();
        assert_eq!(key.to_string(), "GET https://folio.example/");
    }

    #[test]
    fn test_not_found() {
        let resp = Response::not_found();
        assert_eq!(resp.status, 404);
        assert_eq!(resp.status_text, "Not Found");
        assert!(resp.body.is_empty());
        assert!(!resp.is_ok());
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let resp = Response::new(200, "body").with_header("Content-Type", "text/css");
        assert_eq!(resp.content_type(), Some("text/css"));
        assert_eq!(resp.header("CONTENT-TYPE"), Some("text/css"));
    }

    #[test]
    fn test_partial_not_cacheable() {
        assert!(!Response::new(206, "par").is_cacheable());
        assert!(Response::new(500, "err").is_cacheable());
    }
}
