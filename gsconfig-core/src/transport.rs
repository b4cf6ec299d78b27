//! HTTP transport used by the catalog.
//!
//! The catalog only needs a blocking request/response exchange, so the seam is a
//! single-method trait:
//!
//! - [`ReqwestTransport`]: production implementation with Basic authentication
//! - [`FauxTransport`]: in-memory implementation with canned responses for tests

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{CatalogError, CatalogResult};

/// Content type of catalog configuration documents.
pub const XML_CONTENT_TYPE: &str = "application/xml";
/// Content type of zipped upload bundles.
pub const ZIP_CONTENT_TYPE: &str = "application/zip";
/// Content type of raw GeoTIFF uploads.
pub const TIFF_CONTENT_TYPE: &str = "image/tiff";
/// Content type of SLD style bodies.
pub const SLD_CONTENT_TYPE: &str = "application/vnd.ogc.sld+xml";

/// HTTP verbs used by the REST configuration API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        })
    }
}

/// A single request to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub content_type: Option<&'static str>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            content_type: None,
            body: None,
        }
    }

    #[must_use]
    pub fn delete(url: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            url: url.into(),
            content_type: Some(XML_CONTENT_TYPE),
            body: None,
        }
    }

    #[must_use]
    pub fn with_body(
        method: Method,
        url: impl Into<String>,
        content_type: &'static str,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            method,
            url: url.into(),
            content_type: Some(content_type),
            body: Some(body.into()),
        }
    }
}

/// Status and fully read body of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Blocking HTTP exchange with the GeoServer REST endpoint.
///
/// Implementations return `Ok` for every response the server produced,
/// whatever its status. Interpreting the status is up to the catalog.
pub trait HttpTransport: fmt::Debug {
    fn send(&self, request: HttpRequest) -> CatalogResult<HttpResponse>;
}

/// Production transport based on [`reqwest::blocking`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
    username: String,
    password: String,
}

impl ReqwestTransport {
    /// Create a transport that authenticates every request with the given credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> CatalogResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("gsconfig/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(CatalogError::ClientBuild)?;
        Ok(Self {
            client,
            username: username.into(),
            password: password.into(),
        })
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> CatalogResult<HttpResponse> {
        let HttpRequest {
            method,
            url,
            content_type,
            body,
        } = request;
        let verb = match method {
            Method::Get => reqwest::Method::GET,
            Method::Put => reqwest::Method::PUT,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self
            .client
            .request(verb, &url)
            .basic_auth(&self.username, Some(&self.password))
            .header(reqwest::header::ACCEPT, XML_CONTENT_TYPE);
        if let Some(content_type) = content_type {
            builder = builder.header(reqwest::header::CONTENT_TYPE, content_type);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let to_error = |source: reqwest::Error| CatalogError::Transport {
            method,
            url: url.clone(),
            source,
        };
        let response = builder.send().map_err(to_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(to_error)?;
        debug!("{method} {url} answered {status}");
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

/// Test implementation serving canned responses.
///
/// Clones share state, so a test can keep one handle while the catalog owns another.
/// Responses registered for the same request are served in order, the last one repeats.
/// Unregistered requests get a `404`.
#[derive(Debug, Clone, Default)]
pub struct FauxTransport(Rc<RefCell<FauxState>>);

#[derive(Debug, Default)]
struct FauxState {
    responses: HashMap<(Method, String), VecDeque<HttpResponse>>,
    requests: Vec<HttpRequest>,
}

impl FauxTransport {
    /// Register a response for `method url`.
    pub fn respond(&self, method: Method, url: impl Into<String>, status: u16, body: impl Into<Vec<u8>>) {
        self.0
            .borrow_mut()
            .responses
            .entry((method, url.into()))
            .or_default()
            .push_back(HttpResponse::new(status, body));
    }

    /// Register a `200` answer to a GET.
    pub fn get_ok(&self, url: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.respond(Method::Get, url, 200, body);
    }

    /// All requests sent so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.0.borrow().requests.clone()
    }

    /// Number of requests sent for `method url`.
    #[must_use]
    pub fn count(&self, method: Method, url: &str) -> usize {
        self.0
            .borrow()
            .requests
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }

    /// Forget the request log, keeping registered responses.
    pub fn clear_requests(&self) {
        self.0.borrow_mut().requests.clear();
    }
}

impl HttpTransport for FauxTransport {
    fn send(&self, request: HttpRequest) -> CatalogResult<HttpResponse> {
        let mut state = self.0.borrow_mut();
        let key = (request.method, request.url.clone());
        state.requests.push(request);
        let response = match state.responses.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        Ok(response.unwrap_or_else(|| HttpResponse::new(404, "No such resource")))
    }
}
