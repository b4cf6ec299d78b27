//! Error types for catalog operations.

use crate::transport::Method;

/// Errors that can occur while talking to the GeoServer REST API.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    /// A write (save, create, upload) was answered with an unexpected status.
    #[error("Tried to make a {method} request to {url} but got a {status} status code:\n{body}")]
    Upload {
        /// HTTP method of the write
        method: Method,
        /// Target URL
        url: String,
        /// Status code the server answered with
        status: u16,
        /// Response body, usually a Java stack trace or a short message
        body: String,
    },

    /// An object with the requested name already exists.
    #[error("{0}")]
    ConflictingData(String),

    /// A name resolved to more than one catalog entry where exactly one was expected.
    #[error("{0}")]
    AmbiguousRequest(String),

    /// A read or a delete was answered with a non-200 status.
    #[error("Tried to make a {method} request to {url} but got a {status} status code:\n{body}")]
    FailedRequest {
        /// HTTP method of the request
        method: Method,
        /// Requested URL
        url: String,
        /// Status code the server answered with
        status: u16,
        /// Response body
        body: String,
    },

    /// Name resolution found nothing.
    #[error("{0}")]
    NotFound(String),

    /// The attribute list given for a native layer cannot be used.
    #[error("{0}")]
    InvalidAttributes(String),

    /// The server answered a GET with something that is not XML.
    #[error("GeoServer gave non-XML response for [GET {url}]: {source}")]
    InvalidXml {
        /// Requested URL
        url: String,
        /// Parser failure
        #[source]
        source: crate::xml::XmlError,
    },

    /// An XML document lacks an element the catalog depends on.
    #[error("Element <{element}> is missing a <{child}> child")]
    MissingElement {
        /// Element that was inspected
        element: String,
        /// Child element that was expected
        child: &'static str,
    },

    /// Connection level failure of the HTTP client.
    #[error("{method} {url} failed: {source}")]
    Transport {
        /// HTTP method of the request
        method: Method,
        /// Requested URL
        url: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP client could not be constructed.
    #[error("Unable to build the HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// IO error while preparing or reading upload data.
    #[error("IO error {1}: {0}")]
    Io(#[source] std::io::Error, String),

    /// ZIP archive could not be read or written.
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

impl CatalogError {
    /// True for the "failed request" family: a non-200 read or a lookup that found nothing.
    #[must_use]
    pub fn is_failed_request(&self) -> bool {
        matches!(self, Self::FailedRequest { .. } | Self::NotFound(_))
    }
}

/// A convenience [`Result`] for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;
