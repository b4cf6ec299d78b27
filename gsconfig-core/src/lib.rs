#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod bundle;
pub mod cache;
mod catalog;
pub mod config;
mod error;
pub mod model;
pub mod transport;
pub mod xml;

pub use catalog::{Catalog, Lookup, UploadData};
pub use error::{CatalogError, CatalogResult};
pub use transport::{FauxTransport, HttpTransport, ReqwestTransport};
