#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]

pub mod args;
pub mod commands;
pub mod config;
mod error;
pub mod logging;

pub use error::{GsconfigError, GsconfigResult};
