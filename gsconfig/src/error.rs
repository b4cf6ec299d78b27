use std::io;
use std::path::PathBuf;

use gsconfig_core::CatalogError;

/// A convenience [`Result`] for the gsconfig command line tool.
pub type GsconfigResult<T> = Result<T, GsconfigError>;

#[derive(thiserror::Error, Debug)]
pub enum GsconfigError {
    #[error("Unable to load config file {1}: {0}")]
    ConfigLoadError(#[source] io::Error, PathBuf),

    #[error("Unable to parse config file {1}: {0}")]
    ConfigParseError(#[source] subst::yaml::Error, PathBuf),

    #[error("Unable to read {1}: {0}")]
    InputError(#[source] io::Error, PathBuf),

    #[error("File {0} has no extension, unable to tell which part of the upload it is")]
    MissingExtension(PathBuf),

    #[error("No files given for {0}")]
    NoInputFiles(String),

    #[error("Unable to write output: {0}")]
    OutputError(#[from] io::Error),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    YamlError(#[from] serde_yaml::Error),

    #[error(transparent)]
    CatalogError(#[from] CatalogError),
}
