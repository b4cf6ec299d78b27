//! Optional YAML config file.
//!
//! ```yaml
//! url: https://maps.example.org/geoserver/rest
//! username: admin
//! password: ${GEOSERVER_ADMIN_PASSWORD}
//! cache_ttl: 10s
//! ```
//!
//! Settings are resolved in order of precedence: command line, config file,
//! `GEOSERVER_*` environment variables, built-in defaults.

use std::collections::HashMap;
use std::fs::read_to_string;
use std::path::Path;
use std::time::Duration;

use gsconfig_core::config::ConnectionSettings;
use gsconfig_core::config::env::{Env, PASSWORD_VAR, URL_VAR, USER_VAR};
use serde::{Deserialize, Serialize};
use subst::VariableMap;
use tracing::{info, warn};

use crate::args::ConnectionArgs;
use crate::{GsconfigError, GsconfigResult};

pub type UnrecognizedValues = HashMap<String, serde_yaml::Value>;

#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// How long GET responses are reused, e.g. `5s` or `1m`. Zero disables caching.
    #[serde(default, with = "humantime_serde")]
    pub cache_ttl: Option<Duration>,
    #[serde(flatten, skip_serializing)]
    pub unrecognized: UnrecognizedValues,
}

impl FileConfig {
    /// Warn about unknown keys and about environment variables the file shadows.
    pub fn finalize<'a>(&self, env: &impl Env<'a>) {
        let mut keys: Vec<_> = self.unrecognized.keys().collect();
        keys.sort();
        for key in keys {
            warn!(
                "Ignoring unrecognized configuration key '{key}'. Please check your configuration file for typos."
            );
        }
        let shadowed = [
            (URL_VAR, self.url.is_some()),
            (USER_VAR, self.username.is_some()),
            (PASSWORD_VAR, self.password.is_some()),
        ];
        for (var, set) in shadowed {
            if set && env.has_unused_var(var) {
                info!("Environment variable {var} is set, but the config file value takes precedence");
            }
        }
    }

    pub fn merge_into(self, settings: &mut ConnectionSettings) {
        if let Some(url) = self.url {
            settings.url = url;
        }
        if let Some(username) = self.username {
            settings.username = username;
        }
        if let Some(password) = self.password {
            settings.password = password;
        }
        if let Some(cache_ttl) = self.cache_ttl {
            settings.cache_ttl = cache_ttl;
        }
    }
}

/// Read config from a file
pub fn read_config<'a, M>(file_name: &Path, env: &'a M) -> GsconfigResult<FileConfig>
where
    M: VariableMap<'a>,
    M::Value: AsRef<str>,
{
    let contents =
        read_to_string(file_name).map_err(|e| GsconfigError::ConfigLoadError(e, file_name.into()))?;
    parse_config(&contents, env, file_name)
}

pub fn parse_config<'a, M>(contents: &str, env: &'a M, file_name: &Path) -> GsconfigResult<FileConfig>
where
    M: VariableMap<'a>,
    M::Value: AsRef<str>,
{
    subst::yaml::from_str(contents, env)
        .map_err(|e| GsconfigError::ConfigParseError(e, file_name.into()))
}

/// Combine defaults, environment, the optional config file and command line overrides.
pub fn resolve_settings<'a, E>(args: ConnectionArgs, env: &'a E) -> GsconfigResult<ConnectionSettings>
where
    E: Env<'a>,
    E::Value: AsRef<str>,
{
    let mut settings = ConnectionSettings::from_env(env);
    if let Some(file_name) = &args.config {
        info!("Using {}", file_name.display());
        let file = read_config(file_name, env)?;
        file.finalize(env);
        file.merge_into(&mut settings);
    }
    args.merge_into(&mut settings);
    settings.url = settings.url.trim_end_matches('/').to_string();
    Ok(settings)
}
