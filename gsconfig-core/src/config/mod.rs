//! Connection settings for a [`Catalog`](crate::Catalog).

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_CACHE_TTL;

pub mod env;

use env::{Env, PASSWORD_VAR, URL_VAR, USER_VAR};

/// REST endpoint of a stock local GeoServer install.
pub const DEFAULT_URL: &str = "http://localhost:8080/geoserver/rest";
pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "geoserver";

/// Where and how to connect.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    pub url: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            username: DEFAULT_USERNAME.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

// Keep the password out of logs.
impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"***")
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

impl ConnectionSettings {
    /// Defaults, overridden by `GEOSERVER_URL`, `GEOSERVER_USER` and `GEOSERVER_PASSWORD`.
    #[must_use]
    pub fn from_env<'a>(env: &impl Env<'a>) -> Self {
        let mut settings = Self::default();
        if let Some(url) = env.get_env_str(URL_VAR) {
            settings.url = url;
        }
        if let Some(username) = env.get_env_str(USER_VAR) {
            settings.username = username;
        }
        if let Some(password) = env.get_env_str(PASSWORD_VAR) {
            settings.password = password;
        }
        settings.url = settings.url.trim_end_matches('/').to_string();
        settings
    }
}
