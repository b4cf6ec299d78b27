//! Environment variable access.
//!
//! [`Env`] is also a [`VariableMap`], so the same source feeds `${VAR}`
//! substitution in config files and the `GEOSERVER_*` connection overrides.
//!
//! - [`OsEnv`]: the process environment
//! - [`FauxEnv`]: a fixed map for tests

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::env::{var, var_os};
use std::ffi::OsString;

use subst::VariableMap;
use tracing::warn;

/// Base URL of the REST endpoint.
pub const URL_VAR: &str = "GEOSERVER_URL";
/// User for Basic authentication.
pub const USER_VAR: &str = "GEOSERVER_USER";
/// Password for Basic authentication.
pub const PASSWORD_VAR: &str = "GEOSERVER_PASSWORD";

pub trait Env<'a>: VariableMap<'a> {
    fn var_os(&self, key: &str) -> Option<OsString>;

    /// Variable as UTF-8. Values with invalid unicode are reported and ignored.
    #[must_use]
    fn get_env_str(&self, key: &str) -> Option<String> {
        self.var_os(key)?
            .into_string()
            .map_err(|v| {
                warn!(
                    "Environment variable {key} has invalid unicode. Lossy representation: {}",
                    v.to_string_lossy()
                );
            })
            .ok()
    }

    /// True if the variable is set but was never read through substitution.
    #[must_use]
    fn has_unused_var(&self, key: &str) -> bool;
}

#[derive(Debug, Default)]
pub struct OsEnv(RefCell<HashSet<String>>);

impl Env<'_> for OsEnv {
    fn var_os(&self, key: &str) -> Option<OsString> {
        var_os(key)
    }

    fn has_unused_var(&self, key: &str) -> bool {
        !self.0.borrow().contains(key) && self.var_os(key).is_some()
    }
}

impl<'a> VariableMap<'a> for OsEnv {
    type Value = String;

    fn get(&'a self, key: &str) -> Option<Self::Value> {
        self.0.borrow_mut().insert(key.to_string());
        var(key).ok()
    }
}

#[derive(Debug, Default)]
pub struct FauxEnv(pub HashMap<&'static str, OsString>);

impl FauxEnv {
    #[must_use]
    pub fn from_pairs(pairs: &[(&'static str, &str)]) -> Self {
        Self(pairs.iter().map(|(k, v)| (*k, OsString::from(v))).collect())
    }
}

impl<'a> VariableMap<'a> for FauxEnv {
    type Value = String;

    fn get(&'a self, key: &str) -> Option<Self::Value> {
        self.0.get(key).map(|s| s.to_string_lossy().to_string())
    }
}

impl Env<'_> for FauxEnv {
    fn var_os(&self, key: &str) -> Option<OsString> {
        self.0.get(key).cloned()
    }

    fn has_unused_var(&self, key: &str) -> bool {
        self.var_os(key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_pairs() {
        let env = FauxEnv::default();
        assert_eq!(env.get_env_str(URL_VAR), None);

        let env = FauxEnv::from_pairs(&[(URL_VAR, "http://gs:8080/geoserver/rest")]);
        assert_eq!(
            env.get_env_str(URL_VAR).as_deref(),
            Some("http://gs:8080/geoserver/rest")
        );
        assert_eq!(VariableMap::get(&env, URL_VAR).as_deref(), Some("http://gs:8080/geoserver/rest"));
    }

    #[test]
    #[cfg(unix)]
    #[tracing_test::traced_test]
    fn invalid_unicode_is_ignored() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt as _;

        let bad_utf8 = [0x61, 0x64, 0x80, 0x6d];
        let env = FauxEnv([(USER_VAR, OsStr::from_bytes(&bad_utf8).to_owned())].into());
        assert_eq!(env.get_env_str(USER_VAR), None);
        assert!(logs_contain("GEOSERVER_USER has invalid unicode"));
    }
}
