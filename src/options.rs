//! Key-value option resolution.
//!
//! Every tunable of this crate is read through [`Options`]: explicit
//! overrides first, then the process environment. A fresh [`Options`] with a
//! few overrides is all a test needs to run fully isolated.

use std::collections::HashMap;
use std::env;

/// Option resolver with explicit overrides on top of the environment.
#[derive(Clone, Default)]
pub struct Options {
    overrides: HashMap<String, String>,
}

impl Options {
    /// Create an empty resolver that only reads the environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an override for `key`.
    pub fn set(&mut self, key: &str, value: &str) -> &mut Self {
        self.overrides.insert(key.to_string(), value.to_string());
        self
    }

    /// Builder style variant of [`Options::set`].
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    /// Remove an override for `key`, falling back to the environment again.
    pub fn unset(&mut self, key: &str) -> &mut Self {
        self.overrides.remove(key);
        self
    }

    /// Get the value for `key`: overrides win over environment variables.
    ///
    /// An empty value is treated as unset, matching how empty environment
    /// variables behave in the AWS CLI.
    pub fn get(&self, key: &str) -> Option<String> {
        self.overrides
            .get(key)
            .cloned()
            .or_else(|| env::var(key).ok())
            .filter(|v| !v.is_empty())
    }

    /// Get the value for `key`, or `default` if unset.
    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Get a boolean for `key`.
    ///
    /// Anything but `NO`/`FALSE`/`OFF`/`0` (case-insensitive) counts as true.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(v) => truthy(&v),
            None => default,
        }
    }
}

pub(crate) fn truthy(v: &str) -> bool {
    !matches!(
        v.to_ascii_lowercase().as_str(),
        "no" | "false" | "off" | "0"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_beats_env() {
        temp_env::with_var("S3SIGN_TEST_OPTION", Some("from_env"), || {
            let opts = Options::new();
            assert_eq!(opts.get("S3SIGN_TEST_OPTION").as_deref(), Some("from_env"));

            let opts = opts.with("S3SIGN_TEST_OPTION", "from_override");
            assert_eq!(
                opts.get("S3SIGN_TEST_OPTION").as_deref(),
                Some("from_override")
            );
        });
    }

    #[test]
    fn test_empty_is_unset() {
        temp_env::with_var_unset("S3SIGN_TEST_OPTION", || {
            let opts = Options::new().with("S3SIGN_TEST_OPTION", "");
            assert_eq!(opts.get("S3SIGN_TEST_OPTION"), None);
            assert_eq!(opts.get_or("S3SIGN_TEST_OPTION", "fallback"), "fallback");
        });
    }

    #[test]
    fn test_get_bool() {
        let opts = Options::new()
            .with("A", "YES")
            .with("B", "NO")
            .with("C", "off")
            .with("D", "1")
            .with("E", "anything");
        assert!(opts.get_bool("A", false));
        assert!(!opts.get_bool("B", true));
        assert!(!opts.get_bool("C", true));
        assert!(opts.get_bool("D", false));
        assert!(opts.get_bool("E", false));
        temp_env::with_var_unset("F", || {
            assert!(opts.get_bool("F", true));
            assert!(!opts.get_bool("F", false));
        });
    }
}
