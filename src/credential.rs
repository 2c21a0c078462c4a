//! Credentials and the specs needed to refresh them.

use std::fmt::Debug;
use std::fmt::Formatter;

use chrono::Duration;
use zeroize::Zeroizing;

use crate::time::DateTime;

/// Credential that holds the access key and secret key.
///
/// Secret material is kept in buffers that are overwritten when the value is
/// dropped.
#[derive(Clone)]
pub struct Credential {
    access_key_id: String,
    secret_access_key: Zeroizing<String>,
    session_token: Option<Zeroizing<String>>,
    expiration: Option<DateTime>,
}

impl Credential {
    /// Create a new Credential.
    pub fn new(access_key_id: &str, secret_access_key: &str) -> Self {
        Credential {
            access_key_id: access_key_id.to_string(),
            secret_access_key: Zeroizing::new(secret_access_key.to_string()),
            session_token: None,
            expiration: None,
        }
    }

    /// Build a credential with a session token.
    pub fn with_session_token(mut self, token: &str) -> Self {
        self.session_token = Some(Zeroizing::new(token.to_string()));
        self
    }

    /// Build a credential with an expiration instant.
    pub fn with_expiration(mut self, expiration: DateTime) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Get access_key_id.
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Get secret_access_key.
    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    /// Get session_token.
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_ref().map(|v| v.as_str())
    }

    /// Get the expiration instant, if the credential is time-bounded.
    pub fn expiration(&self) -> Option<DateTime> {
        self.expiration
    }

    /// An empty credential drives unsigned requests.
    pub fn is_empty(&self) -> bool {
        self.access_key_id.is_empty() && self.secret_access_key.is_empty()
    }

    /// Whether this credential can still be used at `now`.
    ///
    /// Time-bounded credentials keep one minute of margin before their
    /// expiration.
    pub fn is_valid_at(&self, now: DateTime) -> bool {
        if self.is_empty() {
            return false;
        }
        match self.expiration {
            Some(expiration) => now < expiration - Duration::seconds(60),
            None => true,
        }
    }
}

impl Default for Credential {
    fn default() -> Self {
        Credential::new("", "")
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Credential {{ access_key_id: {}, secret_access_key: {}, session_token: {} }}",
            redact(&self.access_key_id),
            redact(&self.secret_access_key),
            redact(self.session_token.as_deref().unwrap_or(&String::new()))
        )
    }
}

fn redact(v: &str) -> &str {
    if v.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}

/// Where credentials came from; decides whether and how they refresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialsSource {
    /// Explicit keys from options, environment or config files. Never
    /// refreshed.
    Static,
    /// Temporary credentials from STS `AssumeRole`.
    AssumedRole,
    /// Temporary credentials from STS `AssumeRoleWithWebIdentity`.
    WebIdentity,
    /// Instance credentials from EC2/ECS metadata services.
    Ec2,
}

/// Everything needed to call STS `AssumeRole` again.
#[derive(Clone, Debug)]
pub struct AssumedRoleSpec {
    /// ARN of the role to assume.
    pub role_arn: String,
    /// Optional `ExternalId` request parameter.
    pub external_id: Option<String>,
    /// Optional MFA device serial (`SerialNumber` request parameter).
    pub mfa_serial: Option<String>,
    /// Session name; a fixed default applies when unset.
    pub role_session_name: Option<String>,
    /// Long-lived credentials that sign the `AssumeRole` call.
    pub source_credentials: Credential,
}

/// Everything needed to call STS `AssumeRoleWithWebIdentity` again.
#[derive(Clone, Debug)]
pub struct WebIdentitySpec {
    /// ARN of the role to assume.
    pub role_arn: String,
    /// Path of the file holding the OIDC token.
    pub token_file: String,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::time::parse_iso8601;

    #[test]
    fn test_is_valid_at_margin() {
        let expiration = parse_iso8601("2017-07-03T22:42:58Z").expect("must parse");
        let cred = Credential::new("ak", "sk").with_expiration(expiration);

        // One minute of margin: 61 s before expiration is still fine, 59 s
        // before is not.
        assert!(cred.is_valid_at(expiration - Duration::seconds(61)));
        assert!(!cred.is_valid_at(expiration - Duration::seconds(59)));
    }

    #[test]
    fn test_empty_is_never_valid() {
        let cred = Credential::default();
        assert!(cred.is_empty());
        assert!(!cred.is_valid_at(crate::time::now()));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let cred = Credential::new("ak", "sk").with_session_token("token");
        let out = format!("{cred:?}");
        assert!(!out.contains("sk"));
        assert!(!out.contains("token"));
    }
}
