//! Instance metadata credentials: EC2 IMDS (v2 with v1 fallback) and the
//! ECS container credential endpoint.

use std::time::Duration;

use log::debug;
use serde::Deserialize;

use crate::constants::*;
use crate::context::Context;
use crate::credential::Credential;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::error::Result;
use crate::fetch::FetchRequest;
use crate::time::parse_iso8601;

const IMDS_TIMEOUT: Duration = Duration::from_secs(1);

/// Fetch instance credentials, remembering the discovered IAM role in
/// `iam_role` so later refreshes skip the discovery round trip.
pub(crate) fn fetch_credentials(
    ctx: &Context,
    iam_role: &mut Option<String>,
) -> Result<Credential> {
    let root = ctx.get_option_or(CPL_AWS_EC2_API_ROOT_URL, EC2_METADATA_ROOT_URL);
    let ecs_relative_uri = ctx.get_option(AWS_CONTAINER_CREDENTIALS_RELATIVE_URI);

    let mut token = None;
    let credentials_url = match ecs_relative_uri {
        // The ECS endpoint serves task credentials directly, no IMDS token.
        Some(relative_uri) if root == EC2_METADATA_ROOT_URL => {
            format!("{ECS_CREDENTIALS_ROOT_URL}{relative_uri}")
        }
        _ => {
            if !is_machine_potentially_ec2_instance(ctx) {
                return Err(Error::new(
                    ErrorKind::InvalidCredentials,
                    "this machine does not look like an EC2 instance",
                )
                .with_operation("imds"));
            }

            token = fetch_imdsv2_token(ctx, &root);

            let list_url = format!("{root}/latest/meta-data/iam/security-credentials/");
            if iam_role.is_none() {
                let role = fetch_iam_role(ctx, &list_url, token.as_deref());
                match role {
                    Some(role) => *iam_role = Some(role),
                    None => {
                        // No role answer means we are definitely not running
                        // on EC2 or an emulation of it.
                        return Err(Error::new(
                            ErrorKind::InvalidCredentials,
                            "no IAM role exposed by the instance metadata service",
                        )
                        .with_operation("imds"));
                    }
                }
            }
            format!("{list_url}{}", iam_role.as_deref().unwrap_or_default())
        }
    };

    let mut headers = Vec::new();
    if let Some(token) = &token {
        headers.push(("X-aws-ec2-metadata-token".to_string(), token.clone()));
    }
    let resp = ctx.fetch(&FetchRequest {
        method: "GET",
        url: &credentials_url,
        headers: &headers,
        timeout: None,
    });
    if !resp.is_success() {
        return Err(Error::new(
            ErrorKind::InvalidCredentials,
            format!("request to the instance metadata service failed: {}", resp.text()),
        )
        .with_operation("imds"));
    }

    let doc: InstanceCredentials = serde_json::from_slice(&resp.body).map_err(|err| {
        Error::new(ErrorKind::InvalidCredentials, "malformed metadata response")
            .with_operation("imds")
            .set_source(err)
    })?;

    if !doc.code.is_empty() && doc.code != "Success" {
        return Err(Error::new(
            ErrorKind::InvalidCredentials,
            format!("error retrieving credentials from the metadata service: {}", doc.code),
        )
        .with_operation("imds"));
    }
    if doc.access_key_id.is_empty() || doc.secret_access_key.is_empty() {
        return Err(Error::new(
            ErrorKind::InvalidCredentials,
            "metadata response carries no credentials",
        )
        .with_operation("imds"));
    }

    let mut cred = Credential::new(&doc.access_key_id, &doc.secret_access_key);
    if !doc.token.is_empty() {
        cred = cred.with_session_token(&doc.token);
    }
    match parse_iso8601(&doc.expiration) {
        Ok(expiration) => {
            debug!("storing instance credentials until {}", doc.expiration);
            cred = cred.with_expiration(expiration);
        }
        Err(err) => debug!("cannot parse credential expiration {}: {err}", doc.expiration),
    }
    Ok(cred)
}

/// Get an IMDSv2 session token, or `None` to fall back to IMDSv1.
fn fetch_imdsv2_token(ctx: &Context, root: &str) -> Option<String> {
    let url = format!("{root}/latest/api/token");
    let headers = vec![(
        "X-aws-ec2-metadata-token-ttl-seconds".to_string(),
        "10".to_string(),
    )];
    let resp = ctx.fetch(&FetchRequest {
        method: "PUT",
        url: &url,
        headers: &headers,
        timeout: Some(IMDS_TIMEOUT),
    });
    if resp.is_success() {
        return Some(resp.text());
    }

    // The token endpoint does not answer inside containers without host
    // networking even though the rest of IMDS does; detect that situation to
    // give a usable hint before trying IMDSv1.
    if resp.timed_out() {
        let probe = ctx.fetch(&FetchRequest {
            method: "GET",
            url: &format!("{root}/latest/meta-data"),
            headers: &[],
            timeout: Some(IMDS_TIMEOUT),
        });
        if probe.is_success() {
            if std::path::Path::new("/.dockerenv").exists() {
                debug!(
                    "IMDSv2 token request timed out but /latest/meta-data succeeded; \
                     trying IMDSv1. Try running your Docker container with --network=host."
                );
            } else {
                debug!(
                    "IMDSv2 token request timed out but /latest/meta-data succeeded; \
                     trying IMDSv1. Are you running inside a container that has no host \
                     networking?"
                );
            }
        }
    }
    None
}

/// Discover the IAM role name attached to the instance; `None` when the
/// endpoint does not answer.
fn fetch_iam_role(ctx: &Context, list_url: &str, token: Option<&str>) -> Option<String> {
    let mut headers = Vec::new();
    if let Some(token) = token {
        headers.push(("X-aws-ec2-metadata-token".to_string(), token.to_string()));
    }
    let resp = ctx.fetch(&FetchRequest {
        method: "GET",
        url: list_url,
        headers: &headers,
        timeout: Some(IMDS_TIMEOUT),
    });
    if !resp.is_success() {
        return None;
    }
    let role = resp.text().trim().to_string();
    if role.is_empty() {
        None
    } else {
        Some(role)
    }
}

/// Cheap host heuristic to avoid the network probe on machines that cannot
/// be EC2 instances. Disabled with `CPL_AWS_AUTODETECT_EC2=NO`.
#[cfg(target_os = "linux")]
fn is_machine_potentially_ec2_instance(ctx: &Context) -> bool {
    if !ctx.get_bool_option(CPL_AWS_AUTODETECT_EC2, true) {
        return true;
    }

    // Older Xen hypervisor instances expose a uuid starting with "ec2".
    // The file does not exist on Nitro instances.
    if let Ok(uuid) = std::fs::read_to_string("/sys/hypervisor/uuid") {
        return uuid.to_ascii_lowercase().starts_with("ec2");
    }

    // Nitro instances expose the DMI system vendor. The file may exist on
    // Xen instances with another value, which settles the answer too.
    if let Ok(vendor) = std::fs::read_to_string("/sys/devices/virtual/dmi/id/sys_vendor") {
        return vendor.starts_with("Amazon EC2");
    }

    // No usable marker; let the network probe decide.
    true
}

#[cfg(all(not(target_os = "linux"), target_os = "windows"))]
fn is_machine_potentially_ec2_instance(_ctx: &Context) -> bool {
    // No cheap marker available here; let the network probe decide.
    true
}

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
fn is_machine_potentially_ec2_instance(_ctx: &Context) -> bool {
    // EC2 instances are only Linux or Windows.
    false
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct InstanceCredentials {
    access_key_id: String,
    secret_access_key: String,
    token: String,
    expiration: String,

    code: String,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fetch::testing::TestFetch;
    use crate::options::Options;

    const INSTANCE_CREDENTIALS: &str = r#"{
  "Code" : "Success",
  "LastUpdated" : "2017-07-03T16:20:17Z",
  "Type" : "AWS-HMAC",
  "AccessKeyId" : "imds_access_key_id",
  "SecretAccessKey" : "imds_secret_access_key",
  "Token" : "imds_token",
  "Expiration" : "2030-01-01T00:00:00Z"
}"#;

    fn imds_options() -> Options {
        Options::new().with(CPL_AWS_AUTODETECT_EC2, "NO")
    }

    #[test]
    fn test_imdsv2_flow() {
        let _ = env_logger::builder().is_test(true).try_init();

        let fetch = Arc::new(
            TestFetch::new()
                .reply("/latest/api/token", 200, "IMDS_TOKEN")
                .reply("/iam/security-credentials/r1", 200, INSTANCE_CREDENTIALS)
                .reply("/iam/security-credentials/", 200, "r1\n"),
        );
        let ctx = Context::new(imds_options(), Box::new(fetch.clone()));

        let mut iam_role = None;
        temp_env::with_var_unset(AWS_CONTAINER_CREDENTIALS_RELATIVE_URI, || {
            let cred = fetch_credentials(&ctx, &mut iam_role).expect("must succeed");
            assert_eq!(cred.access_key_id(), "imds_access_key_id");
            assert_eq!(cred.session_token(), Some("imds_token"));
            assert!(cred.expiration().is_some());
        });
        assert_eq!(iam_role.as_deref(), Some("r1"));
        assert_eq!(fetch.calls_matching("/latest/api/token"), 1);

        // The discovered role short-circuits discovery on the next fetch.
        temp_env::with_var_unset(AWS_CONTAINER_CREDENTIALS_RELATIVE_URI, || {
            fetch_credentials(&ctx, &mut iam_role).expect("must succeed");
        });
        assert_eq!(fetch.calls_matching("/iam/security-credentials/r1"), 2);
    }

    #[test]
    fn test_imdsv1_fallback_on_timeout() {
        let _ = env_logger::builder().is_test(true).try_init();

        let fetch = Arc::new(
            TestFetch::new()
                .reply_error("/latest/api/token", "Operation timed out after 1000 ms")
                .reply("/iam/security-credentials/r1", 200, INSTANCE_CREDENTIALS)
                .reply("/iam/security-credentials/", 200, "r1")
                .reply("/latest/meta-data", 200, "ami-id"),
        );
        let ctx = Context::new(imds_options(), Box::new(fetch.clone()));

        let mut iam_role = None;
        temp_env::with_var_unset(AWS_CONTAINER_CREDENTIALS_RELATIVE_URI, || {
            let cred = fetch_credentials(&ctx, &mut iam_role).expect("must succeed");
            assert_eq!(cred.access_key_id(), "imds_access_key_id");
        });
    }

    #[test]
    fn test_no_role_means_not_ec2() {
        let _ = env_logger::builder().is_test(true).try_init();

        let fetch = Arc::new(
            TestFetch::new()
                .reply("/latest/api/token", 200, "IMDS_TOKEN")
                .reply("/iam/security-credentials/", 200, ""),
        );
        let ctx = Context::new(imds_options(), Box::new(fetch));

        let mut iam_role = None;
        temp_env::with_var_unset(AWS_CONTAINER_CREDENTIALS_RELATIVE_URI, || {
            let err = fetch_credentials(&ctx, &mut iam_role).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidCredentials);
        });
        assert!(iam_role.is_none());
    }

    #[test]
    fn test_ecs_container_endpoint() {
        let _ = env_logger::builder().is_test(true).try_init();

        let fetch = Arc::new(TestFetch::new().reply(
            "169.254.170.2/v2/credentials",
            200,
            INSTANCE_CREDENTIALS,
        ));
        let ctx = Context::new(
            imds_options().with(AWS_CONTAINER_CREDENTIALS_RELATIVE_URI, "/v2/credentials"),
            Box::new(fetch.clone()),
        );

        let mut iam_role = None;
        let cred = fetch_credentials(&ctx, &mut iam_role).expect("must succeed");
        assert_eq!(cred.access_key_id(), "imds_access_key_id");

        // The ECS shortcut goes straight for the credentials.
        assert_eq!(fetch.calls_matching("/latest/api/token"), 0);
        assert!(iam_role.is_none());
    }
}
