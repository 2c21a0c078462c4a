//! Ordered credential resolution.
//!
//! Sources are tried in a fixed order, stopping at the first that yields
//! credentials: unsigned mode, explicit keys, the cached assumed role, the
//! config/credentials files (including `source_profile` delegation and web
//! identity), web identity from the environment, and finally the instance
//! metadata services. A source that fails only moves the chain forward.

use log::debug;
use log::warn;

use crate::config;
use crate::constants::*;
use crate::context::Context;
use crate::context::CredentialCache;
use crate::credential::AssumedRoleSpec;
use crate::credential::Credential;
use crate::credential::CredentialsSource;
use crate::credential::WebIdentitySpec;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::error::Result;
use crate::imds;
use crate::sts;

/// The outcome of a successful resolution.
#[derive(Debug)]
pub(crate) struct Resolved {
    pub(crate) credential: Credential,
    /// Region learned from the config files or the cache, if any.
    pub(crate) region: Option<String>,
    pub(crate) source: CredentialsSource,
}

/// Resolve credentials, stopping at the first source that yields some.
pub(crate) fn resolve(ctx: &Context) -> Result<Resolved> {
    // Unsigned mode: empty credentials, requests go out without a signature.
    if ctx.get_bool_option(AWS_NO_SIGN_REQUEST, false) {
        return Ok(Resolved {
            credential: Credential::default(),
            region: None,
            source: CredentialsSource::Static,
        });
    }

    // Explicit keys from options or environment.
    if let Some(secret_access_key) = ctx.get_option(AWS_SECRET_ACCESS_KEY) {
        let access_key_id = ctx.get_option(AWS_ACCESS_KEY_ID).ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidCredentials,
                "AWS_ACCESS_KEY_ID configuration option not defined",
            )
        })?;
        let mut credential = Credential::new(&access_key_id, &secret_access_key);
        if let Some(token) = ctx.get_option(AWS_SESSION_TOKEN) {
            credential = credential.with_session_token(&token);
        }
        return Ok(Resolved {
            credential,
            region: None,
            source: CredentialsSource::Static,
        });
    }

    // A role assumed earlier refreshes from its recorded spec.
    {
        let mut cache = ctx.cache.lock().expect("lock poisoned");
        if cache.assumed_role.is_some() {
            match assumed_role_credentials(ctx, &mut cache, false) {
                Ok(credential) => {
                    return Ok(Resolved {
                        credential,
                        region: cache.region.clone(),
                        source: CredentialsSource::AssumedRole,
                    })
                }
                Err(err) => debug!("refreshing cached assumed role failed: {err}"),
            }
        }
    }

    // The config/credentials file pair.
    let options = ctx.options();
    let cfg = config::load(&options, None);
    let credentials_path = cfg.credentials_path.clone();
    if cfg.is_usable(false) {
        if cfg.has_key_pair() {
            let mut credential = Credential::new(
                cfg.access_key_id.as_deref().unwrap_or_default(),
                cfg.secret_access_key.as_deref().unwrap_or_default(),
            );
            if let Some(token) = &cfg.session_token {
                credential = credential.with_session_token(token);
            }
            return Ok(Resolved {
                credential,
                region: cfg.region,
                source: CredentialsSource::Static,
            });
        }

        if let (Some(role_arn), Some(source_profile)) =
            (cfg.role_arn.clone(), cfg.source_profile.clone())
        {
            // The source profile either delegates to a web identity token or
            // holds plain keys in the credentials file.
            let source_cfg = config::load(&options, Some(&source_profile));
            let mut web_identity = None;
            let source_credentials = match (
                source_cfg.role_arn.clone(),
                source_cfg.web_identity_token_file.clone(),
            ) {
                (Some(source_role_arn), Some(token_file)) => {
                    let token = read_web_identity_token_file(&token_file)?;
                    let credential = sts::assume_role_with_web_identity(
                        ctx,
                        &source_role_arn,
                        &token,
                        &sts::root_url(ctx),
                    )?;
                    web_identity = Some(WebIdentitySpec {
                        role_arn: source_role_arn,
                        token_file,
                    });
                    credential
                }
                _ => {
                    let (ak, sk, token) =
                        config::read_shared_credentials(&credentials_path, &source_profile);
                    match (ak, sk) {
                        (Some(ak), Some(sk)) => {
                            let mut credential = Credential::new(&ak, &sk);
                            if let Some(token) = token {
                                credential = credential.with_session_token(&token);
                            }
                            credential
                        }
                        _ => {
                            return Err(Error::new(
                                ErrorKind::InvalidCredentials,
                                format!(
                                    "cannot retrieve credentials for source profile {source_profile}"
                                ),
                            ))
                        }
                    }
                }
            };

            let spec = AssumedRoleSpec {
                role_arn,
                external_id: cfg.external_id.clone(),
                mfa_serial: cfg.mfa_serial.clone(),
                role_session_name: cfg.role_session_name.clone(),
                source_credentials,
            };
            let credential = sts::assume_role(ctx, &spec)?;
            debug!("using assumed role {}", spec.role_arn);

            let mut cache = ctx.cache.lock().expect("lock poisoned");
            cache.assumed_role = Some(spec);
            cache.web_identity = web_identity;
            cache.credential = Some(credential.clone());
            cache.region = cfg.region.clone();
            return Ok(Resolved {
                credential,
                region: cfg.region,
                source: CredentialsSource::AssumedRole,
            });
        }
    }

    // Web identity driven directly by options/environment.
    if ctx.get_bool_option(CPL_AWS_WEB_IDENTITY_ENABLE, true) {
        let mut cache = ctx.cache.lock().expect("lock poisoned");
        match web_identity_credentials(ctx, &mut cache, false, None, None) {
            Ok(Some(credential)) => {
                return Ok(Resolved {
                    credential,
                    region: None,
                    source: CredentialsSource::WebIdentity,
                })
            }
            Ok(None) => {}
            Err(err) => debug!("loading web identity credentials failed: {err}"),
        }
    }

    // Last source: instance metadata.
    {
        let mut cache = ctx.cache.lock().expect("lock poisoned");
        match ec2_credentials(ctx, &mut cache, false) {
            Ok(credential) => {
                return Ok(Resolved {
                    credential,
                    region: None,
                    source: CredentialsSource::Ec2,
                })
            }
            Err(err) => debug!("loading instance metadata credentials failed: {err}"),
        }
    }

    Err(Error::new(
        ErrorKind::InvalidCredentials,
        format!(
            "AWS_SECRET_ACCESS_KEY and AWS_NO_SIGN_REQUEST configuration options not defined, \
             and {credentials_path} not filled"
        ),
    ))
}

/// Refresh the credentials of a dynamic source, reusing the cache when it is
/// still valid. Returns `None` when nothing could be refreshed; callers keep
/// whatever they already hold.
pub(crate) fn refresh(
    ctx: &Context,
    source: CredentialsSource,
    force: bool,
) -> Option<Credential> {
    let mut cache = ctx.cache.lock().expect("lock poisoned");
    let refreshed = match source {
        CredentialsSource::Static => return None,
        CredentialsSource::AssumedRole => assumed_role_credentials(ctx, &mut cache, force),
        CredentialsSource::WebIdentity => {
            match web_identity_credentials(ctx, &mut cache, force, None, None) {
                Ok(Some(credential)) => Ok(credential),
                Ok(None) => Err(Error::new(
                    ErrorKind::InvalidCredentials,
                    "web identity options are no longer set",
                )),
                Err(err) => Err(err),
            }
        }
        CredentialsSource::Ec2 => ec2_credentials(ctx, &mut cache, force),
    };

    match refreshed {
        Ok(credential) => Some(credential),
        Err(err) => {
            warn!("refreshing credentials failed: {err}");
            None
        }
    }
}

/// Reuse or refresh the temporary credentials of the cached assumed role.
fn assumed_role_credentials(
    ctx: &Context,
    cache: &mut CredentialCache,
    force: bool,
) -> Result<Credential> {
    if !force {
        if let Some(credential) = &cache.credential {
            if credential.is_valid_at(ctx.now()) {
                return Ok(credential.clone());
            }
        }
    }

    // When the role chains off a web identity, its source credentials have
    // to be renewed first.
    if let Some(web_identity) = cache.web_identity.clone() {
        let token = read_web_identity_token_file(&web_identity.token_file)?;
        let source_credentials = sts::assume_role_with_web_identity(
            ctx,
            &web_identity.role_arn,
            &token,
            &sts::root_url(ctx),
        )?;
        if let Some(spec) = cache.assumed_role.as_mut() {
            spec.source_credentials = source_credentials;
        }
    }

    let spec = cache.assumed_role.clone().ok_or_else(|| {
        Error::new(ErrorKind::InvalidCredentials, "no assumed role to refresh")
    })?;
    let credential = sts::assume_role(ctx, &spec)?;
    cache.credential = Some(credential.clone());
    Ok(credential)
}

/// Reuse or refresh credentials from `AssumeRoleWithWebIdentity`.
///
/// `Ok(None)` means the web identity options are not set at all.
fn web_identity_credentials(
    ctx: &Context,
    cache: &mut CredentialCache,
    force: bool,
    role_arn: Option<&str>,
    token_file: Option<&str>,
) -> Result<Option<Credential>> {
    let role_arn = role_arn
        .map(str::to_string)
        .or_else(|| ctx.get_option(AWS_ROLE_ARN));
    let token_file = token_file
        .map(str::to_string)
        .or_else(|| ctx.get_option(AWS_WEB_IDENTITY_TOKEN_FILE));
    let (role_arn, token_file) = match (role_arn, token_file) {
        (Some(role_arn), Some(token_file)) => (role_arn, token_file),
        _ => return Ok(None),
    };

    if !force {
        if let Some(credential) = &cache.credential {
            if credential.is_valid_at(ctx.now()) {
                return Ok(Some(credential.clone()));
            }
        }
    }

    let token = read_web_identity_token_file(&token_file)?;
    let credential =
        sts::assume_role_with_web_identity(ctx, &role_arn, &token, &sts::root_url(ctx))?;
    cache.credential = Some(credential.clone());
    Ok(Some(credential))
}

/// Reuse or refresh instance metadata credentials.
fn ec2_credentials(
    ctx: &Context,
    cache: &mut CredentialCache,
    force: bool,
) -> Result<Credential> {
    if !force {
        if let Some(credential) = &cache.credential {
            if credential.is_valid_at(ctx.now()) {
                return Ok(credential.clone());
            }
        }
    }

    let credential = imds::fetch_credentials(ctx, &mut cache.iam_role)?;
    cache.credential = Some(credential.clone());
    Ok(credential)
}

fn read_web_identity_token_file(path: &str) -> Result<String> {
    let mut token = std::fs::read_to_string(path)?;
    // Strip one trailing end-of-line.
    if token.ends_with('\n') {
        token.pop();
        if token.ends_with('\r') {
            token.pop();
        }
    }
    if token.is_empty() {
        return Err(Error::new(
            ErrorKind::InvalidCredentials,
            format!("{path} is empty"),
        ));
    }
    Ok(token)
}
