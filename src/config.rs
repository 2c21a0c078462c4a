//! AWS shared config and credentials files.
//!
//! Reads the INI-style `~/.aws/credentials` and `~/.aws/config` pair the way
//! the AWS CLI documents them: profile sections (`[name]` in the credentials
//! file, `[name]` or `[profile name]` in the config file), `key = value`
//! entries, and credentials-file precedence on conflicts.

use ini::Ini;
use log::debug;
use log::warn;

use crate::constants::*;
use crate::dirs::expand_homedir;
use crate::options::Options;

/// Values gathered from the config/credentials file pair for one profile.
#[derive(Clone, Debug, Default)]
pub struct FileConfig {
    /// `aws_access_key_id` from either file.
    pub access_key_id: Option<String>,
    /// `aws_secret_access_key` from either file.
    pub secret_access_key: Option<String>,
    /// `aws_session_token` from either file.
    pub session_token: Option<String>,
    /// `region` from the config file.
    pub region: Option<String>,
    /// `role_arn` from the config file.
    pub role_arn: Option<String>,
    /// `source_profile` from the config file.
    pub source_profile: Option<String>,
    /// `external_id` from the config file.
    pub external_id: Option<String>,
    /// `mfa_serial` from the config file.
    pub mfa_serial: Option<String>,
    /// `role_session_name` from the config file.
    pub role_session_name: Option<String>,
    /// `web_identity_token_file` from the config file.
    pub web_identity_token_file: Option<String>,
    /// Path of the credentials file that was consulted, for diagnostics.
    pub credentials_path: String,
}

impl FileConfig {
    /// Both halves of a static key pair are present.
    pub fn has_key_pair(&self) -> bool {
        self.access_key_id.is_some() && self.secret_access_key.is_some()
    }

    /// Whether this lookup produced something the credential chain can act
    /// on: a key pair, a role to assume via a source profile, or (for an
    /// explicitly requested profile) a role plus a web identity token file.
    pub fn is_usable(&self, explicit_profile: bool) -> bool {
        self.has_key_pair()
            || (self.role_arn.is_some() && self.source_profile.is_some())
            || (explicit_profile
                && self.role_arn.is_some()
                && self.web_identity_token_file.is_some())
    }
}

/// Profile selection: caller, `AWS_DEFAULT_PROFILE`, `AWS_PROFILE`, `default`.
pub(crate) fn profile_name(opts: &Options, explicit: Option<&str>) -> String {
    if let Some(name) = explicit {
        return name.to_string();
    }
    opts.get(AWS_DEFAULT_PROFILE)
        .or_else(|| opts.get(AWS_PROFILE))
        .unwrap_or_else(|| "default".to_string())
}

pub(crate) fn credentials_file_path(opts: &Options) -> String {
    let path = opts
        .get(CPL_AWS_CREDENTIALS_FILE)
        .unwrap_or_else(|| "~/.aws/credentials".to_string());
    expand_homedir(&path).unwrap_or(path)
}

/// Returns the config file path and whether it was explicitly configured.
fn config_file_path(opts: &Options) -> (String, bool) {
    match opts.get(AWS_CONFIG_FILE) {
        Some(path) => {
            let expanded = expand_homedir(&path).unwrap_or(path);
            (expanded, true)
        }
        None => {
            let path = "~/.aws/config".to_string();
            (expand_homedir(&path).unwrap_or(path), false)
        }
    }
}

/// Read `aws_access_key_id`/`aws_secret_access_key`/`aws_session_token` for
/// `profile` from a shared credentials file.
pub(crate) fn read_shared_credentials(
    path: &str,
    profile: &str,
) -> (Option<String>, Option<String>, Option<String>) {
    let conf = match Ini::load_from_file(path) {
        Ok(v) => v,
        Err(err) => {
            debug!("cannot read credentials file {path}: {err}");
            return (None, None, None);
        }
    };

    let props = match conf.section(Some(profile)) {
        Some(v) => v,
        None => {
            debug!("profile [{profile}] not found in {path}");
            return (None, None, None);
        }
    };

    (
        props.get("aws_access_key_id").map(str::to_string),
        props.get("aws_secret_access_key").map(str::to_string),
        props.get("aws_session_token").map(str::to_string),
    )
}

/// The credentials file wins on conflicts; warn when both files disagree.
fn update_and_warn(
    key: &str,
    current: &mut Option<String>,
    new_value: &str,
    credentials_path: &str,
    config_path: &str,
) {
    match current {
        None => *current = Some(new_value.to_string()),
        Some(existing) if existing != new_value => {
            warn!(
                "{key} defined in both {credentials_path} and {config_path}. \
                 The one of {credentials_path} will be used"
            );
        }
        _ => {}
    }
}

/// Load the configuration of `profile` (or the selected default profile)
/// from the credentials and config files.
pub fn load(opts: &Options, profile: Option<&str>) -> FileConfig {
    let profile = profile_name(opts, profile);
    let mut cfg = FileConfig {
        credentials_path: credentials_file_path(opts),
        ..Default::default()
    };

    let (ak, sk, token) = read_shared_credentials(&cfg.credentials_path, &profile);
    cfg.access_key_id = ak;
    cfg.secret_access_key = sk;
    cfg.session_token = token;

    let (config_path, explicitly_configured) = config_file_path(opts);
    let conf = match Ini::load_from_file(&config_path) {
        Ok(v) => v,
        Err(err) => {
            if explicitly_configured {
                warn!("{config_path} does not exist or cannot be open: {err}");
            } else {
                debug!("cannot read config file {config_path}: {err}");
            }
            return cfg;
        }
    };

    // The section name is nominally [profile foo] for non default profiles,
    // but accept the bare form too.
    let props = conf
        .section(Some(profile.as_str()))
        .or_else(|| conf.section(Some(format!("profile {profile}"))));
    let props = match props {
        Some(v) => v,
        None => {
            debug!("profile [{profile}] not found in {config_path}");
            return cfg;
        }
    };

    for (key, value) in props.iter() {
        match key.to_ascii_lowercase().as_str() {
            "aws_access_key_id" => update_and_warn(
                key,
                &mut cfg.access_key_id,
                value,
                &cfg.credentials_path,
                &config_path,
            ),
            "aws_secret_access_key" => update_and_warn(
                key,
                &mut cfg.secret_access_key,
                value,
                &cfg.credentials_path,
                &config_path,
            ),
            "aws_session_token" => update_and_warn(
                key,
                &mut cfg.session_token,
                value,
                &cfg.credentials_path,
                &config_path,
            ),
            "region" => cfg.region = Some(value.to_string()),
            "role_arn" => cfg.role_arn = Some(value.to_string()),
            "source_profile" => cfg.source_profile = Some(value.to_string()),
            "external_id" => cfg.external_id = Some(value.to_string()),
            "mfa_serial" => cfg.mfa_serial = Some(value.to_string()),
            "role_session_name" => cfg.role_session_name = Some(value.to_string()),
            "web_identity_token_file" => {
                cfg.web_identity_token_file = Some(value.to_string())
            }
            _ => {}
        }
    }

    cfg
}
