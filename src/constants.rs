use percent_encoding::percent_encode;
use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;

// Headers used in S3/STS requests.
pub const X_AMZ_CONTENT_SHA_256: &str = "x-amz-content-sha256";
pub const X_AMZ_DATE: &str = "x-amz-date";
pub const X_AMZ_SECURITY_TOKEN: &str = "x-amz-security-token";
pub const X_AMZ_REQUEST_PAYER: &str = "x-amz-request-payer";
pub const X_AMZ_BUCKET_REGION: &str = "x-amz-bucket-region";

// Option/env keys.
pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
pub const AWS_NO_SIGN_REQUEST: &str = "AWS_NO_SIGN_REQUEST";
pub const AWS_REGION: &str = "AWS_REGION";
pub const AWS_DEFAULT_REGION: &str = "AWS_DEFAULT_REGION";
pub const AWS_PROFILE: &str = "AWS_PROFILE";
pub const AWS_DEFAULT_PROFILE: &str = "AWS_DEFAULT_PROFILE";
pub const AWS_CONFIG_FILE: &str = "AWS_CONFIG_FILE";
pub const CPL_AWS_CREDENTIALS_FILE: &str = "CPL_AWS_CREDENTIALS_FILE";
pub const AWS_S3_ENDPOINT: &str = "AWS_S3_ENDPOINT";
pub const AWS_HTTPS: &str = "AWS_HTTPS";
pub const AWS_VIRTUAL_HOSTING: &str = "AWS_VIRTUAL_HOSTING";
pub const AWS_REQUEST_PAYER: &str = "AWS_REQUEST_PAYER";
pub const AWS_ROLE_ARN: &str = "AWS_ROLE_ARN";
pub const AWS_ROLE_SESSION_NAME: &str = "AWS_ROLE_SESSION_NAME";
pub const AWS_WEB_IDENTITY_TOKEN_FILE: &str = "AWS_WEB_IDENTITY_TOKEN_FILE";
pub const AWS_STS_REGIONAL_ENDPOINTS: &str = "AWS_STS_REGIONAL_ENDPOINTS";
pub const AWS_STS_REGION: &str = "AWS_STS_REGION";
pub const AWS_STS_ENDPOINT: &str = "AWS_STS_ENDPOINT";
pub const AWS_TIMESTAMP: &str = "AWS_TIMESTAMP";
pub const AWS_CONTAINER_CREDENTIALS_RELATIVE_URI: &str = "AWS_CONTAINER_CREDENTIALS_RELATIVE_URI";
pub const CPL_AWS_STS_ROOT_URL: &str = "CPL_AWS_STS_ROOT_URL";
pub const CPL_AWS_EC2_API_ROOT_URL: &str = "CPL_AWS_EC2_API_ROOT_URL";
pub const CPL_AWS_AUTODETECT_EC2: &str = "CPL_AWS_AUTODETECT_EC2";
pub const CPL_AWS_WEB_IDENTITY_ENABLE: &str = "CPL_AWS_WEB_IDENTITY_ENABLE";

// Defaults.
pub const DEFAULT_S3_ENDPOINT: &str = "s3.amazonaws.com";
pub const DEFAULT_STS_ENDPOINT: &str = "sts.amazonaws.com";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const EC2_METADATA_ROOT_URL: &str = "http://169.254.169.254";
pub const ECS_CREDENTIALS_ROOT_URL: &str = "http://169.254.170.2";
pub const STS_API_VERSION: &str = "2011-06-15";
pub const DEFAULT_ROLE_SESSION_NAME: &str = "s3sign-session";

pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Bytes escaped by AWS canonical encoding. The unreserved set is
/// `A-Z a-z 0-9 _ - ~ .`; everything else, `/` included, becomes `%XX`.
const AWS_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'-')
    .remove(b'~')
    .remove(b'.');

/// Same set with `/` kept literal, for canonical URI paths.
const AWS_ENCODE_SET_KEEP_SLASH: AsciiSet = AWS_ENCODE_SET.remove(b'/');

/// Percent-encode `input` following the AWS canonical rules.
///
/// The input is treated as raw bytes; `/` is preserved unless `encode_slash`.
pub fn url_encode(input: &str, encode_slash: bool) -> String {
    let set = if encode_slash {
        &AWS_ENCODE_SET
    } else {
        &AWS_ENCODE_SET_KEEP_SLASH
    };
    percent_encode(input.as_bytes(), set).to_string()
}
