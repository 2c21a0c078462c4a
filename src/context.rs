//! Process-wide state.
//!
//! The original design kept the credential cache and the per-bucket
//! parameters in file-level globals; here they live in a [`Context`] so that
//! tests (and embedders) can run several isolated instances side by side. A
//! default instance is still available through [`Context::global`].

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;

use once_cell::sync::Lazy;

use crate::constants::AWS_TIMESTAMP;
use crate::credential::AssumedRoleSpec;
use crate::credential::Credential;
use crate::credential::WebIdentitySpec;
use crate::fetch::FetchRequest;
use crate::fetch::FetchResponse;
use crate::fetch::HttpFetch;
use crate::fetch::UreqFetch;
use crate::options::Options;
use crate::time;
use crate::time::DateTime;

/// Endpoint parameters learned for one bucket.
#[derive(Clone, Debug)]
pub struct BucketParams {
    /// Signing region for the bucket.
    pub region: String,
    /// Endpoint host serving the bucket.
    pub endpoint: String,
    /// Whether the bucket is addressed with virtual hosting.
    pub virtual_hosting: bool,
}

/// The cached credential state, guarded by one mutex in [`Context`].
#[derive(Default)]
pub(crate) struct CredentialCache {
    /// Live temporary credentials, reused until one minute before expiry.
    pub(crate) credential: Option<Credential>,
    /// How to refresh assumed-role credentials.
    pub(crate) assumed_role: Option<AssumedRoleSpec>,
    /// How to refresh web-identity credentials.
    pub(crate) web_identity: Option<WebIdentitySpec>,
    /// IAM role name discovered from the instance metadata service.
    pub(crate) iam_role: Option<String>,
    /// Region recorded alongside assumed-role credentials.
    pub(crate) region: Option<String>,
}

/// Shared environment: options, fetch primitive and both caches.
pub struct Context {
    options: RwLock<Options>,
    fetch: Box<dyn HttpFetch>,
    pub(crate) cache: Mutex<CredentialCache>,
    bucket_params: Mutex<HashMap<String, BucketParams>>,
}

static GLOBAL: Lazy<Arc<Context>> = Lazy::new(|| {
    Arc::new(Context::new(
        Options::default(),
        Box::new(UreqFetch::default()),
    ))
});

impl Context {
    /// Create an isolated context with its own options and fetcher.
    pub fn new(options: Options, fetch: Box<dyn HttpFetch>) -> Self {
        Self {
            options: RwLock::new(options),
            fetch,
            cache: Mutex::new(CredentialCache::default()),
            bucket_params: Mutex::new(HashMap::new()),
        }
    }

    /// The process-wide default context, reading options from the
    /// environment and fetching over HTTP.
    pub fn global() -> Arc<Context> {
        GLOBAL.clone()
    }

    /// Get an option value, overrides first, then environment.
    pub fn get_option(&self, key: &str) -> Option<String> {
        self.options.read().expect("lock poisoned").get(key)
    }

    /// Get an option value with a default.
    pub fn get_option_or(&self, key: &str, default: &str) -> String {
        self.options
            .read()
            .expect("lock poisoned")
            .get_or(key, default)
    }

    /// Get a boolean option.
    pub fn get_bool_option(&self, key: &str, default: bool) -> bool {
        self.options
            .read()
            .expect("lock poisoned")
            .get_bool(key, default)
    }

    /// Set an option override.
    pub fn set_option(&self, key: &str, value: &str) {
        self.options.write().expect("lock poisoned").set(key, value);
    }

    /// A snapshot of the current options.
    pub fn options(&self) -> Options {
        self.options.read().expect("lock poisoned").clone()
    }

    /// Run a request through the fetch primitive.
    pub fn fetch(&self, req: &FetchRequest) -> FetchResponse {
        self.fetch.fetch(req)
    }

    /// The current instant, or the fixed `AWS_TIMESTAMP` when configured.
    pub fn now(&self) -> DateTime {
        if let Some(stamp) = self.get_option(AWS_TIMESTAMP) {
            if let Ok(t) = time::parse_timestamp(&stamp) {
                return t;
            }
        }
        time::now()
    }

    /// Forget all cached credentials and bucket parameters.
    pub fn clear_cache(&self) {
        *self.cache.lock().expect("lock poisoned") = CredentialCache::default();
        self.bucket_params.lock().expect("lock poisoned").clear();
    }

    /// Adjusted parameters previously learned for `bucket`, if any.
    pub fn bucket_params(&self, bucket: &str) -> Option<BucketParams> {
        self.bucket_params
            .lock()
            .expect("lock poisoned")
            .get(bucket)
            .cloned()
    }

    /// Remember adjusted parameters for `bucket`.
    pub fn update_bucket_params(&self, bucket: &str, params: BucketParams) {
        self.bucket_params
            .lock()
            .expect("lock poisoned")
            .insert(bucket.to_string(), params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_honours_aws_timestamp() {
        let ctx = Context::new(
            Options::new().with(AWS_TIMESTAMP, "20130524T000000Z"),
            Box::new(UreqFetch::default()),
        );
        assert_eq!(time::format_timestamp(ctx.now()), "20130524T000000Z");
    }

    #[test]
    fn test_bucket_params_cleared_with_cache() {
        let ctx = Context::new(Options::new(), Box::new(UreqFetch::default()));
        ctx.update_bucket_params(
            "bucket",
            BucketParams {
                region: "eu-west-1".to_string(),
                endpoint: "s3.eu-west-1.amazonaws.com".to_string(),
                virtual_hosting: true,
            },
        );
        assert!(ctx.bucket_params("bucket").is_some());
        ctx.clear_cache();
        assert!(ctx.bucket_params("bucket").is_none());
    }
}
