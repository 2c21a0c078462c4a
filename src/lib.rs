//! SigV4 request signing and credential resolution for S3-compatible
//! object stores.
//!
//! This crate is the authentication core of a synchronous I/O stack: given a
//! logical `bucket/key` target it resolves AWS credentials from the usual
//! sources (environment, config files, assumed roles, web identity, instance
//! metadata), produces the headers or presigned query string required by AWS
//! Signature Version 4, and adapts to server-side redirect/region hints.
//!
//! # Example
//!
//! ```no_run
//! use s3sign::Context;
//! use s3sign::S3HandleHelper;
//!
//! fn main() -> s3sign::Result<()> {
//!     // The global context resolves credentials from the environment.
//!     let ctx = Context::global();
//!     let mut handle = S3HandleHelper::from_uri(&ctx, "mybucket/path/to/key.tif", false)?;
//!     // Headers for a GET with an empty payload.
//!     for (name, value) in handle.get_headers("GET", &[], b"") {
//!         println!("{name}: {value}");
//!     }
//!     println!("-> {}", handle.url());
//!     Ok(())
//! }
//! ```
//!
//! HTTP transport stays outside: the caller sends the request itself and, on
//! a 3xx/4xx AWS error, feeds the response body back through
//! [`S3HandleHelper::can_restart_on_error`] to decide whether a retry with
//! the adjusted handle is worthwhile.

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod credential;
pub mod error;
pub mod fetch;
pub mod handle;
pub mod options;
pub mod time;
pub mod v4;

pub(crate) mod chain;
pub(crate) mod constants;
pub(crate) mod dirs;
pub(crate) mod hash;
pub(crate) mod imds;
pub(crate) mod sts;

pub use constants::url_encode;
pub use context::BucketParams;
pub use context::Context;
pub use credential::AssumedRoleSpec;
pub use credential::Credential;
pub use credential::CredentialsSource;
pub use credential::WebIdentitySpec;
pub use error::Error;
pub use error::ErrorKind;
pub use error::Result;
pub use fetch::FetchRequest;
pub use fetch::FetchResponse;
pub use fetch::HttpFetch;
pub use fetch::UreqFetch;
pub use handle::S3HandleHelper;
pub use handle::S3LikeHandleHelper;
pub use handle::SignedUrlOptions;
pub use options::Options;
