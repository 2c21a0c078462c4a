//! Error kinds surfaced to callers.

use std::fmt::Debug;
use std::fmt::{self, Display, Formatter};

/// Result that is a wrapper of `Result<T, s3sign::Error>`
pub type Result<T> = std::result::Result<T, Error>;

/// ErrorKind is all kinds of Error of s3sign.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// No credential source yielded usable credentials.
    InvalidCredentials,
    /// AWS answered `AccessDenied`.
    AccessDenied,
    /// AWS answered `NoSuchBucket`.
    BucketNotFound,
    /// AWS answered `NoSuchKey`.
    ObjectNotFound,
    /// AWS answered `SignatureDoesNotMatch`.
    SignatureDoesNotMatch,
    /// Any other AWS-reported error, or an AWS response we could not parse.
    AwsError,
    /// Malformed input or configuration on our side.
    AppDefined,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidCredentials => write!(f, "InvalidCredentials"),
            ErrorKind::AccessDenied => write!(f, "AccessDenied"),
            ErrorKind::BucketNotFound => write!(f, "BucketNotFound"),
            ErrorKind::ObjectNotFound => write!(f, "ObjectNotFound"),
            ErrorKind::SignatureDoesNotMatch => write!(f, "SignatureDoesNotMatch"),
            ErrorKind::AwsError => write!(f, "AwsError"),
            ErrorKind::AppDefined => write!(f, "AppDefined"),
        }
    }
}

/// Errors that returned by s3sign.
pub struct Error {
    kind: ErrorKind,
    message: String,
    operation: &'static str,
    source: Option<anyhow::Error>,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.operation.is_empty() {
            write!(f, " at {}", self.operation)?;
        }

        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }

        if let Some(source) = &self.source {
            write!(f, ", source: {source}")?;
        }

        Ok(())
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // If alternate has been specified, we will print like Debug.
        if f.alternate() {
            let mut de = f.debug_struct("Error");
            de.field("kind", &self.kind);
            de.field("message", &self.message);
            de.field("operation", &self.operation);
            de.field("source", &self.source);
            return de.finish();
        }

        write!(f, "{}", self)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|v| v.as_ref())
    }
}

impl Error {
    /// Create a new Error with error kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),

            operation: "",
            source: None,
        }
    }

    /// Update error's operation.
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        self.operation = operation;
        self
    }

    /// Set source for error.
    pub fn set_source(mut self, src: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.source.is_none(), "the source error has been set");

        self.source = Some(src.into());
        self
    }

    /// Return error's kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Return error's message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self {
            kind: ErrorKind::AppDefined,
            message: "reading fs failed".to_string(),

            operation: "io",
            source: Some(err.into()),
        }
    }
}
