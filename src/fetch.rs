//! The HTTP fetch primitive.
//!
//! Transport is out of scope for this crate: everything network-facing goes
//! through [`HttpFetch`], a blocking primitive that returns status, body
//! bytes and an error text, nothing more. The default implementation is a
//! [`ureq::Agent`]; tests substitute recording stubs.

use std::time::Duration;

use http::StatusCode;
use log::debug;

/// A request for the fetch primitive.
pub struct FetchRequest<'a> {
    /// HTTP verb, e.g. `GET` or `PUT`.
    pub method: &'a str,
    /// Absolute URL.
    pub url: &'a str,
    /// Headers as ordered `name: value` pairs.
    pub headers: &'a [(String, String)],
    /// Per-request timeout; transport default when `None`.
    pub timeout: Option<Duration>,
}

impl<'a> FetchRequest<'a> {
    /// A GET request with no headers and default timeout.
    pub fn get(url: &'a str) -> Self {
        FetchRequest {
            method: "GET",
            url,
            headers: &[],
            timeout: None,
        }
    }
}

/// The outcome of a fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    /// HTTP status code; 0 when the transport failed before a response.
    pub status: u16,
    /// Response body bytes.
    pub body: Vec<u8>,
    /// Transport error text, if any.
    pub error: Option<String>,
}

impl FetchResponse {
    /// True when the transport succeeded with a 2xx status.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
            && StatusCode::from_u16(self.status)
                .map(|s| s.is_success())
                .unwrap_or(false)
    }

    /// Body as text, lossy.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// True when the transport error looks like a connect/read timeout.
    pub fn timed_out(&self) -> bool {
        self.error
            .as_deref()
            .map(|e| e.contains("timed out") || e.contains("timeout"))
            .unwrap_or(false)
    }
}

/// Blocking HTTP fetch primitive.
pub trait HttpFetch: Send + Sync {
    /// Perform the request and report the outcome.
    ///
    /// Transport failures are reported in [`FetchResponse::error`], never as
    /// a panic; HTTP error statuses are regular responses.
    fn fetch(&self, req: &FetchRequest) -> FetchResponse;
}

/// Default fetch implementation over a shared [`ureq::Agent`].
pub struct UreqFetch {
    agent: ureq::Agent,
}

impl Default for UreqFetch {
    fn default() -> Self {
        Self {
            agent: ureq::Agent::new(),
        }
    }
}

impl HttpFetch for UreqFetch {
    fn fetch(&self, req: &FetchRequest) -> FetchResponse {
        let mut r = self.agent.request(req.method, req.url);
        if let Some(timeout) = req.timeout {
            r = r.timeout(timeout);
        }
        for (name, value) in req.headers {
            r = r.set(name, value);
        }

        let read_body = |resp: ureq::Response| -> FetchResponse {
            let status = resp.status();
            let mut body = Vec::new();
            use std::io::Read;
            if let Err(err) = resp.into_reader().read_to_end(&mut body) {
                return FetchResponse {
                    status: 0,
                    body: Vec::new(),
                    error: Some(err.to_string()),
                };
            }
            FetchResponse {
                status,
                body,
                error: None,
            }
        };

        match r.call() {
            Ok(resp) => read_body(resp),
            Err(ureq::Error::Status(_, resp)) => read_body(resp),
            Err(ureq::Error::Transport(t)) => {
                debug!("fetch {} {} failed: {t}", req.method, req.url);
                FetchResponse {
                    status: 0,
                    body: Vec::new(),
                    error: Some(t.to_string()),
                }
            }
        }
    }
}
