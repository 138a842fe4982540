use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, TransportError};

/// The parts of an HTTP response that matter for robots.txt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.into();
        self
    }

    /// The first header called `name`, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| &v[..])
    }
}

/// Retrieves a robots.txt file. Implementations must give up with
/// [`TransportError::Timeout`] once `timeout` has elapsed, and must not
/// retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, timeout: Option<Duration>) -> Result<Response, TransportError>;
}

/// What a response means for the rules of a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Parse,
    DisallowAll,
    AllowAll,
}

/// Any 2xx response has a robots.txt body; 401 and 403 forbid the whole
/// site; 404 means there are no rules. Anything else is an error.
pub(crate) fn interpret(url: &str, status: u16) -> Result<Outcome, Error> {
    match status {
        200..=299 => Ok(Outcome::Parse),
        401 | 403 => Ok(Outcome::DisallowAll),
        404 => Ok(Outcome::AllowAll),
        status => Err(Error::Status {
            url: url.into(),
            status,
        }),
    }
}

#[cfg(feature = "reqwest")]
pub use self::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
mod http {
    use super::*;

    /// A [`Transport`] backed by a `reqwest` client.
    #[derive(Debug, Clone, Default)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        pub fn new(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    #[async_trait]
    impl Transport for ReqwestTransport {
        async fn get(
            &self,
            url: &str,
            timeout: Option<Duration>,
        ) -> Result<Response, TransportError> {
            let mut request = self.client.get(url);
            if let Some(timeout) = timeout {
                request = request.timeout(timeout);
            }

            let response = request.send().await.map_err(|e| map_error(url, e))?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|value| (name.as_str().to_string(), value.to_string()))
                })
                .collect();
            let body = response.text().await.map_err(|e| map_error(url, e))?;

            Ok(Response {
                status,
                headers,
                body,
            })
        }
    }

    fn map_error(url: &str, err: reqwest::Error) -> TransportError {
        let url = url.to_string();
        if err.is_timeout() {
            TransportError::Timeout { url }
        } else if err.is_connect() {
            TransportError::Connect {
                url,
                message: err.to_string(),
            }
        } else {
            TransportError::Other {
                url,
                message: err.to_string(),
            }
        }
    }
}
