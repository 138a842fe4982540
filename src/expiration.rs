use std::fmt::Debug;

use chrono::Utc;
use serde_derive::{Deserialize, Serialize};

use crate::config::Config;
use crate::date;

/// A source of the current time, in epoch seconds.
pub trait Clock: Debug + Send + Sync {
    fn now_utc(&self) -> i64;

    /// The host's local wall clock, read as if it were UTC.
    fn now_local(&self) -> i64;

    fn now(&self, use_local_time: bool) -> i64 {
        if use_local_time {
            self.now_local()
        } else {
            self.now_utc()
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> i64 {
        Utc::now().timestamp()
    }

    fn now_local(&self) -> i64 {
        date::to_epoch(Utc::now(), true)
    }
}

/// The outcome of the most recent fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseStatus {
    NotFetched,
    /// The server answered and the body (possibly empty, for a 404) was
    /// parsed.
    Fetched,
    /// The server answered 401 or 403, so everything is disallowed.
    DisallowedByStatus,
    /// The transport failed or the server gave an unexpected status. The
    /// previous document is still in place.
    FetchFailed,
}

/// Tracks when a robots.txt file was fetched and when it should be fetched
/// again.
///
/// An expiration date is always available: before the first fetch it is
/// the default lifetime from the moment it is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirationState {
    fetched_at: Option<i64>,
    expiration: Option<i64>,
    use_local_time: bool,
    default_secs: i64,
    response_status: ResponseStatus,
}

impl ExpirationState {
    pub fn new(config: &Config) -> Self {
        Self {
            fetched_at: None,
            expiration: None,
            use_local_time: config.use_local_time,
            default_secs: config.default_expiration_secs,
            response_status: ResponseStatus::NotFetched,
        }
    }

    pub fn fetched_at(&self) -> Option<i64> {
        self.fetched_at
    }

    pub fn response_status(&self) -> ResponseStatus {
        self.response_status
    }

    pub fn use_local_time(&self) -> bool {
        self.use_local_time
    }

    pub fn set_use_local_time(&mut self, use_local_time: bool) {
        self.use_local_time = use_local_time;
    }

    pub fn expiration_date(&self, clock: &dyn Clock) -> i64 {
        match self.expiration {
            Some(expiration) => expiration,
            None => clock.now(self.use_local_time).saturating_add(self.default_secs),
        }
    }

    /// Whether the document should be fetched (again). A document that was
    /// never fetched is always expired.
    pub fn is_expired(&self, clock: &dyn Clock) -> bool {
        match self.expiration {
            Some(expiration) => clock.now(self.use_local_time) >= expiration,
            None => true,
        }
    }

    /// Record a completed fetch and work out its expiration from the
    /// response's `Expires` header.
    pub(crate) fn record_fetch(
        &mut self,
        status: ResponseStatus,
        clock: &dyn Clock,
        expires_header: Option<&str>,
    ) {
        let fetched_at = clock.now(self.use_local_time);
        self.fetched_at = Some(fetched_at);
        self.expiration = Some(date::expiration_from_header(
            expires_header,
            fetched_at,
            self.default_secs,
            self.use_local_time,
        ));
        self.response_status = status;
    }

    pub(crate) fn record_failure(&mut self) {
        self.response_status = ResponseStatus::FetchFailed;
    }
}
