use std::sync::Arc;
use std::time::Duration;

use futures_util::io::AsyncRead;
use tracing::{debug, warn};

use crate::config::{Config, Dialect};
use crate::error::Result;
use crate::expiration::{Clock, ExpirationState, ResponseStatus, SystemClock};
use crate::fetch::{self, Outcome, Transport};
use crate::parse::Document;

/// The robots.txt rules of one site, together with the bookkeeping needed
/// to know when they should be fetched again.
///
/// Parsing and matching are synchronous and never fail. Fetching goes
/// through a caller-supplied [`Transport`] and is the only operation that
/// can return an error. Every method that replaces the rules takes
/// `&mut self`, so a parser shared between threads needs a lock around it.
#[derive(Debug, Clone)]
pub struct RobotsParser {
    config: Config,
    document: Document,
    expiration: ExpirationState,
    clock: Arc<dyn Clock>,
}

impl Default for RobotsParser {
    fn default() -> Self {
        Self::with_config(Config::default())
    }
}

impl RobotsParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            expiration: ExpirationState::new(&config),
            document: Document::default(),
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replace the source of the current time.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replace the current rules with those in `text`. Malformed content is
    /// skipped, never reported.
    pub fn parse(&mut self, text: &str) {
        self.document = Document::parse(text);
    }

    /// Replace the current rules with those read from `reader`.
    pub async fn parse_reader<R: AsyncRead + Unpin>(&mut self, reader: R) -> std::io::Result<()> {
        self.document = Document::from_reader(reader).await?;
        Ok(())
    }

    /// Fetch `url` and replace the current rules with the result.
    ///
    /// A 401 or 403 response disallows everything and a 404 allows
    /// everything. Any other non-2xx status, and any transport failure, is
    /// returned as an error and leaves the current rules alone.
    pub async fn fetch<T: Transport + ?Sized>(
        &mut self,
        transport: &T,
        url: &str,
        timeout: Option<Duration>,
    ) -> Result<()> {
        debug!(url, ?timeout, "fetching robots.txt");

        let outcome = transport
            .get(url, timeout)
            .await
            .map_err(Into::into)
            .and_then(|response| fetch::interpret(url, response.status).map(|o| (o, response)));

        let (outcome, response) = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(url, error = %err, "failed to fetch robots.txt");
                self.expiration.record_failure();
                return Err(err);
            }
        };

        let status = match outcome {
            Outcome::Parse => {
                self.document = Document::parse(&response.body);
                ResponseStatus::Fetched
            }
            Outcome::DisallowAll => {
                self.document = Document::disallow_all();
                ResponseStatus::DisallowedByStatus
            }
            Outcome::AllowAll => {
                self.document = Document::default();
                ResponseStatus::Fetched
            }
        };
        debug!(url, http_status = response.status, ?status, "fetched robots.txt");

        self.expiration
            .record_fetch(status, self.clock.as_ref(), response.header("Expires"));
        Ok(())
    }

    /// Whether `user_agent` may fetch `target` under the configured default
    /// dialect.
    pub fn is_allowed(&self, user_agent: &str, target: &str) -> bool {
        self.is_allowed_with(user_agent, target, self.config.default_dialect)
    }

    pub fn is_allowed_with(&self, user_agent: &str, target: &str, dialect: Dialect) -> bool {
        self.document.is_allowed(user_agent, target, dialect)
    }

    pub fn get_crawl_delay(&self, user_agent: &str) -> Option<f64> {
        self.document.crawl_delay(user_agent)
    }

    pub fn sitemaps(&self) -> &[String] {
        self.document.sitemaps()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// When the rules should be fetched again, in epoch seconds.
    pub fn expiration_date(&self) -> i64 {
        self.expiration.expiration_date(self.clock.as_ref())
    }

    pub fn is_expired(&self) -> bool {
        self.expiration.is_expired(self.clock.as_ref())
    }

    pub fn fetched_at(&self) -> Option<i64> {
        self.expiration.fetched_at()
    }

    pub fn response_status(&self) -> ResponseStatus {
        self.expiration.response_status()
    }

    pub fn use_local_time(&self) -> bool {
        self.expiration.use_local_time()
    }

    pub fn set_use_local_time(&mut self, use_local_time: bool) {
        self.config.use_local_time = use_local_time;
        self.expiration.set_use_local_time(use_local_time);
    }
}
