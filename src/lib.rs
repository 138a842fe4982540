//! A permissive parser for robots.txt files.
//!
//! Rules can be matched under two dialects: the classic 1994/1996 draft,
//! where every character of a path pattern is literal, and the 2008
//! wildcard extension, where `*` and a trailing `$` carry meaning. The same
//! parsed file can be queried under either one.
//!
//! ```
//! use robots_exclusion::{Dialect, RobotsParser};
//!
//! let mut parser = RobotsParser::new();
//! parser.parse(
//!     "User-agent: *\n\
//!      Disallow: /private/*\n\
//!      Crawl-delay: 2.5\n\
//!      Sitemap: http://www.example.com/sitemap.xml\n",
//! );
//!
//! assert!(!parser.is_allowed("Mozilla/5.0 (compatible; Foobot/2.1)", "/private/a.html"));
//! assert!(parser.is_allowed_with("Foobot", "/private/a.html", Dialect::Classic));
//! assert_eq!(parser.get_crawl_delay("Foobot"), Some(2.5));
//! assert_eq!(parser.sitemaps(), &["http://www.example.com/sitemap.xml"]);
//! ```

mod config;
mod date;
mod error;
mod expiration;
mod fetch;
mod matcher;
mod parse;
mod pattern;
mod robots;

pub use config::{Config, Dialect, SEVEN_DAYS};
pub use date::expiration_from_header;
pub use error::{Error, Result, TransportError};
pub use expiration::{Clock, ExpirationState, ResponseStatus, SystemClock};
#[cfg(feature = "reqwest")]
pub use fetch::ReqwestTransport;
pub use fetch::{Response, Transport};
pub use parse::{Directive, Document, Record};
pub use pattern::{normalize_path, CompiledPattern};
pub use robots::RobotsParser;
