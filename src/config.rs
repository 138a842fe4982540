use serde_derive::{Deserialize, Serialize};

/// The default lifetime of a fetched robots.txt file, in seconds. MK1996
/// section 3.4 suggests seven days when the server gives no expiry.
pub const SEVEN_DAYS: i64 = 7 * 24 * 60 * 60;

/// Which robots.txt syntax to apply when matching paths.
///
/// The classic dialect is the 1994/1996 draft where every character in a
/// path pattern is literal. The wildcard dialect is the 2008 extension
/// agreed on by Google, Yahoo and Microsoft, where `*` matches any run of
/// characters and a trailing `$` on a pattern without `*` anchors it at the
/// end of the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    #[serde(rename = "classic")]
    Classic,
    #[serde(rename = "wildcard")]
    WildcardExtended,
}

impl Default for Dialect {
    fn default() -> Self {
        Dialect::WildcardExtended
    }
}

/// Settings for a [`RobotsParser`](crate::RobotsParser).
///
/// Every parser carries its own copy, so parsers with different defaults
/// can live side by side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Dialect used by [`RobotsParser::is_allowed`](crate::RobotsParser::is_allowed).
    pub default_dialect: Dialect,
    /// Lifetime of a document that was fetched without a usable `Expires`
    /// header.
    pub default_expiration_secs: i64,
    /// Do expiration arithmetic on the host's local wall clock instead of
    /// UTC.
    pub use_local_time: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_dialect: Dialect::default(),
            default_expiration_secs: SEVEN_DAYS,
            use_local_time: false,
        }
    }
}

impl Config {
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.default_dialect = dialect;
        self
    }

    pub fn with_default_expiration(mut self, secs: i64) -> Self {
        self.default_expiration_secs = secs;
        self
    }

    pub fn with_local_time(mut self, use_local_time: bool) -> Self {
        self.use_local_time = use_local_time;
        self
    }
}
