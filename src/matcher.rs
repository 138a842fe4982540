use tracing::trace;
use url::Url;

use crate::config::Dialect;
use crate::parse::{Directive, Document, Record};
use crate::pattern::{normalize_path, CompiledPattern};

const WILDCARD_AGENT: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq)]
enum Verdict {
    Allow,
    Disallow,
}

impl Verdict {
    /// Re-map a match's specificity based on its verdict. This makes it
    /// easy to guarantee Allow always breaks ties against Disallow.
    fn normalized_weight(self, specificity: usize) -> usize {
        match self {
            Verdict::Allow => 1 + 2 * specificity,
            Verdict::Disallow => 2 * specificity,
        }
    }
}

impl Document {
    /// Decide whether `user_agent` may fetch `target`, which is either a
    /// path such as `/index.html` or an absolute URL. The scheme and host of
    /// a URL are ignored; checking that they belong to the site this file
    /// came from is up to the caller.
    ///
    /// The most specific matching `Allow` or `Disallow` wins, `Allow` wins a
    /// tie, and a path nothing matches is allowed.
    pub fn is_allowed(&self, user_agent: &str, target: &str, dialect: Dialect) -> bool {
        let record = match self.select_record(user_agent) {
            Some(record) => record,
            None => return true,
        };

        let path = normalize_path(&request_path(target));
        let best_match = record
            .directives()
            .iter()
            .filter_map(|directive| match directive {
                Directive::Allow(pattern) => Some((Verdict::Allow, pattern)),
                Directive::Disallow(pattern) => Some((Verdict::Disallow, pattern)),
                _ => None,
            })
            .filter(|(_, pattern)| pattern.matches(&path, dialect))
            .map(|(verdict, pattern)| (effective_verdict(verdict, pattern), pattern))
            .max_by_key(|(verdict, pattern)| verdict.normalized_weight(pattern.specificity(dialect)));

        match best_match {
            Some((verdict, pattern)) => {
                trace!(user_agent, %path, pattern = pattern.raw(), ?verdict, "matched rule");
                verdict == Verdict::Allow
            }
            None => true,
        }
    }

    /// The crawl delay, in seconds, of the record that applies to
    /// `user_agent`.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        self.select_record(user_agent).and_then(Record::crawl_delay)
    }

    /// Find the record that applies to `user_agent`.
    ///
    /// A record applies when one of its tokens appears anywhere in the user
    /// agent, ignoring case. The first such record wins; only when there is
    /// none does the first `*` record apply.
    pub fn select_record(&self, user_agent: &str) -> Option<&Record> {
        let user_agent = user_agent.to_lowercase();

        self.records()
            .iter()
            .find(|record| {
                record
                    .agents()
                    .iter()
                    .any(|agent| agent != WILDCARD_AGENT && user_agent.contains(&agent[..]))
            })
            .or_else(|| {
                self.records()
                    .iter()
                    .find(|record| record.agents().iter().any(|agent| agent == WILDCARD_AGENT))
            })
    }
}

/// An empty pattern matches everything and means "nothing is forbidden",
/// whichever directive it came from.
fn effective_verdict(verdict: Verdict, pattern: &CompiledPattern) -> Verdict {
    if pattern.is_empty() {
        Verdict::Allow
    } else {
        verdict
    }
}

/// Reduce a URL or path to the part robots.txt rules apply to: the path and
/// the query string, always starting with '/'.
fn request_path(target: &str) -> String {
    let path = match Url::parse(target) {
        Ok(url) if url.has_host() => match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        },
        _ => match target.find('#') {
            Some(at) => target[..at].to_string(),
            None => target.to_string(),
        },
    };

    if path.starts_with('/') {
        path
    } else {
        format!("/{}", path)
    }
}
