use futures_util::{
    io::{AsyncRead, BufReader, Result},
    AsyncBufReadExt,
};
use serde_derive::{Deserialize, Serialize};
use tracing::trace;

use crate::pattern::CompiledPattern;

// Directive names are compared after lower-casing and dropping whitespace,
// hyphens and underscores, so "User-agent", "USERAGENT" and "user agent"
// are all the same name.
const UA_NAME: &str = "useragent";
const ALLOW_NAME: &str = "allow";
const DISALLOW_NAME: &str = "disallow";
const DELAY_NAME: &str = "crawldelay";
const SITEMAP_NAME: &str = "sitemap";

const BOM: &str = "\u{feff}";
// A UTF-8 byte order mark that was decoded as Latin-1.
const MOJIBAKE_BOM: &str = "\u{ef}\u{bb}\u{bf}";

/// A single instruction from a robots.txt file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Directive {
    Allow(CompiledPattern),
    Disallow(CompiledPattern),
    /// Seconds to wait between requests.
    CrawlDelay(f64),
    Sitemap(String),
    /// A well-formed line with a name we don't know, e.g. `Host:`. These
    /// are recognized but never stored in a record.
    Unknown { name: String, value: String },
}

/// A group of user agent tokens and the directives that apply to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    agents: Vec<String>,
    directives: Vec<Directive>,
}

impl Record {
    /// Lower-cased user agent tokens, in the order they were listed.
    pub fn agents(&self) -> &[String] {
        &self.agents
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    /// The last valid `Crawl-delay` in the group, if any.
    pub fn crawl_delay(&self) -> Option<f64> {
        self.directives.iter().rev().find_map(|d| match d {
            Directive::CrawlDelay(delay) => Some(*delay),
            _ => None,
        })
    }
}

/// A parsed robots.txt file.
///
/// Parsing never fails. Lines that can't be understood are dropped, and so
/// are user agent groups that end up with no directives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    records: Vec<Record>,
    sitemaps: Vec<String>,
}

impl Document {
    /// Parse the text of a robots.txt file.
    pub fn parse(text: &str) -> Self {
        let mut builder = DocumentBuilder::new();
        for chunk in strip_bom(text).split('\n') {
            builder.push_chunk(chunk);
        }
        builder.finish()
    }

    /// Parse a robots.txt file as it is read, one line at a time. The result
    /// is the same as [`Document::parse`] on the whole text.
    pub async fn from_reader<R: AsyncRead + Unpin>(file: R) -> Result<Self> {
        let mut reader = BufReader::new(file);
        let mut builder = DocumentBuilder::new();
        let mut buf = String::new();
        let mut first = true;

        while reader.read_line(&mut buf).await? != 0 {
            let chunk = if first { strip_bom(&buf) } else { &buf[..] };
            builder.push_chunk(chunk.strip_suffix('\n').unwrap_or(chunk));
            first = false;
            buf.clear();
        }

        Ok(builder.finish())
    }

    /// A document that forbids every path to every user agent.
    pub(crate) fn disallow_all() -> Self {
        Self {
            records: vec![Record {
                agents: vec!["*".into()],
                directives: vec![Directive::Disallow(CompiledPattern::compile("/"))],
            }],
            sitemaps: vec![],
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Sitemap URLs in the order they first appear, without duplicates.
    /// Sitemaps belong to the whole file, not to a user agent group.
    pub fn sitemaps(&self) -> &[String] {
        &self.sitemaps
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.sitemaps.is_empty()
    }
}

#[derive(Debug, PartialEq)]
enum ParsedLine {
    UserAgent(String),
    Directive(Directive),
    Blank,
    Nothing,
}

/// Folds classified lines into records.
///
/// Consecutive user agent lines collect into one pending group. The first
/// directive makes the group active, and the next user agent line after
/// that starts a new group. A blank line ends the current group.
struct DocumentBuilder {
    parsing_agents: bool,
    agents: Vec<String>,
    directives: Vec<Directive>,
    records: Vec<Record>,
    sitemaps: Vec<String>,
}

impl DocumentBuilder {
    fn new() -> Self {
        Self {
            parsing_agents: true,
            agents: vec![],
            directives: vec![],
            records: vec![],
            sitemaps: vec![],
        }
    }

    /// Feed one '\n'-terminated chunk, which may still hold '\r' line
    /// breaks from CRLF or old Mac line endings.
    fn push_chunk(&mut self, chunk: &str) {
        let chunk = chunk.strip_suffix('\r').unwrap_or(chunk);
        for line in chunk.split('\r') {
            self.push(parse_line(line));
        }
    }

    fn push(&mut self, line: ParsedLine) {
        match line {
            ParsedLine::UserAgent(ua) if self.parsing_agents => {
                if !self.agents.contains(&ua) {
                    self.agents.push(ua);
                }
            }
            ParsedLine::UserAgent(ua) => {
                self.close_group();
                self.agents.push(ua);
            }
            ParsedLine::Directive(Directive::Unknown { name, .. }) => {
                trace!(%name, "ignoring unknown directive");
            }
            ParsedLine::Directive(directive) => {
                if let Directive::Sitemap(url) = &directive {
                    if !self.sitemaps.contains(url) {
                        self.sitemaps.push(url.clone());
                    }
                }

                if self.agents.is_empty() {
                    trace!(?directive, "ignoring directive outside of a user agent group");
                    return;
                }

                self.directives.push(directive);
                self.parsing_agents = false;
            }
            ParsedLine::Blank => self.close_group(),
            ParsedLine::Nothing => (),
        }
    }

    fn close_group(&mut self) {
        let agents = std::mem::take(&mut self.agents);
        let directives = std::mem::take(&mut self.directives);
        self.parsing_agents = true;

        if directives.is_empty() {
            if !agents.is_empty() {
                trace!(?agents, "dropping user agent group without directives");
            }
            return;
        }

        self.records.push(Record { agents, directives });
    }

    fn finish(mut self) -> Document {
        self.close_group();
        Document {
            records: self.records,
            sitemaps: self.sitemaps,
        }
    }
}

fn strip_bom(text: &str) -> &str {
    text.strip_prefix(BOM)
        .or_else(|| text.strip_prefix(MOJIBAKE_BOM))
        .unwrap_or(text)
}

fn parse_line(line: &str) -> ParsedLine {
    if line.trim().is_empty() {
        return ParsedLine::Blank;
    }

    let line = strip_comments(line).trim();
    let (name, value) = match line.split_once(':') {
        Some((name, value)) => (normalize_name(name), value.trim()),
        None => {
            if !line.is_empty() {
                trace!(line, "ignoring line without a directive");
            }
            return ParsedLine::Nothing;
        }
    };

    // This tries to parse lines roughly in order of most frequent kind to
    // least frequent kind.
    match &name[..] {
        DISALLOW_NAME => ParsedLine::Directive(Directive::Disallow(CompiledPattern::compile(value))),
        UA_NAME if value.is_empty() => ParsedLine::Nothing,
        UA_NAME => ParsedLine::UserAgent(value.to_lowercase()),
        ALLOW_NAME => ParsedLine::Directive(Directive::Allow(CompiledPattern::compile(value))),
        DELAY_NAME => match parse_delay(value) {
            Some(delay) => ParsedLine::Directive(Directive::CrawlDelay(delay)),
            None => {
                trace!(value, "ignoring unparseable crawl delay");
                ParsedLine::Nothing
            }
        },
        SITEMAP_NAME if value.is_empty() => ParsedLine::Nothing,
        SITEMAP_NAME => ParsedLine::Directive(Directive::Sitemap(value.into())),
        "" => ParsedLine::Nothing,
        _ => ParsedLine::Directive(Directive::Unknown {
            name: name.clone(),
            value: value.into(),
        }),
    }
}

fn strip_comments(line: &str) -> &str {
    match line.find('#') {
        Some(at) => &line[..at],
        None => line,
    }
}

fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn parse_delay(value: &str) -> Option<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|delay| delay.is_finite() && *delay >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow(path: &str) -> ParsedLine {
        ParsedLine::Directive(Directive::Allow(CompiledPattern::compile(path)))
    }

    fn disallow(path: &str) -> ParsedLine {
        ParsedLine::Directive(Directive::Disallow(CompiledPattern::compile(path)))
    }

    #[test]
    fn test_parse_allow() {
        let test_cases = vec![
            ("Allow: /", "/"),
            ("allow: /   #  Root with comment", "/"),
            ("ALLOW: /abc/def  ", "/abc/def"),
            ("Allow:   /abc/def  ", "/abc/def"),
            ("  Allow: /*/foo", "/*/foo"),
            ("Allow :\t/tab\u{b}", "/tab"),
        ];

        for (i, o) in test_cases {
            assert_eq!(parse_line(i), allow(o));
        }
    }

    #[test]
    fn test_parse_disallow() {
        let test_cases = vec![
            ("Disallow: /", "/"),
            ("disallow: /   #  Root with comment", "/"),
            ("DISALLOW: /abc/def  ", "/abc/def"),
            ("Disallow:   /abc/def  ", "/abc/def"),
            ("  Disallow: /*/foo", "/*/foo"),
            ("Disallow:", ""),
            ("Disallow: # nothing", ""),
        ];

        for (i, o) in test_cases {
            assert_eq!(parse_line(i), disallow(o));
        }
    }

    #[test]
    fn test_parse_user_agent() {
        let test_cases = vec![
            ("User-agent: *", "*"),
            ("user-agent: ImABot   #  User agent with comment", "imabot"),
            ("  USER-AGENT:   ImABot  ", "imabot"),
            ("USERAGENT: FOOBOT", "foobot"),
            ("UserAgent: J\u{e4}vla-Foobot", "j\u{e4}vla-foobot"),
            ("\tuser-agent:\t\t\tbarbot\u{b}", "barbot"),
            ("User-agent: onebot twobot", "onebot twobot"),
        ];

        for (i, o) in test_cases {
            assert_eq!(parse_line(i), ParsedLine::UserAgent(o.into()));
        }
    }

    #[test]
    fn test_parse_crawl_delay() {
        let test_cases = vec![
            ("Crawl-delay: 5", 5.0),
            ("crawl-delay: .3", 0.3),
            ("CRAWLDELAY: 2.5 # slow down", 2.5),
            ("Crawl-Delay: 0", 0.0),
        ];

        for (i, o) in test_cases {
            assert_eq!(parse_line(i), ParsedLine::Directive(Directive::CrawlDelay(o)));
        }
    }

    #[test]
    fn test_parse_sitemap() {
        // Only the first ':' separates the name from the value.
        assert_eq!(
            parse_line("Sitemap: http://www.example.org/banana.xml"),
            ParsedLine::Directive(Directive::Sitemap(
                "http://www.example.org/banana.xml".into()
            ))
        );
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(
            parse_line("Host: example.com"),
            ParsedLine::Directive(Directive::Unknown {
                name: "host".into(),
                value: "example.com".into(),
            })
        );
    }

    #[test]
    fn test_parse_nothing() {
        let test_cases = vec![
            "# Comment",
            "alow /",
            "User-agent:",
            "Crawl-delay: go away!",
            "Crawl-delay: -1",
            "Crawl-delay: NaN",
            "Crawl-delay: inf",
            "Sitemap:",
            ": /",
        ];

        for i in test_cases {
            assert_eq!(parse_line(i), ParsedLine::Nothing, "{}", i);
        }
    }

    #[test]
    fn test_parse_blank() {
        for i in vec!["", "    ", "\t", "\u{b}"] {
            assert_eq!(parse_line(i), ParsedLine::Blank);
        }
    }

    #[test]
    fn test_groups() {
        let document = Document::parse(
            "User-agent: jones-bot\n\
             Disallow: /\n\
             \n\
             User-agent: jones\n\
             User-agent: foobar\n\
             Allow: /\n\
             User-agent: *\n\
             Disallow: /\n",
        );

        let agents: Vec<_> = document.records().iter().map(Record::agents).collect();
        assert_eq!(
            agents,
            vec![
                &["jones-bot".to_string()][..],
                &["jones".to_string(), "foobar".to_string()][..],
                &["*".to_string()][..],
            ]
        );
    }

    #[test]
    fn test_empty_groups_are_dropped() {
        let document = Document::parse(
            "Disallow: /\n\
             User-agent: *\n\
             \n\
             User-agent: onebot\n\
             Disallow: /\n\
             \n\
             User-agent: sirbot\n\
             \n\
             # add new user agents below\n\
             User-agent: rabbitbot\n\
             Disallow: /grenade/\n\
             \n\
             User-agent: trailingbot",
        );

        let agents: Vec<_> = document.records().iter().map(Record::agents).collect();
        assert_eq!(
            agents,
            vec![&["onebot".to_string()][..], &["rabbitbot".to_string()][..]]
        );
    }

    #[test]
    fn test_comment_lines_do_not_end_groups() {
        let document = Document::parse(
            "User-agent: a\n\
             # a comment\n\
             User-agent: b\n\
             Disallow: /x\n",
        );
        assert_eq!(document.records().len(), 1);
        assert_eq!(document.records()[0].agents(), &["a", "b"]);
    }

    #[test]
    fn test_sitemaps() {
        let document = Document::parse(
            "Sitemap: http://example.org/first.xml\n\
             User-agent: *\n\
             Disallow: /\n\
             Sitemap: http://example.org/second.xml\n\
             \n\
             Sitemap: http://example.org/first.xml\n\
             Sitemap: http://example.org/third.xml\n",
        );
        assert_eq!(
            document.sitemaps(),
            &[
                "http://example.org/first.xml",
                "http://example.org/second.xml",
                "http://example.org/third.xml",
            ]
        );
    }

    #[test]
    fn test_crawl_delay_last_wins() {
        let document = Document::parse(
            "User-agent: *\n\
             Crawl-delay: 1\n\
             Disallow: /\n\
             Crawl-delay: 4\n\
             Crawl-delay: soon\n",
        );
        assert_eq!(document.records()[0].crawl_delay(), Some(4.0));
    }

    #[test]
    fn test_line_endings_and_bom() {
        let unix = Document::parse("User-agent: a\nDisallow: /x\n\nUser-agent: b\nDisallow: /y\n");
        let dos = Document::parse("\u{feff}User-agent: a\r\nDisallow: /x\r\n\r\nUser-agent: b\r\nDisallow: /y\r\n");
        let mac = Document::parse("\u{ef}\u{bb}\u{bf}User-agent: a\rDisallow: /x\r\rUser-agent: b\rDisallow: /y\r");
        assert_eq!(unix, dos);
        assert_eq!(unix, mac);
        assert_eq!(unix.records().len(), 2);
    }

    #[test]
    fn test_from_reader_matches_parse() {
        let text = "\u{feff}User-agent: a\r\nDisallow: /x\r\n\r\nUser-agent: b\rAllow: /y\nSitemap: /s.xml";
        let streamed = tokio_test::block_on(Document::from_reader(text.as_bytes())).unwrap();
        assert_eq!(streamed, Document::parse(text));
        assert_eq!(streamed.records().len(), 2);
    }

    #[test]
    fn test_garbage() {
        let document = Document::parse("This is not valid robots.txt {{{\n\0\0\n:::\n");
        assert!(document.is_empty());
    }
}
