use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use nmrkit_types::{ChangeKind, ChangelogLine, LogEntry, VersionHeader};

use crate::error::{ChangelogError, Result};

/// Release lines start with a Unix timestamp followed by a space
static VERSION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+ ").expect("version line pattern is valid"));

/// Parser for the line-oriented changelog format
pub struct ChangelogParser;

impl ChangelogParser {
    /// Parse one raw line. Blank lines yield `None`.
    ///
    /// `line_number` is 1-based and only used for error reporting.
    pub fn parse_line(raw: &str, line_number: usize) -> Result<Option<ChangelogLine>> {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if line.trim().is_empty() {
            return Ok(None);
        }

        let parsed = if VERSION_LINE.is_match(line) {
            ChangelogLine::Version(Self::parse_version(line, line_number)?)
        } else {
            ChangelogLine::Entry(Self::parse_entry(line, line_number)?)
        };

        trace!(line = line_number, ?parsed, "parsed changelog line");
        Ok(Some(parsed))
    }

    /// Parse a whole document held in memory
    pub fn parse_str(input: &str) -> Result<Vec<ChangelogLine>> {
        let mut parsed = Vec::new();
        for (idx, raw) in input.lines().enumerate() {
            if let Some(line) = Self::parse_line(raw, idx + 1)? {
                parsed.push(line);
            }
        }
        Ok(parsed)
    }

    /// Parse from any buffered reader, stopping at the first bad line
    pub fn parse_reader<R: BufRead>(reader: R) -> Result<Vec<ChangelogLine>> {
        let mut parsed = Vec::new();
        for (idx, raw) in reader.lines().enumerate() {
            if let Some(line) = Self::parse_line(&raw?, idx + 1)? {
                parsed.push(line);
            }
        }
        Ok(parsed)
    }

    /// Parse a changelog file from disk
    pub fn parse_file(path: &Path) -> Result<Vec<ChangelogLine>> {
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ChangelogError::MissingInput {
                path: path.to_path_buf(),
            },
            _ => ChangelogError::Io(e),
        })?;

        debug!(path = %path.display(), "reading changelog");
        Self::parse_reader(BufReader::new(file))
    }

    /// `<seconds> <anything...> <version>`, whitespace separated
    fn parse_version(line: &str, line_number: usize) -> Result<VersionHeader> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 2 {
            return Err(ChangelogError::malformed(
                line_number,
                "release line has no version label",
            ));
        }

        let seconds: i64 = fields[0].parse().map_err(|_| {
            ChangelogError::malformed(line_number, format!("invalid timestamp '{}'", fields[0]))
        })?;
        let version = fields[fields.len() - 1].to_string();

        VersionHeader::from_timestamp(seconds, version).ok_or_else(|| {
            ChangelogError::malformed(line_number, format!("timestamp {} is out of range", seconds))
        })
    }

    /// `KIND<TAB>summary<TAB>description`
    fn parse_entry(line: &str, line_number: usize) -> Result<LogEntry> {
        let fields: Vec<&str> = line.split('\t').collect();

        let kind: ChangeKind = fields[0]
            .parse()
            .map_err(|source| ChangelogError::UnknownKind {
                line: line_number,
                source,
            })?;

        if fields.len() != 3 {
            return Err(ChangelogError::malformed(
                line_number,
                format!("expected 3 tab-separated fields, found {}", fields.len()),
            ));
        }

        Ok(LogEntry::new(
            kind,
            fields[1].to_string(),
            fields[2].to_string(),
        ))
    }
}
