//! Changelog processing for nmrkit
//!
//! This crate parses the line-oriented release log and renders it as
//! Markdown for the documentation site.

mod error;
mod parser;
mod render;
mod stats;

pub use error::{ChangelogError, Result};
pub use parser::ChangelogParser;
pub use render::{DEFAULT_TITLE, MarkdownRenderer};
pub use stats::ChangelogStats;

// Re-export types used in our public API
pub use nmrkit_types::{ChangeKind, ChangelogLine, LogEntry, VersionHeader};

/// Parse a whole changelog and render it, failing before any output is produced
pub fn render_markdown(input: &str, renderer: &MarkdownRenderer) -> Result<String> {
    let lines = ChangelogParser::parse_str(input)?;
    Ok(renderer.render(&lines))
}
