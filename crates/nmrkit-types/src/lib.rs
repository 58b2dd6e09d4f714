//! Shared types for nmrkit
//!
//! This crate contains data structures used across multiple nmrkit crates.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Changelog Types
// ============================================================================

/// Category of a single changelog entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    New,
    Bug,
    Improve,
}

/// Label that does not name any known change category
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unrecognized change category '{0}' (expected NEW, BUG or IMPROVE)")]
pub struct UnknownChangeKind(pub String);

impl ChangeKind {
    /// Label as it appears in the log file and in the badge
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Bug => "BUG",
            Self::Improve => "IMPROVE",
        }
    }

    /// Badge colours for this category
    pub fn badge(&self) -> BadgeStyle {
        match self {
            Self::New => BadgeStyle::new("blue", "white"),
            Self::Bug => BadgeStyle::new("red", "white"),
            Self::Improve => BadgeStyle::new("yellow", "black"),
        }
    }
}

impl FromStr for ChangeKind {
    type Err = UnknownChangeKind;

    /// Labels are matched exactly; there is no fallback category.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "BUG" => Ok(Self::Bug),
            "IMPROVE" => Ok(Self::Improve),
            other => Err(UnknownChangeKind(other.to_string())),
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inline badge colours (CSS colour names)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BadgeStyle {
    pub background: &'static str,
    pub foreground: &'static str,
}

impl BadgeStyle {
    pub const fn new(background: &'static str, foreground: &'static str) -> Self {
        Self {
            background,
            foreground,
        }
    }
}

/// A single change line: `KIND<TAB>summary<TAB>description`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    /// Change category
    pub kind: ChangeKind,

    /// Short label, rendered uppercased inside the badge
    pub summary: String,

    /// Free text, preserved verbatim
    pub description: String,
}

impl LogEntry {
    pub fn new(kind: ChangeKind, summary: String, description: String) -> Self {
        Self {
            kind,
            summary,
            description,
        }
    }

    /// Text shown inside the badge, e.g. `NEW  FOO`
    pub fn badge_text(&self) -> String {
        format!("{}  {}", self.kind, self.summary.to_uppercase())
    }
}

/// A release marker: `<unix-seconds> ... <version>`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionHeader {
    /// Release time (UTC)
    pub released: DateTime<Utc>,

    /// Version label (last whitespace-separated token of the line)
    pub version: String,
}

impl VersionHeader {
    /// Build a header from a Unix timestamp; `None` if the timestamp is out of range
    pub fn from_timestamp(seconds: i64, version: String) -> Option<Self> {
        let released = DateTime::from_timestamp(seconds, 0)?;
        Some(Self { released, version })
    }

    pub fn timestamp_seconds(&self) -> i64 {
        self.released.timestamp()
    }

    /// Release date as `DD Mon YYYY`
    pub fn release_date(&self) -> String {
        self.released.format("%d %b %Y").to_string()
    }
}

/// One meaningful line of a changelog file
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChangelogLine {
    Version(VersionHeader),
    Entry(LogEntry),
}

// ============================================================================
// Platform Types
// ============================================================================

/// Path conventions used when reading classpath listings
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Platform {
    Windows,
    Unix,
}

/// Host or platform name that is neither Windows- nor Unix-style
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unsupported platform '{0}' (expected a Windows or Unix path convention)")]
pub struct UnsupportedPlatform(pub String);

impl Platform {
    /// Profile matching the OS family this binary was built for
    pub fn detect() -> Result<Self, UnsupportedPlatform> {
        Self::from_family(std::env::consts::FAMILY)
    }

    /// Map an OS family name (`std::env::consts::FAMILY` style) to a profile
    pub fn from_family(family: &str) -> Result<Self, UnsupportedPlatform> {
        match family {
            "windows" => Ok(Self::Windows),
            "unix" => Ok(Self::Unix),
            other => Err(UnsupportedPlatform(other.to_string())),
        }
    }

    /// Separator between directories in a single path
    pub fn path_separator(&self) -> char {
        match self {
            Self::Windows => '\\',
            Self::Unix => '/',
        }
    }

    /// Separator between entries in a classpath listing
    pub fn classpath_delimiter(&self) -> char {
        match self {
            Self::Windows => ';',
            Self::Unix => ':',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Unix => "unix",
        }
    }
}

impl FromStr for Platform {
    type Err = UnsupportedPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "windows" | "win" | "win32" => Ok(Self::Windows),
            "unix" | "linux" | "macos" | "darwin" => Ok(Self::Unix),
            _ => Err(UnsupportedPlatform(s.to_string())),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_kind_is_exact() {
        assert_eq!("BUG".parse::<ChangeKind>(), Ok(ChangeKind::Bug));
        assert!("bug".parse::<ChangeKind>().is_err());
        assert!("FIX".parse::<ChangeKind>().is_err());
    }

    #[test]
    fn test_badge_text() {
        let entry = LogEntry::new(ChangeKind::New, "foo".into(), "Added foo support".into());
        assert_eq!(entry.badge_text(), "NEW  FOO");
        assert_eq!(ChangeKind::New.badge(), BadgeStyle::new("blue", "white"));
        assert_eq!(ChangeKind::Improve.badge().foreground, "black");
    }

    #[test]
    fn test_release_date() {
        let header = VersionHeader::from_timestamp(1_609_459_200, "2.0.1".into()).unwrap();
        assert_eq!(header.release_date(), "01 Jan 2021");
        assert_eq!(header.timestamp_seconds(), 1_609_459_200);
        assert!(VersionHeader::from_timestamp(i64::MAX, "x".into()).is_none());
    }

    #[test]
    fn test_platform_profiles() {
        assert_eq!(Platform::from_family("unix"), Ok(Platform::Unix));
        assert_eq!(Platform::from_family("windows"), Ok(Platform::Windows));
        assert!(Platform::from_family("wasm").is_err());
        assert_eq!("Windows".parse::<Platform>(), Ok(Platform::Windows));
        assert!("solaris-ish".parse::<Platform>().is_err());
        assert_eq!(Platform::Windows.classpath_delimiter(), ';');
        assert_eq!(Platform::Unix.path_separator(), '/');
    }
}
