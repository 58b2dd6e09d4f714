//! Build manifest filtering for nmrkit
//!
//! Turns the classpath listing a build tool writes into a properties file
//! into the `Class-Path` section of a JAR manifest.

mod error;
mod filter;
mod properties;

pub use error::{ManifestError, Result};
pub use filter::{MAX_LINE_BYTES, ManifestFilter, resolve_platform, wrap_manifest_line};
pub use properties::Properties;

pub use nmrkit_types::{Platform, UnsupportedPlatform};
