use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, warn};

use nmrkit_types::Platform;

use crate::error::{ManifestError, Result};
use crate::properties::Properties;

/// Longest physical manifest line, in bytes, excluding the line break
pub const MAX_LINE_BYTES: usize = 72;

/// Platform named on the command line or in config, or the host's when unset
pub fn resolve_platform(name: Option<&str>) -> Result<Platform> {
    let platform = match name {
        Some(name) => name.parse::<Platform>()?,
        None => Platform::detect()?,
    };
    debug!(%platform, "classpath path convention");
    Ok(platform)
}

/// Rewrites a classpath properties file into a manifest fragment
#[derive(Clone, Debug)]
pub struct ManifestFilter {
    platform: Platform,
    key: String,
    lib_dir: String,
    main_class: Option<String>,
}

impl ManifestFilter {
    /// Create a filter for the given platform with default key (`classpath`) and lib dir (`lib`)
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            key: "classpath".to_string(),
            lib_dir: "lib".to_string(),
            main_class: None,
        }
    }

    /// Property holding the classpath listing
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Directory, relative to the JAR, that holds the dependencies
    pub fn with_lib_dir(mut self, lib_dir: impl Into<String>) -> Self {
        self.lib_dir = lib_dir.into();
        self
    }

    /// Also emit a `Main-Class` attribute
    pub fn with_main_class(mut self, main_class: impl Into<String>) -> Self {
        self.main_class = Some(main_class.into());
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Manifest-relative entries for a raw classpath value, in listing order
    pub fn classpath_entries(&self, value: &str) -> Vec<String> {
        let prefix = self.lib_dir.trim_end_matches(['/', '\\']);

        value
            .split(self.platform.classpath_delimiter())
            .map(str::trim)
            .filter_map(|entry| self.file_name(entry))
            .map(|name| {
                if prefix.is_empty() {
                    name.to_string()
                } else {
                    format!("{}/{}", prefix, name)
                }
            })
            .collect()
    }

    fn file_name<'a>(&self, entry: &'a str) -> Option<&'a str> {
        let name = match self.platform {
            // Windows tools emit either separator
            Platform::Windows => entry.rsplit(['\\', '/']).next(),
            Platform::Unix => entry.rsplit(self.platform.path_separator()).next(),
        }?;
        (!name.is_empty()).then_some(name)
    }

    /// Filter properties text into a manifest fragment
    pub fn filter(&self, input: &str) -> Result<String> {
        let properties = Properties::parse(input);
        let value = properties
            .get(&self.key)
            .ok_or_else(|| ManifestError::MissingKey {
                key: self.key.clone(),
            })?;

        let entries = self.classpath_entries(value);
        debug!(
            platform = %self.platform,
            entries = entries.len(),
            "filtered classpath"
        );

        let mut out = String::new();
        if let Some(main_class) = &self.main_class {
            out.push_str(&wrap_manifest_line(&format!("Main-Class: {}", main_class)));
        }
        if entries.is_empty() {
            warn!(key = %self.key, "classpath is empty, no Class-Path attribute written");
        } else {
            out.push_str(&wrap_manifest_line(&format!(
                "Class-Path: {}",
                entries.join(" ")
            )));
        }

        Ok(out)
    }

    /// Filter a properties file from disk
    pub fn filter_file(&self, path: &Path) -> Result<String> {
        let input = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ManifestError::MissingInput {
                path: path.to_path_buf(),
            },
            _ => ManifestError::Io(e),
        })?;
        self.filter(&input)
    }
}

/// Split one attribute into physical lines of at most [`MAX_LINE_BYTES`] bytes.
///
/// Continuation lines start with a single space. Every line, including the
/// last, ends with `\n`. Multi-byte characters are never split.
pub fn wrap_manifest_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len() + line.len() / MAX_LINE_BYTES * 2 + 1);
    let mut rest = line;
    let mut budget = MAX_LINE_BYTES;

    loop {
        if rest.len() <= budget {
            out.push_str(rest);
            out.push('\n');
            return out;
        }

        let mut cut = budget;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        out.push_str(&rest[..cut]);
        out.push_str("\n ");
        rest = &rest[cut..];
        // Leading space of the continuation counts toward the limit
        budget = MAX_LINE_BYTES - 1;
    }
}
