use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::EngineError;

/// Verbs shipped with the engine, with the entry point each one maps to
const BUILTIN_COMMANDS: [(&str, &str, &str); 7] = [
    ("batch", "batch", "Run a batch of structure calculations"),
    ("gen", "gen", "Generate structures from a project description"),
    ("predict", "predict", "Predict chemical shifts for a molecule"),
    ("score", "score", "Score structures against experimental restraints"),
    ("summary", "summary", "Summarize a set of calculated structures"),
    ("super", "super", "Superimpose calculated structures"),
    ("train", "train", "Train prediction parameters"),
];

/// One entry of the dispatch table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    /// Verb typed on the command line
    pub name: String,

    /// Engine entry point the verb forwards to
    pub entry: String,

    /// One-line description
    pub about: String,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>, entry: impl Into<String>, about: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entry: entry.into(),
            about: about.into(),
        }
    }
}

/// What a verb resolved to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// A named engine entry point
    Entry { name: String, entry: String },

    /// A script file handed to the engine as-is
    Script(PathBuf),
}

impl Target {
    /// Argument naming the target on the engine command line
    pub fn engine_arg(&self) -> String {
        match self {
            Self::Entry { entry, .. } => entry.clone(),
            Self::Script(path) => path.display().to_string(),
        }
    }
}

/// Validated mapping from verb to engine entry point
#[derive(Clone, Debug)]
pub struct CommandTable {
    commands: BTreeMap<String, CommandSpec>,
}

impl CommandTable {
    /// Table with the built-in verbs, checked like any other table
    pub fn builtin() -> Result<Self, EngineError> {
        Self::from_specs(
            BUILTIN_COMMANDS
                .iter()
                .map(|(name, entry, about)| CommandSpec::new(*name, *entry, *about)),
        )
    }

    /// Build a table, rejecting blank names or entries and duplicate verbs
    pub fn from_specs(specs: impl IntoIterator<Item = CommandSpec>) -> Result<Self, EngineError> {
        let mut seen = HashSet::new();
        let mut commands = BTreeMap::new();

        for spec in specs {
            Self::validate(&spec)?;
            if !seen.insert(spec.name.clone()) {
                return Err(EngineError::InvalidTable(format!(
                    "command '{}' is defined more than once",
                    spec.name
                )));
            }
            commands.insert(spec.name.clone(), spec);
        }

        Ok(Self { commands })
    }

    /// Apply `verb = entry` overrides: existing verbs are re-pointed, new ones added
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, String>) -> Result<Self, EngineError> {
        for (name, entry) in overrides {
            let spec = match self.commands.get(name) {
                Some(existing) => CommandSpec::new(name, entry, existing.about.clone()),
                None => CommandSpec::new(name, entry, "Configured engine entry point"),
            };
            Self::validate(&spec)?;
            debug!(verb = %name, entry = %entry, "command override");
            self.commands.insert(name.clone(), spec);
        }
        Ok(self)
    }

    fn validate(spec: &CommandSpec) -> Result<(), EngineError> {
        if spec.name.trim().is_empty() {
            return Err(EngineError::InvalidTable("command name is empty".into()));
        }
        if spec.name.chars().any(char::is_whitespace) {
            return Err(EngineError::InvalidTable(format!(
                "command name '{}' contains whitespace",
                spec.name
            )));
        }
        if spec.entry.trim().is_empty() {
            return Err(EngineError::InvalidTable(format!(
                "command '{}' has an empty entry point",
                spec.name
            )));
        }
        Ok(())
    }

    /// Resolve a verb: table first, then an existing script file
    pub fn resolve(&self, verb: &str) -> Result<Target, EngineError> {
        if let Some(spec) = self.commands.get(verb) {
            return Ok(Target::Entry {
                name: spec.name.clone(),
                entry: spec.entry.clone(),
            });
        }

        let path = Path::new(verb);
        if path.is_file() {
            return Ok(Target::Script(path.to_path_buf()));
        }

        Err(EngineError::UnknownCommand {
            verb: verb.to_string(),
            known: self.names().collect::<Vec<_>>().join(", "),
        })
    }

    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Specs sorted by verb
    pub fn iter(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
