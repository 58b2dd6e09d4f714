//! Launching the external engine process

use std::path::Path;

use tracing::{debug, info};

use crate::dispatch::Target;
use crate::error::EngineError;

/// Fully resolved engine command line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// Shell-style rendering for dry runs and logs
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

/// Engine launcher wrapper
#[derive(Clone, Debug)]
pub struct EngineClient {
    program: String,
    base_args: Vec<String>,
}

impl EngineClient {
    /// `program` is started with `base_args` ahead of every invocation
    pub fn new(program: impl Into<String>, base_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            base_args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Command line for a resolved dispatch target; `args` are forwarded verbatim
    pub fn invocation(&self, target: &Target, args: &[String]) -> Invocation {
        let mut full = self.base_args.clone();
        full.push(target.engine_arg());
        full.extend(args.iter().cloned());

        Invocation {
            program: self.program.clone(),
            args: full,
        }
    }

    /// Command line that hands a recipe file to the engine's processing entry point
    pub fn recipe_invocation(&self, entry: &str, recipe: &Path) -> Invocation {
        let target = Target::Entry {
            name: entry.to_string(),
            entry: entry.to_string(),
        };
        self.invocation(&target, &[recipe.display().to_string()])
    }

    /// Run the engine with inherited stdio and wait for it to exit
    pub async fn run(&self, invocation: &Invocation) -> Result<(), EngineError> {
        info!(command = %invocation.command_line(), "launching engine");

        let status = tokio::process::Command::new(&invocation.program)
            .args(&invocation.args)
            .status()
            .await
            .map_err(|source| EngineError::Launch {
                program: invocation.program.clone(),
                source,
            })?;

        debug!(?status, "engine exited");
        if status.success() {
            Ok(())
        } else {
            Err(EngineError::Failed {
                program: invocation.program.clone(),
                code: status.code(),
            })
        }
    }
}
