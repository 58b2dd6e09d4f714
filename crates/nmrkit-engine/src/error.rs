use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown command '{verb}' (known commands: {known})")]
    UnknownCommand { verb: String, known: String },

    #[error("invalid command table: {0}")]
    InvalidTable(String),

    #[error("failed to launch engine '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("engine '{program}' exited with {}", describe_exit(.code))]
    Failed { program: String, code: Option<i32> },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("line {line}: syntax error: {reason}")]
    Syntax { line: usize, reason: String },

    #[error("line {line}: unknown operation '{name}'")]
    UnknownOperation { line: usize, name: String },

    #[error("line {line}: {op}: {reason}")]
    Argument {
        line: usize,
        op: String,
        reason: String,
    },

    #[error("line {line}: {reason}")]
    Order { line: usize, reason: String },

    #[error("invalid operation registry: {0}")]
    InvalidRegistry(String),

    #[error("recipe '{}' not found", path.display())]
    MissingInput { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
