//! External engine integration for nmrkit
//!
//! This crate maps command verbs to engine entry points, launches the engine
//! process, and validates processing recipes against the registry of known
//! operations before they are handed over.

mod client;
mod dispatch;
mod error;
mod recipe;
mod registry;

pub use client::{EngineClient, Invocation};
pub use dispatch::{CommandSpec, CommandTable, Target};
pub use error::{EngineError, RecipeError};
pub use recipe::{Call, Recipe, Value};
pub use registry::{Operation, OperationRegistry, OperationSpec, Step};
