use std::path::PathBuf;

use crate::symbols::{DataTypeBase, SymbolKind};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScopeError {
    #[error("symbol {name:?} does not exist in scope {scope:?}")]
    MissingSymbol { name: String, scope: String },
    #[error("undefined symbol {name:?}")]
    UndefinedSymbol { name: String, scope: String },
    #[error("undefined scope {name:?}")]
    UndefinedScope { name: String, scope: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassError {
    #[error("class index {index} is not registered")]
    UnknownClass { index: usize },
    #[error("class {name:?} can't be its own parent or interface")]
    SelfReference { name: String },
    #[error("setting {parent:?} as parent of {name:?} would create an inheritance cycle")]
    CyclicParent { name: String, parent: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InstructionError {
    #[error("condition {name:?} must be a bool, found {found}")]
    NonBooleanCondition { name: String, found: DataTypeBase },
    #[error("opcode {opcode} can't carry a call")]
    NotCallLike { opcode: String },
    #[error("opcode {code:#04x} is outside the extension range")]
    ReservedOpcode { code: u16 },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuilderError {
    #[error(transparent)]
    Scope(#[from] ScopeError),
    #[error(transparent)]
    Class(#[from] ClassError),
    #[error(transparent)]
    Instruction(#[from] InstructionError),
    #[error("symbol {name:?} is already defined in scope {scope:?}")]
    Redefinition { name: String, scope: String },
    #[error("expected {expected} {name:?}, found {found}")]
    UnexpectedSymbol {
        name: String,
        expected: SymbolKind,
        found: SymbolKind,
    },
    #[error("{opcode} can only be emitted through its dedicated builder method")]
    StructuralInstruction { opcode: String },
    #[error("scope end without an open scope")]
    UnbalancedScopeEnd,
    #[error("scope {scope:?} was never closed")]
    UnclosedScope { scope: String },
    #[error("{name:?} is not a loop scope")]
    NotALoop { name: String },
    #[error("library {library:?} must be registered before any program code")]
    LateLibraryRegistration { library: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] toml::de::Error),
    #[error("profile {0:?} is not defined")]
    MissingProfile(String),
}
