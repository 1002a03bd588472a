//! Well-formedness checks over a finished [`Program`].
//!
//! The checker replays the instruction stream against the scope tree: every
//! SCOPE_BEGIN must enter a matching child scope, every jump-like target must
//! resolve, and variables must be declared before instructions use them.

use std::{collections::HashSet, ops::Range};

use ariadne::{ColorGenerator, Label, Report, ReportKind};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::{
    ir::{Instruction, InstructionKind, Metadata, Program},
    scope::{ScopeIndex, ScopeTree},
    symbols::{StructureType, SymbolName},
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckError {
    #[error("SCOPE_END at {index} closes no scope")]
    UnmatchedScopeEnd { index: usize, meta: Metadata },
    #[error("scope {name:?} is never closed")]
    UnclosedScope {
        index: usize,
        meta: Metadata,
        name: String,
    },
    #[error("no {kind} scope {name:?} under the current scope")]
    UnknownScope {
        index: usize,
        meta: Metadata,
        name: String,
        kind: StructureType,
    },
    #[error("jump target {target:?} does not resolve")]
    UnresolvedTarget {
        index: usize,
        meta: Metadata,
        target: String,
    },
    #[error("{target:?} is not a loop")]
    NotALoop {
        index: usize,
        meta: Metadata,
        target: String,
    },
    #[error("variable {name:?} is used before being declared")]
    UndeclaredVariable {
        index: usize,
        meta: Metadata,
        name: String,
    },
    #[error("variable {name:?} is released but not declared in this scope")]
    ReleaseUndeclared {
        index: usize,
        meta: Metadata,
        name: String,
    },
}

impl CheckError {
    /// Position of the offending instruction in the program.
    pub fn index(&self) -> usize {
        match self {
            CheckError::UnmatchedScopeEnd { index, .. }
            | CheckError::UnclosedScope { index, .. }
            | CheckError::UnknownScope { index, .. }
            | CheckError::UnresolvedTarget { index, .. }
            | CheckError::NotALoop { index, .. }
            | CheckError::UndeclaredVariable { index, .. }
            | CheckError::ReleaseUndeclared { index, .. } => *index,
        }
    }

    pub fn meta(&self) -> &Metadata {
        match self {
            CheckError::UnmatchedScopeEnd { meta, .. }
            | CheckError::UnclosedScope { meta, .. }
            | CheckError::UnknownScope { meta, .. }
            | CheckError::UnresolvedTarget { meta, .. }
            | CheckError::NotALoop { meta, .. }
            | CheckError::UndeclaredVariable { meta, .. }
            | CheckError::ReleaseUndeclared { meta, .. } => meta,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            CheckError::UnmatchedScopeEnd { .. } => "UnmatchedScopeEnd",
            CheckError::UnclosedScope { .. } => "UnclosedScope",
            CheckError::UnknownScope { .. } => "UnknownScope",
            CheckError::UnresolvedTarget { .. } => "UnresolvedTarget",
            CheckError::NotALoop { .. } => "NotALoop",
            CheckError::UndeclaredVariable { .. } => "UndeclaredVariable",
            CheckError::ReleaseUndeclared { .. } => "ReleaseUndeclared",
        }
    }
}

struct Frame {
    scope: ScopeIndex,
    /// Index of the SCOPE_BEGIN that opened it.
    opened_at: usize,
    declared: HashSet<String>,
}

struct Checker<'a> {
    tree: &'a ScopeTree,
    frames: Vec<Frame>,
    entered: HashSet<ScopeIndex>,
    /// Parameters of the last FUNCTION, bound by the next function scope.
    params: Vec<String>,
    errors: Vec<CheckError>,
}

/// Runs every check and returns the findings in program order.
#[instrument(level = "debug", skip_all, fields(instructions = program.instructions.len()))]
pub fn check_program(program: &Program) -> Vec<CheckError> {
    let mut checker = Checker {
        tree: &program.scopes,
        frames: vec![Frame {
            scope: program.scopes.root(),
            opened_at: 0,
            declared: HashSet::new(),
        }],
        entered: HashSet::new(),
        params: Vec::new(),
        errors: Vec::new(),
    };

    for (index, instruction) in program.instructions.iter().enumerate() {
        checker.visit(index, instruction);
    }

    while checker.frames.len() > 1 {
        if let Some(frame) = checker.frames.pop() {
            let meta = program.instructions[frame.opened_at].meta().clone();
            checker.errors.push(CheckError::UnclosedScope {
                index: frame.opened_at,
                meta,
                name: checker.tree.unique_name(frame.scope),
            });
        }
    }

    debug!("{} findings", checker.errors.len());
    checker.errors
}

impl Checker<'_> {
    fn current(&self) -> ScopeIndex {
        self.frames.last().map_or(self.tree.root(), |f| f.scope)
    }

    fn is_declared(&self, name: &str) -> bool {
        self.frames.iter().rev().any(|f| f.declared.contains(name))
    }

    fn visit(&mut self, index: usize, instruction: &Instruction) {
        let meta = instruction.meta();

        match instruction.kind() {
            InstructionKind::ScopeBegin { name, kind } => {
                self.enter(index, meta, name, *kind);
                return;
            }
            InstructionKind::ScopeEnd => {
                if self.frames.len() > 1 {
                    self.frames.pop();
                } else {
                    self.errors.push(CheckError::UnmatchedScopeEnd {
                        index,
                        meta: meta.clone(),
                    });
                }
                return;
            }
            InstructionKind::Function { function } => {
                self.params = function.params.iter().map(|p| p.name.clone()).collect();
                return;
            }
            InstructionKind::Declare { symbol } => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.declared.insert(symbol.name().to_string());
                }
                return;
            }
            InstructionKind::VarRelease { name } => {
                let released = self
                    .frames
                    .last_mut()
                    .is_some_and(|frame| frame.declared.remove(name));
                if !released {
                    self.errors.push(CheckError::ReleaseUndeclared {
                        index,
                        meta: meta.clone(),
                        name: name.clone(),
                    });
                }
                return;
            }
            InstructionKind::Break { target } | InstructionKind::Continue { target } => {
                match self.tree.resolve_scope(self.current(), target) {
                    Ok(scope) if self.tree[scope].kind == StructureType::Loop => {}
                    Ok(_) => self.errors.push(CheckError::NotALoop {
                        index,
                        meta: meta.clone(),
                        target: target.clone(),
                    }),
                    Err(_) => self.errors.push(CheckError::UnresolvedTarget {
                        index,
                        meta: meta.clone(),
                        target: target.clone(),
                    }),
                }
            }
            InstructionKind::Jump { .. } | InstructionKind::CondJump { .. } => {
                for target in instruction.scope_targets() {
                    if self.tree.resolve_scope(self.current(), target).is_err() {
                        self.errors.push(CheckError::UnresolvedTarget {
                            index,
                            meta: meta.clone(),
                            target: target.to_string(),
                        });
                    }
                }
            }
            _ => {}
        }

        for name in instruction.variables() {
            if !self.is_declared(name) {
                self.errors.push(CheckError::UndeclaredVariable {
                    index,
                    meta: meta.clone(),
                    name: name.to_string(),
                });
            }
        }
    }

    fn enter(&mut self, index: usize, meta: &Metadata, name: &str, kind: StructureType) {
        let parent = self.current();
        let child = self.tree.children(parent).iter().copied().find(|child| {
            let scope = &self.tree[*child];
            scope.name == name && scope.kind == kind && !self.entered.contains(child)
        });

        let scope = match child {
            Some(child) => {
                self.entered.insert(child);
                child
            }
            None => {
                self.errors.push(CheckError::UnknownScope {
                    index,
                    meta: meta.clone(),
                    name: name.to_string(),
                    kind,
                });
                parent
            }
        };

        let declared = if kind == StructureType::Function {
            std::mem::take(&mut self.params).into_iter().collect()
        } else {
            HashSet::new()
        };
        self.frames.push(Frame {
            scope,
            opened_at: index,
            declared,
        });
    }
}

#[derive(Debug, Clone)]
pub struct FileSpan {
    pub span: Range<usize>,
    pub path: String,
}

impl FileSpan {
    pub fn new(path: String, span: Range<usize>) -> Self {
        Self { path, span }
    }
}

impl ariadne::Span for FileSpan {
    type SourceId = String;

    fn source(&self) -> &Self::SourceId {
        &self.path
    }

    fn start(&self) -> usize {
        self.span.start
    }

    fn end(&self) -> usize {
        self.span.end
    }
}

/// Character range of the token at the 1-based line and column of `meta`.
///
/// Columns count characters, and ariadne indexes sources by character too.
fn span_of(meta: &Metadata, source: &str) -> Range<usize> {
    let (Some(line), Some(column)) = (meta.line, meta.column) else {
        return 0..0;
    };

    let mut offset = 0;
    for (number, text) in source.split_inclusive('\n').enumerate() {
        let width = text.chars().count();
        if number + 1 == line as usize {
            let skip = (column as usize).saturating_sub(1).min(width);
            let len = text
                .chars()
                .skip(skip)
                .take_while(|c| !c.is_whitespace())
                .count();
            let len = if len == 0 && skip < width { 1 } else { len };
            return offset + skip..offset + skip + len;
        }
        offset += width;
    }
    offset..offset
}

/// Creates a report from a check error.
pub fn check_error_to_report(
    error: &CheckError,
    path: &str,
    source: &str,
) -> Report<'static, FileSpan> {
    let mut colors = ColorGenerator::new();
    colors.next();
    let filespan = FileSpan::new(path.to_string(), span_of(error.meta(), source));

    let label = match error {
        CheckError::UnmatchedScopeEnd { .. } => "This closes a scope that was never opened".into(),
        CheckError::UnclosedScope { name, .. } => format!("Scope {name:?} opened here"),
        CheckError::UnknownScope { name, kind, .. } => {
            format!("No {kind} scope {name:?} was created here")
        }
        CheckError::UnresolvedTarget { target, .. } => format!("Target {target:?} not found"),
        CheckError::NotALoop { target, .. } => format!("{target:?} is not a loop"),
        CheckError::UndeclaredVariable { name, .. } => format!("Variable {name:?} not declared"),
        CheckError::ReleaseUndeclared { name, .. } => {
            format!("Variable {name:?} is not declared in this scope")
        }
    };

    Report::build(ReportKind::Error, filespan.clone())
        .with_code(error.code())
        .with_label(
            Label::new(filespan)
                .with_message(label)
                .with_color(colors.next()),
        )
        .with_message(error.to_string())
        .finish()
}
