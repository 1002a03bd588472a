use std::fmt;

use crate::symbols::{
    ClassSymbol, DataTypeBase, Function, Reference, Slot, StructureType, ValueRef, Variable,
};

use super::{BinOp, CmpOp, Instruction, InstructionKind, UnOp};

/// A borrowed view of one operand, for passes that walk every instruction
/// the same way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand<'a> {
    /// A scope a jump-like instruction targets.
    ScopeName(&'a str),
    /// A plain name: scope being opened, released variable, object field.
    Name(&'a str),
    Structure(StructureType),
    Slot(&'a Slot),
    Value(&'a ValueRef),
    Variable(&'a Reference<Variable>),
    Function(&'a Reference<Function>),
    Class(&'a ClassSymbol),
    Type(&'a DataTypeBase),
    UnOp(UnOp),
    BinOp(BinOp),
    CmpOp(CmpOp),
}

impl Instruction {
    /// Operands in schema order. Argument lists are flattened in place and
    /// absent optional operands are skipped.
    pub fn operands(&self) -> Vec<Operand<'_>> {
        match self.kind() {
            InstructionKind::Jump { target }
            | InstructionKind::Break { target }
            | InstructionKind::Continue { target } => vec![Operand::ScopeName(target)],
            InstructionKind::CondJump {
                condition,
                if_true,
                if_false,
            } => {
                let mut ops = vec![Operand::Variable(condition), Operand::ScopeName(if_true)];
                ops.extend(if_false.as_deref().map(Operand::ScopeName));
                ops
            }
            InstructionKind::Function { function } => vec![Operand::Function(function)],
            InstructionKind::Call {
                result,
                function,
                args,
                ..
            } => std::iter::once(Operand::Slot(result))
                .chain(std::iter::once(Operand::Function(function)))
                .chain(args.iter().map(Operand::Value))
                .collect(),
            InstructionKind::Return { value } => value.iter().map(Operand::Value).collect(),
            InstructionKind::ScopeBegin { name, kind } => {
                vec![Operand::Name(name), Operand::Structure(*kind)]
            }
            InstructionKind::ScopeEnd | InstructionKind::DebugInfo => Vec::new(),
            InstructionKind::Declare { symbol } => vec![Operand::Slot(symbol)],
            InstructionKind::VarRelease { name } => vec![Operand::Name(name)],
            InstructionKind::Assign { target, source } => {
                vec![Operand::Slot(target), Operand::Value(source)]
            }
            InstructionKind::UnaryOp {
                result,
                op,
                operand,
            } => vec![
                Operand::Slot(result),
                Operand::UnOp(*op),
                Operand::Value(operand),
            ],
            InstructionKind::Op {
                result,
                op,
                left,
                right,
            } => vec![
                Operand::Slot(result),
                Operand::BinOp(*op),
                Operand::Value(left),
                Operand::Value(right),
            ],
            InstructionKind::Compare {
                result,
                op,
                left,
                right,
            } => vec![
                Operand::Slot(result),
                Operand::CmpOp(*op),
                Operand::Value(left),
                Operand::Value(right),
            ],
            InstructionKind::Cast {
                result,
                target,
                value,
            } => vec![
                Operand::Slot(result),
                Operand::Type(target),
                Operand::Value(value),
            ],
            InstructionKind::Class { class } => vec![Operand::Class(class)],
            InstructionKind::NewObj {
                result,
                class,
                args,
            } => std::iter::once(Operand::Slot(result))
                .chain(std::iter::once(Operand::Class(class)))
                .chain(args.iter().map(Operand::Value))
                .collect(),
            InstructionKind::GetField {
                result,
                object,
                field,
            } => vec![
                Operand::Slot(result),
                Operand::Value(object),
                Operand::Name(field),
            ],
            InstructionKind::SetField {
                object,
                field,
                value,
            } => vec![
                Operand::Variable(object),
                Operand::Name(field),
                Operand::Value(value),
            ],
            InstructionKind::CallMethod {
                result,
                object,
                method,
                args,
            } => [
                Operand::Slot(result),
                Operand::Value(object),
                Operand::Function(method),
            ]
            .into_iter()
            .chain(args.iter().map(Operand::Value))
            .collect(),
            InstructionKind::RawCmd { command } => vec![Operand::Value(command)],
            InstructionKind::Extension { operands, .. } => {
                operands.iter().map(Operand::Value).collect()
            }
        }
    }

    /// Names of the variables this instruction reads or writes.
    pub fn variables(&self) -> Vec<&str> {
        self.operands()
            .into_iter()
            .filter_map(|op| match op {
                Operand::Variable(var) => Some(var.resolve().name.as_str()),
                Operand::Slot(Slot::Variable(var)) => Some(var.resolve().name.as_str()),
                Operand::Value(ValueRef::Variable(var)) => Some(var.resolve().name.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::ScopeName(name) | Operand::Name(name) => write!(f, "{name}"),
            Operand::Structure(kind) => write!(f, "{kind}"),
            Operand::Slot(slot) => write!(f, "{slot}"),
            Operand::Value(value) => write!(f, "{value}"),
            Operand::Variable(var) => write!(f, "{}", var.name),
            Operand::Function(func) => write!(f, "{}", func.name),
            Operand::Class(class) => write!(f, "{class}"),
            Operand::Type(ty) => write!(f, "{ty}"),
            Operand::UnOp(op) => write!(f, "{op}"),
            Operand::BinOp(op) => write!(f, "{op}"),
            Operand::CmpOp(op) => write!(f, "{op}"),
        }
    }
}
