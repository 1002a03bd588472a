use std::{fmt, sync::Arc};

use educe::Educe;
use itertools::Itertools;

pub mod builder;
mod opcode;
mod operands;

pub use opcode::{ControlOp, ExtensionOpcode, IROpCode, MetaOp, ObjectOp, OpcodeBand, ValueOp};
pub use operands::Operand;

use crate::{
    errors::InstructionError,
    library::NativeRegistry,
    scope::ScopeTree,
    symbols::{
        ClassSymbol, ClassTable, DataTypeBase, Function, Reference, Slot, StructureType,
        SymbolName, ValueRef, Variable,
    },
};

/// A finished compilation unit, ready for the backend.
#[derive(Debug, Clone)]
pub struct Program {
    pub instructions: Vec<Instruction>,
    pub scopes: ScopeTree,
    pub classes: ClassTable,
    /// Native handlers of the loaded libraries.
    pub natives: NativeRegistry,
}

/// Source position and debug flag of an instruction. Never part of its
/// identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Metadata {
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub filename: Option<Arc<str>>,
    pub debug: bool,
}

impl Metadata {
    pub fn new(line: u32, column: u32) -> Self {
        Self {
            line: Some(line),
            column: Some(column),
            ..Default::default()
        }
    }

    pub fn with_filename(mut self, filename: impl Into<Arc<str>>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filename = self.filename.as_deref().unwrap_or("<unknown>");
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, "{filename}:{line}:{column}"),
            (Some(line), None) => write!(f, "{filename}:{line}"),
            _ => write!(f, "{filename}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UnOp {
    Neg,
    Not,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// The operation and operands of an instruction; one variant per opcode.
#[derive(Debug, Clone, Educe)]
#[educe(PartialEq, Eq, Hash)]
pub enum InstructionKind {
    /// Unconditional jump to the named scope.
    Jump { target: String },
    /// Jumps to `if_true` when the condition holds, else to `if_false` or falls through.
    CondJump {
        condition: Reference<Variable>,
        if_true: String,
        if_false: Option<String>,
    },
    Function { function: Reference<Function> },
    /// A call, also the shape of call-like extension opcodes.
    Call {
        /// Not part of the instruction identity.
        #[educe(PartialEq(ignore), Hash(ignore))]
        opcode: IROpCode,
        result: Slot,
        function: Reference<Function>,
        args: Vec<ValueRef>,
    },
    Return { value: Option<ValueRef> },
    ScopeBegin { name: String, kind: StructureType },
    ScopeEnd,
    /// Leaves the named loop scope.
    Break { target: String },
    /// Starts the next iteration of the named loop scope.
    Continue { target: String },
    Declare { symbol: Slot },
    VarRelease { name: String },
    Assign { target: Slot, source: ValueRef },
    UnaryOp {
        result: Slot,
        op: UnOp,
        operand: ValueRef,
    },
    Op {
        result: Slot,
        op: BinOp,
        left: ValueRef,
        right: ValueRef,
    },
    Compare {
        result: Slot,
        op: CmpOp,
        left: ValueRef,
        right: ValueRef,
    },
    /// `target` is either a primitive or a class.
    Cast {
        result: Slot,
        target: DataTypeBase,
        value: ValueRef,
    },
    Class { class: ClassSymbol },
    NewObj {
        result: Slot,
        class: ClassSymbol,
        args: Vec<ValueRef>,
    },
    GetField {
        result: Slot,
        object: ValueRef,
        field: String,
    },
    SetField {
        object: Reference<Variable>,
        field: String,
        value: ValueRef,
    },
    CallMethod {
        result: Slot,
        object: ValueRef,
        method: Reference<Function>,
        args: Vec<ValueRef>,
    },
    /// A verbatim target language fragment, opaque to every IR pass.
    RawCmd { command: ValueRef },
    /// A debug checkpoint, its payload is the instruction metadata.
    DebugInfo,
    /// A user defined opcode taking plain value operands.
    Extension {
        opcode: ExtensionOpcode,
        operands: Vec<ValueRef>,
    },
}

/// One IR statement.
///
/// Immutable once built. Two instructions are equal (and hash equal) iff their
/// opcode and operands are; the metadata is ignored.
#[derive(Debug, Clone, Educe)]
#[educe(PartialEq, Eq, Hash)]
pub struct Instruction {
    kind: InstructionKind,
    #[educe(PartialEq(ignore), Hash(ignore))]
    meta: Metadata,
}

impl Instruction {
    /// Builds an instruction after checking the operand contract of its kind.
    pub fn new(kind: InstructionKind, meta: Metadata) -> Result<Self, InstructionError> {
        match &kind {
            InstructionKind::CondJump { condition, .. } if !condition.dtype.is_boolean() => {
                return Err(InstructionError::NonBooleanCondition {
                    name: condition.name.clone(),
                    found: condition.dtype,
                });
            }
            InstructionKind::Call { opcode, .. } if !opcode.is_call_like() => {
                return Err(InstructionError::NotCallLike {
                    opcode: opcode.to_string(),
                });
            }
            _ => {}
        }

        Ok(Self { kind, meta })
    }

    /// For kinds without an operand contract to check.
    fn unchecked(kind: InstructionKind) -> Self {
        Self {
            kind,
            meta: Metadata::default(),
        }
    }

    pub fn jump(target: impl Into<String>) -> Self {
        Self::unchecked(InstructionKind::Jump {
            target: target.into(),
        })
    }

    /// Fails unless the condition is a bool.
    pub fn cond_jump(
        condition: Reference<Variable>,
        if_true: impl Into<String>,
        if_false: Option<String>,
    ) -> Result<Self, InstructionError> {
        Self::new(
            InstructionKind::CondJump {
                condition,
                if_true: if_true.into(),
                if_false,
            },
            Metadata::default(),
        )
    }

    pub fn function(function: Reference<Function>) -> Self {
        Self::unchecked(InstructionKind::Function { function })
    }

    pub fn call(result: impl Into<Slot>, function: Reference<Function>, args: Vec<ValueRef>) -> Self {
        Self::unchecked(InstructionKind::Call {
            opcode: IROpCode::CALL,
            result: result.into(),
            function,
            args,
        })
    }

    /// A call carrying another call-like opcode.
    pub fn call_as(
        opcode: IROpCode,
        result: impl Into<Slot>,
        function: Reference<Function>,
        args: Vec<ValueRef>,
    ) -> Result<Self, InstructionError> {
        Self::new(
            InstructionKind::Call {
                opcode,
                result: result.into(),
                function,
                args,
            },
            Metadata::default(),
        )
    }

    pub fn ret(value: Option<ValueRef>) -> Self {
        Self::unchecked(InstructionKind::Return { value })
    }

    pub fn scope_begin(name: impl Into<String>, kind: StructureType) -> Self {
        Self::unchecked(InstructionKind::ScopeBegin {
            name: name.into(),
            kind,
        })
    }

    pub fn scope_end() -> Self {
        Self::unchecked(InstructionKind::ScopeEnd)
    }

    pub fn break_(target: impl Into<String>) -> Self {
        Self::unchecked(InstructionKind::Break {
            target: target.into(),
        })
    }

    pub fn continue_(target: impl Into<String>) -> Self {
        Self::unchecked(InstructionKind::Continue {
            target: target.into(),
        })
    }

    pub fn declare(symbol: impl Into<Slot>) -> Self {
        Self::unchecked(InstructionKind::Declare {
            symbol: symbol.into(),
        })
    }

    pub fn var_release(name: impl Into<String>) -> Self {
        Self::unchecked(InstructionKind::VarRelease { name: name.into() })
    }

    pub fn assign(target: impl Into<Slot>, source: impl Into<ValueRef>) -> Self {
        Self::unchecked(InstructionKind::Assign {
            target: target.into(),
            source: source.into(),
        })
    }

    pub fn unary_op(result: impl Into<Slot>, op: UnOp, operand: impl Into<ValueRef>) -> Self {
        Self::unchecked(InstructionKind::UnaryOp {
            result: result.into(),
            op,
            operand: operand.into(),
        })
    }

    pub fn op(
        result: impl Into<Slot>,
        op: BinOp,
        left: impl Into<ValueRef>,
        right: impl Into<ValueRef>,
    ) -> Self {
        Self::unchecked(InstructionKind::Op {
            result: result.into(),
            op,
            left: left.into(),
            right: right.into(),
        })
    }

    pub fn compare(
        result: impl Into<Slot>,
        op: CmpOp,
        left: impl Into<ValueRef>,
        right: impl Into<ValueRef>,
    ) -> Self {
        Self::unchecked(InstructionKind::Compare {
            result: result.into(),
            op,
            left: left.into(),
            right: right.into(),
        })
    }

    pub fn cast(
        result: impl Into<Slot>,
        target: impl Into<DataTypeBase>,
        value: impl Into<ValueRef>,
    ) -> Self {
        Self::unchecked(InstructionKind::Cast {
            result: result.into(),
            target: target.into(),
            value: value.into(),
        })
    }

    pub fn class(class: ClassSymbol) -> Self {
        Self::unchecked(InstructionKind::Class { class })
    }

    pub fn new_obj(result: impl Into<Slot>, class: ClassSymbol, args: Vec<ValueRef>) -> Self {
        Self::unchecked(InstructionKind::NewObj {
            result: result.into(),
            class,
            args,
        })
    }

    pub fn get_field(
        result: impl Into<Slot>,
        object: impl Into<ValueRef>,
        field: impl Into<String>,
    ) -> Self {
        Self::unchecked(InstructionKind::GetField {
            result: result.into(),
            object: object.into(),
            field: field.into(),
        })
    }

    pub fn set_field(
        object: Reference<Variable>,
        field: impl Into<String>,
        value: impl Into<ValueRef>,
    ) -> Self {
        Self::unchecked(InstructionKind::SetField {
            object,
            field: field.into(),
            value: value.into(),
        })
    }

    pub fn call_method(
        result: impl Into<Slot>,
        object: impl Into<ValueRef>,
        method: Reference<Function>,
        args: Vec<ValueRef>,
    ) -> Self {
        Self::unchecked(InstructionKind::CallMethod {
            result: result.into(),
            object: object.into(),
            method,
            args,
        })
    }

    pub fn raw_cmd(command: impl Into<ValueRef>) -> Self {
        Self::unchecked(InstructionKind::RawCmd {
            command: command.into(),
        })
    }

    pub fn debug_info() -> Self {
        Self::unchecked(InstructionKind::DebugInfo)
    }

    pub fn extension(opcode: ExtensionOpcode, operands: Vec<ValueRef>) -> Self {
        Self::unchecked(InstructionKind::Extension { opcode, operands })
    }

    /// The same instruction at another source position.
    pub fn with_meta(mut self, meta: Metadata) -> Self {
        self.meta = meta;
        self
    }

    pub fn kind(&self) -> &InstructionKind {
        &self.kind
    }

    pub fn meta(&self) -> &Metadata {
        &self.meta
    }

    pub fn opcode(&self) -> IROpCode {
        match &self.kind {
            InstructionKind::Jump { .. } => IROpCode::JUMP,
            InstructionKind::CondJump { .. } => IROpCode::COND_JUMP,
            InstructionKind::Function { .. } => IROpCode::FUNCTION,
            InstructionKind::Call { opcode, .. } => *opcode,
            InstructionKind::Return { .. } => IROpCode::RETURN,
            InstructionKind::ScopeBegin { .. } => IROpCode::SCOPE_BEGIN,
            InstructionKind::ScopeEnd => IROpCode::SCOPE_END,
            InstructionKind::Break { .. } => IROpCode::BREAK,
            InstructionKind::Continue { .. } => IROpCode::CONTINUE,
            InstructionKind::Declare { .. } => IROpCode::DECLARE,
            InstructionKind::VarRelease { .. } => IROpCode::VAR_RELEASE,
            InstructionKind::Assign { .. } => IROpCode::ASSIGN,
            InstructionKind::UnaryOp { .. } => IROpCode::UNARY_OP,
            InstructionKind::Op { .. } => IROpCode::OP,
            InstructionKind::Compare { .. } => IROpCode::COMPARE,
            InstructionKind::Cast { .. } => IROpCode::CAST,
            InstructionKind::Class { .. } => IROpCode::CLASS,
            InstructionKind::NewObj { .. } => IROpCode::NEW_OBJ,
            InstructionKind::GetField { .. } => IROpCode::GET_FIELD,
            InstructionKind::SetField { .. } => IROpCode::SET_FIELD,
            InstructionKind::CallMethod { .. } => IROpCode::CALL_METHOD,
            InstructionKind::RawCmd { .. } => IROpCode::RAW_CMD,
            InstructionKind::DebugInfo => IROpCode::DEBUG_INFO,
            InstructionKind::Extension { opcode, .. } => IROpCode::Extension(*opcode),
        }
    }

    /// Scope names this instruction transfers control to.
    pub fn scope_targets(&self) -> Vec<&str> {
        self.operands()
            .into_iter()
            .filter_map(|op| match op {
                Operand::ScopeName(name) => Some(name),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for UnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnOp::Neg => write!(f, "-"),
            UnOp::Not => write!(f, "!"),
            UnOp::BitNot => write!(f, "~"),
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinOp::Add => write!(f, "+"),
            BinOp::Sub => write!(f, "-"),
            BinOp::Mul => write!(f, "*"),
            BinOp::Div => write!(f, "/"),
            BinOp::Mod => write!(f, "%"),
            BinOp::Pow => write!(f, "**"),
            BinOp::And => write!(f, "&&"),
            BinOp::Or => write!(f, "||"),
            BinOp::BitAnd => write!(f, "&"),
            BinOp::BitOr => write!(f, "|"),
            BinOp::BitXor => write!(f, "^"),
            BinOp::Shl => write!(f, "<<"),
            BinOp::Shr => write!(f, ">>"),
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CmpOp::Eq => write!(f, "=="),
            CmpOp::Ne => write!(f, "!="),
            CmpOp::Lt => write!(f, "<"),
            CmpOp::Le => write!(f, "<="),
            CmpOp::Gt => write!(f, ">"),
            CmpOp::Ge => write!(f, ">="),
        }
    }
}

/// `OPCODE(operand, ..)`, prefixed with the numeric opcode in alternate mode.
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opcode = self.opcode();
        if f.alternate() {
            write!(f, "{:#04x} ", opcode.code())?;
        }
        write!(f, "{opcode}({})", self.operands().iter().join(", "))
    }
}

/// One instruction per line, indented by scope nesting.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut depth = 0usize;
        for instruction in &self.instructions {
            if matches!(instruction.kind(), InstructionKind::ScopeEnd) {
                depth = depth.saturating_sub(1);
            }
            writeln!(f, "{}{instruction}", "  ".repeat(depth))?;
            if matches!(instruction.kind(), InstructionKind::ScopeBegin { .. }) {
                depth += 1;
            }
        }
        Ok(())
    }
}

impl Program {
    /// Functions declared in the global scope, including library ones.
    pub fn global_functions(&self) -> impl Iterator<Item = Reference<Function>> + '_ {
        self.scopes[self.scopes.root()]
            .symbols()
            .values()
            .filter_map(|symbol| symbol.as_function())
            .sorted_by(|a, b| a.name().cmp(b.name()))
    }
}

#[cfg(test)]
mod tests {
    use std::hash::{BuildHasher, RandomState};

    use super::*;
    use crate::symbols::{ConstValue, DataType};

    #[test]
    fn metadata_is_not_identity() {
        let x = Reference::new(Variable::new("x", DataType::Int));
        let a = Instruction::assign(x.clone(), ConstValue::Int(1)).with_meta(Metadata::new(1, 2));
        let b = Instruction::assign(x, ConstValue::Int(1))
            .with_meta(Metadata::new(9, 9).with_filename("other.src").with_debug(true));

        let state = RandomState::new();
        assert_eq!(a, b);
        assert_eq!(state.hash_one(&a), state.hash_one(&b));
        assert_ne!(a.meta(), b.meta());
    }

    #[test]
    fn operand_change_breaks_equality() {
        let x = Reference::new(Variable::new("x", DataType::Int));
        let a = Instruction::assign(x.clone(), ConstValue::Int(1));
        let b = Instruction::assign(x, ConstValue::Int(2));

        let state = RandomState::new();
        assert_ne!(a, b);
        assert_ne!(state.hash_one(&a), state.hash_one(&b));
    }

    #[test]
    fn call_opcode_must_be_call_like() {
        let result = Reference::new(Variable::new("r", DataType::Int));
        let f = Reference::new(Function::new("f", DataType::Int));

        let err = Instruction::call_as(IROpCode::JUMP, result, f, vec![]).unwrap_err();
        assert!(matches!(err, InstructionError::NotCallLike { .. }));
    }

    #[test]
    fn display_listing() {
        let x = Reference::new(Variable::new("x", DataType::Int));
        let instruction = Instruction::op(x.clone(), BinOp::Add, x, ConstValue::Int(1));

        assert_eq!(instruction.to_string(), "OP(x, +, x, 1)");
        assert_eq!(format!("{instruction:#}"), "0x24 OP(x, +, x, 1)");
        assert_eq!(Instruction::scope_end().to_string(), "SCOPE_END()");
    }

    #[test]
    fn metadata_display() {
        let meta = Metadata::new(3, 7).with_filename("main.src");
        assert_eq!(meta.to_string(), "main.src:3:7");
        assert_eq!(Metadata::default().to_string(), "<unknown>");
    }
}
