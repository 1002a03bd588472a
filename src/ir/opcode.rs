use std::fmt;

use crate::errors::InstructionError;

/// Control flow opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ControlOp {
    Jump,
    CondJump,
    Function,
    Call,
    Return,
    ScopeBegin,
    ScopeEnd,
    Break,
    Continue,
}

/// Variable and value opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueOp {
    Declare,
    VarRelease,
    Assign,
    UnaryOp,
    Op,
    Compare,
    Cast,
}

/// Object orientation opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectOp {
    Class,
    NewObj,
    GetField,
    SetField,
    CallMethod,
}

/// Escape hatches and debug markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetaOp {
    RawCmd,
    DebugInfo,
}

/// A user defined opcode, always at or above [`ExtensionOpcode::FIRST`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExtensionOpcode(u16);

impl ExtensionOpcode {
    pub const FIRST: u16 = 0x80;

    pub fn new(code: u16) -> Result<Self, InstructionError> {
        if code < Self::FIRST {
            return Err(InstructionError::ReservedOpcode { code });
        }
        Ok(Self(code))
    }

    pub fn code(&self) -> u16 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OpcodeBand {
    Control,
    Value,
    Object,
    Meta,
    Extension,
}

/// The closed opcode space, grouped by band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IROpCode {
    Control(ControlOp),
    Value(ValueOp),
    Object(ObjectOp),
    Meta(MetaOp),
    Extension(ExtensionOpcode),
}

impl IROpCode {
    pub const JUMP: Self = Self::Control(ControlOp::Jump);
    pub const COND_JUMP: Self = Self::Control(ControlOp::CondJump);
    pub const FUNCTION: Self = Self::Control(ControlOp::Function);
    pub const CALL: Self = Self::Control(ControlOp::Call);
    pub const RETURN: Self = Self::Control(ControlOp::Return);
    pub const SCOPE_BEGIN: Self = Self::Control(ControlOp::ScopeBegin);
    pub const SCOPE_END: Self = Self::Control(ControlOp::ScopeEnd);
    pub const BREAK: Self = Self::Control(ControlOp::Break);
    pub const CONTINUE: Self = Self::Control(ControlOp::Continue);
    pub const DECLARE: Self = Self::Value(ValueOp::Declare);
    pub const VAR_RELEASE: Self = Self::Value(ValueOp::VarRelease);
    pub const ASSIGN: Self = Self::Value(ValueOp::Assign);
    pub const UNARY_OP: Self = Self::Value(ValueOp::UnaryOp);
    pub const OP: Self = Self::Value(ValueOp::Op);
    pub const COMPARE: Self = Self::Value(ValueOp::Compare);
    pub const CAST: Self = Self::Value(ValueOp::Cast);
    pub const CLASS: Self = Self::Object(ObjectOp::Class);
    pub const NEW_OBJ: Self = Self::Object(ObjectOp::NewObj);
    pub const GET_FIELD: Self = Self::Object(ObjectOp::GetField);
    pub const SET_FIELD: Self = Self::Object(ObjectOp::SetField);
    pub const CALL_METHOD: Self = Self::Object(ObjectOp::CallMethod);
    pub const RAW_CMD: Self = Self::Meta(MetaOp::RawCmd);
    pub const DEBUG_INFO: Self = Self::Meta(MetaOp::DebugInfo);

    pub fn band(&self) -> OpcodeBand {
        match self {
            IROpCode::Control(_) => OpcodeBand::Control,
            IROpCode::Value(_) => OpcodeBand::Value,
            IROpCode::Object(_) => OpcodeBand::Object,
            IROpCode::Meta(_) => OpcodeBand::Meta,
            IROpCode::Extension(_) => OpcodeBand::Extension,
        }
    }

    /// Opcodes whose instruction has the CALL shape.
    pub fn is_call_like(&self) -> bool {
        matches!(self, IROpCode::Control(ControlOp::Call) | IROpCode::Extension(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            IROpCode::Control(op) => match op {
                ControlOp::Jump => "JUMP",
                ControlOp::CondJump => "COND_JUMP",
                ControlOp::Function => "FUNCTION",
                ControlOp::Call => "CALL",
                ControlOp::Return => "RETURN",
                ControlOp::ScopeBegin => "SCOPE_BEGIN",
                ControlOp::ScopeEnd => "SCOPE_END",
                ControlOp::Break => "BREAK",
                ControlOp::Continue => "CONTINUE",
            },
            IROpCode::Value(op) => match op {
                ValueOp::Declare => "DECLARE",
                ValueOp::VarRelease => "VAR_RELEASE",
                ValueOp::Assign => "ASSIGN",
                ValueOp::UnaryOp => "UNARY_OP",
                ValueOp::Op => "OP",
                ValueOp::Compare => "COMPARE",
                ValueOp::Cast => "CAST",
            },
            IROpCode::Object(op) => match op {
                ObjectOp::Class => "CLASS",
                ObjectOp::NewObj => "NEW_OBJ",
                ObjectOp::GetField => "GET_FIELD",
                ObjectOp::SetField => "SET_FIELD",
                ObjectOp::CallMethod => "CALL_METHOD",
            },
            IROpCode::Meta(op) => match op {
                MetaOp::RawCmd => "RAW_CMD",
                MetaOp::DebugInfo => "DEBUG_INFO",
            },
            IROpCode::Extension(_) => "EXT",
        }
    }

    /// Position in the numeric opcode table. Bands start at 0x00, 0x20, 0x40,
    /// 0x60 and 0x80, leaving room to grow each band in place.
    pub(crate) fn code(&self) -> u16 {
        match self {
            IROpCode::Control(op) => *op as u16,
            IROpCode::Value(op) => 0x20 + *op as u16,
            IROpCode::Object(op) => 0x40 + *op as u16,
            IROpCode::Meta(op) => 0x60 + *op as u16,
            IROpCode::Extension(op) => op.code(),
        }
    }
}

impl fmt::Display for IROpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IROpCode::Extension(op) => write!(f, "EXT({:#x})", op.code()),
            op => write!(f, "{}", op.name()),
        }
    }
}
