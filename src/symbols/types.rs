use std::fmt;

use super::ClassIndex;

/// Primitive data types of the source language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DataType {
    Int,
    Float,
    Boolean,
    String,
    Null,
    /// Return type of functions that produce no value.
    Void,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int => write!(f, "int"),
            DataType::Float => write!(f, "float"),
            DataType::Boolean => write!(f, "bool"),
            DataType::String => write!(f, "string"),
            DataType::Null => write!(f, "null"),
            DataType::Void => write!(f, "void"),
        }
    }
}

/// Anything usable where a type is expected: a primitive or a class.
///
/// Classes are referenced by their index in the [`ClassTable`](super::ClassTable),
/// so two types are the same iff they are the same primitive or the same class
/// definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DataTypeBase {
    Primitive(DataType),
    Class(ClassIndex),
}

impl DataTypeBase {
    pub fn is_boolean(&self) -> bool {
        matches!(self, DataTypeBase::Primitive(DataType::Boolean))
    }

    pub fn as_primitive(&self) -> Option<DataType> {
        match self {
            DataTypeBase::Primitive(ty) => Some(*ty),
            DataTypeBase::Class(_) => None,
        }
    }

    pub fn as_class(&self) -> Option<ClassIndex> {
        match self {
            DataTypeBase::Primitive(_) => None,
            DataTypeBase::Class(idx) => Some(*idx),
        }
    }
}

impl From<DataType> for DataTypeBase {
    fn from(value: DataType) -> Self {
        DataTypeBase::Primitive(value)
    }
}

impl From<ClassIndex> for DataTypeBase {
    fn from(value: ClassIndex) -> Self {
        DataTypeBase::Class(value)
    }
}

impl fmt::Display for DataTypeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataTypeBase::Primitive(ty) => write!(f, "{ty}"),
            DataTypeBase::Class(idx) => write!(f, "class#{}", idx.to_idx()),
        }
    }
}

/// A literal value as written in the source.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConstValue {
    Int(i64),
    /// Kept in its textual form so the value stays hashable.
    Float(String),
    Boolean(bool),
    String(String),
    Null,
}

impl ConstValue {
    pub fn data_type(&self) -> DataType {
        match self {
            ConstValue::Int(_) => DataType::Int,
            ConstValue::Float(_) => DataType::Float,
            ConstValue::Boolean(_) => DataType::Boolean,
            ConstValue::String(_) => DataType::String,
            ConstValue::Null => DataType::Null,
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Int(x) => write!(f, "{x}"),
            ConstValue::Float(x) => write!(f, "{x}"),
            ConstValue::Boolean(x) => write!(f, "{x}"),
            ConstValue::String(x) => write!(f, "{x:?}"),
            ConstValue::Null => write!(f, "null"),
        }
    }
}

/// The lexical construct a scope was opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StructureType {
    Global,
    Function,
    Class,
    Conditional,
    Loop,
    Block,
}

impl fmt::Display for StructureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureType::Global => write!(f, "global"),
            StructureType::Function => write!(f, "function"),
            StructureType::Class => write!(f, "class"),
            StructureType::Conditional => write!(f, "conditional"),
            StructureType::Loop => write!(f, "loop"),
            StructureType::Block => write!(f, "block"),
        }
    }
}
