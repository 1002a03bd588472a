//! The symbol taxonomy: every compile-time entity a scope can own and an
//! instruction can reference.

use std::{fmt, sync::Arc};

use itertools::Itertools;

mod class;
mod reference;
mod types;

pub use class::{Class, ClassIndex, ClassSymbol, ClassTable, ClassType, Classes};
pub use reference::{Reference, Slot, ValueRef};
pub use types::{ConstValue, DataType, DataTypeBase, StructureType};

/// The capability shared by all symbol kinds.
pub trait SymbolName {
    /// The name the symbol is registered under. Literals are unnamed and
    /// return an empty string.
    fn name(&self) -> &str;
}

/// An inline value with no declared name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Literal {
    pub value: ConstValue,
}

impl Literal {
    pub fn new(value: ConstValue) -> Self {
        Self { value }
    }

    pub fn data_type(&self) -> DataType {
        self.value.data_type()
    }
}

/// A named, immutable declaration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Constant {
    pub name: String,
    pub dtype: DataTypeBase,
    pub value: ConstValue,
}

impl Constant {
    pub fn new(name: impl Into<String>, dtype: impl Into<DataTypeBase>, value: ConstValue) -> Self {
        Self {
            name: name.into(),
            dtype: dtype.into(),
            value,
        }
    }
}

/// A named, mutable declaration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Variable {
    pub name: String,
    pub dtype: DataTypeBase,
}

impl Variable {
    pub fn new(name: impl Into<String>, dtype: impl Into<DataTypeBase>) -> Self {
        Self {
            name: name.into(),
            dtype: dtype.into(),
        }
    }
}

/// A function argument declaration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Parameter {
    pub name: String,
    pub dtype: DataTypeBase,
    /// Zero based position in the parameter list.
    pub position: usize,
}

impl Parameter {
    pub fn new(name: impl Into<String>, dtype: impl Into<DataTypeBase>, position: usize) -> Self {
        Self {
            name: name.into(),
            dtype: dtype.into(),
            position,
        }
    }

    /// The variable a function body sees for this parameter.
    pub fn as_variable(&self) -> Variable {
        Variable::new(self.name.clone(), self.dtype)
    }
}

/// A function signature. Identity (and hashing) covers the name and the full
/// signature, so overloads are distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Function {
    pub name: String,
    pub return_type: DataTypeBase,
    pub params: Vec<Parameter>,
}

impl Function {
    pub fn new(name: impl Into<String>, return_type: impl Into<DataTypeBase>) -> Self {
        Self {
            name: name.into(),
            return_type: return_type.into(),
            params: Vec::new(),
        }
    }

    /// Appends a parameter at the next position.
    pub fn with_param(mut self, name: impl Into<String>, dtype: impl Into<DataTypeBase>) -> Self {
        let position = self.params.len();
        self.params.push(Parameter::new(name, dtype, position));
        self
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// `name(type, type) -> type`
    pub fn signature(&self) -> String {
        format!(
            "{}({}) -> {}",
            self.name,
            self.params.iter().map(|p| p.dtype).join(", "),
            self.return_type
        )
    }
}

impl SymbolName for Literal {
    fn name(&self) -> &str {
        ""
    }
}

impl SymbolName for Constant {
    fn name(&self) -> &str {
        &self.name
    }
}

impl SymbolName for Variable {
    fn name(&self) -> &str {
        &self.name
    }
}

impl SymbolName for Parameter {
    fn name(&self) -> &str {
        &self.name
    }
}

impl SymbolName for Function {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Literal,
    Constant,
    Variable,
    Parameter,
    Function,
    Class,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::Literal => write!(f, "literal"),
            SymbolKind::Constant => write!(f, "constant"),
            SymbolKind::Variable => write!(f, "variable"),
            SymbolKind::Parameter => write!(f, "parameter"),
            SymbolKind::Function => write!(f, "function"),
            SymbolKind::Class => write!(f, "class"),
        }
    }
}

/// A symbol as stored in a scope table.
///
/// Scopes own the shared handles; class bodies live in the [`ClassTable`] and
/// the scope only records where to find them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Symbol {
    Literal(Arc<Literal>),
    Constant(Arc<Constant>),
    Variable(Arc<Variable>),
    Parameter(Arc<Parameter>),
    Function(Arc<Function>),
    Class(ClassSymbol),
}

impl Symbol {
    pub fn kind(&self) -> SymbolKind {
        match self {
            Symbol::Literal(_) => SymbolKind::Literal,
            Symbol::Constant(_) => SymbolKind::Constant,
            Symbol::Variable(_) => SymbolKind::Variable,
            Symbol::Parameter(_) => SymbolKind::Parameter,
            Symbol::Function(_) => SymbolKind::Function,
            Symbol::Class(_) => SymbolKind::Class,
        }
    }

    /// The type of the value this symbol produces. For functions this is the
    /// return type.
    pub fn data_type(&self) -> DataTypeBase {
        match self {
            Symbol::Literal(x) => x.data_type().into(),
            Symbol::Constant(x) => x.dtype,
            Symbol::Variable(x) => x.dtype,
            Symbol::Parameter(x) => x.dtype,
            Symbol::Function(x) => x.return_type,
            Symbol::Class(x) => DataTypeBase::Class(x.index),
        }
    }

    pub fn as_variable(&self) -> Option<Reference<Variable>> {
        match self {
            Symbol::Variable(x) => Some(Arc::clone(x).into()),
            _ => None,
        }
    }

    pub fn as_constant(&self) -> Option<Reference<Constant>> {
        match self {
            Symbol::Constant(x) => Some(Arc::clone(x).into()),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<Reference<Function>> {
        match self {
            Symbol::Function(x) => Some(Arc::clone(x).into()),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassSymbol> {
        match self {
            Symbol::Class(x) => Some(x),
            _ => None,
        }
    }

    /// A value operand for this symbol, if it names a value.
    pub fn as_value(&self) -> Option<ValueRef> {
        match self {
            Symbol::Literal(x) => Some(ValueRef::Literal(Arc::clone(x).into())),
            Symbol::Constant(x) => Some(ValueRef::Constant(Arc::clone(x).into())),
            Symbol::Variable(x) => Some(ValueRef::Variable(Arc::clone(x).into())),
            _ => None,
        }
    }

    /// Whether both symbols are the very same declaration.
    pub fn same_declaration(&self, other: &Symbol) -> bool {
        match (self, other) {
            (Symbol::Literal(a), Symbol::Literal(b)) => Arc::ptr_eq(a, b),
            (Symbol::Constant(a), Symbol::Constant(b)) => Arc::ptr_eq(a, b),
            (Symbol::Variable(a), Symbol::Variable(b)) => Arc::ptr_eq(a, b),
            (Symbol::Parameter(a), Symbol::Parameter(b)) => Arc::ptr_eq(a, b),
            (Symbol::Function(a), Symbol::Function(b)) => Arc::ptr_eq(a, b),
            (Symbol::Class(a), Symbol::Class(b)) => a.index == b.index,
            _ => false,
        }
    }
}

impl SymbolName for Symbol {
    fn name(&self) -> &str {
        match self {
            Symbol::Literal(x) => x.name(),
            Symbol::Constant(x) => x.name(),
            Symbol::Variable(x) => x.name(),
            Symbol::Parameter(x) => x.name(),
            Symbol::Function(x) => x.name(),
            Symbol::Class(x) => &x.name,
        }
    }
}

impl From<Literal> for Symbol {
    fn from(value: Literal) -> Self {
        Symbol::Literal(Arc::new(value))
    }
}

impl From<Constant> for Symbol {
    fn from(value: Constant) -> Self {
        Symbol::Constant(Arc::new(value))
    }
}

impl From<Variable> for Symbol {
    fn from(value: Variable) -> Self {
        Symbol::Variable(Arc::new(value))
    }
}

impl From<Parameter> for Symbol {
    fn from(value: Parameter) -> Self {
        Symbol::Parameter(Arc::new(value))
    }
}

impl From<Function> for Symbol {
    fn from(value: Function) -> Self {
        Symbol::Function(Arc::new(value))
    }
}

impl From<ClassSymbol> for Symbol {
    fn from(value: ClassSymbol) -> Self {
        Symbol::Class(value)
    }
}

impl From<Reference<Variable>> for Symbol {
    fn from(value: Reference<Variable>) -> Self {
        Symbol::Variable(value.shared())
    }
}

impl From<Reference<Constant>> for Symbol {
    fn from(value: Reference<Constant>) -> Self {
        Symbol::Constant(value.shared())
    }
}

impl From<Reference<Function>> for Symbol {
    fn from(value: Reference<Function>) -> Self {
        Symbol::Function(value.shared())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_identity_covers_signature() {
        let a = Function::new("add", DataType::Int)
            .with_param("a", DataType::Int)
            .with_param("b", DataType::Int);
        let b = Function::new("add", DataType::Float)
            .with_param("a", DataType::Float)
            .with_param("b", DataType::Float);

        assert_ne!(a, b);
        assert_eq!(a.params[1].position, 1);
        assert_eq!(a.signature(), "add(int, int) -> int");
    }

    #[test]
    fn symbol_accessors() {
        let symbol = Symbol::from(Variable::new("x", DataType::Int));

        assert_eq!(symbol.kind(), SymbolKind::Variable);
        assert_eq!(symbol.name(), "x");
        assert!(symbol.as_variable().is_some());
        assert!(symbol.as_function().is_none());
        assert!(symbol.as_value().is_some());
    }

    #[test]
    fn accessors_share_the_declaration() {
        let symbol = Symbol::from(Constant::new("PI", DataType::Float, ConstValue::Float("3.14".into())));
        let a = symbol.as_constant().unwrap();
        let b = symbol.as_constant().unwrap();

        assert!(a.ptr_eq(&b));
        assert!(symbol.same_declaration(&symbol.clone()));
    }

    #[test]
    fn literal_is_unnamed() {
        let symbol = Symbol::from(Literal::new(ConstValue::Boolean(true)));

        assert_eq!(symbol.name(), "");
        assert_eq!(symbol.data_type(), DataTypeBase::from(DataType::Boolean));
    }
}
