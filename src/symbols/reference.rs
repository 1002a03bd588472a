use std::{fmt, ops::Deref, sync::Arc};

use super::{Constant, DataTypeBase, Literal, SymbolName, Variable};
use crate::symbols::ConstValue;

/// A non-owning handle to a symbol, cheaply clonable.
///
/// The scope that registered the symbol owns it; a reference only shares the
/// handle. Cloning duplicates the handle, never the symbol. Equality and
/// hashing are structural over the referenced symbol, use [`Reference::ptr_eq`]
/// to test for the very same declaration.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Reference<T>(Arc<T>);

impl<T> Reference<T> {
    pub fn new(symbol: T) -> Self {
        Self(Arc::new(symbol))
    }

    /// The referenced symbol.
    pub fn resolve(&self) -> &T {
        &self.0
    }

    pub fn shared(&self) -> Arc<T> {
        Arc::clone(&self.0)
    }

    /// Whether both handles point at the same declaration.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Reference<Reference<T>> {
    /// Collapses a reference to a reference into a direct one.
    pub fn flatten(&self) -> Reference<T> {
        (*self.0).clone()
    }
}

impl<T> Clone for Reference<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Deref for Reference<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> From<Arc<T>> for Reference<T> {
    fn from(value: Arc<T>) -> Self {
        Self(value)
    }
}

impl<T: SymbolName> SymbolName for Reference<T> {
    fn name(&self) -> &str {
        self.0.name()
    }
}

/// A value producible now: the operand kind of every value position.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueRef {
    Variable(Reference<Variable>),
    Constant(Reference<Constant>),
    Literal(Reference<Literal>),
}

impl ValueRef {
    pub fn literal(value: ConstValue) -> Self {
        ValueRef::Literal(Reference::new(Literal::new(value)))
    }

    pub fn data_type(&self) -> DataTypeBase {
        match self {
            ValueRef::Variable(x) => x.dtype,
            ValueRef::Constant(x) => x.dtype,
            ValueRef::Literal(x) => x.data_type().into(),
        }
    }

    pub fn as_variable(&self) -> Option<&Reference<Variable>> {
        match self {
            ValueRef::Variable(x) => Some(x),
            _ => None,
        }
    }
}

impl SymbolName for ValueRef {
    fn name(&self) -> &str {
        match self {
            ValueRef::Variable(x) => x.name(),
            ValueRef::Constant(x) => x.name(),
            ValueRef::Literal(x) => x.name(),
        }
    }
}

impl From<Reference<Variable>> for ValueRef {
    fn from(value: Reference<Variable>) -> Self {
        ValueRef::Variable(value)
    }
}

impl From<Reference<Constant>> for ValueRef {
    fn from(value: Reference<Constant>) -> Self {
        ValueRef::Constant(value)
    }
}

impl From<Reference<Literal>> for ValueRef {
    fn from(value: Reference<Literal>) -> Self {
        ValueRef::Literal(value)
    }
}

impl From<ConstValue> for ValueRef {
    fn from(value: ConstValue) -> Self {
        ValueRef::literal(value)
    }
}

impl fmt::Display for ValueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueRef::Variable(x) => write!(f, "{}", x.name),
            ValueRef::Constant(x) => write!(f, "{}", x.name),
            ValueRef::Literal(x) => write!(f, "{}", x.value),
        }
    }
}

/// A storage location an instruction writes to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    Variable(Reference<Variable>),
    Constant(Reference<Constant>),
}

impl Slot {
    pub fn data_type(&self) -> DataTypeBase {
        match self {
            Slot::Variable(x) => x.dtype,
            Slot::Constant(x) => x.dtype,
        }
    }

    pub fn as_variable(&self) -> Option<&Reference<Variable>> {
        match self {
            Slot::Variable(x) => Some(x),
            Slot::Constant(_) => None,
        }
    }
}

impl SymbolName for Slot {
    fn name(&self) -> &str {
        match self {
            Slot::Variable(x) => x.name(),
            Slot::Constant(x) => x.name(),
        }
    }
}

impl From<Reference<Variable>> for Slot {
    fn from(value: Reference<Variable>) -> Self {
        Slot::Variable(value)
    }
}

impl From<Reference<Constant>> for Slot {
    fn from(value: Reference<Constant>) -> Self {
        Slot::Constant(value)
    }
}

impl From<Slot> for ValueRef {
    fn from(value: Slot) -> Self {
        match value {
            Slot::Variable(x) => ValueRef::Variable(x),
            Slot::Constant(x) => ValueRef::Constant(x),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::DataType;

    #[test]
    fn clone_shares_the_symbol() {
        let var = Reference::new(Variable::new("x", DataType::Int));
        let copy = var.clone();

        assert!(var.ptr_eq(&copy));
        assert_eq!(var, copy);
    }

    #[test]
    fn structural_equality_without_identity() {
        let a = Reference::new(Variable::new("x", DataType::Int));
        let b = Reference::new(Variable::new("x", DataType::Int));

        assert_eq!(a, b);
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn nested_reference_resolves_transparently() {
        let var = Reference::new(Variable::new("x", DataType::Boolean));
        let nested = Reference::new(var.clone());

        assert_eq!(nested.name(), "x");
        assert!(nested.dtype.is_boolean());
        assert!(nested.flatten().ptr_eq(&var));
    }

    #[test]
    fn literal_value_ref() {
        let value = ValueRef::literal(ConstValue::Int(3));

        assert_eq!(value.name(), "");
        assert_eq!(value.data_type(), DataTypeBase::from(DataType::Int));
        assert_eq!(value.to_string(), "3");
    }
}
