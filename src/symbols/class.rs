use std::{collections::BTreeSet, fmt};

use tracing::debug;
use typed_generational_arena::{SmallSlab, SmallSlabIndex};

use super::{Constant, Function, SymbolName, Variable};
use crate::errors::ClassError;

pub type ClassIndex = SmallSlabIndex<Class>;
pub type Classes = SmallSlab<Class>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ClassType {
    #[default]
    Class,
    /// A capability contract other classes point at through `interface`.
    Interface,
}

/// A class definition.
///
/// `parent` and `interface` are shared links into the [`ClassTable`], so they
/// compare by identity (same index, same class), while every other field
/// compares by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Class {
    pub name: String,
    pub methods: BTreeSet<Function>,
    pub interface: Option<ClassIndex>,
    /// Single implementation inheritance.
    pub parent: Option<ClassIndex>,
    pub constants: BTreeSet<Constant>,
    pub variables: BTreeSet<Variable>,
    pub kind: ClassType,
}

impl Class {
    pub fn new(name: impl Into<String>, kind: ClassType) -> Self {
        Self {
            name: name.into(),
            methods: BTreeSet::new(),
            interface: None,
            parent: None,
            constants: BTreeSet::new(),
            variables: BTreeSet::new(),
            kind,
        }
    }

    pub fn with_parent(mut self, parent: ClassIndex) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_interface(mut self, interface: ClassIndex) -> Self {
        self.interface = Some(interface);
        self
    }

    pub fn with_method(mut self, method: Function) -> Self {
        self.methods.insert(method);
        self
    }

    pub fn with_constant(mut self, constant: Constant) -> Self {
        self.constants.insert(constant);
        self
    }

    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variables.insert(variable);
        self
    }

    /// Looks up a method declared directly on this class.
    pub fn method(&self, name: &str) -> Option<&Function> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }
}

impl SymbolName for Class {
    fn name(&self) -> &str {
        &self.name
    }
}

/// What a scope table stores for a class: its name and where its body lives.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassSymbol {
    pub name: String,
    pub index: ClassIndex,
}

impl fmt::Display for ClassSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Owns every class definition of a compilation unit.
///
/// Links between classes are indices into this table. Registration and link
/// updates keep the parent chain acyclic.
#[derive(Debug, Clone)]
pub struct ClassTable {
    classes: Classes,
}

impl Default for ClassTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassTable {
    pub fn new() -> Self {
        Self {
            classes: Classes::new(),
        }
    }

    pub fn register(&mut self, class: Class) -> Result<ClassSymbol, ClassError> {
        if let Some(parent) = class.parent {
            self.try_get(parent)?;
        }
        if let Some(interface) = class.interface {
            self.try_get(interface)?;
        }

        let name = class.name.clone();
        let index = self.classes.insert(class);
        debug!("registered class {name:?} at {}", index.to_idx());

        Ok(ClassSymbol { name, index })
    }

    pub fn get(&self, index: ClassIndex) -> Option<&Class> {
        self.classes.get(index)
    }

    pub fn try_get(&self, index: ClassIndex) -> Result<&Class, ClassError> {
        self.classes.get(index).ok_or(ClassError::UnknownClass {
            index: index.to_idx(),
        })
    }

    fn try_get_mut(&mut self, index: ClassIndex) -> Result<&mut Class, ClassError> {
        self.classes.get_mut(index).ok_or(ClassError::UnknownClass {
            index: index.to_idx(),
        })
    }

    pub fn find(&self, name: &str) -> Option<ClassSymbol> {
        self.classes
            .iter()
            .find(|(_, class)| class.name == name)
            .map(|(index, class)| ClassSymbol {
                name: class.name.clone(),
                index,
            })
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClassIndex, &Class)> {
        self.classes.iter()
    }

    pub fn set_parent(
        &mut self,
        index: ClassIndex,
        parent: Option<ClassIndex>,
    ) -> Result<(), ClassError> {
        let name = self.try_get(index)?.name.clone();

        if let Some(parent) = parent {
            if parent == index {
                return Err(ClassError::SelfReference { name });
            }
            let parent_name = self.try_get(parent)?.name.clone();

            if self.ancestors(parent).any(|x| x == index) {
                return Err(ClassError::CyclicParent {
                    name,
                    parent: parent_name,
                });
            }
        }

        self.try_get_mut(index)?.parent = parent;
        Ok(())
    }

    pub fn set_interface(
        &mut self,
        index: ClassIndex,
        interface: Option<ClassIndex>,
    ) -> Result<(), ClassError> {
        let name = self.try_get(index)?.name.clone();

        if let Some(interface) = interface {
            if interface == index {
                return Err(ClassError::SelfReference { name });
            }
            self.try_get(interface)?;
        }

        self.try_get_mut(index)?.interface = interface;
        Ok(())
    }

    /// Returns false if the class already declares this exact method.
    pub fn add_method(&mut self, index: ClassIndex, method: Function) -> Result<bool, ClassError> {
        Ok(self.try_get_mut(index)?.methods.insert(method))
    }

    pub fn add_constant(
        &mut self,
        index: ClassIndex,
        constant: Constant,
    ) -> Result<bool, ClassError> {
        Ok(self.try_get_mut(index)?.constants.insert(constant))
    }

    pub fn add_variable(
        &mut self,
        index: ClassIndex,
        variable: Variable,
    ) -> Result<bool, ClassError> {
        Ok(self.try_get_mut(index)?.variables.insert(variable))
    }

    /// The parent chain, nearest first, excluding `index` itself.
    pub fn ancestors(&self, index: ClassIndex) -> impl Iterator<Item = ClassIndex> + '_ {
        std::iter::successors(self.get(index).and_then(|c| c.parent), |idx| {
            self.get(*idx).and_then(|c| c.parent)
        })
    }

    pub fn is_subclass_of(&self, index: ClassIndex, other: ClassIndex) -> bool {
        index == other || self.ancestors(index).any(|x| x == other)
    }

    /// Finds a method on the class or, failing that, on its nearest parent
    /// that declares it.
    pub fn resolve_method(&self, index: ClassIndex, name: &str) -> Option<&Function> {
        std::iter::once(index)
            .chain(self.ancestors(index))
            .filter_map(|idx| self.get(idx))
            .find_map(|class| class.method(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::{DataType, DataTypeBase};

    #[test]
    fn register_rejects_unknown_links() {
        let mut other = ClassTable::new();
        let foreign = other.register(Class::new("A", ClassType::Class)).unwrap();
        other.register(Class::new("B", ClassType::Class)).unwrap();

        let mut table = ClassTable::new();
        let orphan = Class::new("C", ClassType::Class).with_parent(
            other.find("B").unwrap().index,
        );
        assert!(matches!(
            table.register(orphan),
            Err(ClassError::UnknownClass { .. })
        ));

        assert!(table.get(foreign.index).is_none());
    }

    #[test]
    fn parent_cycle_is_rejected() {
        let mut table = ClassTable::new();
        let a = table.register(Class::new("A", ClassType::Class)).unwrap();
        let b = table
            .register(Class::new("B", ClassType::Class).with_parent(a.index))
            .unwrap();
        let c = table
            .register(Class::new("C", ClassType::Class).with_parent(b.index))
            .unwrap();

        let err = table.set_parent(a.index, Some(c.index)).unwrap_err();
        assert_eq!(
            err,
            ClassError::CyclicParent {
                name: "A".into(),
                parent: "C".into()
            }
        );
        assert_eq!(
            table.set_parent(a.index, Some(a.index)),
            Err(ClassError::SelfReference { name: "A".into() })
        );
        assert_eq!(table.get(a.index).unwrap().parent, None);
        assert_eq!(table.ancestors(c.index).collect::<Vec<_>>(), vec![b.index, a.index]);
    }

    #[test]
    fn interface_cannot_be_self() {
        let mut table = ClassTable::new();
        let a = table.register(Class::new("A", ClassType::Interface)).unwrap();

        assert!(matches!(
            table.set_interface(a.index, Some(a.index)),
            Err(ClassError::SelfReference { .. })
        ));
    }

    #[test]
    fn methods_resolve_through_parents() {
        let mut table = ClassTable::new();
        let base = table
            .register(
                Class::new("Base", ClassType::Class)
                    .with_method(Function::new("speak", DataType::String)),
            )
            .unwrap();
        let derived = table
            .register(Class::new("Derived", ClassType::Class).with_parent(base.index))
            .unwrap();

        let method = table.resolve_method(derived.index, "speak").unwrap();
        assert_eq!(method.return_type, DataTypeBase::from(DataType::String));
        assert!(table.resolve_method(derived.index, "missing").is_none());
        assert!(table.is_subclass_of(derived.index, base.index));
        assert!(!table.is_subclass_of(base.index, derived.index));
    }

    #[test]
    fn members_referencing_own_class() {
        let mut table = ClassTable::new();
        let node = table.register(Class::new("Node", ClassType::Class)).unwrap();

        let added = table
            .add_variable(node.index, Variable::new("next", node.index))
            .unwrap();
        assert!(added);
        assert!(
            !table
                .add_variable(node.index, Variable::new("next", node.index))
                .unwrap()
        );
        assert_eq!(
            table.get(node.index).unwrap().field("next").unwrap().dtype,
            node.index.into()
        );
    }
}
