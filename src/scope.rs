//! Lexically nested scopes.
//!
//! All scopes of a compilation unit live in one arena owned by [`ScopeTree`];
//! parents and children are indices into it. Two lookup families exist:
//! climbing (`resolve_*`, walks outwards through the enclosing scopes) and
//! single level (`find_*`, looks at exactly one scope).

use std::collections::HashMap;

use itertools::Itertools;
use tracing::{debug, trace};
use typed_generational_arena::{SmallSlab, SmallSlabIndex};

use crate::{
    errors::ScopeError,
    symbols::{StructureType, Symbol, SymbolName},
};

pub type ScopeIndex = SmallSlabIndex<Scope>;
pub type Scopes = SmallSlab<Scope>;

/// Name of the root scope, and the first segment of every unique name.
pub const GLOBAL_SCOPE_NAME: &str = "global";

/// One lexical region.
#[derive(Debug, Clone)]
pub struct Scope {
    /// Unique only among siblings.
    pub name: String,
    /// `None` only for the global scope.
    pub parent: Option<ScopeIndex>,
    pub kind: StructureType,
    symbols: HashMap<String, Symbol>,
    /// In creation order.
    children: Vec<ScopeIndex>,
}

impl Scope {
    fn new(name: String, parent: Option<ScopeIndex>, kind: StructureType) -> Self {
        Self {
            name,
            parent,
            kind,
            symbols: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn symbols(&self) -> &HashMap<String, Symbol> {
        &self.symbols
    }

    pub fn children(&self) -> &[ScopeIndex] {
        &self.children
    }
}

/// Arena of every scope of a compilation unit, rooted at the global scope.
///
/// A [`ScopeIndex`] is only meaningful for the tree that created it. Every
/// method taking one, and indexing, panics on an index the tree never handed
/// out and may alias an unrelated scope for an index from another tree. Use
/// [`ScopeTree::get`] to test an index of unknown origin.
#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Scopes,
    root: ScopeIndex,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Index<ScopeIndex> for ScopeTree {
    type Output = Scope;

    fn index(&self, index: ScopeIndex) -> &Self::Output {
        &self.scopes[index]
    }
}

impl ScopeTree {
    /// Creates a tree holding only the global scope.
    pub fn new() -> Self {
        let mut scopes = Scopes::new();
        let root = scopes.insert(Scope::new(
            GLOBAL_SCOPE_NAME.to_string(),
            None,
            StructureType::Global,
        ));
        Self { scopes, root }
    }

    pub fn root(&self) -> ScopeIndex {
        self.root
    }

    /// The scope at `scope`, or `None` if this tree never created it.
    pub fn get(&self, scope: ScopeIndex) -> Option<&Scope> {
        self.scopes.get(scope)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        // The global scope always exists.
        false
    }

    /// Opens a child scope below `parent`, appended after any existing children.
    pub fn create_child(
        &mut self,
        parent: ScopeIndex,
        name: impl Into<String>,
        kind: StructureType,
    ) -> ScopeIndex {
        let name = name.into();
        debug!(
            "creating {kind} scope {name:?} in {:?}",
            self.unique_name(parent)
        );
        let child = self.scopes.insert(Scope::new(name, Some(parent), kind));
        self.scopes[parent].children.push(child);
        child
    }

    /// Inserts `symbol` into `scope`.
    ///
    /// Returns false and leaves the table untouched if the name is already
    /// bound in this very scope and `force` isn't set. Shadowing a binding of an
    /// enclosing scope is always allowed.
    pub fn add_symbol(&mut self, scope: ScopeIndex, symbol: impl Into<Symbol>, force: bool) -> bool {
        let symbol = symbol.into();
        let table = &mut self.scopes[scope].symbols;

        if table.contains_key(symbol.name()) && !force {
            debug!("rejected redefinition of {:?}", symbol.name());
            return false;
        }

        table.insert(symbol.name().to_string(), symbol);
        true
    }

    /// Rebinds an existing name. With `force` set, inserts the binding if it
    /// doesn't exist yet.
    pub fn set_symbol(
        &mut self,
        scope: ScopeIndex,
        symbol: impl Into<Symbol>,
        force: bool,
    ) -> Result<(), ScopeError> {
        let symbol = symbol.into();

        if !self.scopes[scope].symbols.contains_key(symbol.name()) && !force {
            return Err(ScopeError::MissingSymbol {
                name: symbol.name().to_string(),
                scope: self.unique_name(scope),
            });
        }

        self.scopes[scope]
            .symbols
            .insert(symbol.name().to_string(), symbol);
        Ok(())
    }

    /// Removes a binding from exactly this scope, ending its visible lifetime.
    pub fn release_symbol(&mut self, scope: ScopeIndex, name: &str) -> Result<Symbol, ScopeError> {
        match self.scopes[scope].symbols.remove(name) {
            Some(symbol) => {
                debug!("released {name:?}");
                Ok(symbol)
            }
            None => Err(ScopeError::MissingSymbol {
                name: name.to_string(),
                scope: self.unique_name(scope),
            }),
        }
    }

    pub fn has_symbol(&self, scope: ScopeIndex, name: &str) -> bool {
        self.scopes[scope].symbols.contains_key(name)
    }

    /// Looks the name up in `scope`, then in each enclosing scope, returning
    /// the nearest binding.
    pub fn resolve_symbol(&self, scope: ScopeIndex, name: &str) -> Result<&Symbol, ScopeError> {
        trace!("resolving symbol {name:?}");
        std::iter::once(scope)
            .chain(self.ancestors(scope))
            .find_map(|idx| self.scopes[idx].symbols.get(name))
            .ok_or_else(|| ScopeError::UndefinedSymbol {
                name: name.to_string(),
                scope: self.unique_name(scope),
            })
    }

    /// Looks the name up in `scope` only.
    pub fn find_symbol(&self, scope: ScopeIndex, name: &str) -> Result<&Symbol, ScopeError> {
        trace!("finding symbol {name:?}");
        self.scopes[scope]
            .symbols
            .get(name)
            .ok_or_else(|| ScopeError::UndefinedSymbol {
                name: name.to_string(),
                scope: self.unique_name(scope),
            })
    }

    /// Looks for a direct child of `scope` with this name.
    pub fn find_scope(&self, scope: ScopeIndex, name: &str) -> Result<ScopeIndex, ScopeError> {
        self.child_named(scope, name)
            .ok_or_else(|| ScopeError::UndefinedScope {
                name: name.to_string(),
                scope: self.unique_name(scope),
            })
    }

    /// Scans the children of `scope`, then the children of each enclosing
    /// scope, returning the first child with this name.
    ///
    /// A level's own name is never compared, only the names of its children.
    pub fn resolve_scope(&self, scope: ScopeIndex, name: &str) -> Result<ScopeIndex, ScopeError> {
        trace!("resolving scope {name:?}");
        std::iter::once(scope)
            .chain(self.ancestors(scope))
            .find_map(|idx| self.child_named(idx, name))
            .ok_or_else(|| ScopeError::UndefinedScope {
                name: name.to_string(),
                scope: self.unique_name(scope),
            })
    }

    fn child_named(&self, scope: ScopeIndex, name: &str) -> Option<ScopeIndex> {
        self.scopes[scope]
            .children
            .iter()
            .copied()
            .find(|child| self.scopes[*child].name == name)
    }

    /// The '/' separated path from the global scope, e.g. `global/outer/inner`.
    pub fn unique_name(&self, scope: ScopeIndex) -> String {
        let mut path: Vec<&str> = std::iter::once(scope)
            .chain(self.ancestors(scope))
            .map(|idx| &self.scopes[idx])
            .take_while(|s| s.kind != StructureType::Global)
            .map(|s| s.name.as_str())
            .collect();
        path.push(GLOBAL_SCOPE_NAME);
        path.iter().rev().join("/")
    }

    /// The enclosing scope. The global scope is its own parent.
    pub fn parent_of(&self, scope: ScopeIndex) -> ScopeIndex {
        self.scopes[scope].parent.unwrap_or(scope)
    }

    pub fn has_parent(&self, scope: ScopeIndex) -> bool {
        self.scopes[scope].parent.is_some()
    }

    /// Enclosing scopes, nearest first, excluding `scope` itself.
    pub fn ancestors(&self, scope: ScopeIndex) -> impl Iterator<Item = ScopeIndex> + '_ {
        std::iter::successors(self.scopes[scope].parent, |idx| self.scopes[*idx].parent)
    }

    pub fn children(&self, scope: ScopeIndex) -> &[ScopeIndex] {
        &self.scopes[scope].children
    }

    /// Number of enclosing scopes; zero for the global scope.
    pub fn depth(&self, scope: ScopeIndex) -> usize {
        self.ancestors(scope).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::{DataType, DataTypeBase, Function, Variable};

    #[test]
    fn redefinition_is_rejected_without_force() {
        let mut tree = ScopeTree::new();
        let root = tree.root();

        assert!(tree.add_symbol(root, Variable::new("x", DataType::Int), false));
        assert!(!tree.add_symbol(root, Variable::new("x", DataType::String), false));
        assert_eq!(
            tree.find_symbol(root, "x").unwrap().data_type(),
            DataTypeBase::from(DataType::Int)
        );

        assert!(tree.add_symbol(root, Variable::new("x", DataType::String), true));
        assert_eq!(
            tree.find_symbol(root, "x").unwrap().data_type(),
            DataTypeBase::from(DataType::String)
        );
    }

    #[test]
    fn shadowing_across_scopes_is_allowed() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        let func = tree.create_child(root, "f", StructureType::Function);

        assert!(tree.add_symbol(root, Variable::new("x", DataType::Int), false));
        assert!(tree.add_symbol(func, Variable::new("x", DataType::Float), false));
        assert_eq!(
            tree.resolve_symbol(func, "x").unwrap().data_type(),
            DataTypeBase::from(DataType::Float)
        );
    }

    #[test]
    fn set_symbol_requires_existing_binding() {
        let mut tree = ScopeTree::new();
        let root = tree.root();

        let err = tree
            .set_symbol(root, Function::new("f", DataType::Void), false)
            .unwrap_err();
        assert_eq!(
            err,
            ScopeError::MissingSymbol {
                name: "f".into(),
                scope: "global".into()
            }
        );

        tree.set_symbol(root, Function::new("f", DataType::Void), true)
            .unwrap();
        tree.set_symbol(root, Function::new("f", DataType::Int), false)
            .unwrap();
        assert_eq!(
            tree.find_symbol(root, "f").unwrap().data_type(),
            DataTypeBase::from(DataType::Int)
        );
    }

    #[test]
    fn release_removes_only_from_that_scope() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        let block = tree.create_child(root, "b", StructureType::Block);
        tree.add_symbol(root, Variable::new("x", DataType::Int), false);
        tree.add_symbol(block, Variable::new("x", DataType::Int), false);

        tree.release_symbol(block, "x").unwrap();
        assert!(!tree.has_symbol(block, "x"));
        assert!(tree.has_symbol(root, "x"));
        assert!(matches!(
            tree.release_symbol(block, "x"),
            Err(ScopeError::MissingSymbol { .. })
        ));
    }

    #[test]
    fn parent_of_global_is_itself() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        let child = tree.create_child(root, "f", StructureType::Function);

        assert_eq!(tree.parent_of(root), root);
        assert_eq!(tree.parent_of(child), root);
        assert!(!tree.has_parent(root));
        assert!(tree.has_parent(child));
        assert_eq!(tree.depth(child), 1);
    }

    #[test]
    fn foreign_indices_are_not_found() {
        let mut other = ScopeTree::new();
        let other_root = other.root();
        let a = other.create_child(other_root, "a", StructureType::Block);
        let b = other.create_child(a, "b", StructureType::Block);

        let tree = ScopeTree::new();
        assert!(tree.get(b).is_none());
        assert!(tree.get(tree.root()).is_some());
    }

    #[test]
    fn children_keep_creation_order() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        let a = tree.create_child(root, "a", StructureType::Block);
        let b = tree.create_child(root, "b", StructureType::Block);
        let c = tree.create_child(root, "c", StructureType::Block);

        assert_eq!(tree.children(root), &[a, b, c]);
        assert_eq!(tree[b].parent, Some(root));
    }
}
