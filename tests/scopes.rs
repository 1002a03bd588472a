use transpiler_ir::{
    errors::ScopeError,
    scope::ScopeTree,
    symbols::{DataType, Reference, StructureType, Symbol, Variable},
};

mod common;

#[test]
fn resolve_climbs_find_does_not() {
    common::init_tracing();
    let mut tree = ScopeTree::new();
    let global = tree.root();
    let func = tree.create_child(global, "f", StructureType::Function);
    let body = tree.create_child(func, "loop", StructureType::Loop);

    let x = Reference::new(Variable::new("x", DataType::Int));
    assert!(tree.add_symbol(global, x.clone(), false));

    let resolved = tree.resolve_symbol(body, "x").unwrap();
    assert!(resolved.same_declaration(&Symbol::from(x.clone())));
    assert!(resolved.as_variable().unwrap().ptr_eq(&x));
    assert!(matches!(
        tree.find_symbol(body, "x"),
        Err(ScopeError::UndefinedSymbol { name, scope }) if name == "x" && scope == "global/f/loop"
    ));
}

#[test]
fn shadowing_picks_the_nearest_binding() {
    let mut tree = ScopeTree::new();
    let global = tree.root();
    let inner = tree.create_child(global, "inner", StructureType::Block);

    let outer_x = Reference::new(Variable::new("x", DataType::Int));
    let inner_x = Reference::new(Variable::new("x", DataType::String));
    assert!(tree.add_symbol(global, outer_x.clone(), false));
    assert!(tree.add_symbol(inner, inner_x.clone(), false));

    let found = tree.resolve_symbol(inner, "x").unwrap();
    assert!(found.same_declaration(&inner_x.into()));
    assert!(!found.same_declaration(&outer_x.into()));
}

#[test]
fn resolve_scope_finds_siblings_of_ancestors() {
    let mut tree = ScopeTree::new();
    let global = tree.root();
    let outer = tree.create_child(global, "outer", StructureType::Function);
    let then = tree.create_child(outer, "then", StructureType::Conditional);
    let inner = tree.create_child(outer, "inner", StructureType::Loop);
    let deep = tree.create_child(inner, "deep", StructureType::Block);

    assert_eq!(tree.resolve_scope(deep, "then").unwrap(), then);
    assert_eq!(tree.resolve_scope(deep, "inner").unwrap(), inner);
    // Levels are matched through their parent's children, so the root never is.
    assert_eq!(tree.resolve_scope(deep, "deep").unwrap(), deep);
    assert!(tree.resolve_scope(deep, "global").is_err());
    assert!(tree.find_scope(deep, "then").is_err());
    assert_eq!(tree.find_scope(outer, "then").unwrap(), then);
}

#[test]
fn unique_names() {
    let mut tree = ScopeTree::new();
    let global = tree.root();
    let outer = tree.create_child(global, "outer", StructureType::Function);
    let inner = tree.create_child(outer, "inner", StructureType::Loop);

    assert_eq!(tree.unique_name(global), "global");
    assert_eq!(tree.unique_name(inner), "global/outer/inner");
    assert_eq!(tree.depth(inner), 2);
    assert_eq!(tree.parent_of(global), global);
    assert_eq!(tree.parent_of(inner), outer);
    assert_eq!(tree.children(outer), &[inner]);
}
