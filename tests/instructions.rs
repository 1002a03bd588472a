use std::hash::{BuildHasher, RandomState};

use test_case::test_case;
use transpiler_ir::{
    errors::InstructionError,
    ir::{CmpOp, ExtensionOpcode, IROpCode, Instruction, InstructionKind, Metadata, Operand},
    symbols::{
        Class, ClassTable, ClassType, ConstValue, DataType, DataTypeBase, Function, Reference,
        Slot, ValueRef, Variable,
    },
};

mod common;

#[test_case(DataType::Int ; "int")]
#[test_case(DataType::Float ; "float")]
#[test_case(DataType::String ; "string")]
#[test_case(DataType::Null ; "null")]
#[test_case(DataType::Void ; "void")]
fn cond_jump_needs_a_boolean(dtype: DataType) {
    let condition = Reference::new(Variable::new("c", dtype));

    let err = Instruction::cond_jump(condition, "then", Some("else".into())).unwrap_err();
    assert_eq!(
        err,
        InstructionError::NonBooleanCondition {
            name: "c".into(),
            found: DataTypeBase::from(dtype),
        }
    );
}

#[test]
fn cond_jump_on_a_class_typed_condition_fails() {
    let mut classes = ClassTable::new();
    let flag = classes
        .register(Class::new("Flag", ClassType::Class))
        .unwrap();
    let condition = Reference::new(Variable::new("c", flag.index));

    assert!(Instruction::cond_jump(condition, "then", None).is_err());
}

#[test]
fn cond_jump_on_a_boolean() {
    let condition = Reference::new(Variable::new("c", DataType::Boolean));
    let jump = Instruction::cond_jump(condition, "then", Some("else".into())).unwrap();

    assert_eq!(jump.opcode(), IROpCode::COND_JUMP);
    assert_eq!(jump.scope_targets(), vec!["then", "else"]);
}

#[test]
fn structurally_equal_instructions_hash_equal() {
    let state = RandomState::new();
    let build = || {
        let r = Reference::new(Variable::new("r", DataType::Boolean));
        let a = Reference::new(Variable::new("a", DataType::Int));
        Instruction::compare(r, CmpOp::Lt, a, ConstValue::Int(10))
    };

    let (first, second) = (build(), build());
    assert_eq!(first, second);
    assert_eq!(state.hash_one(&first), state.hash_one(&second));

    let r = Reference::new(Variable::new("r", DataType::Boolean));
    let a = Reference::new(Variable::new("a", DataType::Int));
    let changed = Instruction::compare(r, CmpOp::Le, a, ConstValue::Int(10));
    assert_ne!(first, changed);
}

#[test]
fn call_identity_ignores_metadata() {
    let state = RandomState::new();
    let result = Reference::new(Variable::new("r", DataType::Int));
    let max = Reference::new(
        Function::new("max", DataType::Int)
            .with_param("a", DataType::Int)
            .with_param("b", DataType::Int),
    );
    let args: Vec<ValueRef> = vec![ConstValue::Int(1).into(), ConstValue::Int(2).into()];

    let a = Instruction::call(result.clone(), max.clone(), args.clone())
        .with_meta(Metadata::new(1, 1));
    let b = Instruction::call(result, max, args).with_meta(
        Metadata::new(40, 2)
            .with_filename("lib.src")
            .with_debug(true),
    );

    assert_eq!(a, b);
    assert_eq!(state.hash_one(&a), state.hash_one(&b));
}

#[test]
fn extension_calls_share_the_call_shape() {
    let opcode = ExtensionOpcode::new(0x90).unwrap();
    let result = Reference::new(Variable::new("r", DataType::Int));
    let f = Reference::new(Function::new("f", DataType::Int));

    let call = Instruction::call_as(IROpCode::Extension(opcode), result, f, vec![]).unwrap();
    assert!(matches!(call.kind(), InstructionKind::Call { .. }));
    assert_eq!(call.opcode(), IROpCode::Extension(opcode));
}

#[test]
fn operands_walk_in_schema_order() {
    let object = Reference::new(Variable::new("p", DataType::Null));
    let value = Reference::new(Variable::new("v", DataType::Int));
    let set = Instruction::set_field(object, "x", value);

    let ops = set.operands();
    assert_eq!(ops.len(), 3);
    assert!(matches!(ops[1], Operand::Name("x")));
    assert_eq!(set.variables(), vec!["p", "v"]);

    let declare = Instruction::declare(Reference::new(Variable::new("n", DataType::Int)));
    assert!(matches!(declare.operands()[0], Operand::Slot(Slot::Variable(_))));
}

#[test]
fn class_links_are_identities() {
    let mut classes = ClassTable::new();
    let base = classes
        .register(Class::new("Base", ClassType::Class))
        .unwrap();
    let twin = classes
        .register(Class::new("Base", ClassType::Class))
        .unwrap();

    // Distinct declarations without links still compare by value.
    assert_eq!(classes.get(base.index), classes.get(twin.index));

    let child = classes
        .register(Class::new("Child", ClassType::Class).with_parent(base.index))
        .unwrap();
    let other = classes
        .register(Class::new("Child", ClassType::Class).with_parent(twin.index))
        .unwrap();

    let child = classes.get(child.index).unwrap();
    assert_eq!(child.parent, Some(base.index));
    assert_ne!(Some(child), classes.get(other.index));
}
