use transpiler_ir::{
    ir::builder::IRBuilder,
    symbols::{DataType, Function, StructureType},
};

#[allow(unused)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A builder with `main` defined and its body scope open.
#[allow(unused)]
pub fn builder_in_main() -> IRBuilder {
    init_tracing();
    let mut builder = IRBuilder::default();
    let main = builder
        .define_function(Function::new("main", DataType::Void))
        .expect("main is the first definition");
    builder.begin_function_body(&main).expect("main has no params");
    builder
}

/// Opens a loop scope named `name` in the builder.
#[allow(unused)]
pub fn open_loop(builder: &mut IRBuilder, name: &str) {
    builder.begin_scope(name, StructureType::Loop);
}
