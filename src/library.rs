//! Built-in libraries: providers of native functions, constants, events and
//! classes.
//!
//! A library is described once, up front, by an immutable [`LibraryDescriptor`]
//! handed to [`IRBuilder::register_library`](crate::ir::builder::IRBuilder::register_library).
//! The core never runs the handlers, it only records them for the backend.

use std::{collections::HashMap, sync::Arc};

use educe::Educe;

use crate::{
    ir::Instruction,
    symbols::{Class, Constant, Function, ValueRef},
};

/// Produces the value of a call to a native function.
pub type NativeFunction = Arc<dyn Fn(&[ValueRef]) -> ValueRef + Send + Sync>;

/// Expands an event or annotation into instructions.
pub type InstructionHandler = Arc<dyn Fn(&[ValueRef]) -> Vec<Instruction> + Send + Sync>;

#[derive(Clone, Default, Educe)]
#[educe(Debug)]
pub struct LibraryDescriptor {
    pub name: String,
    /// Initialization code, emitted before any program code.
    pub init: Vec<Instruction>,
    #[educe(Debug(method(fmt_keys)))]
    pub functions: HashMap<Function, NativeFunction>,
    pub constants: HashMap<Constant, ValueRef>,
    #[educe(Debug(method(fmt_keys)))]
    pub events: HashMap<String, InstructionHandler>,
    #[educe(Debug(method(fmt_keys)))]
    pub annotations: HashMap<String, InstructionHandler>,
    /// Classes must only link to classes already registered.
    pub classes: Vec<Class>,
}

fn fmt_keys<K: std::fmt::Debug, V>(
    map: &HashMap<K, V>,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    f.debug_set().entries(map.keys()).finish()
}

impl LibraryDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_function(
        mut self,
        function: Function,
        handler: impl Fn(&[ValueRef]) -> ValueRef + Send + Sync + 'static,
    ) -> Self {
        self.functions.insert(function, Arc::new(handler));
        self
    }

    pub fn with_constant(mut self, constant: Constant, value: ValueRef) -> Self {
        self.constants.insert(constant, value);
        self
    }

    pub fn with_event(
        mut self,
        name: impl Into<String>,
        handler: impl Fn(&[ValueRef]) -> Vec<Instruction> + Send + Sync + 'static,
    ) -> Self {
        self.events.insert(name.into(), Arc::new(handler));
        self
    }

    pub fn with_annotation(
        mut self,
        name: impl Into<String>,
        handler: impl Fn(&[ValueRef]) -> Vec<Instruction> + Send + Sync + 'static,
    ) -> Self {
        self.annotations.insert(name.into(), Arc::new(handler));
        self
    }

    pub fn with_class(mut self, class: Class) -> Self {
        self.classes.push(class);
        self
    }

    pub fn with_init(mut self, init: Vec<Instruction>) -> Self {
        self.init = init;
        self
    }
}

/// Something that can describe itself as a library.
pub trait Library {
    fn name(&self) -> &str;

    /// Initialization code.
    fn load(&self) -> Vec<Instruction>;

    fn functions(&self) -> HashMap<Function, NativeFunction>;

    fn constants(&self) -> HashMap<Constant, ValueRef>;

    fn events(&self) -> HashMap<String, InstructionHandler> {
        HashMap::new()
    }

    fn annotations(&self) -> HashMap<String, InstructionHandler> {
        HashMap::new()
    }

    fn classes(&self) -> Vec<Class> {
        Vec::new()
    }

    fn describe(&self) -> LibraryDescriptor {
        LibraryDescriptor {
            name: self.name().to_string(),
            init: self.load(),
            functions: self.functions(),
            constants: self.constants(),
            events: self.events(),
            annotations: self.annotations(),
            classes: self.classes(),
        }
    }
}

/// Handlers of every registered library, looked up by the backend.
#[derive(Clone, Default, Educe)]
#[educe(Debug)]
pub struct NativeRegistry {
    libraries: Vec<String>,
    #[educe(Debug(method(fmt_keys)))]
    functions: HashMap<Function, NativeFunction>,
    constants: HashMap<Constant, ValueRef>,
    #[educe(Debug(method(fmt_keys)))]
    events: HashMap<String, InstructionHandler>,
    #[educe(Debug(method(fmt_keys)))]
    annotations: HashMap<String, InstructionHandler>,
}

impl NativeRegistry {
    pub(crate) fn record(
        &mut self,
        name: String,
        functions: HashMap<Function, NativeFunction>,
        constants: HashMap<Constant, ValueRef>,
        events: HashMap<String, InstructionHandler>,
        annotations: HashMap<String, InstructionHandler>,
    ) {
        self.libraries.push(name);
        self.functions.extend(functions);
        self.constants.extend(constants);
        self.events.extend(events);
        self.annotations.extend(annotations);
    }

    /// Names of the registered libraries, in registration order.
    pub fn libraries(&self) -> &[String] {
        &self.libraries
    }

    pub fn function(&self, function: &Function) -> Option<&NativeFunction> {
        self.functions.get(function)
    }

    pub fn constant(&self, constant: &Constant) -> Option<&ValueRef> {
        self.constants.get(constant)
    }

    pub fn event(&self, name: &str) -> Option<&InstructionHandler> {
        self.events.get(name)
    }

    pub fn annotation(&self, name: &str) -> Option<&InstructionHandler> {
        self.annotations.get(name)
    }
}
