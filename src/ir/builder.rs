use std::{collections::HashSet, sync::Arc};

use tracing::{debug, instrument};

use crate::{
    config::BuilderOptions,
    errors::BuilderError,
    ir::{Instruction, InstructionKind, Metadata, Program},
    library::{LibraryDescriptor, NativeRegistry},
    scope::{ScopeIndex, ScopeTree},
    symbols::{
        Class, ClassSymbol, ClassTable, ConstValue, Constant, DataTypeBase, Function, Reference,
        StructureType, Symbol, SymbolKind, SymbolName, ValueRef, Variable,
    },
};

/// Builds a [`Program`] while keeping the scope tree in step with the
/// instruction stream.
///
/// Every symbol is registered in its scope before any instruction references
/// it, and every SCOPE_BEGIN gets its SCOPE_END through [`IRBuilder::end_scope`].
#[derive(Debug)]
pub struct IRBuilder {
    scopes: ScopeTree,
    classes: ClassTable,
    natives: NativeRegistry,
    instructions: Vec<Instruction>,
    /// The scope new symbols and instructions belong to.
    current: ScopeIndex,
    filename: Option<Arc<str>>,
    debug: bool,
    line: Option<u32>,
    column: Option<u32>,
    /// Set once the front-end emits its first instruction.
    sealed: bool,
}

impl Default for IRBuilder {
    fn default() -> Self {
        Self::new(BuilderOptions::default())
    }
}

impl IRBuilder {
    pub fn new(options: BuilderOptions) -> Self {
        let scopes = ScopeTree::new();
        let current = scopes.root();
        Self {
            scopes,
            classes: ClassTable::new(),
            natives: NativeRegistry::default(),
            instructions: Vec::new(),
            current,
            filename: options.filename.map(Arc::from),
            debug: options.debug,
            line: None,
            column: None,
            sealed: false,
        }
    }

    pub fn scopes(&self) -> &ScopeTree {
        &self.scopes
    }

    pub fn classes(&self) -> &ClassTable {
        &self.classes
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn current_scope(&self) -> ScopeIndex {
        self.current
    }

    /// Source position stamped on the following instructions.
    pub fn set_position(&mut self, line: u32, column: u32) {
        self.line = Some(line);
        self.column = Some(column);
    }

    fn metadata(&self) -> Metadata {
        Metadata {
            line: self.line,
            column: self.column,
            filename: self.filename.clone(),
            debug: self.debug,
        }
    }

    /// Appends an instruction at the current position.
    ///
    /// Instructions that open or close scopes, bind or release names, or
    /// transfer control have dedicated methods that keep the scope tree in
    /// step, and are rejected here.
    pub fn emit(&mut self, instruction: Instruction) -> Result<(), BuilderError> {
        match instruction.kind() {
            InstructionKind::ScopeBegin { .. }
            | InstructionKind::ScopeEnd
            | InstructionKind::Declare { .. }
            | InstructionKind::VarRelease { .. }
            | InstructionKind::Function { .. }
            | InstructionKind::Class { .. }
            | InstructionKind::Jump { .. }
            | InstructionKind::CondJump { .. }
            | InstructionKind::Break { .. }
            | InstructionKind::Continue { .. } => Err(BuilderError::StructuralInstruction {
                opcode: instruction.opcode().to_string(),
            }),
            _ => {
                self.push(instruction);
                Ok(())
            }
        }
    }

    fn push(&mut self, instruction: Instruction) {
        self.sealed = true;
        let instruction = instruction.with_meta(self.metadata());
        debug!("emit {instruction}");
        self.instructions.push(instruction);
    }

    /// Emits a DEBUG_INFO checkpoint when debug info is enabled.
    pub fn checkpoint(&mut self) {
        if self.debug {
            self.push(Instruction::debug_info());
        }
    }

    #[instrument(level = "debug", skip(self))]
    pub fn begin_scope(&mut self, name: &str, kind: StructureType) -> ScopeIndex {
        let child = self.scopes.create_child(self.current, name, kind);
        self.push(Instruction::scope_begin(name, kind));
        self.current = child;
        child
    }

    /// Closes the current scope and returns to its parent.
    #[instrument(level = "debug", skip_all)]
    pub fn end_scope(&mut self) -> Result<ScopeIndex, BuilderError> {
        if !self.scopes.has_parent(self.current) {
            return Err(BuilderError::UnbalancedScopeEnd);
        }
        self.push(Instruction::scope_end());
        let closed = self.current;
        self.current = self.scopes.parent_of(closed);
        Ok(closed)
    }

    fn register(&mut self, symbol: Symbol) -> Result<(), BuilderError> {
        let name = symbol.name().to_string();
        if !self.scopes.add_symbol(self.current, symbol, false) {
            return Err(BuilderError::Redefinition {
                name,
                scope: self.scopes.unique_name(self.current),
            });
        }
        Ok(())
    }

    #[instrument(level = "debug", skip(self, dtype))]
    pub fn declare_variable(
        &mut self,
        name: &str,
        dtype: impl Into<DataTypeBase>,
    ) -> Result<Reference<Variable>, BuilderError> {
        let var = Reference::new(Variable::new(name, dtype));
        self.register(var.clone().into())?;
        self.push(Instruction::declare(var.clone()));
        Ok(var)
    }

    #[instrument(level = "debug", skip(self, dtype, value))]
    pub fn declare_constant(
        &mut self,
        name: &str,
        dtype: impl Into<DataTypeBase>,
        value: ConstValue,
    ) -> Result<Reference<Constant>, BuilderError> {
        let constant = Reference::new(Constant::new(name, dtype, value));
        self.register(constant.clone().into())?;
        self.push(Instruction::declare(constant.clone()));
        Ok(constant)
    }

    /// Ends the lifetime of a variable declared in the current scope.
    #[instrument(level = "debug", skip(self))]
    pub fn release_variable(&mut self, name: &str) -> Result<(), BuilderError> {
        let found = self.scopes.find_symbol(self.current, name)?.kind();
        if found != SymbolKind::Variable {
            return Err(BuilderError::UnexpectedSymbol {
                name: name.to_string(),
                expected: SymbolKind::Variable,
                found,
            });
        }
        self.scopes.release_symbol(self.current, name)?;
        self.push(Instruction::var_release(name));
        Ok(())
    }

    /// Registers a function in the current scope and emits its FUNCTION
    /// instruction. The body goes in a scope opened afterwards.
    #[instrument(level = "debug", skip_all, fields(name = %function.name))]
    pub fn define_function(&mut self, function: Function) -> Result<Reference<Function>, BuilderError> {
        let function = Reference::new(function);
        self.register(function.clone().into())?;
        self.push(Instruction::function(function.clone()));
        Ok(function)
    }

    /// Opens the body scope of `function` and binds its parameters there.
    pub fn begin_function_body(
        &mut self,
        function: &Reference<Function>,
    ) -> Result<ScopeIndex, BuilderError> {
        let body = self.begin_scope(&function.name, StructureType::Function);
        for param in &function.params {
            self.register(param.as_variable().into())?;
        }
        Ok(body)
    }

    #[instrument(level = "debug", skip_all, fields(name = %class.name))]
    pub fn define_class(&mut self, class: Class) -> Result<ClassSymbol, BuilderError> {
        if self.scopes.has_symbol(self.current, &class.name) {
            return Err(BuilderError::Redefinition {
                name: class.name,
                scope: self.scopes.unique_name(self.current),
            });
        }
        let symbol = self.classes.register(class)?;
        self.register(symbol.clone().into())?;
        self.push(Instruction::class(symbol.clone()));
        Ok(symbol)
    }

    /// Links a registered class to a parent, rejecting inheritance cycles.
    pub fn set_class_parent(
        &mut self,
        class: &ClassSymbol,
        parent: Option<&ClassSymbol>,
    ) -> Result<(), BuilderError> {
        self.classes.set_parent(class.index, parent.map(|p| p.index))?;
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&Symbol, BuilderError> {
        Ok(self.scopes.resolve_symbol(self.current, name)?)
    }

    pub fn resolve_value(&self, name: &str) -> Result<ValueRef, BuilderError> {
        let symbol = self.resolve(name)?;
        symbol
            .as_value()
            .ok_or_else(|| BuilderError::UnexpectedSymbol {
                name: name.to_string(),
                expected: SymbolKind::Variable,
                found: symbol.kind(),
            })
    }

    pub fn resolve_variable(&self, name: &str) -> Result<Reference<Variable>, BuilderError> {
        let symbol = self.resolve(name)?;
        symbol
            .as_variable()
            .ok_or_else(|| BuilderError::UnexpectedSymbol {
                name: name.to_string(),
                expected: SymbolKind::Variable,
                found: symbol.kind(),
            })
    }

    pub fn resolve_function(&self, name: &str) -> Result<Reference<Function>, BuilderError> {
        let symbol = self.resolve(name)?;
        symbol
            .as_function()
            .ok_or_else(|| BuilderError::UnexpectedSymbol {
                name: name.to_string(),
                expected: SymbolKind::Function,
                found: symbol.kind(),
            })
    }

    pub fn resolve_class(&self, name: &str) -> Result<ClassSymbol, BuilderError> {
        let symbol = self.resolve(name)?;
        symbol
            .as_class()
            .cloned()
            .ok_or_else(|| BuilderError::UnexpectedSymbol {
                name: name.to_string(),
                expected: SymbolKind::Class,
                found: symbol.kind(),
            })
    }

    pub fn emit_jump(&mut self, target: &str) -> Result<(), BuilderError> {
        self.scopes.resolve_scope(self.current, target)?;
        self.push(Instruction::jump(target));
        Ok(())
    }

    pub fn emit_cond_jump(
        &mut self,
        condition: Reference<Variable>,
        if_true: &str,
        if_false: Option<&str>,
    ) -> Result<(), BuilderError> {
        self.scopes.resolve_scope(self.current, if_true)?;
        if let Some(if_false) = if_false {
            self.scopes.resolve_scope(self.current, if_false)?;
        }
        let instruction =
            Instruction::cond_jump(condition, if_true, if_false.map(ToString::to_string))?;
        self.push(instruction);
        Ok(())
    }

    pub fn emit_break(&mut self, target: &str) -> Result<(), BuilderError> {
        self.loop_target(target)?;
        self.push(Instruction::break_(target));
        Ok(())
    }

    pub fn emit_continue(&mut self, target: &str) -> Result<(), BuilderError> {
        self.loop_target(target)?;
        self.push(Instruction::continue_(target));
        Ok(())
    }

    fn loop_target(&self, target: &str) -> Result<ScopeIndex, BuilderError> {
        let scope = self.scopes.resolve_scope(self.current, target)?;
        if self.scopes[scope].kind != StructureType::Loop {
            return Err(BuilderError::NotALoop {
                name: target.to_string(),
            });
        }
        Ok(scope)
    }

    /// Registers a library into the global scope. Only allowed before the
    /// front-end emits program code.
    #[instrument(level = "debug", skip_all, fields(library = %library.name))]
    pub fn register_library(&mut self, library: LibraryDescriptor) -> Result<(), BuilderError> {
        if self.sealed {
            return Err(BuilderError::LateLibraryRegistration {
                library: library.name,
            });
        }

        let LibraryDescriptor {
            name,
            init,
            functions,
            constants,
            events,
            annotations,
            classes,
        } = library;
        let root = self.scopes.root();

        // Nothing is mutated until every name and class link checks out.
        let mut names = HashSet::new();
        let declared = functions
            .keys()
            .map(|f| f.name.as_str())
            .chain(constants.keys().map(|c| c.name.as_str()))
            .chain(classes.iter().map(|c| c.name.as_str()));
        for declared in declared {
            if !names.insert(declared) || self.scopes.has_symbol(root, declared) {
                return Err(BuilderError::Redefinition {
                    name: declared.to_string(),
                    scope: self.scopes.unique_name(root),
                });
            }
        }
        for class in &classes {
            for link in class.parent.iter().chain(class.interface.iter()) {
                self.classes.try_get(*link)?;
            }
        }

        for function in functions.keys() {
            self.scopes.add_symbol(root, function.clone(), false);
        }
        for constant in constants.keys() {
            self.scopes.add_symbol(root, constant.clone(), false);
        }
        for class in classes {
            let symbol = self.classes.register(class)?;
            self.scopes.add_symbol(root, symbol, false);
        }

        debug!(
            "loaded {} functions, {} constants, {} init instructions",
            functions.len(),
            constants.len(),
            init.len()
        );
        self.instructions.extend(init);
        self.natives
            .record(name, functions, constants, events, annotations);
        Ok(())
    }

    /// Finishes the unit. Fails if a scope is still open.
    #[instrument(level = "debug", skip_all)]
    pub fn finish(self) -> Result<Program, BuilderError> {
        if self.current != self.scopes.root() {
            return Err(BuilderError::UnclosedScope {
                scope: self.scopes.unique_name(self.current),
            });
        }
        debug!("finished with {} instructions", self.instructions.len());
        Ok(Program {
            instructions: self.instructions,
            scopes: self.scopes,
            classes: self.classes,
            natives: self.natives,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::DataType;

    #[test]
    fn scopes_follow_the_stream() {
        let mut builder = IRBuilder::default();
        let func = builder
            .define_function(Function::new("main", DataType::Void))
            .unwrap();
        builder.begin_function_body(&func).unwrap();
        builder.begin_scope("loop", StructureType::Loop);
        builder.emit_break("loop").unwrap();
        builder.end_scope().unwrap();
        builder.end_scope().unwrap();

        assert!(matches!(
            builder.end_scope(),
            Err(BuilderError::UnbalancedScopeEnd)
        ));
        let program = builder.finish().unwrap();
        assert_eq!(program.instructions.len(), 6);
    }

    #[test]
    fn structural_instructions_need_their_methods() {
        let mut builder = IRBuilder::default();

        assert_eq!(
            builder.emit(Instruction::scope_end()),
            Err(BuilderError::StructuralInstruction {
                opcode: "SCOPE_END".into()
            })
        );
        assert!(builder.emit(Instruction::jump("anywhere")).is_err());
        assert!(builder.instructions().is_empty());

        builder
            .emit(Instruction::raw_cmd(ConstValue::String("nop".into())))
            .unwrap();
        assert_eq!(builder.finish().unwrap().instructions.len(), 1);
    }

    #[test]
    fn unclosed_scope_fails_finish() {
        let mut builder = IRBuilder::default();
        builder.begin_scope("f", StructureType::Function);

        assert_eq!(
            builder.finish().unwrap_err(),
            BuilderError::UnclosedScope {
                scope: "global/f".into()
            }
        );
    }

    #[test]
    fn parameters_are_visible_in_the_body() {
        let mut builder = IRBuilder::default();
        let func = builder
            .define_function(Function::new("inc", DataType::Int).with_param("n", DataType::Int))
            .unwrap();
        builder.begin_function_body(&func).unwrap();

        let n = builder.resolve_variable("n").unwrap();
        assert_eq!(n.dtype, DataTypeBase::from(DataType::Int));
        builder.end_scope().unwrap();
        assert!(builder.resolve_variable("n").is_err());
    }
}
