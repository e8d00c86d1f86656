//! Main compiler module.
//!
//! The [`Compiler`] owns everything that outlives a single function: the
//! type table, the global symbol table, the ABI cache and the output being
//! assembled. While a function body is lowered it also holds a
//! [`FunctionContext`] with the CFG builder and the local scope chain.
//!
//! Top-level names are resolved on demand. The driver walks the module in
//! source order and asks for each name; resolving one may recursively
//! resolve the names it depends on.

use std::{collections::HashMap, rc::Rc};

use tracing::{debug, trace};

use crate::{
    ast::{
        ast::{Declaration, Definition, DefinitionBody, Item, Module},
        expressions::Expr,
        statements::Stmt,
    },
    errors::errors::{Error, ErrorImpl},
    ir::{
        builder::{FinishError, FunctionBuilder},
        ir::{self, BlockId, Constant, External, Function, Global, Instr, Operand, Param, ParamClass, StorageClass, Temp},
    },
    options::CompileOptions,
    types::types::{TypeId, TypeTable},
    Span,
};

use super::{
    call::{Abi, ReturnClass},
    stmt::lower_statement,
    symbols::{GlobalEntry, GlobalSlot, GlobalTable, Scopes},
    value::{FunctionInstance, Value, Variable},
};

pub fn error(kind: ErrorImpl, span: &Span) -> Error {
    Error::new(kind, span.clone())
}

/// Where `break` and `continue` jump inside the innermost loop.
#[derive(Debug, Clone, Copy)]
pub struct LoopTargets {
    pub update: BlockId,
    pub exit: BlockId,
}

/// Per-function lowering state.
pub struct FunctionContext {
    pub builder: FunctionBuilder,
    pub instance: Rc<FunctionInstance>,
    pub ret: TypeId,
    pub abi: Rc<Abi>,
    pub scopes: Scopes,
    pub loops: Vec<LoopTargets>,
    /// Shared block every `return` jumps to when the result is returned
    /// through the hidden slot. Created by the first such `return`.
    pub epilogue: Option<BlockId>,
}

pub struct Compiler<'m> {
    pub module: &'m Module,
    pub options: CompileOptions,
    pub types: TypeTable,
    pub globals: GlobalTable,
    pub abi_cache: HashMap<TypeId, Rc<Abi>>,
    /// Absent while evaluating constants.
    pub function: Option<FunctionContext>,
    /// Representations currently being classified as type or value.
    pub classifying: Vec<String>,

    pub ir_globals: Vec<Global>,
    pub externals: Vec<External>,
    pub functions: Vec<Function>,
}

impl<'m> Compiler<'m> {
    pub fn new(module: &'m Module, options: &CompileOptions) -> Self {
        Compiler {
            module,
            options: options.clone(),
            types: TypeTable::new(options.word_size),
            globals: GlobalTable::default(),
            abi_cache: HashMap::new(),
            function: None,
            classifying: vec![],
            ir_globals: vec![],
            externals: vec![],
            functions: vec![],
        }
    }

    pub fn in_function(&self) -> bool {
        self.function.is_some()
    }

    /// The current function, or a `NotConstant` error naming `what` needed
    /// one.
    pub fn context(&mut self, what: &str, span: &Span) -> Result<&mut FunctionContext, Error> {
        match self.function.as_mut() {
            Some(context) => Ok(context),
            None => Err(error(
                ErrorImpl::NotConstant {
                    what: what.to_string(),
                },
                span,
            )),
        }
    }

    pub fn builder(&mut self, what: &str, span: &Span) -> Result<&mut FunctionBuilder, Error> {
        Ok(&mut self.context(what, span)?.builder)
    }

    pub fn emit(&mut self, what: &str, span: &Span, instr: Instr) -> Result<(), Error> {
        self.builder(what, span)?.emit(instr);
        Ok(())
    }

    /// Emits an instruction defining a fresh temporary and returns it.
    pub fn emit_temp(&mut self, what: &str, span: &Span, make: impl FnOnce(Temp) -> Instr) -> Result<Operand, Error> {
        let builder = self.builder(what, span)?;
        let dest = builder.temp();
        builder.emit(make(dest));
        Ok(Operand::Temp(dest))
    }

    pub fn alloca(&mut self, ty: TypeId, span: &Span) -> Result<Operand, Error> {
        Ok(self.builder("a local variable", span)?.alloca(ty))
    }

    /// Runs `f` with no function context so that it can neither see locals
    /// nor emit instructions. The context is restored whatever `f` returns.
    pub fn with_global_context<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, Error>) -> Result<T, Error> {
        let saved = self.function.take();
        let result = f(self);
        self.function = saved;
        result
    }

    pub fn lookup_local(&self, name: &str) -> Option<Rc<Variable>> {
        self.function
            .as_ref()
            .and_then(|context| context.scopes.lookup(name))
            .cloned()
    }

    pub fn push_scope(&mut self) {
        if let Some(context) = self.function.as_mut() {
            context.scopes.push();
        }
    }

    pub fn pop_scope(&mut self) {
        if let Some(context) = self.function.as_mut() {
            context.scopes.pop();
        }
    }

    /// Binds a local in the innermost scope.
    pub fn bind_local(&mut self, name: &str, variable: Rc<Variable>, span: &Span) -> Result<(), Error> {
        let context = self.context("a local variable", span)?;
        if !context.scopes.bind(name, variable) {
            return Err(error(
                ErrorImpl::Redefinition {
                    name: name.to_string(),
                },
                span,
            ));
        }
        Ok(())
    }

    /// Resolves a top-level name, building its entry on first use.
    pub fn global(&mut self, name: &str, span: &Span) -> Result<GlobalEntry, Error> {
        match self.globals.get(name) {
            Some(GlobalSlot::Resolved(entry)) => return Ok(entry.clone()),
            Some(GlobalSlot::InProgress) => {
                return Err(error(
                    ErrorImpl::CyclicDefinition {
                        name: name.to_string(),
                    },
                    span,
                ))
            }
            Some(GlobalSlot::Failed) => {
                return Err(error(
                    ErrorImpl::DependencyFailed {
                        name: name.to_string(),
                    },
                    span,
                ))
            }
            None => {}
        }

        let module = self.module;
        let Some(item) = module.lookup(name) else {
            return match TypeTable::builtin(name) {
                Some(id) => Ok(GlobalEntry::Type(id)),
                None => Err(error(
                    ErrorImpl::UnknownIdentifier {
                        name: name.to_string(),
                    },
                    span,
                )),
            };
        };

        trace!(name, "resolving global");

        self.with_global_context(|compiler| match item {
            Item::Representation(representation) => compiler.resolve_representation(representation),
            Item::Declaration(declaration) => compiler.guarded(name, |c| c.resolve_declaration(declaration)),
            Item::Definition(definition) => compiler.guarded(name, |c| c.resolve_definition(definition)),
        })
    }

    /// Marks `name` in progress while `f` runs and records the outcome.
    pub fn guarded(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut Self) -> Result<GlobalEntry, Error>,
    ) -> Result<GlobalEntry, Error> {
        if self.globals.entry(name).is_none() {
            self.globals.begin(name);
        }

        let result = f(self);
        match &result {
            Ok(entry) => self.globals.resolve(name, entry.clone()),
            Err(_) => self.globals.fail(name),
        }
        result
    }

    fn resolve_declaration(&mut self, declaration: &Declaration) -> Result<GlobalEntry, Error> {
        let ty = self.resolve_type(&declaration.ty, false)?;

        let entry = if self.types.is_function(ty) {
            GlobalEntry::Function(Rc::new(FunctionInstance {
                name: declaration.name.clone(),
                ty,
                storage: StorageClass::External,
            }))
        } else {
            self.validate_variable_type(ty, &declaration.span)?;
            GlobalEntry::Variable(Rc::new(self.global_variable(
                &declaration.name,
                ty,
                StorageClass::External,
            )))
        };

        self.externals.push(External {
            name: declaration.name.clone(),
            ty,
        });
        Ok(entry)
    }

    fn resolve_definition(&mut self, definition: &Definition) -> Result<GlobalEntry, Error> {
        let storage = if definition.private {
            StorageClass::Private
        } else {
            StorageClass::Internal
        };

        match (&definition.body, &definition.ty) {
            (DefinitionBody::Function(_), Some(annotation)) => {
                let ty = self.resolve_type(annotation, false)?;
                if !self.types.is_function(ty) {
                    return Err(error(
                        ErrorImpl::NotAFunctionType {
                            type_: self.types.name(ty),
                        },
                        &annotation.span,
                    ));
                }

                Ok(GlobalEntry::Function(Rc::new(FunctionInstance {
                    name: definition.name.clone(),
                    ty,
                    storage,
                })))
            }
            (DefinitionBody::Function(_), None) => Err(error(
                ErrorImpl::NotAFunctionType {
                    type_: self.types.name(TypeId::UNKNOWN),
                },
                &definition.span,
            )),
            (DefinitionBody::Variable(value), Some(annotation)) => {
                let ty = self.resolve_type(annotation, false)?;
                self.validate_variable_type(ty, &annotation.span)?;

                // The address is known before the initializer, so the
                // initializer may refer to the variable itself.
                let variable = Rc::new(self.global_variable(&definition.name, ty, storage));
                self.globals
                    .resolve(&definition.name, GlobalEntry::Variable(variable.clone()));

                let init = self.constant_initializer(value.as_ref(), ty, &definition.span)?;
                self.push_global(&definition.name, ty, storage, init);
                Ok(GlobalEntry::Variable(variable))
            }
            (DefinitionBody::Variable(Some(value)), None) => {
                let (ty, init) = self.inferred_constant(value)?;
                self.validate_variable_type(ty, &value.span)?;

                let variable = Rc::new(self.global_variable(&definition.name, ty, storage));
                self.push_global(&definition.name, ty, storage, init);
                Ok(GlobalEntry::Variable(variable))
            }
            (DefinitionBody::Variable(None), None) => Err(error(
                ErrorImpl::InvalidInitializer {
                    type_: self.types.name(TypeId::UNKNOWN),
                },
                &definition.span,
            )),
        }
    }

    /// A variable with module storage whose address is its symbol.
    pub fn global_variable(&mut self, symbol: &str, ty: TypeId, storage: StorageClass) -> Variable {
        let pointer = self.types.pointer_to(ty);
        Variable {
            name: symbol.to_string(),
            storage,
            location: Operand::Const(Constant::Address {
                symbol: symbol.to_string(),
                offset: 0,
                ty: pointer,
            }),
            ty,
            assignable: true,
        }
    }

    pub fn push_global(&mut self, name: &str, ty: TypeId, storage: StorageClass, init: Constant) {
        debug!(name, ty = %self.types.name(ty), "defined global");
        self.ir_globals.push(Global {
            name: name.to_string(),
            ty,
            storage,
            init,
        });
    }

    /// Lowers an expression that must produce a compile-time constant.
    pub fn lower_constant(&mut self, expr: &Expr) -> Result<Value, Error> {
        let value = self.with_global_context(|compiler| super::expr::lower_expression(compiler, expr))?;

        if value.as_constant().is_none() {
            return Err(error(
                ErrorImpl::NotConstant {
                    what: String::from("the expression"),
                },
                &expr.span,
            ));
        }

        Ok(value)
    }

    /// Evaluates the initializer of a variable with module storage. Without
    /// one the variable is zero-initialized.
    pub fn constant_initializer(
        &mut self,
        value: Option<&Expr>,
        ty: TypeId,
        span: &Span,
    ) -> Result<Constant, Error> {
        let Some(expr) = value else {
            return Ok(super::constant::zero_constant(&self.types, ty));
        };

        let value = self.with_global_context(|compiler| compiler.lower_converted(expr, ty))?;
        match value.as_constant() {
            Some(constant) => Ok(constant.clone()),
            None => Err(error(
                ErrorImpl::NotConstant {
                    what: String::from("the initializer"),
                },
                span,
            )),
        }
    }

    /// Evaluates an unannotated constant initializer; the value decides the
    /// type.
    pub fn inferred_constant(&mut self, expr: &Expr) -> Result<(TypeId, Constant), Error> {
        let value = self.lower_constant(expr)?;
        let value = self.settle(value, &expr.span)?;

        match value.as_constant() {
            Some(constant) => Ok((value.ty, constant.clone())),
            None => Err(error(
                ErrorImpl::NotConstant {
                    what: String::from("the initializer"),
                },
                &expr.span,
            )),
        }
    }

    /// Sets up the context for lowering the body of `instance`: the CFG
    /// builder, the ABI and a root scope holding the parameters.
    pub fn begin_function(&mut self, instance: &Rc<FunctionInstance>, span: &Span) -> Result<(), Error> {
        let Some((params, ret)) = self
            .types
            .function_parts(instance.ty)
            .map(|(params, ret)| (params.to_vec(), ret))
        else {
            return Err(error(
                ErrorImpl::NotAFunctionType {
                    type_: self.types.name(instance.ty),
                },
                span,
            ));
        };

        let abi = self.abi(instance.ty, span)?;
        let indirect = abi.ret == ReturnClass::Indirect;

        let mut ir_params = vec![];
        if indirect {
            ir_params.push(Param {
                name: String::from("return"),
                ty: self.types.pointer_to(ret),
                class: ParamClass::ReturnSlot,
            });
        }
        for (param, class) in params.iter().zip(abi.params.iter()) {
            ir_params.push(Param {
                name: param.name.clone().unwrap_or_default(),
                ty: param.ty,
                class: *class,
            });
        }

        debug!(function = %instance.name, params = params.len(), indirect, "lowering function");

        self.function = Some(FunctionContext {
            builder: FunctionBuilder::new(&instance.name, instance.ty, instance.storage, ir_params),
            instance: instance.clone(),
            ret,
            abi: abi.clone(),
            scopes: Scopes::default(),
            loops: vec![],
            epilogue: None,
        });

        let offset = if indirect { 1 } else { 0 };
        for (index, (param, class)) in params.iter().zip(abi.params.iter()).enumerate() {
            let incoming = Operand::Param((index + offset) as u32);
            let name = param.name.clone().unwrap_or_default();

            let variable = match class {
                ParamClass::ByReference | ParamClass::Indirect | ParamClass::ReturnSlot => Variable {
                    name: name.clone(),
                    storage: StorageClass::Reference,
                    location: incoming,
                    ty: param.ty,
                    assignable: true,
                },
                ParamClass::Direct => {
                    let slot = self.alloca(param.ty, span)?;
                    let store = if self.types.is_aggregate(param.ty) {
                        Instr::StoreBits {
                            size: self.types.size_of(param.ty).unwrap_or(0),
                            addr: slot.clone(),
                            value: incoming,
                        }
                    } else {
                        Instr::Store {
                            ty: param.ty,
                            addr: slot.clone(),
                            value: incoming,
                        }
                    };
                    self.emit("a parameter", span, store)?;

                    Variable {
                        name: name.clone(),
                        storage: StorageClass::Local,
                        location: slot,
                        ty: param.ty,
                        assignable: true,
                    }
                }
            };

            if !name.is_empty() {
                self.bind_local(&name, Rc::new(variable), span)?;
            }
        }

        Ok(())
    }

    /// Closes the current function and returns its finished CFG.
    pub fn end_function(&mut self, span: &Span) -> Result<Function, Error> {
        let Some(context) = self.function.take() else {
            return Err(error(
                ErrorImpl::NotConstant {
                    what: String::from("a function body"),
                },
                span,
            ));
        };

        let name = context.instance.name.clone();
        let returns_void = context.abi.ret == ReturnClass::Void;

        context.builder.finish(returns_void).map_err(|finish| match finish {
            FinishError::MissingReturn(block) => {
                debug!(function = %name, block = block.0, "block falls off the end");
                error(ErrorImpl::MissingReturn { function: name.clone() }, span)
            }
        })
    }

    pub fn lower_function(
        &mut self,
        instance: &Rc<FunctionInstance>,
        body: &[Stmt],
        span: &Span,
    ) -> Result<Function, Error> {
        let result = self.begin_function(instance, span).and_then(|_| {
            body.iter()
                .try_for_each(|statement| lower_statement(self, statement))
        });

        if let Err(error) = result {
            self.function = None;
            return Err(error);
        }

        self.end_function(span)
    }

    /// Resolves one top-level item and, for a function definition, lowers
    /// its body.
    pub fn lower_item(&mut self, item: Item<'m>) -> Result<(), Error> {
        let entry = self.global(item.name(), item.span())?;

        if let (
            Item::Definition(Definition {
                body: DefinitionBody::Function(body),
                span,
                ..
            }),
            GlobalEntry::Function(instance),
        ) = (item, entry)
        {
            let function = self.lower_function(&instance, body, span)?;
            self.functions.push(function);
        }

        Ok(())
    }

    pub fn finish(self) -> ir::Module {
        ir::Module {
            types: self.types,
            globals: self.ir_globals,
            externals: self.externals,
            functions: self.functions,
        }
    }
}

/// Lowers every item of `module`.
///
/// Items are visited in source order. Each item reports at most one error;
/// an item that already failed as a dependency of an earlier one is not
/// reported again.
///
/// # Returns
///
/// The finished IR module, or every error in the order found.
pub fn compile(module: &Module, options: &CompileOptions) -> Result<ir::Module, Vec<Error>> {
    let mut compiler = Compiler::new(module, options);
    let mut errors = vec![];

    for item in module.items() {
        if compiler.globals.is_failed(item.name()) {
            continue;
        }

        if let Err(error) = compiler.lower_item(item) {
            debug!(item = item.name(), error = %error, "item failed");
            errors.push(error);
        }
    }

    if errors.is_empty() {
        Ok(compiler.finish())
    } else {
        Err(errors)
    }
}
