use std::rc::Rc;

use tracing::trace;

use crate::{
    ast::{
        expressions::Expr,
        statements::{IfBranch, Stmt, StmtKind, VarDecl},
    },
    errors::errors::{Error, ErrorImpl},
    ir::ir::{BlockId, Operand, StorageClass},
    types::types::TypeId,
    Span,
};

use super::{
    compiler::{error, Compiler, LoopTargets},
    constant::zero_constant,
    expr::lower_expression,
    value::{Value, Variable},
};

/// Lowers a statement into the current block. Code following a terminator
/// goes to a fresh block that `finish` prunes.
pub fn lower_statement(compiler: &mut Compiler, stmt: &Stmt) -> Result<(), Error> {
    let span = &stmt.span;

    let builder = compiler.builder("a statement", span)?;
    if builder.is_terminated() {
        let dead = builder.new_block("dead");
        builder.position_at(dead);
    }

    match &stmt.kind {
        StmtKind::Expression(expr) => lower_expression(compiler, expr).map(|_| ()),
        StmtKind::Block(body) => compiler.lower_block(body),
        StmtKind::VarDecl(decl) => compiler.lower_var_decl(decl, span),
        StmtKind::If { branches, otherwise } => compiler.lower_if(branches, otherwise.as_deref(), span),
        StmtKind::Loop {
            init,
            condition,
            update,
            body,
        } => compiler.lower_loop(init.as_deref(), condition.as_ref(), update.as_ref(), body, span),
        StmtKind::Break => {
            let target = compiler.loop_target(span, |targets| targets.exit, ErrorImpl::BreakOutsideLoop)?;
            compiler.builder("a statement", span)?.jump(target);
            Ok(())
        }
        StmtKind::Continue => {
            let target = compiler.loop_target(span, |targets| targets.update, ErrorImpl::ContinueOutsideLoop)?;
            compiler.builder("a statement", span)?.jump(target);
            Ok(())
        }
        StmtKind::Return(value) => compiler.lower_return(value.as_ref(), span),
    }
}

impl<'m> Compiler<'m> {
    /// Lowers statements in a scope of their own.
    pub fn lower_block(&mut self, body: &[Stmt]) -> Result<(), Error> {
        self.push_scope();
        let result = body.iter().try_for_each(|stmt| lower_statement(self, stmt));
        self.pop_scope();
        result
    }

    fn loop_target(&mut self, span: &Span, pick: impl Fn(&LoopTargets) -> BlockId, outside: ErrorImpl) -> Result<BlockId, Error> {
        let context = self.context("a statement", span)?;
        match context.loops.last() {
            Some(targets) => Ok(pick(targets)),
            None => Err(error(outside, span)),
        }
    }

    fn lower_var_decl(&mut self, decl: &VarDecl, span: &Span) -> Result<(), Error> {
        if decl.is_static {
            return self.lower_static(decl, span);
        }

        let variable = match (&decl.ty, &decl.value) {
            (Some(annotation), value) => {
                let ty = self.resolve_type(annotation, false)?;
                self.validate_variable_type(ty, &annotation.span)?;

                let slot = self.alloca(ty, span)?;
                match value {
                    Some(value) => self.lower_into(value, &slot, ty)?,
                    None => {
                        let zero = Value::constant(zero_constant(&self.types, ty), ty);
                        self.store_into(&slot, zero, ty, span)?;
                    }
                }

                Variable {
                    name: decl.name.clone(),
                    storage: StorageClass::Local,
                    location: slot,
                    ty,
                    assignable: true,
                }
            }
            (None, Some(value)) => self.inferred_local(&decl.name, value, span)?,
            (None, None) => {
                return Err(error(
                    ErrorImpl::InvalidInitializer {
                        type_: self.types.name(TypeId::UNKNOWN),
                    },
                    span,
                ))
            }
        };

        trace!(name = %decl.name, ty = %self.types.name(variable.ty), "declared local");
        self.bind_local(&decl.name, Rc::new(variable), span)
    }

    /// A local whose type comes from its initializer. A temporary holding
    /// an aggregate result becomes the variable's own storage.
    fn inferred_local(&mut self, name: &str, value: &Expr, span: &Span) -> Result<Variable, Error> {
        let value = lower_expression(self, value)?;
        let value = self.settle(value, span)?;
        let ty = value.ty;
        self.validate_variable_type(ty, span)?;

        let temporary = value.as_variable().filter(|variable| {
            !variable.assignable
                && variable.storage == StorageClass::Private
                && matches!(variable.location, Operand::Temp(_))
        });
        if let Some(temporary) = temporary {
            return Ok(Variable {
                name: name.to_string(),
                storage: StorageClass::Local,
                location: temporary.location.clone(),
                ty,
                assignable: true,
            });
        }

        let slot = self.alloca(ty, span)?;
        self.store_into(&slot, value, ty, span)?;

        Ok(Variable {
            name: name.to_string(),
            storage: StorageClass::Local,
            location: slot,
            ty,
            assignable: true,
        })
    }

    /// A `static` local: module storage under a name derived from the
    /// function, initialized by a constant.
    fn lower_static(&mut self, decl: &VarDecl, span: &Span) -> Result<(), Error> {
        let function = self.context("a static variable", span)?.instance.name.clone();

        let base = format!("{}.{}", function, decl.name);
        let mut symbol = base.clone();
        let mut counter = 1;
        while self.ir_globals.iter().any(|global| global.name == symbol) {
            symbol = format!("{}.{}", base, counter);
            counter += 1;
        }

        let (ty, init) = match (&decl.ty, &decl.value) {
            (Some(annotation), value) => {
                let ty = self.resolve_type(annotation, false)?;
                self.validate_variable_type(ty, &annotation.span)?;
                (ty, self.constant_initializer(value.as_ref(), ty, span)?)
            }
            (None, Some(value)) => {
                let (ty, init) = self.inferred_constant(value)?;
                self.validate_variable_type(ty, span)?;
                (ty, init)
            }
            (None, None) => {
                return Err(error(
                    ErrorImpl::InvalidInitializer {
                        type_: self.types.name(TypeId::UNKNOWN),
                    },
                    span,
                ))
            }
        };

        let variable = self.global_variable(&symbol, ty, StorageClass::Static);
        self.push_global(&symbol, ty, StorageClass::Static, init);
        self.bind_local(&decl.name, Rc::new(variable), span)
    }

    /// `if`/`elif`/`else`. Every branch tests in its own probe block; the
    /// `else` body runs in the last one.
    fn lower_if(&mut self, branches: &[IfBranch], otherwise: Option<&[Stmt]>, span: &Span) -> Result<(), Error> {
        let builder = self.builder("an if statement", span)?;

        let mut blocks = vec![];
        for index in 0..branches.len() {
            let body = builder.new_block("if.body");
            let next = if index + 1 < branches.len() || otherwise.is_some() {
                Some(builder.new_block("if.next"))
            } else {
                None
            };
            blocks.push((body, next));
        }
        let merge = builder.new_block("if.merge");

        for (branch, (body, next)) in branches.iter().zip(blocks) {
            let condition = self.lower_condition(&branch.condition)?;
            let condition = self.operand(&condition, &branch.condition.span)?;
            let probe = next.unwrap_or(merge);

            let builder = self.builder("an if statement", span)?;
            builder.branch(condition, body, probe);
            builder.position_at(body);

            self.lower_block(&branch.body)?;

            let builder = self.builder("an if statement", span)?;
            builder.jump(merge);
            builder.position_at(probe);
        }

        if let Some(otherwise) = otherwise {
            self.lower_block(otherwise)?;

            let builder = self.builder("an if statement", span)?;
            builder.jump(merge);
            builder.position_at(merge);
        }

        Ok(())
    }

    /// Branches to `body` while `condition` holds, otherwise to `exit`. No
    /// condition loops forever.
    fn loop_test(&mut self, condition: Option<&Expr>, body: BlockId, exit: BlockId, span: &Span) -> Result<(), Error> {
        match condition {
            Some(condition) => {
                let value = self.lower_condition(condition)?;
                let value = self.operand(&value, &condition.span)?;
                self.builder("a loop", span)?.branch(value, body, exit);
            }
            None => {
                self.builder("a loop", span)?.jump(body);
            }
        }
        Ok(())
    }

    /// Lowers a loop into its five blocks: `loop.pre` runs the initializer
    /// and the first test, `loop.body` is re-entered every iteration,
    /// `loop.update` runs the update and tests again, `loop.exit` is where
    /// `break` goes and `loop.merge` follows.
    fn lower_loop(
        &mut self,
        init: Option<&Stmt>,
        condition: Option<&Expr>,
        update: Option<&Expr>,
        body: &[Stmt],
        span: &Span,
    ) -> Result<(), Error> {
        let builder = self.builder("a loop", span)?;
        let pre = builder.new_block("loop.pre");
        let header = builder.new_block("loop.body");
        let latch = builder.new_block("loop.update");
        let exit = builder.new_block("loop.exit");
        let merge = builder.new_block("loop.merge");

        builder.jump(pre);
        builder.position_at(pre);

        self.push_scope();
        let result = self.lower_loop_blocks(init, condition, update, body, [header, latch, exit], span);
        self.pop_scope();
        result?;

        let builder = self.builder("a loop", span)?;
        builder.position_at(exit);
        builder.jump(merge);
        builder.position_at(merge);
        Ok(())
    }

    fn lower_loop_blocks(
        &mut self,
        init: Option<&Stmt>,
        condition: Option<&Expr>,
        update: Option<&Expr>,
        body: &[Stmt],
        [header, latch, exit]: [BlockId; 3],
        span: &Span,
    ) -> Result<(), Error> {
        if let Some(init) = init {
            lower_statement(self, init)?;
        }
        self.loop_test(condition, header, exit, span)?;

        self.builder("a loop", span)?.position_at(header);
        self.context("a loop", span)?.loops.push(LoopTargets { update: latch, exit });
        let result = self.lower_block(body);
        self.context("a loop", span)?.loops.pop();
        result?;
        self.builder("a loop", span)?.jump(latch);

        self.builder("a loop", span)?.position_at(latch);
        if let Some(update) = update {
            lower_expression(self, update)?;
        }
        self.loop_test(condition, header, exit, span)
    }
}
