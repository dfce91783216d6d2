// Code Generator - Statement Lowering
//
// Control flow uses the generator's jump stack: pending GotoF/Goto sites
// and loop tops are pushed, then popped and backpatched when the enclosing
// block closes.

use crate::compiler::address_space::{Address, UNUSED_ADDRESS};
use crate::compiler::ast::*;
use crate::compiler::codegen::{unassigned, CodeGenerator, FunctionContext};
use crate::compiler::error::CompilerError;
use crate::compiler::quad::Operation;
use crate::compiler::semantic::resolve_attribute;

impl CodeGenerator {
    pub(super) fn generate_block(
        &mut self,
        block: &[Statement],
        ctx: &FunctionContext,
    ) -> Result<(), CompilerError> {
        for statement in block {
            self.generate_statement(statement, ctx)?;
        }
        Ok(())
    }

    fn generate_statement(
        &mut self,
        statement: &Statement,
        ctx: &FunctionContext,
    ) -> Result<(), CompilerError> {
        match statement {
            Statement::VarDecl(decl) => {
                let var = ctx
                    .scope
                    .locals
                    .get(&decl.id)
                    .ok_or_else(|| CompilerError::UndeclaredIdentifier(decl.id.clone(), decl.line))?;
                let address = var.address.ok_or_else(|| unassigned(&decl.id))?;
                self.emit_init(address, &var.ty);
                Ok(())
            }
            Statement::Assign(assign) => self.generate_assign(assign, ctx),
            Statement::Condition(condition) => self.generate_condition(condition, ctx),
            Statement::Write(write) => {
                let (value, _) = self.generate_expression(&write.value, ctx)?;
                self.emit(Operation::Print, UNUSED_ADDRESS, UNUSED_ADDRESS, value);
                Ok(())
            }
            Statement::Return(ret) => {
                let value = match &ret.value {
                    Some(expression) => self.generate_expression(expression, ctx)?.0,
                    None => UNUSED_ADDRESS,
                };
                self.emit(Operation::Ret, UNUSED_ADDRESS, UNUSED_ADDRESS, value);
                Ok(())
            }
            Statement::For(f) => self.generate_for(f, ctx),
            Statement::While(w) => self.generate_while(w, ctx),
            Statement::Call(call) => self.generate_call(call, ctx).map(|_| ()),
        }
    }

    fn generate_assign(&mut self, assign: &Assign, ctx: &FunctionContext) -> Result<(), CompilerError> {
        let (value, _) = self.generate_expression(&assign.value, ctx)?;
        let target = &assign.target;

        if let Some(index) = &target.index {
            let (pointer, _) = self.generate_element_address(target, index, ctx)?;
            self.emit(Operation::AssignIndex, value, UNUSED_ADDRESS, pointer);
            return Ok(());
        }

        let resolved = resolve_attribute(ctx.scope, target)?;
        let base = resolved
            .variable
            .address
            .ok_or_else(|| unassigned(&target.obj_id))?;
        let offset = resolved.attribute.map(|a| a.offset()).unwrap_or(0);
        self.emit(Operation::Assign, value, UNUSED_ADDRESS, base + offset);
        Ok(())
    }

    fn generate_condition(
        &mut self,
        condition: &Condition,
        ctx: &FunctionContext,
    ) -> Result<(), CompilerError> {
        let (guard, _) = self.generate_expression(&condition.guard, ctx)?;
        let gotof = self.emit(Operation::GotoF, guard, UNUSED_ADDRESS, UNUSED_ADDRESS);
        self.jump_stack.push(gotof);

        self.generate_block(&condition.then_block, ctx)?;

        match &condition.else_block {
            Some(else_block) => {
                let false_jump = self.pop_jump()?;
                let skip_else = self.emit(
                    Operation::Goto,
                    UNUSED_ADDRESS,
                    UNUSED_ADDRESS,
                    UNUSED_ADDRESS,
                );
                self.jump_stack.push(skip_else);
                self.fill_jump(false_jump)?;

                self.generate_block(else_block, ctx)?;

                let skip_else = self.pop_jump()?;
                self.fill_jump(skip_else)
            }
            None => {
                let false_jump = self.pop_jump()?;
                self.fill_jump(false_jump)
            }
        }
    }

    fn generate_while(&mut self, w: &While, ctx: &FunctionContext) -> Result<(), CompilerError> {
        self.generate_loop(&w.condition, &w.body, None, ctx)
    }

    fn generate_for(&mut self, f: &For, ctx: &FunctionContext) -> Result<(), CompilerError> {
        self.generate_assign(&f.init, ctx)?;
        self.generate_loop(&f.condition, &f.body, Some(&f.step), ctx)
    }

    /// Shared shape of `while` and `for`: test at the top, body, optional
    /// step, jump back
    fn generate_loop(
        &mut self,
        condition: &Expression,
        body: &[Statement],
        step: Option<&Assign>,
        ctx: &FunctionContext,
    ) -> Result<(), CompilerError> {
        self.jump_stack.push(self.quads.len());

        let (guard, _) = self.generate_expression(condition, ctx)?;
        let gotof = self.emit(Operation::GotoF, guard, UNUSED_ADDRESS, UNUSED_ADDRESS);
        self.jump_stack.push(gotof);

        self.generate_block(body, ctx)?;
        if let Some(step) = step {
            self.generate_assign(step, ctx)?;
        }

        let exit_jump = self.pop_jump()?;
        let loop_top = self.pop_jump()? as Address;
        self.emit(Operation::Goto, UNUSED_ADDRESS, UNUSED_ADDRESS, loop_top);
        self.fill_jump(exit_jump)
    }
}
