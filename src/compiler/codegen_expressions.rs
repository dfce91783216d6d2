// Code Generator - Expression Lowering
//
// Expression -> Exp -> Term -> Factor, each folded left to right. Every
// binary step allocates one fresh temporary of the cube's result type.

use crate::compiler::address_space::{Address, UNUSED_ADDRESS};
use crate::compiler::ast::*;
use crate::compiler::builtins;
use crate::compiler::codegen::{unassigned, CodeGenerator, FunctionContext};
use crate::compiler::error::CompilerError;
use crate::compiler::quad::Operation;
use crate::compiler::references::PatchField;
use crate::compiler::semantic::resolve_attribute;
use crate::compiler::semantic_cube::cube;
use crate::compiler::types::Type;

/// A lowered value: where it lives and its type
pub(super) type Operand = (Address, Type);

fn operation_for(op: Operator) -> Operation {
    match op {
        Operator::Add => Operation::Add,
        Operator::Sub => Operation::Sub,
        Operator::Mul => Operation::Mult,
        Operator::Div => Operation::Div,
        Operator::Lt => Operation::Lt,
        Operator::Gt => Operation::Gt,
        Operator::Eq => Operation::Equal,
        Operator::And => Operation::And,
        Operator::Or => Operation::Or,
    }
}

impl CodeGenerator {
    pub(super) fn generate_expression(
        &mut self,
        expression: &Expression,
        ctx: &FunctionContext,
    ) -> Result<Operand, CompilerError> {
        let mut acc = self.generate_exp(&expression.exps[0], ctx)?;
        for (op, exp) in expression.ops.iter().zip(&expression.exps[1..]) {
            let next = self.generate_exp(exp, ctx)?;
            acc = self.fold(*op, acc, next)?;
        }
        Ok(acc)
    }

    fn generate_exp(&mut self, exp: &Exp, ctx: &FunctionContext) -> Result<Operand, CompilerError> {
        let mut acc = self.generate_term(&exp.terms[0], ctx)?;
        for (op, term) in exp.ops.iter().zip(&exp.terms[1..]) {
            let next = self.generate_term(term, ctx)?;
            acc = self.fold(*op, acc, next)?;
        }
        Ok(acc)
    }

    fn generate_term(&mut self, term: &Term, ctx: &FunctionContext) -> Result<Operand, CompilerError> {
        let mut acc = self.generate_factor(&term.factors[0], ctx)?;
        for (op, factor) in term.ops.iter().zip(&term.factors[1..]) {
            let next = self.generate_factor(factor, ctx)?;
            acc = self.fold(*op, acc, next)?;
        }
        Ok(acc)
    }

    fn fold(&mut self, op: Operator, left: Operand, right: Operand) -> Result<Operand, CompilerError> {
        let result_type = cube().check(op, &left.1, &right.1)?;
        let temp = self.space.next_temp(&result_type)?;
        self.emit(operation_for(op), left.0, right.0, temp);
        Ok((temp, result_type))
    }

    fn generate_factor(
        &mut self,
        factor: &Factor,
        ctx: &FunctionContext,
    ) -> Result<Operand, CompilerError> {
        match factor {
            Factor::Expression(inner) => self.generate_expression(inner, ctx),
            Factor::Not(inner) => {
                let (address, ty) = self.generate_factor(inner, ctx)?;
                let result_type = cube().check_not(&ty)?;
                let temp = self.space.next_temp(&result_type)?;
                self.emit(Operation::Not, address, UNUSED_ADDRESS, temp);
                Ok((temp, result_type))
            }
            Factor::Constant(constant) => self.generate_constant(constant, ctx),
        }
    }

    fn generate_constant(
        &mut self,
        constant: &Constant,
        ctx: &FunctionContext,
    ) -> Result<Operand, CompilerError> {
        match constant {
            Constant::Literal(literal) => {
                let address = self.space.add_constant(&literal.text, &literal.ty)?;
                Ok((address, literal.ty.clone()))
            }
            Constant::Attribute(attr) => self.generate_attribute_read(attr, ctx),
            Constant::ListElem(elem) => {
                let attr = AttributeRef {
                    obj_id: elem.id.clone(),
                    field: None,
                    index: Some(elem.index.clone()),
                    line: elem.line,
                };
                self.generate_attribute_read(&attr, ctx)
            }
            Constant::Call(call) => self.generate_call(call, ctx),
        }
    }

    fn generate_attribute_read(
        &mut self,
        attr: &AttributeRef,
        ctx: &FunctionContext,
    ) -> Result<Operand, CompilerError> {
        match &attr.index {
            Some(index) => {
                let (element_address, ty) = self.generate_element_address(attr, index, ctx)?;
                let temp = self.space.next_temp(&ty)?;
                self.emit(Operation::AssignIndexInv, element_address, UNUSED_ADDRESS, temp);
                Ok((temp, ty))
            }
            None => {
                let resolved = resolve_attribute(ctx.scope, attr)?;
                let base = resolved
                    .variable
                    .address
                    .ok_or_else(|| unassigned(&attr.obj_id))?;
                let offset = resolved.attribute.map(|a| a.offset()).unwrap_or(0);
                Ok((base + offset, resolved.ty))
            }
        }
    }

    /// Bounds check and address arithmetic for `list[index]` (optionally
    /// followed by `.field`). Returns the temp holding the computed address
    /// and the type stored there.
    pub(super) fn generate_element_address(
        &mut self,
        attr: &AttributeRef,
        index: &Expression,
        ctx: &FunctionContext,
    ) -> Result<Operand, CompilerError> {
        let (index_address, _) = self.generate_expression(index, ctx)?;

        let resolved = resolve_attribute(ctx.scope, attr)?;
        let base = resolved
            .variable
            .address
            .ok_or_else(|| unassigned(&attr.obj_id))?;
        let size = resolved.variable.ty.size as Address;
        let offset = resolved.attribute.map(|a| a.offset()).unwrap_or(0);

        self.emit(Operation::CheckBound, size, UNUSED_ADDRESS, index_address);
        let pointer = self.space.next_temp(&Type::int())?;
        self.emit(Operation::AddAddr, base + offset, index_address, pointer);
        Ok((pointer, resolved.ty))
    }

    /// Builtins lower to one opcode; user functions go through
    /// `Era`/`Param`/`Call` with the entry address patched later
    pub(super) fn generate_call(
        &mut self,
        call: &FunctionCall,
        ctx: &FunctionContext,
    ) -> Result<Operand, CompilerError> {
        if let Some(builtin) = builtins::lookup(&call.id) {
            let mut operands = [UNUSED_ADDRESS; 2];
            for (slot, arg) in operands.iter_mut().zip(&call.args) {
                *slot = self.generate_expression(arg, ctx)?.0;
            }
            let return_type = builtin.return_type();
            let temp = self.space.next_temp(&return_type)?;
            self.emit(builtin.operation, operands[0], operands[1], temp);
            return Ok((temp, return_type));
        }

        let function = ctx
            .functions
            .get(&call.id)
            .ok_or_else(|| CompilerError::UndeclaredIdentifier(call.id.clone(), call.line))?;

        self.emit(
            Operation::Era,
            function.footprint as Address,
            UNUSED_ADDRESS,
            UNUSED_ADDRESS,
        );

        for (arg, param) in call.args.iter().zip(&function.params) {
            let (mut address, ty) = self.generate_expression(arg, ctx)?;
            if param != &ty {
                // Widen into a temp of the parameter's type so the value
                // lands in the parameter's segment
                let widened = self.space.next_temp(param)?;
                self.emit(Operation::Assign, address, UNUSED_ADDRESS, widened);
                address = widened;
            }
            let size = if ty.is_list() {
                ty.size as Address
            } else {
                UNUSED_ADDRESS
            };
            self.emit(Operation::Param, address, size, UNUSED_ADDRESS);
        }

        let result = self.space.next_temp(&function.return_type)?;
        self.references
            .add(self.quads.len(), PatchField::Operand1, call.id.as_str());
        self.emit(Operation::Call, UNUSED_ADDRESS, UNUSED_ADDRESS, result);
        Ok((result, function.return_type.clone()))
    }
}
