// Quadruple Code Generator
//
// Two passes over the analyzed program: address assignment for every
// declared variable, then emission of the quadruple list with backpatching.
// Expression and statement lowering live in codegen_expressions.rs and
// codegen_statements.rs.

use crate::compiler::address_space::{Address, AddressSpace, Region, UNUSED_ADDRESS};
use crate::compiler::ast::Function;
use crate::compiler::directories::{FunctionDirectory, Scope, VariableDirectory};
use crate::compiler::error::CompilerError;
use crate::compiler::quad::{Operation, Quadruple, QuadrupleProgram};
use crate::compiler::references::{patch_field, PatchField, ReferenceContext};
use crate::compiler::semantic::AnalyzedProgram;
use crate::compiler::types::{Type, STORABLE_TYPES};
use indexmap::IndexMap;
use log::{debug, info};

/// Read-only view of the symbols while one function body is emitted
pub(super) struct FunctionContext<'a> {
    pub scope: Scope<'a>,
    pub functions: &'a FunctionDirectory,
}

pub struct CodeGenerator {
    pub(super) space: AddressSpace,
    pub(super) quads: Vec<Quadruple>,
    /// Pending jump sites and loop tops, innermost last
    pub(super) jump_stack: Vec<usize>,
    pub(super) references: ReferenceContext,
    entry_points: IndexMap<String, Address>,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGenerator {
    pub fn new() -> Self {
        Self::with_address_space(AddressSpace::new())
    }

    pub fn with_address_space(space: AddressSpace) -> Self {
        CodeGenerator {
            space,
            quads: Vec::new(),
            jump_stack: Vec::new(),
            references: ReferenceContext::new(),
            entry_points: IndexMap::new(),
        }
    }

    pub fn generate(mut self, analyzed: AnalyzedProgram) -> Result<QuadrupleProgram, CompilerError> {
        let AnalyzedProgram {
            program,
            mut functions,
            mut globals,
            entry,
        } = analyzed;

        // Pass 1: addresses
        self.assign_addresses(&mut functions, &mut globals)?;

        // Pass 2: emission
        self.emit_globals(&globals)?;
        self.references.add(self.quads.len(), PatchField::Result, entry.as_str());
        self.emit(Operation::Goto, UNUSED_ADDRESS, UNUSED_ADDRESS, UNUSED_ADDRESS);

        for function in &program.functions {
            self.generate_function(function, &functions, &globals)?;
        }

        for (id, address) in &self.entry_points {
            if let Some(entry) = functions.get_mut(id) {
                entry.entry_address = *address;
            }
        }
        self.references.resolve(&mut self.quads, &functions)?;

        if !self.jump_stack.is_empty() {
            return Err(CompilerError::CodeGenError(format!(
                "{} unresolved jumps after emission",
                self.jump_stack.len()
            )));
        }

        info!(
            "generated {} quadruples, {} constants",
            self.quads.len(),
            self.space.constants().len()
        );

        Ok(QuadrupleProgram {
            quads: self.quads,
            constants: self.space.constants(),
        })
    }

    /// Give every variable its address, in declaration order per function,
    /// then the globals
    pub(super) fn assign_addresses(
        &mut self,
        functions: &mut FunctionDirectory,
        globals: &mut VariableDirectory,
    ) -> Result<(), CompilerError> {
        for function in functions.iter_mut() {
            self.space.reset_local();
            for id in function.vars.ids_in_order() {
                if let Some(var) = function.vars.get_mut(&id) {
                    var.address = Some(self.space.next_local(&var.ty)?);
                    debug!("{}::{} -> {:?}", function.id, var.id, var.address);
                }
            }
            function.footprint = STORABLE_TYPES
                .iter()
                .map(|t| self.space.used(Region::Local, *t) as usize)
                .sum();
        }
        self.space.reset_local();

        for id in globals.ids_in_order() {
            if let Some(var) = globals.get_mut(&id) {
                var.address = Some(self.space.next_global(&var.ty)?);
                debug!("global {} -> {:?}", var.id, var.address);
            }
        }
        Ok(())
    }

    fn emit_globals(&mut self, globals: &VariableDirectory) -> Result<(), CompilerError> {
        for var in globals.entries() {
            let address = var.address.ok_or_else(|| unassigned(&var.id))?;
            self.emit_init(address, &var.ty);
        }
        Ok(())
    }

    fn generate_function(
        &mut self,
        function: &Function,
        functions: &FunctionDirectory,
        globals: &VariableDirectory,
    ) -> Result<(), CompilerError> {
        let entry = functions.get(&function.id).ok_or_else(|| {
            CompilerError::CodeGenError(format!("function '{}' missing from directory", function.id))
        })?;

        self.space.reset_temp();
        self.entry_points
            .insert(function.id.clone(), self.quads.len() as Address);
        debug!("function {} starts at {}", function.id, self.quads.len());

        let ctx = FunctionContext {
            scope: Scope::new(&entry.vars, globals),
            functions,
        };
        self.generate_block(&function.body, &ctx)?;

        let fallback = self.space.default_address(&entry.return_type);
        self.emit(Operation::Ret, UNUSED_ADDRESS, UNUSED_ADDRESS, fallback);
        Ok(())
    }

    // Emission helpers

    pub(super) fn emit(
        &mut self,
        op: Operation,
        operand1: Address,
        operand2: Address,
        result: Address,
    ) -> usize {
        let index = self.quads.len();
        let quad = Quadruple::new(op, operand1, operand2, result);
        debug!("{:4}: {}", index, quad);
        self.quads.push(quad);
        index
    }

    /// `Init address, count, typeCode`
    pub(super) fn emit_init(&mut self, address: Address, ty: &Type) {
        let count = if ty.is_list() { ty.size as Address } else { 1 };
        self.emit(Operation::Init, address, count, ty.element.code_value());
    }

    pub(super) fn here(&self) -> Address {
        self.quads.len() as Address
    }

    /// Point a pending jump's result at the current position
    pub(super) fn fill_jump(&mut self, index: usize) -> Result<(), CompilerError> {
        let target = self.here();
        debug!("backpatch jump {} -> {}", index, target);
        patch_field(&mut self.quads, index, PatchField::Result, target)
    }

    pub(super) fn pop_jump(&mut self) -> Result<usize, CompilerError> {
        self.jump_stack
            .pop()
            .ok_or_else(|| CompilerError::CodeGenError("jump stack underflow".to_string()))
    }
}

pub(super) fn unassigned(id: &str) -> CompilerError {
    CompilerError::CodeGenError(format!("variable '{}' has no address", id))
}
