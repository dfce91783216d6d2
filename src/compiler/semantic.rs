// Semantic Analysis for Doodle
// Builds the symbol directories, then checks scopes and types

use crate::compiler::ast::*;
use crate::compiler::builtins;
use crate::compiler::directories::{
    FunctionDirectory, FunctionEntry, Scope, VariableDirectory, VariableEntry,
};
use crate::compiler::error::CompilerError;
use crate::compiler::semantic_cube::cube;
use crate::compiler::types::{attributes_for, Attribute, Type};
use log::debug;
use std::collections::HashSet;

/// A checked program together with its directories
#[derive(Debug, Clone)]
pub struct AnalyzedProgram {
    pub program: Program,
    pub functions: FunctionDirectory,
    pub globals: VariableDirectory,
    pub entry: String,
}

/// What an attribute reference designates once resolved
#[derive(Debug, Clone)]
pub struct ResolvedAttribute<'a> {
    pub variable: &'a VariableEntry,
    pub attribute: Option<Attribute>,
    pub ty: Type,
}

pub struct SemanticAnalyzer {
    functions: FunctionDirectory,
    globals: VariableDirectory,
    entry: String,
}

impl Default for SemanticAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SemanticAnalyzer {
    pub fn new() -> Self {
        Self::with_entry("main")
    }

    pub fn with_entry(entry: impl Into<String>) -> Self {
        SemanticAnalyzer {
            functions: FunctionDirectory::new(),
            globals: VariableDirectory::new(),
            entry: entry.into(),
        }
    }

    pub fn analyze(mut self, program: Program) -> Result<AnalyzedProgram, CompilerError> {
        self.build_globals(&program)?;
        for function in &program.functions {
            self.build_function(function)?;
        }
        self.check_entry()?;

        for function in &program.functions {
            self.check_function(function)?;
        }

        debug!(
            "semantic analysis of '{}' done: {} functions, {} globals",
            program.id,
            self.functions.len(),
            self.globals.len()
        );

        Ok(AnalyzedProgram {
            program,
            functions: self.functions,
            globals: self.globals,
            entry: self.entry,
        })
    }

    // Directory construction

    fn build_globals(&mut self, program: &Program) -> Result<(), CompilerError> {
        for decl in &program.globals {
            declare(&mut self.globals, decl)?;
        }
        Ok(())
    }

    fn build_function(&mut self, function: &Function) -> Result<(), CompilerError> {
        if builtins::is_reserved(&function.id) {
            return Err(CompilerError::ReservedKeywordViolation(
                function.id.clone(),
                function.line,
            ));
        }
        if function.return_type.is_list() {
            return Err(CompilerError::TypeMismatch(
                "non-list return type".to_string(),
                function.return_type.to_string(),
                function.line,
            ));
        }

        let mut entry =
            FunctionEntry::new(function.id.clone(), function.return_type.clone(), function.line);
        for param in &function.params {
            declare(&mut entry.vars, param)?;
            entry.params.push(param.ty.clone());
        }
        collect_locals(&function.body, &mut entry.vars)?;

        if !self.functions.add(entry) {
            return Err(CompilerError::RedeclarationError(
                function.id.clone(),
                function.line,
            ));
        }
        Ok(())
    }

    fn check_entry(&self) -> Result<(), CompilerError> {
        let entry = self
            .functions
            .get(&self.entry)
            .ok_or_else(|| CompilerError::UndeclaredIdentifier(self.entry.clone(), 0))?;
        if !entry.params.is_empty() {
            return Err(CompilerError::ArityOrArgumentType(
                format!("entry function '{}' must not take parameters", entry.id),
                entry.line,
            ));
        }
        Ok(())
    }

    // Type checking

    fn check_function(&self, function: &Function) -> Result<(), CompilerError> {
        let entry = self.functions.get(&function.id).ok_or_else(|| {
            CompilerError::CodeGenError(format!("function '{}' missing from directory", function.id))
        })?;
        let mut checker = TypeChecker {
            functions: &self.functions,
            scope: Scope::new(&entry.vars, &self.globals),
            return_type: &entry.return_type,
            declared: function.params.iter().map(|p| p.id.clone()).collect(),
        };
        checker.check_block(&function.body)
    }
}

fn declare(dir: &mut VariableDirectory, decl: &VarDecl) -> Result<(), CompilerError> {
    if builtins::is_reserved(&decl.id) {
        return Err(CompilerError::ReservedKeywordViolation(
            decl.id.clone(),
            decl.line,
        ));
    }
    if !dir.add(VariableEntry::new(decl.id.clone(), decl.ty.clone(), decl.line)) {
        return Err(CompilerError::RedeclarationError(
            decl.id.clone(),
            decl.line,
        ));
    }
    Ok(())
}

/// Every declaration in a function body, nested blocks included, lands in
/// the function's single local directory
fn collect_locals(body: &[Statement], dir: &mut VariableDirectory) -> Result<(), CompilerError> {
    for statement in body {
        match statement {
            Statement::VarDecl(decl) => declare(dir, decl)?,
            Statement::Condition(condition) => {
                collect_locals(&condition.then_block, dir)?;
                if let Some(else_block) = &condition.else_block {
                    collect_locals(else_block, dir)?;
                }
            }
            Statement::For(f) => collect_locals(&f.body, dir)?,
            Statement::While(w) => collect_locals(&w.body, dir)?,
            Statement::Assign(_)
            | Statement::Write(_)
            | Statement::Return(_)
            | Statement::Call(_) => {}
        }
    }
    Ok(())
}

/// Resolve `obj`, `obj.field`, `list[i]` or `list[i].field` to its variable,
/// attribute and the type of the designated storage. Index expressions are
/// not inspected here.
pub fn resolve_attribute<'a>(
    scope: Scope<'a>,
    attr: &AttributeRef,
) -> Result<ResolvedAttribute<'a>, CompilerError> {
    let variable = scope
        .lookup(&attr.obj_id)
        .ok_or_else(|| CompilerError::UndeclaredIdentifier(attr.obj_id.clone(), attr.line))?;

    let base = if attr.index.is_some() {
        if !variable.ty.is_list() {
            return Err(CompilerError::TypeMismatch(
                "list".to_string(),
                variable.ty.to_string(),
                attr.line,
            ));
        }
        variable.ty.element_type()
    } else {
        variable.ty.clone()
    };

    let Some(field) = &attr.field else {
        return Ok(ResolvedAttribute {
            variable,
            attribute: None,
            ty: base,
        });
    };

    let attribute = Attribute::from_name(field)
        .filter(|a| base.is_object() && attributes_for(base.element).contains(a))
        .ok_or_else(|| {
            CompilerError::InvalidAttribute(field.clone(), base.to_string(), attr.line)
        })?;

    Ok(ResolvedAttribute {
        variable,
        attribute: Some(attribute),
        ty: Type::basic(attribute.value_type()),
    })
}

struct TypeChecker<'a> {
    functions: &'a FunctionDirectory,
    scope: Scope<'a>,
    return_type: &'a Type,
    /// Locals whose `var` statement has been passed, in statement order
    declared: HashSet<String>,
}

impl<'a> TypeChecker<'a> {
    fn check_block(&mut self, block: &[Statement]) -> Result<(), CompilerError> {
        for statement in block {
            self.check_statement(statement)?;
        }
        Ok(())
    }

    fn check_statement(&mut self, statement: &Statement) -> Result<(), CompilerError> {
        match statement {
            Statement::VarDecl(decl) => {
                self.declared.insert(decl.id.clone());
                Ok(())
            }
            Statement::Assign(assign) => self.check_assign(assign),
            Statement::Condition(condition) => {
                self.check_guard(&condition.guard, condition.line)?;
                self.check_block(&condition.then_block)?;
                if let Some(else_block) = &condition.else_block {
                    self.check_block(else_block)?;
                }
                Ok(())
            }
            Statement::Write(write) => {
                let ty = self.expression_type(&write.value)?;
                if ty.is_void() || ty.is_list() {
                    return Err(CompilerError::TypeMismatch(
                        "printable value".to_string(),
                        ty.to_string(),
                        write.line,
                    ));
                }
                Ok(())
            }
            Statement::Return(ret) => self.check_return(ret),
            Statement::For(f) => {
                self.check_assign(&f.init)?;
                self.check_guard(&f.condition, f.line)?;
                self.check_assign(&f.step)?;
                self.check_block(&f.body)
            }
            Statement::While(w) => {
                self.check_guard(&w.condition, w.line)?;
                self.check_block(&w.body)
            }
            Statement::Call(call) => self.call_type(call).map(|_| ()),
        }
    }

    fn check_assign(&self, assign: &Assign) -> Result<(), CompilerError> {
        let target = self.attribute_type(&assign.target)?;
        let value = self.expression_type(&assign.value)?;
        if target.is_list() || !target.accepts(&value) {
            return Err(CompilerError::TypeMismatch(
                target.to_string(),
                value.to_string(),
                assign.line,
            ));
        }
        Ok(())
    }

    fn check_guard(&self, guard: &Expression, line: usize) -> Result<(), CompilerError> {
        let ty = self.expression_type(guard)?;
        if ty != Type::bool() {
            return Err(CompilerError::TypeMismatch(
                "bool".to_string(),
                ty.to_string(),
                line,
            ));
        }
        Ok(())
    }

    fn check_return(&self, ret: &Return) -> Result<(), CompilerError> {
        match &ret.value {
            None if self.return_type.is_void() => Ok(()),
            None => Err(CompilerError::TypeMismatch(
                self.return_type.to_string(),
                "void".to_string(),
                ret.line,
            )),
            Some(value) => {
                let ty = self.expression_type(value)?;
                if self.return_type.is_void() || !self.return_type.accepts(&ty) {
                    return Err(CompilerError::TypeMismatch(
                        self.return_type.to_string(),
                        ty.to_string(),
                        ret.line,
                    ));
                }
                Ok(())
            }
        }
    }

    fn check_index(&self, index: &Expression, line: usize) -> Result<(), CompilerError> {
        let ty = self.expression_type(index)?;
        if ty != Type::int() {
            return Err(CompilerError::TypeMismatch(
                "int index".to_string(),
                ty.to_string(),
                line,
            ));
        }
        Ok(())
    }

    /// Scope lookup that refuses locals used ahead of their declaration
    fn lookup(&self, id: &str, line: usize) -> Result<&'a VariableEntry, CompilerError> {
        if self.scope.locals.get(id).is_some() && !self.declared.contains(id) {
            return Err(CompilerError::UndeclaredIdentifier(id.to_string(), line));
        }
        self.scope
            .lookup(id)
            .ok_or_else(|| CompilerError::UndeclaredIdentifier(id.to_string(), line))
    }

    fn attribute_type(&self, attr: &AttributeRef) -> Result<Type, CompilerError> {
        if let Some(index) = &attr.index {
            self.check_index(index, attr.line)?;
        }
        self.lookup(&attr.obj_id, attr.line)?;
        resolve_attribute(self.scope, attr).map(|r| r.ty)
    }

    fn expression_type(&self, expression: &Expression) -> Result<Type, CompilerError> {
        let mut acc = self.exp_type(&expression.exps[0])?;
        for (op, exp) in expression.ops.iter().zip(&expression.exps[1..]) {
            let next = self.exp_type(exp)?;
            acc = cube().check(*op, &acc, &next)?;
        }
        Ok(acc)
    }

    fn exp_type(&self, exp: &Exp) -> Result<Type, CompilerError> {
        let mut acc = self.term_type(&exp.terms[0])?;
        for (op, term) in exp.ops.iter().zip(&exp.terms[1..]) {
            let next = self.term_type(term)?;
            acc = cube().check(*op, &acc, &next)?;
        }
        Ok(acc)
    }

    fn term_type(&self, term: &Term) -> Result<Type, CompilerError> {
        let mut acc = self.factor_type(&term.factors[0])?;
        for (op, factor) in term.ops.iter().zip(&term.factors[1..]) {
            let next = self.factor_type(factor)?;
            acc = cube().check(*op, &acc, &next)?;
        }
        Ok(acc)
    }

    fn factor_type(&self, factor: &Factor) -> Result<Type, CompilerError> {
        match factor {
            Factor::Expression(inner) => self.expression_type(inner),
            Factor::Not(inner) => {
                let ty = self.factor_type(inner)?;
                cube().check_not(&ty)
            }
            Factor::Constant(constant) => self.constant_type(constant),
        }
    }

    fn constant_type(&self, constant: &Constant) -> Result<Type, CompilerError> {
        match constant {
            Constant::Literal(literal) => Ok(literal.ty.clone()),
            Constant::Attribute(attr) => self.attribute_type(attr),
            Constant::Call(call) => self.call_type(call),
            Constant::ListElem(elem) => {
                self.check_index(&elem.index, elem.line)?;
                let variable = self.lookup(&elem.id, elem.line)?;
                if !variable.ty.is_list() {
                    return Err(CompilerError::TypeMismatch(
                        "list".to_string(),
                        variable.ty.to_string(),
                        elem.line,
                    ));
                }
                Ok(variable.ty.element_type())
            }
        }
    }

    fn call_type(&self, call: &FunctionCall) -> Result<Type, CompilerError> {
        let arg_types = call
            .args
            .iter()
            .map(|arg| self.expression_type(arg))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(builtin) = builtins::lookup(&call.id) {
            check_arity(&call.id, builtin.params.len(), arg_types.len(), call.line)?;
            for (i, (kind, ty)) in builtin.params.iter().zip(&arg_types).enumerate() {
                if !kind.accepts(ty) {
                    return Err(argument_error(&call.id, i, &kind.describe(), ty, call.line));
                }
            }
            return Ok(builtin.return_type());
        }

        let function = self
            .functions
            .get(&call.id)
            .ok_or_else(|| CompilerError::UndeclaredIdentifier(call.id.clone(), call.line))?;
        check_arity(&call.id, function.params.len(), arg_types.len(), call.line)?;
        for (i, (param, (arg, ty))) in function
            .params
            .iter()
            .zip(call.args.iter().zip(&arg_types))
            .enumerate()
        {
            let matches = if param.is_list() {
                param == ty && param.size == ty.size && is_plain_variable(arg)
            } else {
                param.accepts(ty)
            };
            if !matches {
                return Err(argument_error(&call.id, i, &param.to_string(), ty, call.line));
            }
        }
        Ok(function.return_type.clone())
    }
}

fn check_arity(id: &str, expected: usize, found: usize, line: usize) -> Result<(), CompilerError> {
    if expected != found {
        return Err(CompilerError::ArityOrArgumentType(
            format!("'{}' expects {} arguments, got {}", id, expected, found),
            line,
        ));
    }
    Ok(())
}

fn argument_error(id: &str, position: usize, expected: &str, found: &Type, line: usize) -> CompilerError {
    CompilerError::ArityOrArgumentType(
        format!(
            "argument {} of '{}' expects {}, got {}",
            position + 1,
            id,
            expected,
            found
        ),
        line,
    )
}

/// List arguments are passed by copying the variable's storage block, so
/// they must name a variable directly
fn is_plain_variable(expression: &Expression) -> bool {
    if !expression.ops.is_empty() {
        return false;
    }
    let exp = &expression.exps[0];
    if !exp.ops.is_empty() || exp.terms[0].factors.len() != 1 {
        return false;
    }
    match &exp.terms[0].factors[0] {
        Factor::Constant(Constant::Attribute(attr)) => attr.index.is_none() && attr.field.is_none(),
        Factor::Expression(inner) => is_plain_variable(inner),
        _ => false,
    }
}
