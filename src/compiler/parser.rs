// Doodle Language Recursive Descent Parser

use crate::compiler::ast::*;
use crate::compiler::error::CompilerError;
use crate::compiler::lexer::{quote_char, quote_string, Token, TokenKind};
use crate::compiler::types::{ElementType, Type};

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, current: 0 }
    }

    pub fn parse(&mut self) -> Result<Program, CompilerError> {
        self.consume(TokenKind::Program, "Expected 'program'")?;
        let id = self.consume_identifier("Expected program name")?;
        self.consume(TokenKind::Semicolon, "Expected ';' after program name")?;

        let mut globals = Vec::new();
        while self.check(&TokenKind::Var) {
            globals.extend(self.parse_var_decl()?);
        }

        let mut functions = Vec::new();
        while !self.is_at_end() {
            functions.push(self.parse_function()?);
        }

        Ok(Program {
            id,
            globals,
            functions,
        })
    }

    fn parse_var_decl(&mut self) -> Result<Vec<VarDecl>, CompilerError> {
        self.consume(TokenKind::Var, "Expected 'var'")?;
        let line = self.peek().line;
        let ty = self.parse_type()?;
        if ty.is_void() {
            return Err(CompilerError::ParseError(
                "'void' is only valid as a return type".to_string(),
                line,
            ));
        }

        let mut decls = Vec::new();
        loop {
            let line = self.peek().line;
            let id = self.consume_identifier("Expected variable name")?;
            decls.push(VarDecl {
                id,
                ty: ty.clone(),
                line,
            });
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        self.consume(TokenKind::Semicolon, "Expected ';' after variable declaration")?;
        Ok(decls)
    }

    fn parse_type(&mut self) -> Result<Type, CompilerError> {
        let token = self.advance().clone();
        let element = match &token.kind {
            TokenKind::TypeName(name) => ElementType::from_keyword(name),
            _ => None,
        }
        .ok_or_else(|| {
            CompilerError::ParseError(format!("Expected type, found {:?}", token.kind), token.line)
        })?;

        if self.match_token(&TokenKind::LeftBracket) {
            let size_token = self.advance().clone();
            let size = match size_token.kind {
                TokenKind::IntegerLiteral(n) if n > 0 => n as usize,
                _ => {
                    return Err(CompilerError::ParseError(
                        "List size must be a positive integer".to_string(),
                        size_token.line,
                    ))
                }
            };
            self.consume(TokenKind::RightBracket, "Expected ']' after list size")?;
            if element == ElementType::Void {
                return Err(CompilerError::ParseError(
                    "Lists of void are not allowed".to_string(),
                    token.line,
                ));
            }
            return Ok(Type::list(element, size));
        }

        Ok(Type::basic(element))
    }

    fn parse_function(&mut self) -> Result<Function, CompilerError> {
        let line = self.peek().line;
        self.consume(TokenKind::Func, "Expected 'func'")?;
        let return_type = self.parse_type()?;
        let id = self.consume_identifier("Expected function name")?;
        self.consume(TokenKind::LeftParen, "Expected '(' after function name")?;

        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                let line = self.peek().line;
                let ty = self.parse_type()?;
                if ty.is_void() {
                    return Err(CompilerError::ParseError(
                        "Parameters cannot be void".to_string(),
                        line,
                    ));
                }
                let id = self.consume_identifier("Expected parameter name")?;
                params.push(VarDecl { id, ty, line });
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expected ')' after parameters")?;

        let body = self.parse_block()?;

        Ok(Function {
            id,
            params,
            return_type,
            body,
            line,
        })
    }

    fn parse_block(&mut self) -> Result<Vec<Statement>, CompilerError> {
        self.consume(TokenKind::LeftBrace, "Expected '{'")?;

        let mut statements = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            statements.extend(self.parse_statement()?);
        }

        self.consume(TokenKind::RightBrace, "Expected '}'")?;
        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<Vec<Statement>, CompilerError> {
        let line = self.peek().line;

        let statement = match &self.peek().kind {
            TokenKind::Var => {
                return Ok(self
                    .parse_var_decl()?
                    .into_iter()
                    .map(Statement::VarDecl)
                    .collect())
            }
            TokenKind::If => {
                self.advance();
                self.consume(TokenKind::LeftParen, "Expected '(' after 'if'")?;
                let guard = self.parse_expression()?;
                self.consume(TokenKind::RightParen, "Expected ')' after condition")?;
                let then_block = self.parse_block()?;
                let else_block = if self.match_token(&TokenKind::Else) {
                    Some(self.parse_block()?)
                } else {
                    None
                };
                Statement::Condition(Condition {
                    guard,
                    then_block,
                    else_block,
                    line,
                })
            }
            TokenKind::While => {
                self.advance();
                self.consume(TokenKind::LeftParen, "Expected '(' after 'while'")?;
                let condition = self.parse_expression()?;
                self.consume(TokenKind::RightParen, "Expected ')' after condition")?;
                let body = self.parse_block()?;
                Statement::While(While {
                    condition,
                    body,
                    line,
                })
            }
            TokenKind::For => {
                self.advance();
                self.consume(TokenKind::LeftParen, "Expected '(' after 'for'")?;
                let init = self.parse_assign()?;
                self.consume(TokenKind::Semicolon, "Expected ';' after for initializer")?;
                let condition = self.parse_expression()?;
                self.consume(TokenKind::Semicolon, "Expected ';' after for condition")?;
                let step = self.parse_assign()?;
                self.consume(TokenKind::RightParen, "Expected ')' after for step")?;
                let body = self.parse_block()?;
                Statement::For(For {
                    init,
                    condition,
                    step,
                    body,
                    line,
                })
            }
            TokenKind::Write => {
                self.advance();
                let value = self.parse_expression()?;
                self.consume(TokenKind::Semicolon, "Expected ';' after write")?;
                Statement::Write(Write { value, line })
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.check(&TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.consume(TokenKind::Semicolon, "Expected ';' after return")?;
                Statement::Return(Return { value, line })
            }
            TokenKind::Identifier(_) if self.peek_next_is(&TokenKind::LeftParen) => {
                let call = self.parse_call()?;
                self.consume(TokenKind::Semicolon, "Expected ';' after call")?;
                Statement::Call(call)
            }
            TokenKind::Identifier(_) => {
                let assign = self.parse_assign()?;
                self.consume(TokenKind::Semicolon, "Expected ';' after assignment")?;
                Statement::Assign(assign)
            }
            other => {
                return Err(CompilerError::ParseError(
                    format!("Expected statement, found {:?}", other),
                    line,
                ))
            }
        };

        Ok(vec![statement])
    }

    fn parse_assign(&mut self) -> Result<Assign, CompilerError> {
        let line = self.peek().line;
        let target = self.parse_attribute_ref()?;
        self.consume(TokenKind::Equal, "Expected '=' in assignment")?;
        let value = self.parse_expression()?;
        Ok(Assign {
            target,
            value,
            line,
        })
    }

    fn parse_attribute_ref(&mut self) -> Result<AttributeRef, CompilerError> {
        let line = self.peek().line;
        let obj_id = self.consume_identifier("Expected identifier")?;

        let index = if self.match_token(&TokenKind::LeftBracket) {
            let index = self.parse_expression()?;
            self.consume(TokenKind::RightBracket, "Expected ']' after index")?;
            Some(Box::new(index))
        } else {
            None
        };

        let field = if self.match_token(&TokenKind::Dot) {
            Some(self.consume_identifier("Expected attribute name after '.'")?)
        } else {
            None
        };

        Ok(AttributeRef {
            obj_id,
            field,
            index,
            line,
        })
    }

    fn parse_call(&mut self) -> Result<FunctionCall, CompilerError> {
        let line = self.peek().line;
        let id = self.consume_identifier("Expected function name")?;
        self.consume(TokenKind::LeftParen, "Expected '('")?;

        let mut args = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expected ')' after arguments")?;

        Ok(FunctionCall { id, args, line })
    }

    /// Logical operators bind looser than relational ones. Each relational
    /// chain joined by `&&`/`||` becomes its own parenthesized sub-expression.
    pub fn parse_expression(&mut self) -> Result<Expression, CompilerError> {
        let line = self.peek().line;
        let first = self.parse_relational()?;
        if !self.check(&TokenKind::And) && !self.check(&TokenKind::Or) {
            return Ok(first);
        }

        let mut exps = vec![nest_relational(first)];
        let mut ops = Vec::new();
        while let Some(op) = self.match_operator(&[
            (TokenKind::And, Operator::And),
            (TokenKind::Or, Operator::Or),
        ]) {
            ops.push(op);
            let next = self.parse_relational()?;
            exps.push(nest_relational(next));
        }

        Ok(Expression { exps, ops, line })
    }

    fn parse_relational(&mut self) -> Result<Expression, CompilerError> {
        let line = self.peek().line;
        let mut exps = vec![self.parse_exp()?];
        let mut ops = Vec::new();
        while let Some(op) = self.match_operator(&[
            (TokenKind::Less, Operator::Lt),
            (TokenKind::Greater, Operator::Gt),
            (TokenKind::EqualEqual, Operator::Eq),
        ]) {
            ops.push(op);
            exps.push(self.parse_exp()?);
        }
        Ok(Expression { exps, ops, line })
    }

    fn parse_exp(&mut self) -> Result<Exp, CompilerError> {
        let mut terms = vec![self.parse_term()?];
        let mut ops = Vec::new();
        while let Some(op) = self.match_operator(&[
            (TokenKind::Plus, Operator::Add),
            (TokenKind::Minus, Operator::Sub),
        ]) {
            ops.push(op);
            terms.push(self.parse_term()?);
        }
        Ok(Exp { terms, ops })
    }

    fn parse_term(&mut self) -> Result<Term, CompilerError> {
        let mut factors = vec![self.parse_factor()?];
        let mut ops = Vec::new();
        while let Some(op) = self.match_operator(&[
            (TokenKind::Star, Operator::Mul),
            (TokenKind::Slash, Operator::Div),
        ]) {
            ops.push(op);
            factors.push(self.parse_factor()?);
        }
        Ok(Term { factors, ops })
    }

    fn parse_factor(&mut self) -> Result<Factor, CompilerError> {
        let token = self.peek().clone();
        let line = token.line;

        match token.kind {
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.consume(TokenKind::RightParen, "Expected ')' after expression")?;
                Ok(Factor::Expression(Box::new(inner)))
            }
            TokenKind::Not => {
                self.advance();
                Ok(Factor::Not(Box::new(self.parse_factor()?)))
            }
            TokenKind::Minus => {
                self.advance();
                let number = self.advance().clone();
                match number.kind {
                    TokenKind::IntegerLiteral(n) => {
                        Ok(literal(format!("-{}", n), ElementType::Int, line))
                    }
                    TokenKind::FloatLiteral(f) => {
                        Ok(literal(format!("{:?}", -f), ElementType::Float, line))
                    }
                    _ => Err(CompilerError::ParseError(
                        "Unary '-' is only supported before numeric literals".to_string(),
                        line,
                    )),
                }
            }
            TokenKind::IntegerLiteral(n) => {
                self.advance();
                Ok(literal(n.to_string(), ElementType::Int, line))
            }
            TokenKind::FloatLiteral(f) => {
                self.advance();
                Ok(literal(format!("{:?}", f), ElementType::Float, line))
            }
            TokenKind::CharLiteral(c) => {
                self.advance();
                Ok(literal(quote_char(c), ElementType::Char, line))
            }
            TokenKind::StringLiteral(s) => {
                self.advance();
                Ok(literal(quote_string(&s), ElementType::String, line))
            }
            TokenKind::True => {
                self.advance();
                Ok(literal("true".to_string(), ElementType::Bool, line))
            }
            TokenKind::False => {
                self.advance();
                Ok(literal("false".to_string(), ElementType::Bool, line))
            }
            TokenKind::Identifier(_) if self.peek_next_is(&TokenKind::LeftParen) => {
                Ok(Factor::Constant(Constant::Call(self.parse_call()?)))
            }
            TokenKind::Identifier(_) => {
                let attribute = self.parse_attribute_ref()?;
                match (attribute.index, attribute.field) {
                    (Some(index), None) => Ok(Factor::Constant(Constant::ListElem(ListElem {
                        id: attribute.obj_id,
                        index,
                        line,
                    }))),
                    (index, field) => Ok(Factor::Constant(Constant::Attribute(AttributeRef {
                        obj_id: attribute.obj_id,
                        field,
                        index,
                        line,
                    }))),
                }
            }
            other => Err(CompilerError::ParseError(
                format!("Expected expression, found {:?}", other),
                line,
            )),
        }
    }

    // Helper methods

    fn match_operator(&mut self, table: &[(TokenKind, Operator)]) -> Option<Operator> {
        let op = table
            .iter()
            .find(|(kind, _)| self.check(kind))
            .map(|(_, op)| *op)?;
        self.advance();
        Some(op)
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn peek_next_is(&self, kind: &TokenKind) -> bool {
        self.tokens
            .get(self.current + 1)
            .map(|t| std::mem::discriminant(&t.kind) == std::mem::discriminant(kind))
            .unwrap_or(false)
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::EOF
    }

    fn peek(&self) -> &Token {
        // The lexer always terminates the stream with EOF
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<&Token, CompilerError> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            let token = self.peek();
            Err(CompilerError::ParseError(
                format!("{}, found {:?}", message, token.kind),
                token.line,
            ))
        }
    }

    fn consume_identifier(&mut self, message: &str) -> Result<String, CompilerError> {
        let token = self.peek().clone();
        if let TokenKind::Identifier(name) = token.kind {
            self.advance();
            Ok(name)
        } else {
            Err(CompilerError::ParseError(
                format!("{}, found {:?}", message, token.kind),
                token.line,
            ))
        }
    }
}

fn literal(text: String, element: ElementType, line: usize) -> Factor {
    Factor::Constant(Constant::Literal(Literal {
        text,
        ty: Type::basic(element),
        line,
    }))
}

fn nest_relational(mut expression: Expression) -> Exp {
    if expression.ops.is_empty() {
        if let Some(exp) = expression.exps.pop() {
            return exp;
        }
    }
    Exp {
        terms: vec![Term {
            factors: vec![Factor::Expression(Box::new(expression))],
            ops: Vec::new(),
        }],
        ops: Vec::new(),
    }
}
