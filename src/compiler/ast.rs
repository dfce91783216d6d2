// Abstract Syntax Tree definitions for Doodle

use crate::compiler::types::Type;

#[derive(Debug, Clone)]
pub struct Program {
    pub id: String,
    pub globals: Vec<VarDecl>,
    pub functions: Vec<Function>,
}

/// A variable or parameter declaration
#[derive(Debug, Clone)]
pub struct VarDecl {
    pub id: String,
    pub ty: Type,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub id: String,
    pub params: Vec<VarDecl>,
    pub return_type: Type,
    pub body: Vec<Statement>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub enum Statement {
    VarDecl(VarDecl),
    Assign(Assign),
    Condition(Condition),
    Write(Write),
    Return(Return),
    For(For),
    While(While),
    Call(FunctionCall),
}

#[derive(Debug, Clone)]
pub struct Assign {
    pub target: AttributeRef,
    pub value: Expression,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct Condition {
    pub guard: Expression,
    pub then_block: Vec<Statement>,
    pub else_block: Option<Vec<Statement>>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct Write {
    pub value: Expression,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct Return {
    pub value: Option<Expression>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct For {
    pub init: Assign,
    pub condition: Expression,
    pub step: Assign,
    pub body: Vec<Statement>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct While {
    pub condition: Expression,
    pub body: Vec<Statement>,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Gt,
    Eq,
    And,
    Or,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Eq => "==",
            Operator::And => "&&",
            Operator::Or => "||",
        }
    }
}

// Expression -> Exp -> Term -> Factor, each a left-associative chain.
// `ops[i]` joins element `i` and element `i + 1`.

#[derive(Debug, Clone)]
pub struct Expression {
    pub exps: Vec<Exp>,
    pub ops: Vec<Operator>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct Exp {
    pub terms: Vec<Term>,
    pub ops: Vec<Operator>,
}

#[derive(Debug, Clone)]
pub struct Term {
    pub factors: Vec<Factor>,
    pub ops: Vec<Operator>,
}

#[derive(Debug, Clone)]
pub enum Factor {
    Expression(Box<Expression>),
    Not(Box<Factor>),
    Constant(Constant),
}

#[derive(Debug, Clone)]
pub enum Constant {
    Literal(Literal),
    Attribute(AttributeRef),
    Call(FunctionCall),
    ListElem(ListElem),
}

/// A literal keeps its lexical text; constants are interned by (type, text)
#[derive(Debug, Clone)]
pub struct Literal {
    pub text: String,
    pub ty: Type,
    pub line: usize,
}

/// `obj`, `obj.field`, `list[i]` as an assignment target, or `list[i].field`
#[derive(Debug, Clone)]
pub struct AttributeRef {
    pub obj_id: String,
    pub field: Option<String>,
    pub index: Option<Box<Expression>>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct ListElem {
    pub id: String,
    pub index: Box<Expression>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct FunctionCall {
    pub id: String,
    pub args: Vec<Expression>,
    pub line: usize,
}

impl Expression {
    /// Wrap a single factor as a full expression
    pub fn from_factor(factor: Factor, line: usize) -> Self {
        Expression {
            exps: vec![Exp {
                terms: vec![Term {
                    factors: vec![factor],
                    ops: Vec::new(),
                }],
                ops: Vec::new(),
            }],
            ops: Vec::new(),
            line,
        }
    }
}
