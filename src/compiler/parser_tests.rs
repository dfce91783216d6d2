// Parser tests for the Doodle language

use crate::compiler::ast::*;
use crate::compiler::error::CompilerError;
use crate::compiler::lexer::Lexer;
use crate::compiler::parser::Parser;
use crate::compiler::types::{ElementType, Type};
use test_log::test;

fn parse_input(input: &str) -> Result<Program, CompilerError> {
    let mut lexer = Lexer::new(input);
    let tokens = lexer.tokenize()?;
    let mut parser = Parser::new(tokens);
    parser.parse()
}

fn parse_expr(input: &str) -> Expression {
    let tokens = Lexer::new(input).tokenize().unwrap();
    Parser::new(tokens).parse_expression().unwrap()
}

#[test]
fn test_minimal_program() {
    let program = parse_input("program p; func void main() { }").unwrap();
    assert_eq!(program.id, "p");
    assert!(program.globals.is_empty());
    assert_eq!(program.functions.len(), 1);
    assert!(program.functions[0].return_type.is_void());
}

#[test]
fn test_globals_and_list_types() {
    let program = parse_input(
        "program p; var int a, b; var square[3] boxes; func void main() { }",
    )
    .unwrap();
    let ids: Vec<_> = program.globals.iter().map(|g| g.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "boxes"]);
    assert_eq!(program.globals[2].ty, Type::list(ElementType::Square, 3));
    assert_eq!(program.globals[2].ty.size, 3);
}

#[test]
fn test_function_params() {
    let program =
        parse_input("program p; func int add(int a, float b) { return a; }").unwrap();
    let f = &program.functions[0];
    assert_eq!(f.id, "add");
    assert_eq!(f.params.len(), 2);
    assert_eq!(f.params[1].ty, Type::float());
    assert!(matches!(f.body[0], Statement::Return(Return { value: Some(_), .. })));
}

#[test]
fn test_statement_forms() {
    let program = parse_input(
        r#"program p;
        func void main() {
            var int i;
            var square s;
            i = 0;
            s.x = 1.5;
            if (i < 3) { write i; } else { write "no"; }
            while (i < 3) { i = i + 1; }
            for (i = 0; i < 3; i = i + 1) { render(s); }
            clear();
        }"#,
    )
    .unwrap();
    let body = &program.functions[0].body;
    assert!(matches!(body[0], Statement::VarDecl(_)));
    assert!(matches!(body[3], Statement::Assign(_)));
    if let Statement::Assign(assign) = &body[3] {
        assert_eq!(assign.target.field.as_deref(), Some("x"));
    }
    assert!(matches!(
        body[4],
        Statement::Condition(Condition {
            else_block: Some(_),
            ..
        })
    ));
    assert!(matches!(body[5], Statement::While(_)));
    assert!(matches!(body[6], Statement::For(_)));
    assert!(matches!(body[7], Statement::Call(_)));
}

#[test]
fn test_logical_ops_nest_relational_chains() {
    let expr = parse_expr("a < b && c == d");
    assert_eq!(expr.ops, vec![Operator::And]);
    assert_eq!(expr.exps.len(), 2);
    match &expr.exps[0].terms[0].factors[0] {
        Factor::Expression(inner) => assert_eq!(inner.ops, vec![Operator::Lt]),
        other => panic!("expected nested expression, got {:?}", other),
    }
}

#[test]
fn test_relational_stays_flat() {
    let expr = parse_expr("a + 1 < b * 2");
    assert_eq!(expr.ops, vec![Operator::Lt]);
    assert_eq!(expr.exps[0].ops, vec![Operator::Add]);
    assert_eq!(expr.exps[1].terms[0].ops, vec![Operator::Mul]);
}

#[test]
fn test_negative_literal_and_not() {
    let expr = parse_expr("!(x == -3)");
    match &expr.exps[0].terms[0].factors[0] {
        Factor::Not(inner) => match inner.as_ref() {
            Factor::Expression(e) => match &e.exps[1].terms[0].factors[0] {
                Factor::Constant(Constant::Literal(l)) => assert_eq!(l.text, "-3"),
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        },
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_list_element_and_indexed_attribute() {
    let expr = parse_expr("xs[1] + boxes[0].x");
    assert!(matches!(
        expr.exps[0].terms[0].factors[0],
        Factor::Constant(Constant::ListElem(_))
    ));
    match &expr.exps[0].terms[1].factors[0] {
        Factor::Constant(Constant::Attribute(a)) => {
            assert_eq!(a.obj_id, "boxes");
            assert!(a.index.is_some());
            assert_eq!(a.field.as_deref(), Some("x"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_string_literal_keeps_quotes() {
    let expr = parse_expr(r#""hi there""#);
    match &expr.exps[0].terms[0].factors[0] {
        Factor::Constant(Constant::Literal(l)) => {
            assert_eq!(l.text, "\"hi there\"");
            assert_eq!(l.ty, Type::basic(ElementType::String));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_void_variable_rejected() {
    let err = parse_input("program p; var void v; func void main() { }").unwrap_err();
    assert!(matches!(err, CompilerError::ParseError(_, 1)));
}

#[test]
fn test_missing_semicolon_reports_line() {
    let err = parse_input("program p;\nfunc void main() {\n write 1\n}").unwrap_err();
    assert!(matches!(err, CompilerError::ParseError(_, 4)));
}
